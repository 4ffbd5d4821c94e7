//! Pass 4: prototype binding
//!
//! Each function definition is matched by name against the prototype-only
//! declarations collected earlier.  Matching pairs are linked through their
//! `binding` fields, and both sides are marked used: a definition is a
//! reference to its forward declaration and vice versa.

use tracing::debug;

use crate::ast::{NodeKind, SyntaxTree};
use crate::diagnostics::FrontendError;
use crate::sema::symbols::SymbolTable;

pub(crate) fn run(tree: &mut SyntaxTree, symbols: &mut SymbolTable) -> Result<(), FrontendError> {
    let definitions = tree.find_matching(|node| {
        matches!(
            node.kind,
            NodeKind::FunctionDecl {
                body: Some(_),
                binding: None,
                ..
            }
        )
    });
    debug!(count = definitions.len(), "binding function prototypes");

    for definition in definitions {
        let Some(name) = tree.node(definition).kind.declared_name().map(str::to_string) else {
            continue;
        };

        let prototype = symbols.prototypes().iter().copied().find(|&p| {
            matches!(
                tree.node(p).kind,
                NodeKind::FunctionDecl {
                    body: None,
                    binding: None,
                    ..
                }
            ) && tree.node(p).kind.declared_name() == Some(name.as_str())
        });

        if let Some(prototype) = prototype {
            if let NodeKind::FunctionDecl { binding, .. } = &mut tree.node_mut(definition).kind {
                *binding = Some(prototype);
            }
            if let NodeKind::FunctionDecl { binding, .. } = &mut tree.node_mut(prototype).kind {
                *binding = Some(definition);
            }
            symbols.mark_used(definition);
            symbols.mark_used(prototype);
        }
    }
    Ok(())
}
