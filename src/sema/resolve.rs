//! Pass 3: identifier resolution
//!
//! Every unresolved reference searches its enclosing function's scope and
//! falls back to the global scope.  A successful lookup binds the
//! reference and marks the declaration as used; a miss is a fatal semantic
//! error.  References that are already bound are skipped, which makes the
//! pass idempotent: a second run binds nothing and raises nothing.

use tracing::debug;

use crate::ast::{NodeKind, SyntaxTree};
use crate::diagnostics::FrontendError;
use crate::sema::symbols::{SymbolTable, GLOBAL_SCOPE};

pub fn run(tree: &mut SyntaxTree, symbols: &mut SymbolTable) -> Result<usize, FrontendError> {
    let ids = tree.find_matching(|node| {
        matches!(node.kind, NodeKind::Identifier { resolved: None, .. })
    });
    debug!(count = ids.len(), "resolving identifier references");

    let mut bound = 0;
    for id in ids {
        let node = tree.node(id);
        let NodeKind::Identifier { ref name, .. } = node.kind else {
            continue;
        };
        let name = name.clone();
        let location = node.location;

        let scope = tree.enclosing_function(id).unwrap_or(GLOBAL_SCOPE);
        let declaration = symbols
            .lookup(scope, &name)
            .or_else(|| symbols.lookup(GLOBAL_SCOPE, &name));

        let Some(declaration) = declaration else {
            return Err(FrontendError::semantic(
                format!("use of undeclared identifier '{name}'"),
                Some(location),
            ));
        };

        if let NodeKind::Identifier { resolved, .. } = &mut tree.node_mut(id).kind {
            *resolved = Some(declaration);
        }
        symbols.mark_used(declaration);
        bound += 1;
    }
    Ok(bound)
}
