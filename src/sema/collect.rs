//! Pass 1: named-declaration collection
//!
//! Every declaration node with a non-empty name is recorded under its
//! enclosing function's scope id, or the global scope id if it sits at file
//! scope.  Record fields are left out — they live in their record's member
//! namespace and are reached through member lookup, never by bare name.

use tracing::debug;

use crate::ast::{NodeId, NodeKind, SyntaxTree};
use crate::diagnostics::FrontendError;
use crate::sema::symbols::{SymbolTable, GLOBAL_SCOPE};

pub(crate) fn run(tree: &SyntaxTree, symbols: &mut SymbolTable) -> Result<(), FrontendError> {
    let ids = tree.find_matching(|node| node.kind.is_declaration());
    debug!(count = ids.len(), "collecting named declarations");

    for id in ids {
        let node = tree.node(id);
        let Some(name) = node.kind.declared_name().map(str::to_string) else {
            continue;
        };
        match &node.kind {
            NodeKind::TranslationUnit { .. } | NodeKind::FieldDecl { .. } => continue,
            NodeKind::FunctionDecl { body, .. } => {
                let scope = scope_of(tree, id)?;
                let is_definition = body.is_some();
                if !is_definition {
                    symbols.add_prototype(id);
                }
                match symbols.entry(scope, &name) {
                    Some(existing) => {
                        let existing_is_definition = matches!(
                            tree.node(existing).kind,
                            NodeKind::FunctionDecl { body: Some(_), .. }
                        );
                        if is_definition && existing_is_definition {
                            return Err(FrontendError::semantic(
                                format!("redefinition of '{name}'"),
                                Some(node.location),
                            ));
                        }
                        // The definition wins the name; prototypes keep
                        // their slot in the prototype list for binding.
                        if is_definition {
                            symbols.insert(scope, &name, id);
                        }
                    }
                    None => symbols.insert(scope, &name, id),
                }
            }
            _ => {
                let scope = scope_of(tree, id)?;
                if symbols.entry(scope, &name).is_some() {
                    return Err(FrontendError::semantic(
                        format!("redefinition of '{name}'"),
                        Some(node.location),
                    ));
                }
                symbols.insert(scope, &name, id);
            }
        }
    }
    Ok(())
}

/// Scope a declaration belongs to: its enclosing function, or the global
/// scope.  A declaration inside a compound block that has no enclosing
/// function is ill-formed.
fn scope_of(tree: &SyntaxTree, id: NodeId) -> Result<NodeId, FrontendError> {
    let mut block_seen = false;
    let mut cursor = tree.node(id).parent;
    while let Some(current) = cursor {
        match &tree.node(current).kind {
            NodeKind::FunctionDecl { .. } => return Ok(current),
            NodeKind::Block { .. } => block_seen = true,
            _ => {}
        }
        cursor = tree.node(current).parent;
    }
    if block_seen {
        return Err(FrontendError::semantic(
            "declaration inside a block with no enclosing function",
            Some(tree.node(id).location),
        ));
    }
    Ok(GLOBAL_SCOPE)
}
