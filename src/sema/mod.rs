//! Semantic resolver
//!
//! A fixed, ordered sequence of whole-tree passes over the finished syntax
//! tree, each one a "find every node matching a predicate, run a callback"
//! walk:
//!
//! 1. [`collect`] — record named declarations per scope
//! 2. [`fold`] — execute and replace builtin compile-time calls
//! 3. [`resolve`] — bind identifier references, mark declarations used
//! 4. [`prototypes`] — link function definitions to forward declarations
//! 5. [`deduce`] — propagate types bottom-up
//! 6. [`validate`] — check agreement, inject implicit conversions, report
//!    unused declarations
//!
//! The first violation aborts the whole run; a partially resolved tree is
//! never handed to later stages.

mod collect;
mod deduce;
mod fold;
mod prototypes;
mod resolve;
pub mod symbols;
mod validate;

use tracing::debug;

pub use symbols::{ScopeId, SymbolTable, GLOBAL_SCOPE};

use crate::ast::SyntaxTree;
use crate::context::Context;
use crate::diagnostics::FrontendError;

/// Run the full pass sequence.  On success the tree is fully bound and
/// typed and the returned symbol table reflects every declaration and its
/// usage.
pub fn resolve(tree: &mut SyntaxTree, ctx: &mut Context) -> Result<SymbolTable, FrontendError> {
    ctx.clear_notices();
    let mut symbols = SymbolTable::new();

    debug!("pass 1: named-declaration collection");
    collect::run(tree, &mut symbols)?;
    debug!("pass 2: static folding");
    fold::run(tree)?;
    debug!("pass 3: identifier resolution");
    resolve::run(tree, &mut symbols)?;
    debug!("pass 4: prototype binding");
    prototypes::run(tree, &mut symbols)?;
    debug!("pass 5: type deduction");
    deduce::run(tree)?;
    debug!("pass 6: validation");
    validate::run(tree, ctx, &symbols)?;

    Ok(symbols)
}

/// Re-run identifier resolution alone.  Binding is idempotent: on an
/// already-resolved tree this binds nothing and raises nothing.  Returns
/// the number of references bound.
pub fn resolve_identifiers(
    tree: &mut SyntaxTree,
    symbols: &mut SymbolTable,
) -> Result<usize, FrontendError> {
    resolve::run(tree, symbols)
}
