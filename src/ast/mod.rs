//! Syntax tree data model
//!
//! - [`node`]: the closed node hierarchy and its families
//! - [`tree`]: the arena, ownership rules, and the mutation primitive
//! - [`types`]: type facades attached to declarations and expressions
//! - [`display`]: rendering in current and as-originally-parsed modes
//!
//! # Ownership
//!
//! Forward (parent→child) ids inside [`NodeKind`] fields are the only
//! owning edges; the tree is owned top-down from a single translation-unit
//! root.  The per-node parent back-reference and the generic `children()`
//! traversal view are non-owning and must never extend a node's lifetime.

pub mod display;
pub mod node;
pub mod tree;
pub mod types;

pub use display::RenderMode;
pub use node::{BinOp, Node, NodeId, NodeKind, SourceLocation, UnOp};
pub use tree::SyntaxTree;
pub use types::{BuiltinType, TypeFacade, TypeRef, POINTER_SIZE};
