//! Type facades
//!
//! Declarations and expressions carry a [`TypeFacade`]: a pointer count
//! plus a reference to an underlying type descriptor.  Facades are compared
//! structurally — two record types agree when their fields agree, and a
//! type alias is transparent to comparison — never by descriptor identity.

use crate::ast::node::{NodeId, NodeKind};
use crate::ast::tree::SyntaxTree;

/// Width of a pointer on the target, in bytes.
pub const POINTER_SIZE: i64 = 8;

/// Built-in scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinType {
    Void,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl BuiltinType {
    pub fn name(self) -> &'static str {
        match self {
            BuiltinType::Void => "void",
            BuiltinType::Char => "char",
            BuiltinType::Int => "int",
            BuiltinType::Long => "long",
            BuiltinType::Float => "float",
            BuiltinType::Double => "double",
        }
    }

    /// Size of the type on the target platform.
    pub fn size_in_bytes(self) -> i64 {
        match self {
            BuiltinType::Void => 0,
            BuiltinType::Char => 1,
            BuiltinType::Int => 4,
            BuiltinType::Long => 8,
            BuiltinType::Float => 4,
            BuiltinType::Double => 8,
        }
    }

    pub fn is_arithmetic(self) -> bool {
        !matches!(self, BuiltinType::Void)
    }
}

/// Reference to an underlying type descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRef {
    Builtin(BuiltinType),
    /// A record declaration node.
    Record(NodeId),
    /// A type-alias declaration node; transparent to comparison.
    Alias(NodeId),
    /// The `...` marker standing in for a variadic tail.
    Variadic,
}

/// Pointer count plus underlying type descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeFacade {
    pub pointers: usize,
    pub underlying: TypeRef,
}

impl TypeFacade {
    pub fn builtin(builtin: BuiltinType) -> Self {
        TypeFacade {
            pointers: 0,
            underlying: TypeRef::Builtin(builtin),
        }
    }

    pub fn record(decl: NodeId) -> Self {
        TypeFacade {
            pointers: 0,
            underlying: TypeRef::Record(decl),
        }
    }

    pub fn alias(decl: NodeId) -> Self {
        TypeFacade {
            pointers: 0,
            underlying: TypeRef::Alias(decl),
        }
    }

    pub fn variadic() -> Self {
        TypeFacade {
            pointers: 0,
            underlying: TypeRef::Variadic,
        }
    }

    pub fn with_pointer(mut self) -> Self {
        self.pointers += 1;
        self
    }

    pub fn with_pointers(mut self, count: usize) -> Self {
        self.pointers += count;
        self
    }

    pub fn is_pointer(&self) -> bool {
        self.pointers > 0
    }

    /// Chase alias descriptors, accumulating any pointer levels the alias
    /// itself added (`typedef int *intp;` makes `intp` one level deep).
    pub fn resolved(&self, tree: &SyntaxTree) -> TypeFacade {
        let mut pointers = self.pointers;
        let mut underlying = self.underlying;
        while let TypeRef::Alias(decl) = underlying {
            match tree.node(decl).facade {
                Some(aliased) => {
                    pointers += aliased.pointers;
                    underlying = aliased.underlying;
                }
                None => break,
            }
        }
        TypeFacade {
            pointers,
            underlying,
        }
    }

    pub fn is_void(&self, tree: &SyntaxTree) -> bool {
        let resolved = self.resolved(tree);
        resolved.pointers == 0 && resolved.underlying == TypeRef::Builtin(BuiltinType::Void)
    }

    pub fn is_arithmetic(&self, tree: &SyntaxTree) -> bool {
        let resolved = self.resolved(tree);
        resolved.pointers == 0
            && matches!(resolved.underlying, TypeRef::Builtin(b) if b.is_arithmetic())
    }

    /// Structural type agreement.  Aliases are chased on both sides; two
    /// record types agree when they have the same field count and every
    /// field agrees in turn.  A visited set breaks cycles introduced by
    /// self-referential records behind pointers.
    pub fn same_type(&self, other: &TypeFacade, tree: &SyntaxTree) -> bool {
        same_type_inner(*self, *other, tree, &mut Vec::new())
    }

    /// Whether a value of this type may be implicitly converted to
    /// `target`: arithmetic types convert among themselves, `void*`
    /// converts to and from any pointer, and identical types trivially
    /// agree.  Pointer/integer mixing is not convertible.
    pub fn convertible_to(&self, target: &TypeFacade, tree: &SyntaxTree) -> bool {
        if self.same_type(target, tree) {
            return true;
        }
        if self.is_arithmetic(tree) && target.is_arithmetic(tree) {
            return true;
        }
        let from = self.resolved(tree);
        let to = target.resolved(tree);
        if from.pointers > 0 && to.pointers > 0 {
            // void* is the universal exchange pointer.
            let from_void = from.underlying == TypeRef::Builtin(BuiltinType::Void);
            let to_void = to.underlying == TypeRef::Builtin(BuiltinType::Void);
            return from_void || to_void;
        }
        false
    }

    /// Size of a value of this type, if it has one.
    pub fn size_in_bytes(&self, tree: &SyntaxTree) -> Option<i64> {
        let resolved = self.resolved(tree);
        if resolved.pointers > 0 {
            return Some(POINTER_SIZE);
        }
        match resolved.underlying {
            TypeRef::Builtin(BuiltinType::Void) => None,
            TypeRef::Builtin(builtin) => Some(builtin.size_in_bytes()),
            TypeRef::Record(decl) => {
                let NodeKind::RecordDecl { ref fields, .. } = tree.node(decl).kind else {
                    return None;
                };
                let mut total = 0;
                for &field in fields {
                    total += tree.node(field).facade.as_ref()?.size_in_bytes(tree)?;
                }
                Some(total)
            }
            TypeRef::Alias(_) | TypeRef::Variadic => None,
        }
    }

    /// Human-readable spelling for diagnostics, e.g. `int`, `char*`,
    /// `struct Point`.
    pub fn describe(&self, tree: &SyntaxTree) -> String {
        let mut text = match self.underlying {
            TypeRef::Builtin(builtin) => builtin.name().to_string(),
            TypeRef::Record(decl) => match tree.node(decl).kind.declared_name() {
                Some(name) => format!("struct {name}"),
                None => "struct <anonymous>".to_string(),
            },
            TypeRef::Alias(decl) => tree
                .node(decl)
                .kind
                .declared_name()
                .unwrap_or("<alias>")
                .to_string(),
            TypeRef::Variadic => "...".to_string(),
        };
        for _ in 0..self.pointers {
            text.push('*');
        }
        text
    }
}

fn same_type_inner(
    a: TypeFacade,
    b: TypeFacade,
    tree: &SyntaxTree,
    visited: &mut Vec<(NodeId, NodeId)>,
) -> bool {
    let a = a.resolved(tree);
    let b = b.resolved(tree);
    if a.pointers != b.pointers {
        return false;
    }
    match (a.underlying, b.underlying) {
        (TypeRef::Builtin(x), TypeRef::Builtin(y)) => x == y,
        (TypeRef::Variadic, TypeRef::Variadic) => true,
        (TypeRef::Record(x), TypeRef::Record(y)) => {
            if x == y || visited.contains(&(x, y)) {
                return true;
            }
            visited.push((x, y));
            let (NodeKind::RecordDecl { fields: fx, .. }, NodeKind::RecordDecl { fields: fy, .. }) =
                (&tree.node(x).kind, &tree.node(y).kind)
            else {
                return false;
            };
            fx.len() == fy.len()
                && fx.iter().zip(fy).all(|(&fa, &fb)| {
                    match (&tree.node(fa).facade, &tree.node(fb).facade) {
                        (Some(ta), Some(tb)) => same_type_inner(*ta, *tb, tree, visited),
                        _ => false,
                    }
                })
        }
        _ => false,
    }
}
