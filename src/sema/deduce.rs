//! Pass 5: type deduction
//!
//! Bottom-up propagation over the finished tree.  Declarations were typed
//! by the parser; this pass types expressions from their descendants:
//! literals from their natural types, references from their resolved
//! declarations, calls from the callee's return type, subscripts by
//! stripping a pointer level, members by looking the field up in the
//! object's record, and operators and parentheses from their first typed
//! descendant (with the pointer adjustments dereference and address-of
//! require).  Record declarations become structural record types; enum
//! constants must be initialized by integer-compatible literals and come
//! out as int.

use tracing::debug;

use crate::ast::{
    BuiltinType, NodeId, NodeKind, SyntaxTree, TypeFacade, TypeRef, UnOp,
};
use crate::diagnostics::FrontendError;
use crate::sema::fold::const_eval;

pub(crate) fn run(tree: &mut SyntaxTree) -> Result<(), FrontendError> {
    let order = post_order(tree, SyntaxTree::ROOT);
    debug!(count = order.len(), "deducing types bottom-up");
    for id in order {
        deduce_node(tree, id)?;
    }
    Ok(())
}

/// Owning-edge walk with children visited before their parents.
fn post_order(tree: &SyntaxTree, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![(root, false)];
    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            out.push(id);
            continue;
        }
        stack.push((id, true));
        let children = tree.node(id).kind.children();
        for &child in children.iter().rev() {
            stack.push((child, false));
        }
    }
    out
}

fn deduce_node(tree: &mut SyntaxTree, id: NodeId) -> Result<(), FrontendError> {
    if tree.node(id).facade.is_some() {
        return Ok(());
    }
    let location = tree.node(id).location;

    let facade: Option<TypeFacade> = match &tree.node(id).kind {
        NodeKind::IntLiteral(_) => Some(TypeFacade::builtin(BuiltinType::Int)),
        NodeKind::FloatLiteral(_) => Some(TypeFacade::builtin(BuiltinType::Double)),
        NodeKind::CharLiteral(_) => Some(TypeFacade::builtin(BuiltinType::Char)),
        NodeKind::StringLiteral(_) => {
            Some(TypeFacade::builtin(BuiltinType::Char).with_pointer())
        }

        NodeKind::Identifier { resolved, .. } => {
            resolved.and_then(|decl| tree.node(decl).facade)
        }

        NodeKind::Call { callee, .. } => tree.node(*callee).facade,
        NodeKind::BuiltinCall { .. } => Some(TypeFacade::builtin(BuiltinType::Int)),
        NodeKind::Paren { inner } => tree.node(*inner).facade,

        NodeKind::Unary { op, operand } => {
            let operand_facade = tree.node(*operand).facade;
            match op {
                UnOp::Deref => {
                    let Some(facade) = operand_facade else {
                        return Ok(());
                    };
                    let resolved = facade.resolved(tree);
                    if resolved.pointers == 0 {
                        return Err(FrontendError::semantic(
                            format!(
                                "cannot dereference a value of type '{}'",
                                facade.describe(tree)
                            ),
                            Some(location),
                        ));
                    }
                    Some(TypeFacade {
                        pointers: resolved.pointers - 1,
                        underlying: resolved.underlying,
                    })
                }
                UnOp::AddrOf => operand_facade.map(TypeFacade::with_pointer),
                _ => operand_facade,
            }
        }

        NodeKind::Subscript { array, .. } => {
            let Some(facade) = tree.node(*array).facade else {
                return Ok(());
            };
            let resolved = facade.resolved(tree);
            if resolved.pointers == 0 {
                return Err(FrontendError::semantic(
                    format!(
                        "subscripted value of type '{}' is not a pointer",
                        facade.describe(tree)
                    ),
                    Some(location),
                ));
            }
            Some(TypeFacade {
                pointers: resolved.pointers - 1,
                underlying: resolved.underlying,
            })
        }

        NodeKind::Member {
            object,
            member,
            through_pointer,
        } => {
            let member = member.clone();
            let through_pointer = *through_pointer;
            let Some(facade) = tree.node(*object).facade else {
                return Ok(());
            };
            Some(member_type(tree, facade, &member, through_pointer, location)?)
        }

        NodeKind::InitializerList { items } => {
            // Empty lists get their type from context during validation.
            items.first().and_then(|&first| tree.node(first).facade)
        }

        // Operators type from their first typed descendant.
        NodeKind::Binary { .. } | NodeKind::Conditional { .. } | NodeKind::CompoundAssign { .. } => {
            first_typed_child(tree, id)
        }

        NodeKind::EnumConstantDecl { value, .. } => {
            if let Some(value) = *value {
                if const_eval(tree, value).is_none() {
                    return Err(FrontendError::semantic(
                        "enum constant initializer must be an integer constant",
                        Some(tree.node(value).location),
                    ));
                }
            }
            Some(TypeFacade::builtin(BuiltinType::Int))
        }
        NodeKind::RecordDecl { .. } => Some(TypeFacade::record(id)),
        NodeKind::EnumDecl { .. } => Some(TypeFacade::builtin(BuiltinType::Int)),

        // Statements and remaining declarations carry no deduced type.
        _ => None,
    };

    if let Some(facade) = facade {
        tree.node_mut(id).facade = Some(facade);
    }
    Ok(())
}

fn first_typed_child(tree: &SyntaxTree, id: NodeId) -> Option<TypeFacade> {
    tree.node(id)
        .kind
        .children()
        .into_iter()
        .find_map(|child| tree.node(child).facade)
}

fn member_type(
    tree: &SyntaxTree,
    object: TypeFacade,
    member: &str,
    through_pointer: bool,
    location: crate::ast::SourceLocation,
) -> Result<TypeFacade, FrontendError> {
    let resolved = object.resolved(tree);

    if through_pointer && resolved.pointers != 1 {
        return Err(FrontendError::semantic(
            format!(
                "'->' requires a pointer to a record, not '{}'",
                object.describe(tree)
            ),
            Some(location),
        ));
    }
    if !through_pointer && resolved.pointers != 0 {
        return Err(FrontendError::semantic(
            format!(
                "'.' requires a record value, not '{}'",
                object.describe(tree)
            ),
            Some(location),
        ));
    }

    let TypeRef::Record(record) = resolved.underlying else {
        return Err(FrontendError::semantic(
            format!(
                "member access on non-record type '{}'",
                object.describe(tree)
            ),
            Some(location),
        ));
    };

    let NodeKind::RecordDecl { ref fields, .. } = tree.node(record).kind else {
        unreachable!("record type reference always names a record declaration");
    };
    for &field in fields {
        if tree.node(field).kind.declared_name() == Some(member) {
            return tree.node(field).facade.ok_or_else(|| {
                FrontendError::semantic(
                    format!("field '{member}' has no type"),
                    Some(location),
                )
            });
        }
    }
    let record_name = tree
        .node(record)
        .kind
        .declared_name()
        .unwrap_or("<anonymous>");
    Err(FrontendError::semantic(
        format!("no member named '{member}' in 'struct {record_name}'"),
        Some(location),
    ))
}
