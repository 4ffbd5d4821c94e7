//! Pass 2: static folding of built-in compile-time calls
//!
//! `sizeof` and `static_assert` are executed here and replaced in place.
//! Each builtin call finds its own position through its parent
//! back-reference and swaps itself for a computed integer literal via the
//! tree's child-replacement primitive.
//!
//! Folding runs before type deduction, so `sizeof` can only measure an
//! explicit type name or a literal operand; anything else has no type yet
//! and is rejected.

use tracing::debug;

use crate::ast::{BinOp, BuiltinType, NodeId, NodeKind, SyntaxTree, UnOp, POINTER_SIZE};
use crate::diagnostics::FrontendError;

pub(crate) fn run(tree: &mut SyntaxTree) -> Result<(), FrontendError> {
    let ids = tree.find_matching(|node| matches!(node.kind, NodeKind::BuiltinCall { .. }));
    debug!(count = ids.len(), "folding builtin compile-time calls");

    for id in ids {
        let NodeKind::BuiltinCall { ref name, .. } = tree.node(id).kind else {
            continue;
        };
        let value = match name.as_str() {
            "sizeof" => fold_sizeof(tree, id)?,
            "static_assert" => fold_static_assert(tree, id)?,
            other => {
                return Err(FrontendError::semantic(
                    format!("unknown builtin call '{other}'"),
                    Some(tree.node(id).location),
                ))
            }
        };
        replace_with_literal(tree, id, value);
    }
    Ok(())
}

fn fold_sizeof(tree: &SyntaxTree, id: NodeId) -> Result<i64, FrontendError> {
    let location = tree.node(id).location;
    let NodeKind::BuiltinCall {
        arguments,
        type_argument,
        ..
    } = &tree.node(id).kind
    else {
        unreachable!("caller matched a builtin call");
    };

    if let Some(facade) = type_argument {
        return facade.size_in_bytes(tree).ok_or_else(|| {
            FrontendError::semantic(
                "cannot take the size of an incomplete type",
                Some(location),
            )
        });
    }

    let NodeKind::ArgumentList { arguments: args } = &tree.node(*arguments).kind else {
        unreachable!("builtin call arguments are always an argument list");
    };
    let &[operand] = args.as_slice() else {
        return Err(FrontendError::semantic(
            "sizeof takes exactly one operand",
            Some(location),
        ));
    };

    // Only literals have a known type this early.
    match tree.node(operand).kind {
        NodeKind::IntLiteral(_) => Ok(BuiltinType::Int.size_in_bytes()),
        NodeKind::CharLiteral(_) => Ok(BuiltinType::Char.size_in_bytes()),
        NodeKind::FloatLiteral(_) => Ok(BuiltinType::Double.size_in_bytes()),
        NodeKind::StringLiteral(_) => Ok(POINTER_SIZE),
        _ => Err(FrontendError::semantic(
            "sizeof operand must name a type or be a literal",
            Some(location),
        )),
    }
}

fn fold_static_assert(tree: &SyntaxTree, id: NodeId) -> Result<i64, FrontendError> {
    let location = tree.node(id).location;
    let NodeKind::BuiltinCall { arguments, .. } = &tree.node(id).kind else {
        unreachable!("caller matched a builtin call");
    };
    let NodeKind::ArgumentList { arguments: args } = &tree.node(*arguments).kind else {
        unreachable!("builtin call arguments are always an argument list");
    };

    let (&condition, rest) = args.split_first().ok_or_else(|| {
        FrontendError::semantic("static_assert requires a condition", Some(location))
    })?;
    let message = match rest {
        [] => None,
        [message] => match &tree.node(*message).kind {
            NodeKind::StringLiteral(text) => Some(text.clone()),
            _ => {
                return Err(FrontendError::semantic(
                    "static_assert message must be a string literal",
                    Some(location),
                ))
            }
        },
        _ => {
            return Err(FrontendError::semantic(
                "static_assert takes a condition and an optional message",
                Some(location),
            ))
        }
    };

    let value = const_eval(tree, condition).ok_or_else(|| {
        FrontendError::semantic(
            "static_assert requires a constant expression",
            Some(location),
        )
    })?;

    if value == 0 {
        let text = match message {
            Some(text) => format!("static assertion failed: {text}"),
            None => "static assertion failed".to_string(),
        };
        return Err(FrontendError::semantic(text, Some(location)));
    }
    Ok(1)
}

/// Swap the builtin call for an integer literal through the mutation
/// primitive, locating the call via its parent back-reference.
fn replace_with_literal(tree: &mut SyntaxTree, id: NodeId, value: i64) {
    let location = tree.node(id).location;
    let parent = tree
        .node(id)
        .parent
        .expect("builtin call always has a parent");
    let index = tree
        .child_index(parent, id)
        .expect("parent back-reference matches a child slot");
    let literal = tree.alloc(NodeKind::IntLiteral(value), location);
    tree.replace_child(parent, index, literal);
}

/// Minimal constant evaluator over integer and character literals.
pub(crate) fn const_eval(tree: &SyntaxTree, id: NodeId) -> Option<i64> {
    match &tree.node(id).kind {
        NodeKind::IntLiteral(value) => Some(*value),
        NodeKind::CharLiteral(value) => Some(i64::from(*value)),
        NodeKind::Paren { inner } => const_eval(tree, *inner),
        NodeKind::Unary { op, operand } => {
            let value = const_eval(tree, *operand)?;
            match op {
                UnOp::Neg => Some(-value),
                UnOp::Not => Some(i64::from(value == 0)),
                UnOp::BitNot => Some(!value),
                _ => None,
            }
        }
        NodeKind::Conditional {
            condition,
            then_value,
            else_value,
        } => {
            let condition = const_eval(tree, *condition)?;
            if condition != 0 {
                const_eval(tree, *then_value)
            } else {
                const_eval(tree, *else_value)
            }
        }
        NodeKind::Binary { op, left, right } => {
            let left = const_eval(tree, *left)?;
            let right = const_eval(tree, *right)?;
            match op {
                BinOp::Add => left.checked_add(right),
                BinOp::Sub => left.checked_sub(right),
                BinOp::Mul => left.checked_mul(right),
                BinOp::Div => left.checked_div(right),
                BinOp::Mod => left.checked_rem(right),
                BinOp::Eq => Some(i64::from(left == right)),
                BinOp::Ne => Some(i64::from(left != right)),
                BinOp::Lt => Some(i64::from(left < right)),
                BinOp::Le => Some(i64::from(left <= right)),
                BinOp::Gt => Some(i64::from(left > right)),
                BinOp::Ge => Some(i64::from(left >= right)),
                BinOp::LogicalAnd => Some(i64::from(left != 0 && right != 0)),
                BinOp::LogicalOr => Some(i64::from(left != 0 || right != 0)),
                BinOp::BitAnd => Some(left & right),
                BinOp::BitOr => Some(left | right),
                BinOp::BitXor => Some(left ^ right),
                BinOp::Shl => left.checked_shl(u32::try_from(right).ok()?),
                BinOp::Shr => left.checked_shr(u32::try_from(right).ok()?),
                BinOp::Assign => None,
            }
        }
        _ => None,
    }
}
