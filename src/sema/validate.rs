//! Pass 6: validation and implicit-conversion injection
//!
//! Checks prototype/definition agreement, call arity and argument types
//! (a variadic tail relaxes the upper bound), initializer-list
//! homogeneity, initializer agreement, and return-statement agreement.
//! Wherever two related types differ in a context that permits conversion
//! — arithmetic to arithmetic, `void*` to and from other pointers — a
//! conversion node is injected between the value and its consumer through
//! the tree's child-replacement primitive.  Anything else is a fatal
//! type-agreement error.
//!
//! After the checks, declarations that were never referenced produce
//! non-fatal unused notices.

use tracing::debug;

use crate::ast::{NodeId, NodeKind, SyntaxTree, TypeFacade};
use crate::context::Context;
use crate::diagnostics::FrontendError;
use crate::sema::symbols::SymbolTable;

pub(crate) fn run(
    tree: &mut SyntaxTree,
    ctx: &mut Context,
    symbols: &SymbolTable,
) -> Result<(), FrontendError> {
    debug!("validating the resolved tree");
    check_prototype_agreement(tree)?;
    check_calls(tree)?;
    check_initializer_lists(tree)?;
    check_variable_initializers(tree)?;
    check_returns(tree)?;
    report_unused(tree, ctx, symbols);
    Ok(())
}

/// Parameter facades of a function, plus whether it is variadic.
fn signature(tree: &SyntaxTree, function: NodeId) -> (Vec<TypeFacade>, bool) {
    let NodeKind::FunctionDecl { params, .. } = &tree.node(function).kind else {
        return (Vec::new(), false);
    };
    let NodeKind::ParameterList { parameters } = &tree.node(*params).kind else {
        return (Vec::new(), false);
    };
    let mut facades = Vec::new();
    let mut variadic = false;
    for &param in parameters {
        match &tree.node(param).kind {
            NodeKind::VariadicMarker => variadic = true,
            NodeKind::ParamDecl { .. } => {
                if let Some(facade) = tree.node(param).facade {
                    facades.push(facade);
                }
            }
            _ => {}
        }
    }
    (facades, variadic)
}

fn check_prototype_agreement(tree: &SyntaxTree) -> Result<(), FrontendError> {
    let definitions = tree.find_matching(|node| {
        matches!(
            node.kind,
            NodeKind::FunctionDecl {
                body: Some(_),
                binding: Some(_),
                ..
            }
        )
    });

    for definition in definitions {
        let NodeKind::FunctionDecl {
            ref name,
            binding: Some(prototype),
            ..
        } = tree.node(definition).kind
        else {
            continue;
        };
        let name = name.clone();

        let (def_params, def_variadic) = signature(tree, definition);
        let (proto_params, proto_variadic) = signature(tree, prototype);

        let return_agrees = match (tree.node(definition).facade, tree.node(prototype).facade) {
            (Some(a), Some(b)) => a.same_type(&b, tree),
            _ => false,
        };
        let params_agree = def_params.len() == proto_params.len()
            && def_variadic == proto_variadic
            && def_params
                .iter()
                .zip(&proto_params)
                .all(|(a, b)| a.same_type(b, tree));

        if !return_agrees || !params_agree {
            return Err(FrontendError::semantic(
                format!("conflicting types for '{name}'"),
                Some(tree.node(definition).location),
            ));
        }
    }
    Ok(())
}

fn check_calls(tree: &mut SyntaxTree) -> Result<(), FrontendError> {
    let calls = tree.find_matching(|node| matches!(node.kind, NodeKind::Call { .. }));

    for call in calls {
        let NodeKind::Call { callee, arguments } = tree.node(call).kind else {
            continue;
        };
        let location = tree.node(call).location;

        let NodeKind::Identifier {
            ref name,
            resolved: Some(target),
        } = tree.node(callee).kind
        else {
            return Err(FrontendError::semantic(
                "called expression does not name a function",
                Some(location),
            ));
        };
        let name = name.clone();

        if !matches!(tree.node(target).kind, NodeKind::FunctionDecl { .. }) {
            return Err(FrontendError::semantic(
                format!("called object '{name}' is not a function"),
                Some(location),
            ));
        }

        let (params, variadic) = signature(tree, target);
        let NodeKind::ArgumentList { arguments: args } = tree.node(arguments).kind.clone() else {
            continue;
        };

        if args.len() < params.len() {
            return Err(FrontendError::semantic(
                format!("too few arguments to function '{name}'"),
                Some(location),
            ));
        }
        if args.len() > params.len() && !variadic {
            return Err(FrontendError::semantic(
                format!("too many arguments to function '{name}'"),
                Some(location),
            ));
        }

        for (index, (&arg, &expected)) in args.iter().zip(&params).enumerate() {
            let Some(actual) = tree.node(arg).facade else {
                continue;
            };
            if actual.same_type(&expected, tree) {
                continue;
            }
            if actual.convertible_to(&expected, tree) {
                inject_conversion(tree, arguments, index, arg, expected);
            } else {
                return Err(FrontendError::semantic(
                    format!(
                        "incompatible type '{}' for argument {} of '{name}' (expected '{}')",
                        actual.describe(tree),
                        index + 1,
                        expected.describe(tree),
                    ),
                    Some(tree.node(arg).location),
                ));
            }
        }
    }
    Ok(())
}

fn check_initializer_lists(tree: &mut SyntaxTree) -> Result<(), FrontendError> {
    let lists = tree.find_matching(|node| matches!(node.kind, NodeKind::InitializerList { .. }));

    for list in lists {
        // An empty list takes its type from the declaration it initializes.
        if tree.node(list).facade.is_none() {
            if let Some(parent) = tree.node(list).parent {
                if matches!(tree.node(parent).kind, NodeKind::VarDecl { .. }) {
                    let inherited = tree.node(parent).facade;
                    tree.node_mut(list).facade = inherited;
                }
            }
            continue;
        }

        let Some(element_type) = tree.node(list).facade else {
            continue;
        };
        let NodeKind::InitializerList { items } = tree.node(list).kind.clone() else {
            continue;
        };

        for (index, &item) in items.iter().enumerate() {
            let Some(actual) = tree.node(item).facade else {
                continue;
            };
            if actual.same_type(&element_type, tree) {
                continue;
            }
            if actual.convertible_to(&element_type, tree) {
                inject_conversion(tree, list, index, item, element_type);
            } else {
                return Err(FrontendError::semantic(
                    format!(
                        "initializer list element of type '{}' does not agree with '{}'",
                        actual.describe(tree),
                        element_type.describe(tree),
                    ),
                    Some(tree.node(item).location),
                ));
            }
        }
    }
    Ok(())
}

fn check_variable_initializers(tree: &mut SyntaxTree) -> Result<(), FrontendError> {
    let variables = tree.find_matching(|node| {
        matches!(node.kind, NodeKind::VarDecl { init: Some(_), .. })
    });

    for var in variables {
        let NodeKind::VarDecl {
            ref name,
            init: Some(init),
        } = tree.node(var).kind
        else {
            continue;
        };
        let name = name.clone();

        // Braced initializers are checked for homogeneity only.
        if matches!(tree.node(init).kind, NodeKind::InitializerList { .. }) {
            continue;
        }

        let (Some(declared), Some(actual)) = (tree.node(var).facade, tree.node(init).facade)
        else {
            continue;
        };
        if actual.same_type(&declared, tree) {
            continue;
        }
        if actual.convertible_to(&declared, tree) {
            let index = tree
                .child_index(var, init)
                .expect("initializer is a child of its declaration");
            inject_conversion(tree, var, index, init, declared);
        } else {
            return Err(FrontendError::semantic(
                format!(
                    "cannot initialize '{name}' of type '{}' with a value of type '{}'",
                    declared.describe(tree),
                    actual.describe(tree),
                ),
                Some(tree.node(init).location),
            ));
        }
    }
    Ok(())
}

fn check_returns(tree: &mut SyntaxTree) -> Result<(), FrontendError> {
    let returns = tree.find_matching(|node| matches!(node.kind, NodeKind::Return { .. }));

    for ret in returns {
        let location = tree.node(ret).location;
        let Some(function) = tree.enclosing_function(ret) else {
            return Err(FrontendError::semantic(
                "return statement outside of a function",
                Some(location),
            ));
        };
        let function_name = tree
            .node(function)
            .kind
            .declared_name()
            .unwrap_or("<anonymous>")
            .to_string();
        let Some(return_type) = tree.node(function).facade else {
            continue;
        };
        let NodeKind::Return { value } = tree.node(ret).kind else {
            continue;
        };

        if return_type.is_void(tree) {
            if value.is_some() {
                return Err(FrontendError::semantic(
                    format!("void function '{function_name}' should not return a value"),
                    Some(location),
                ));
            }
            continue;
        }

        let Some(value) = value else {
            return Err(FrontendError::semantic(
                format!("non-void function '{function_name}' should return a value"),
                Some(location),
            ));
        };
        let Some(actual) = tree.node(value).facade else {
            continue;
        };
        if actual.same_type(&return_type, tree) {
            continue;
        }
        if actual.convertible_to(&return_type, tree) {
            let index = tree
                .child_index(ret, value)
                .expect("return value is a child of its statement");
            inject_conversion(tree, ret, index, value, return_type);
        } else {
            return Err(FrontendError::semantic(
                format!(
                    "returning '{}' from '{function_name}' which returns '{}'",
                    actual.describe(tree),
                    return_type.describe(tree),
                ),
                Some(location),
            ));
        }
    }
    Ok(())
}

/// Wrap the child at `index` of `parent` in an implicit-conversion node
/// targeting `target`.  The conversion claims the child first, so the
/// replacement primitive leaves the child parented to its new wrapper.
fn inject_conversion(
    tree: &mut SyntaxTree,
    parent: NodeId,
    index: usize,
    child: NodeId,
    target: TypeFacade,
) {
    let location = tree.node(child).location;
    let conversion = tree.alloc_typed(NodeKind::Conversion { operand: child }, location, target);
    tree.replace_child(parent, index, conversion);
}

/// Non-fatal notices for declarations that were never referenced.
fn report_unused(tree: &SyntaxTree, ctx: &mut Context, symbols: &SymbolTable) {
    for (_, name, decl) in symbols.entries() {
        if symbols.is_used(decl) {
            continue;
        }
        let node = tree.node(decl);
        match node.kind {
            NodeKind::VarDecl { .. } => {
                ctx.notice(format!("unused variable '{name}'"), Some(node.location));
            }
            NodeKind::FunctionDecl { .. } if name != "main" => {
                ctx.notice(format!("unused function '{name}'"), Some(node.location));
            }
            _ => {}
        }
    }
}
