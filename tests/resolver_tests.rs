// Integration tests for the semantic resolver: the pass pipeline, static
// folding, binding, type deduction, conversion injection, and the
// provenance guarantees of in-place mutation.

use cfront::ast::{BuiltinType, NodeKind, RenderMode, SyntaxTree, TypeFacade, TypeRef};
use cfront::context::Context;
use cfront::diagnostics::FrontendError;
use cfront::parser::Parser;
use cfront::sema::{self, SymbolTable};

fn compile(source: &str) -> (SyntaxTree, SymbolTable, Context) {
    let mut ctx = Context::new();
    let mut tree = Parser::new(source, &mut ctx)
        .parse()
        .expect("parse failed");
    let symbols = sema::resolve(&mut tree, &mut ctx).expect("resolve failed");
    (tree, symbols, ctx)
}

fn compile_err(source: &str) -> FrontendError {
    let mut ctx = Context::new();
    let mut tree = Parser::new(source, &mut ctx)
        .parse()
        .expect("parse failed");
    sema::resolve(&mut tree, &mut ctx).expect_err("resolve unexpectedly succeeded")
}

#[test]
fn test_top_level_declaration_shape() {
    // `int x = 1 + 2;` becomes a declaration statement holding one int
    // variable whose initializer is PLUS over the two literals.
    let (tree, _, _) = compile("int x = 1 + 2;");

    let decls = tree.find_matching(|n| matches!(n.kind, NodeKind::DeclStatement { .. }));
    assert_eq!(decls.len(), 1);

    let vars = tree.find_matching(|n| matches!(n.kind, NodeKind::VarDecl { .. }));
    assert_eq!(vars.len(), 1);
    let var = tree.node(vars[0]);
    assert_eq!(var.kind.declared_name(), Some("x"));
    assert_eq!(var.facade, Some(TypeFacade::builtin(BuiltinType::Int)));

    let NodeKind::VarDecl {
        init: Some(init), ..
    } = var.kind
    else {
        panic!("expected an initialized variable");
    };
    let NodeKind::Binary { op, left, right } = tree.node(init).kind else {
        panic!("expected a binary initializer");
    };
    assert_eq!(format!("{op:?}"), "Add");
    assert!(matches!(tree.node(left).kind, NodeKind::IntLiteral(1)));
    assert!(matches!(tree.node(right).kind, NodeKind::IntLiteral(2)));
}

#[test]
fn test_call_resolves_to_function_and_return_type() {
    let source = "int f(int a) { return a; } int main(void) { return f(5); }";
    let (tree, _, _) = compile(source);

    let functions = tree.find_matching(
        |n| matches!(&n.kind, NodeKind::FunctionDecl { name, .. } if name == "f"),
    );
    assert_eq!(functions.len(), 1);

    let calls = tree.find_matching(|n| matches!(n.kind, NodeKind::Call { .. }));
    assert_eq!(calls.len(), 1);
    let NodeKind::Call { callee, arguments } = tree.node(calls[0]).kind else {
        unreachable!();
    };

    // The callee reference is bound to the function declaration.
    let NodeKind::Identifier { resolved, .. } = tree.node(callee).kind else {
        panic!("callee is not an identifier");
    };
    assert_eq!(resolved, Some(functions[0]));

    // The call's deduced type is the function's declared return type.
    assert_eq!(
        tree.node(calls[0]).facade,
        Some(TypeFacade::builtin(BuiltinType::Int))
    );

    // The literal 5 is the sole argument.
    let NodeKind::ArgumentList { arguments: args } = &tree.node(arguments).kind else {
        unreachable!();
    };
    assert_eq!(args.len(), 1);
    assert!(matches!(tree.node(args[0]).kind, NodeKind::IntLiteral(5)));
}

#[test]
fn test_sizeof_folds_to_integer_literal() {
    let source = "int main(void) { sizeof(int); return 0; }";
    let (tree, _, _) = compile(source);

    let current = tree.render(RenderMode::Current);
    assert!(!current.contains("BuiltinCall"));
    assert!(current.contains("IntLiteral(4)"));

    // The pre-mutation shape is still reproducible.
    let original = tree.render(RenderMode::AsParsed);
    assert!(original.contains("BuiltinCall(sizeof)"));
    assert!(!original.contains("IntLiteral(4)"));
}

#[test]
fn test_folding_bumps_the_alteration_counter() {
    let source = "int main(void) { sizeof(int); return 0; }";
    let (tree, _, _) = compile(source);

    let blocks = tree.find_matching(|n| matches!(n.kind, NodeKind::Block { .. }));
    assert_eq!(blocks.len(), 1);
    assert_eq!(tree.node(blocks[0]).alterations, 1);
}

#[test]
fn test_static_assert_holds() {
    let source = "int main(void) { static_assert(1 + 1 == 2); return 0; }";
    let (tree, _, _) = compile(source);
    assert!(!tree.render(RenderMode::Current).contains("BuiltinCall"));
}

#[test]
fn test_static_assert_failure_is_fatal() {
    let source = "int main(void) { static_assert(0, \"broken invariant\"); return 0; }";
    let err = compile_err(source);
    let text = err.to_string();
    assert!(text.contains("static assertion failed"), "{text}");
    assert!(text.contains("broken invariant"), "{text}");
}

#[test]
fn test_undeclared_identifier_is_reported() {
    let err = compile_err("int main(void) { return y; }");
    let text = err.to_string();
    assert!(text.contains("undeclared identifier"), "{text}");
    assert!(text.contains("'y'"), "{text}");
}

#[test]
fn test_prototype_binds_to_definition() {
    let source = r#"
        int g(int);
        int g(int a) { return a; }
        int main(void) { return g(1); }
    "#;
    let (tree, symbols, _) = compile(source);

    let functions = tree.find_matching(
        |n| matches!(&n.kind, NodeKind::FunctionDecl { name, .. } if name == "g"),
    );
    assert_eq!(functions.len(), 2);

    let (prototype, definition) = match tree.node(functions[0]).kind {
        NodeKind::FunctionDecl { body: None, .. } => (functions[0], functions[1]),
        _ => (functions[1], functions[0]),
    };

    let NodeKind::FunctionDecl {
        binding: Some(bound_to),
        ..
    } = tree.node(definition).kind
    else {
        panic!("definition was not bound to its prototype");
    };
    assert_eq!(bound_to, prototype);

    let NodeKind::FunctionDecl {
        binding: Some(bound_back),
        ..
    } = tree.node(prototype).kind
    else {
        panic!("prototype was not bound to its definition");
    };
    assert_eq!(bound_back, definition);

    assert!(symbols.is_used(prototype));
    assert!(symbols.is_used(definition));
}

#[test]
fn test_conflicting_prototype_is_rejected() {
    let source = r#"
        int g(char *s);
        int g(int a) { return a; }
    "#;
    let err = compile_err(source);
    assert!(err.to_string().contains("conflicting types for 'g'"));
}

#[test]
fn test_return_type_disagreement_is_rejected() {
    // A string literal is not convertible to int, so the declared policy
    // rejects this outright rather than injecting a conversion.
    let err = compile_err("int h(int a) { return \"x\"; }");
    let text = err.to_string();
    assert!(text.contains("returning"), "{text}");
    assert!(text.contains("char*"), "{text}");
}

#[test]
fn test_convertible_return_gets_a_conversion_node() {
    let source = "int h(void) { return 'x'; }";
    let (tree, _, _) = compile(source);

    let conversions = tree.find_matching(|n| matches!(n.kind, NodeKind::Conversion { .. }));
    assert_eq!(conversions.len(), 1);
    assert_eq!(
        tree.node(conversions[0]).facade,
        Some(TypeFacade::builtin(BuiltinType::Int))
    );

    // The conversion wraps the literal at the position it occupied.
    let NodeKind::Conversion { operand } = tree.node(conversions[0]).kind else {
        unreachable!();
    };
    assert!(matches!(tree.node(operand).kind, NodeKind::CharLiteral(_)));

    // As originally parsed, the return value is the bare literal.
    assert!(!tree.render(RenderMode::AsParsed).contains("Conversion"));
}

#[test]
fn test_initializer_conversion_is_injected() {
    let source = "int main(void) { int x = 'a'; return x; }";
    let (tree, _, _) = compile(source);

    let vars = tree.find_matching(
        |n| matches!(&n.kind, NodeKind::VarDecl { name, .. } if name == "x"),
    );
    assert_eq!(vars.len(), 1);
    assert_eq!(tree.node(vars[0]).alterations, 1);

    let NodeKind::VarDecl {
        init: Some(init), ..
    } = tree.node(vars[0]).kind
    else {
        unreachable!();
    };
    assert!(matches!(
        tree.node(init).kind,
        NodeKind::Conversion { .. }
    ));
}

#[test]
fn test_incompatible_initializer_is_rejected() {
    let err = compile_err("int main(void) { int x = \"text\"; return x; }");
    assert!(err.to_string().contains("cannot initialize"));
}

#[test]
fn test_call_arity_is_checked() {
    let source = "int f(int a) { return a; } int main(void) { return f(1, 2); }";
    assert!(compile_err(source).to_string().contains("too many arguments"));

    let source = "int f(int a) { return a; } int main(void) { return f(); }";
    assert!(compile_err(source).to_string().contains("too few arguments"));
}

#[test]
fn test_variadic_tail_relaxes_arity() {
    let source = r#"
        int addup(int n, ...);
        int main(void) { return addup(3, 1, 2, 3); }
    "#;
    let (tree, _, _) = compile(source);
    assert!(tree.render(RenderMode::Current).contains("Call"));
}

#[test]
fn test_argument_conversion_is_injected() {
    let source = "int f(double d) { return 0; } int main(void) { return f(1); }";
    let (tree, _, _) = compile(source);

    let conversions = tree.find_matching(|n| matches!(n.kind, NodeKind::Conversion { .. }));
    assert_eq!(conversions.len(), 1);
    assert_eq!(
        tree.node(conversions[0]).facade,
        Some(TypeFacade::builtin(BuiltinType::Double))
    );
}

#[test]
fn test_member_access_types_from_record_field() {
    let source = r#"
        struct Point { int x; int y; };
        int main(void) {
            struct Point p;
            p.x = 3;
            return p.x;
        }
    "#;
    let (tree, _, _) = compile(source);

    let members = tree.find_matching(|n| matches!(n.kind, NodeKind::Member { .. }));
    assert!(!members.is_empty());
    for member in members {
        assert_eq!(
            tree.node(member).facade,
            Some(TypeFacade::builtin(BuiltinType::Int))
        );
    }

    let records = tree.find_matching(|n| matches!(n.kind, NodeKind::RecordDecl { .. }));
    assert_eq!(records.len(), 1);
    match tree.node(records[0]).facade {
        Some(TypeFacade {
            pointers: 0,
            underlying: TypeRef::Record(decl),
        }) => assert_eq!(decl, records[0]),
        other => panic!("unexpected record facade: {other:?}"),
    }
}

#[test]
fn test_enum_constants_default_to_int() {
    let source = r#"
        enum Color { RED, GREEN = 2 };
        int main(void) { return GREEN; }
    "#;
    let (tree, _, _) = compile(source);

    let constants = tree.find_matching(|n| matches!(n.kind, NodeKind::EnumConstantDecl { .. }));
    assert_eq!(constants.len(), 2);
    for constant in constants {
        assert_eq!(
            tree.node(constant).facade,
            Some(TypeFacade::builtin(BuiltinType::Int))
        );
    }
}

#[test]
fn test_resolution_is_idempotent() {
    let source = "int f(int a) { return a; } int main(void) { return f(5); }";
    let (mut tree, mut symbols, _) = compile(source);

    let before = tree.render(RenderMode::Current);
    let bound = sema::resolve_identifiers(&mut tree, &mut symbols)
        .expect("second resolution raised an error");
    assert_eq!(bound, 0);
    assert_eq!(tree.render(RenderMode::Current), before);
}

#[test]
fn test_resolved_tree_is_deterministic() {
    let source = r#"
        int g(int);
        int g(int a) { return a; }
        int main(void) { int x = g('a'); return x; }
    "#;
    let render = |source: &str| {
        let (tree, _, _) = compile(source);
        tree.render(RenderMode::Current)
    };
    assert_eq!(render(source), render(source));
}

#[test]
fn test_unused_declarations_produce_notices() {
    let source = r#"
        int helper(void);
        int main(void) { int x; return 0; }
    "#;
    let (_, _, mut ctx) = compile(source);

    let notices = ctx.take_notices();
    assert!(notices.iter().any(|n| n.message == "unused function 'helper'"));
    assert!(notices.iter().any(|n| n.message == "unused variable 'x'"));
}

#[test]
fn test_redefinition_is_rejected() {
    let err = compile_err("int main(void) { int x; int x; return 0; }");
    assert!(err.to_string().contains("redefinition of 'x'"));
}

#[test]
fn test_parent_chain_returns_to_node() {
    let source = "int main(void) { int x = 1 + 2; return x; }";
    let (tree, _, _) = compile(source);

    for id in tree.find_matching(|_| true) {
        if let Some(parent) = tree.node(id).parent {
            assert!(tree.node(parent).kind.children().contains(&id));
        }
    }
}
