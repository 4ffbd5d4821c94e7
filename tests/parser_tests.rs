// Integration tests for the parser: grammar coverage, ambiguity
// resolution, and backtrack transparency.

use cfront::ast::{NodeKind, RenderMode, SyntaxTree};
use cfront::context::Context;
use cfront::diagnostics::FrontendError;
use cfront::parser::Parser;

fn parse(source: &str) -> SyntaxTree {
    let mut ctx = Context::new();
    Parser::new(source, &mut ctx)
        .parse()
        .expect("parse failed")
}

fn parse_err(source: &str) -> FrontendError {
    let mut ctx = Context::new();
    Parser::new(source, &mut ctx)
        .parse()
        .expect_err("parse unexpectedly succeeded")
}

#[test]
fn test_parse_simple_function() {
    let source = "int main(void) { return 0; }";
    let tree = parse(source);

    let functions = tree.find_matching(|n| matches!(n.kind, NodeKind::FunctionDecl { .. }));
    assert_eq!(functions.len(), 1);
    match &tree.node(functions[0]).kind {
        NodeKind::FunctionDecl { name, body, .. } => {
            assert_eq!(name, "main");
            assert!(body.is_some());
        }
        _ => unreachable!(),
    }
}

#[test]
fn test_parse_is_deterministic() {
    let source = r#"
        struct Point { int x; int y; };
        int length(struct Point *p);

        int main(void) {
            struct Point origin;
            origin.x = 0;
            origin.y = 0;
            return length(&origin);
        }

        int length(struct Point *p) {
            return p->x + p->y;
        }
    "#;

    let first = parse(source).render(RenderMode::Current);
    let second = parse(source).render(RenderMode::Current);
    assert_eq!(first, second);
}

#[test]
fn test_paren_expression_is_not_parsed_as_cast() {
    // `(a) - b` must come out identical to a tree that never tried the
    // cast interpretation, and parsing must continue cleanly after it.
    let source = "int main(void) { int a; int b; (a) - b; return 0; }";
    let tree = parse(source);
    let rendered = tree.render(RenderMode::Current);

    assert!(rendered.contains("Paren"));
    assert!(rendered.contains("Binary(Sub)"));
    assert!(!rendered.contains("Cast"));
    // The trailing return statement proves the cursor ended in the right
    // position after the abandoned speculation.
    assert!(rendered.contains("Return"));
}

#[test]
fn test_typedef_name_turns_paren_into_cast() {
    let source = "typedef int myint; int main(void) { int a; (myint) - a; return 0; }";
    let tree = parse(source);
    let rendered = tree.render(RenderMode::Current);

    assert!(rendered.contains("Cast : myint"));
    assert!(rendered.contains("Unary(Neg)"));
}

#[test]
fn test_typedef_scope_ends_with_block() {
    // The alias is registered in the function's scope only; afterwards the
    // same name is an ordinary identifier again.
    let source = "int main(void) { typedef int T; T x; x = 1; return x; } int T;";
    let tree = parse(source);
    let rendered = tree.render(RenderMode::Current);

    assert!(rendered.contains("TypeAliasDecl(T)"));
    assert!(rendered.contains("VarDecl(x) : T"));
    assert!(rendered.contains("VarDecl(T) : int"));
}

#[test]
fn test_declaration_vs_expression_statement() {
    let source = "typedef int T; int main(void) { int x; T y; x * 2; T *z; return 0; }";
    let tree = parse(source);
    let rendered = tree.render(RenderMode::Current);

    // `x * 2` is a multiplication, `T *z` declares a pointer.
    assert!(rendered.contains("Binary(Mul)"));
    assert!(rendered.contains("VarDecl(z) : T*"));
}

#[test]
fn test_label_vs_expression_statement() {
    let source = r#"
        int main(void) {
            int x;
            x = 0;
        again:
            x += 1;
            if (x < 3) goto again;
            return x;
        }
    "#;
    let tree = parse(source);
    let rendered = tree.render(RenderMode::Current);

    assert!(rendered.contains("Label(again)"));
    assert!(rendered.contains("Goto(again)"));
    assert!(rendered.contains("CompoundAssign(Add)"));
    assert!(rendered.contains("Binary(Assign)"));
}

#[test]
fn test_compound_literal() {
    let source = r#"
        struct Point { int x; int y; };
        int main(void) {
            struct Point p = (struct Point){ 1, 2 };
            return p.x;
        }
    "#;
    let tree = parse(source);
    let rendered = tree.render(RenderMode::Current);

    assert!(rendered.contains("CompoundLiteral : struct Point"));
    assert!(rendered.contains("InitializerList"));
}

#[test]
fn test_sizeof_type_and_expression_forms() {
    let source = "int main(void) { sizeof(int); sizeof(1 + 2); return 0; }";
    let tree = parse(source);

    let builtins = tree.find_matching(|n| matches!(n.kind, NodeKind::BuiltinCall { .. }));
    assert_eq!(builtins.len(), 2);
    match &tree.node(builtins[0]).kind {
        NodeKind::BuiltinCall { type_argument, .. } => assert!(type_argument.is_some()),
        _ => unreachable!(),
    }
    match &tree.node(builtins[1]).kind {
        NodeKind::BuiltinCall { type_argument, .. } => assert!(type_argument.is_none()),
        _ => unreachable!(),
    }
}

#[test]
fn test_knr_parameter_declarations() {
    let source = "int add(a, b) int a; int b; { return a + b; }";
    let tree = parse(source);
    let rendered = tree.render(RenderMode::Current);

    assert!(rendered.contains("ParamDecl(a) : int"));
    assert!(rendered.contains("ParamDecl(b) : int"));
}

#[test]
fn test_knr_list_emits_notice() {
    let mut ctx = Context::new();
    Parser::new("int add(a, b) int a; int b; { return a + b; }", &mut ctx)
        .parse()
        .expect("parse failed");
    let notices = ctx.take_notices();
    assert!(notices
        .iter()
        .any(|n| n.message.contains("old-style")));
}

#[test]
fn test_variadic_parameter_list() {
    let source = "int output(char *fmt, ...);";
    let tree = parse(source);
    let rendered = tree.render(RenderMode::Current);

    assert!(rendered.contains("FunctionDecl(output, prototype)"));
    assert!(rendered.contains("VariadicMarker"));
    assert!(rendered.contains("ParamDecl(fmt) : char*"));
}

#[test]
fn test_control_flow_statements() {
    let source = r#"
        int main(void) {
            int s;
            int i;
            s = 0;
            for (i = 0; i < 10; i += 1) {
                if (i % 2 == 0) continue;
                s += i;
            }
            while (s > 100) s -= 10;
            do { s += 1; } while (s < 5);
            switch (s) {
                case 1:
                    s = 10;
                    break;
                default:
                    s = 20;
            }
            return s;
        }
    "#;
    let tree = parse(source);
    let rendered = tree.render(RenderMode::Current);

    for label in [
        "For", "If", "Continue", "While", "DoWhile", "Switch", "Case", "DefaultCase", "Break",
    ] {
        assert!(rendered.contains(label), "missing {label} in:\n{rendered}");
    }
}

#[test]
fn test_enum_declaration() {
    let source = "enum Color { RED, GREEN = 5, BLUE };";
    let tree = parse(source);
    let rendered = tree.render(RenderMode::Current);

    assert!(rendered.contains("EnumDecl(Color)"));
    assert!(rendered.contains("EnumConstantDecl(GREEN)"));
    assert!(rendered.contains("IntLiteral(5)"));
}

#[test]
fn test_every_node_carries_a_location() {
    let source = r#"
        struct Point { int x; int y; };
        int main(void) {
            struct Point p;
            p.x = 1;
            return p.x + sizeof(int);
        }
    "#;
    let tree = parse(source);
    for id in tree.find_matching(|_| true) {
        let location = tree.node(id).location;
        assert!(location.line >= 1);
        assert!(location.column >= 1);
    }
}

#[test]
fn test_ownership_is_acyclic_and_complete() {
    let source = "int f(int a) { return a * 2; } int main(void) { return f(21); }";
    let tree = parse(source);

    // Every node reachable over owning edges is visited exactly once.
    let visited = tree.find_matching(|_| true);
    let mut unique = visited.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), visited.len());

    // Parent back-reference and forward ownership agree.
    for &id in &visited {
        if let Some(parent) = tree.node(id).parent {
            assert!(
                tree.node(parent).kind.children().contains(&id),
                "node {id} is not among its parent's children"
            );
        }
    }
}

#[test]
fn test_missing_semicolon_is_a_syntax_error() {
    let err = parse_err("int x = 1");
    let text = err.to_string();
    assert!(text.contains("expected"), "{text}");
    assert!(text.contains("';'"), "{text}");
}

#[test]
fn test_case_outside_switch_is_a_syntax_error() {
    let err = parse_err("int main(void) { case 1: return 0; }");
    assert!(err.to_string().contains("'case' outside of switch"));
}

#[test]
fn test_unterminated_string_reports_location() {
    let err = parse_err("int main(void) { char *s = \"abc; }");
    let text = err.to_string();
    assert!(text.contains("unterminated"), "{text}");
}

#[test]
fn test_stray_character_is_a_syntax_error() {
    let err = parse_err("int x = $;");
    assert!(err.to_string().contains("well-formed token"));
}
