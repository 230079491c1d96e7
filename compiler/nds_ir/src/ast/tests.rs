use super::*;
use pretty_assertions::assert_eq;

fn add(l: Expr, r: Expr) -> Expr {
    Expr::binary(BinaryOp::Add, l, r)
}

fn mul(l: Expr, r: Expr) -> Expr {
    Expr::binary(BinaryOp::Mul, l, r)
}

#[test]
fn test_render_respects_precedence() {
    let expr = mul(add(Expr::ident("a"), Expr::int(1)), Expr::ident("b"));
    assert_eq!(expr.to_string(), "(a + 1) * b");

    let expr = add(Expr::ident("a"), mul(Expr::int(1), Expr::ident("b")));
    assert_eq!(expr.to_string(), "a + 1 * b");
}

#[test]
fn test_render_right_operand_of_same_precedence() {
    let expr = Expr::binary(
        BinaryOp::Sub,
        Expr::ident("a"),
        Expr::binary(BinaryOp::Sub, Expr::ident("b"), Expr::ident("c")),
    );
    assert_eq!(expr.to_string(), "a - (b - c)");
}

#[test]
fn test_render_not_of_conjunction() {
    let expr = Expr::unary(
        UnaryOp::Not,
        Expr::binary(BinaryOp::And, Expr::ident("a"), Expr::ident("b")),
    );
    assert_eq!(expr.to_string(), "not (a and b)");
}

#[test]
fn test_render_literals() {
    assert_eq!(Expr::float(2.0).to_string(), "2.0");
    assert_eq!(Expr::string("say \"hi\"").to_string(), r#""say \"hi\"""#);
    assert_eq!(
        Expr::call("max", vec![Expr::int(1), Expr::ident("جذر")]).to_string(),
        "max(1, جذر)"
    );
}

#[test]
fn test_render_function_definition() {
    let stmt = Stmt::function(
        "f",
        &["n"],
        vec![Stmt::if_else(
            Expr::binary(BinaryOp::Lt, Expr::ident("n"), Expr::int(2)),
            vec![Stmt::ret(Some(Expr::ident("n")))],
            None,
        )],
    );
    let program = Program::new(vec![stmt]);
    assert_eq!(
        program.to_string(),
        "function f(n): {\n    if n < 2: {\n        return n\n    }\n}\n"
    );
}

#[test]
fn test_body_source_single_expression() {
    let def = Definition::new(
        "double",
        &["x"],
        vec![Stmt::expr(add(Expr::ident("x"), Expr::ident("x")))],
    );
    assert_eq!(def.body_source(), "x + x");
    assert_eq!(def.arity(), 1);
    assert!(def.body_expr().is_some());
}

#[test]
fn test_body_source_multiple_statements() {
    let def = Definition::new(
        "twice",
        &["x"],
        vec![
            Stmt::assign("y", mul(Expr::ident("x"), Expr::int(2))),
            Stmt::expr(Expr::ident("y")),
        ],
    );
    assert_eq!(def.body_source(), "y = x * 2\ny");
    assert!(def.body_expr().is_none());
}

#[test]
fn test_stmt_span() {
    let stmt = Stmt::brk().at(3, 7);
    assert_eq!(stmt.span, Some(Span::new(3, 7)));
    assert_eq!(stmt.span.map(|s| s.to_string()).as_deref(), Some("3:7"));
}

#[test]
fn test_import_rendering() {
    assert_eq!(Stmt::import("lib/math").to_string(), "import \"lib/math\"");
    assert_eq!(
        Stmt::import_as("geometry.ndx", "geo").to_string(),
        "import \"geometry.ndx\" as geo"
    );
    assert_eq!(
        Stmt::import_names("util", &["square", "cube"]).to_string(),
        "from \"util\" import square, cube"
    );
}
