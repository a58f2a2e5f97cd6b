use super::*;
use crate::lexer;

fn parse_source(src: &str) -> Result<Program> {
    let tokens = lexer::lex(src).expect("should lex");
    parse(&tokens)
}

fn parse_expression(src: &str) -> Expr {
    let tokens = lexer::lex(src).expect("should lex");
    let mut cursor = Cursor::new(&tokens);
    parse_expr(&mut cursor, 0).expect("should parse")
}

fn int(value: i64, line: u32, col: u32) -> Expr {
    Expr::new(ExprKind::IntLit(value), Span::new(line, col))
}

#[test]
fn test_expression_precedence() {
    let parsed = parse_expression("1 * 2 - 3 * (4 + 5)");
    let expected = Expr::new(
        ExprKind::Binary(
            BinaryOp::Sub,
            Box::new(Expr::new(
                ExprKind::Binary(
                    BinaryOp::Mul,
                    Box::new(int(1, 1, 1)),
                    Box::new(int(2, 1, 5)),
                ),
                Span::new(1, 3),
            )),
            Box::new(Expr::new(
                ExprKind::Binary(
                    BinaryOp::Mul,
                    Box::new(int(3, 1, 9)),
                    Box::new(Expr::new(
                        ExprKind::Binary(
                            BinaryOp::Add,
                            Box::new(int(4, 1, 14)),
                            Box::new(int(5, 1, 18)),
                        ),
                        Span::new(1, 16),
                    )),
                ),
                Span::new(1, 11),
            )),
        ),
        Span::new(1, 7),
    );
    assert_eq!(expected, parsed);
}

#[test]
fn test_left_associativity() {
    // 10 - 4 - 3 must parse as (10 - 4) - 3
    let parsed = parse_expression("10 - 4 - 3");
    let ExprKind::Binary(BinaryOp::Sub, left, right) = parsed.kind else {
        panic!("expected top-level subtraction");
    };
    assert!(matches!(right.kind, ExprKind::IntLit(3)));
    assert!(matches!(
        left.kind,
        ExprKind::Binary(BinaryOp::Sub, _, _)
    ));
}

#[test]
fn test_logical_binds_loosest() {
    let parsed = parse_expression("a + 1 < b && c == d || e");
    let ExprKind::Binary(BinaryOp::LogicalOr, left, _) = parsed.kind else {
        panic!("expected || at the top");
    };
    assert!(matches!(
        left.kind,
        ExprKind::Binary(BinaryOp::LogicalAnd, _, _)
    ));
}

#[test]
fn test_var_and_func_decl() {
    let program = parse_source("const int limit = 100;\nint twice(int n) { return n * 2; }")
        .expect("should parse");
    assert_eq!(2, program.declarations.len());

    let Declaration::Var(var) = &program.declarations[0] else {
        panic!("expected variable declaration");
    };
    assert_eq!("limit", var.name);
    assert!(var.is_const);
    assert!(var.init.is_some());

    let Declaration::Fun(fun) = &program.declarations[1] else {
        panic!("expected function declaration");
    };
    assert_eq!("twice", fun.name);
    assert_eq!(Type::Int, fun.return_type);
    assert_eq!(1, fun.params.len());
    assert_eq!("n", fun.params[0].name);
}

#[test]
fn test_array_decl_and_store() {
    let program = parse_source("void main() { int a[5]; a[2] = 7; }").expect("should parse");
    let Declaration::Fun(fun) = &program.declarations[0] else {
        panic!("expected function");
    };
    let Statement::Decl(decl) = &fun.body.stmts[0] else {
        panic!("expected declaration");
    };
    assert_eq!(Some(5), decl.array_size);
    assert!(matches!(fun.body.stmts[1], Statement::ArrayStore(_)));
}

#[test]
fn test_dangling_else_binds_inner() {
    let program =
        parse_source("void main() { if (1 < 2) if (2 < 3) print(1); else print(2); }").unwrap();
    let Declaration::Fun(fun) = &program.declarations[0] else {
        panic!("expected function");
    };
    let Statement::If(outer) = &fun.body.stmts[0] else {
        panic!("expected if");
    };
    assert!(outer.els.is_none());
    let Statement::If(inner) = outer.then.as_ref() else {
        panic!("expected nested if");
    };
    assert!(inner.els.is_some());
}

#[test]
fn test_for_with_decl_and_update() {
    let program = parse_source("void main() { for (int i = 0; i < 10; ++i) print(i); }").unwrap();
    let Declaration::Fun(fun) = &program.declarations[0] else {
        panic!("expected function");
    };
    let Statement::For(for_st) = &fun.body.stmts[0] else {
        panic!("expected for");
    };
    assert!(matches!(
        for_st.init.as_deref(),
        Some(Statement::Decl(_))
    ));
    assert!(for_st.condition.is_some());
    assert!(matches!(
        for_st.update.as_ref().map(|e| &e.kind),
        Some(ExprKind::Unary(UnaryOp::PrefixIncrement, _))
    ));
}

#[test]
fn test_postfix_and_prefix_incdec() {
    let post = parse_expression("x++");
    assert!(matches!(
        post.kind,
        ExprKind::Unary(UnaryOp::PostfixIncrement, _)
    ));
    let pre = parse_expression("--x");
    assert!(matches!(
        pre.kind,
        ExprKind::Unary(UnaryOp::PrefixDecrement, _)
    ));
}

#[test]
fn test_assignment_is_not_an_expression() {
    // `=` nested inside an expression context has no production
    let err = parse_source("void main() { print(x = 2); }").unwrap_err();
    let (line, _) = err.position();
    assert_eq!(1, line);
}

#[test]
fn test_invalid_assign_target() {
    let err = parse_source("void main() { 1 = 2; }").unwrap_err();
    assert_eq!(&InnerParseError::InvalidAssignTarget, err.inner());
}

#[test]
fn test_missing_semicolon() {
    let err = parse_source("void main() { int x = 1 }").unwrap_err();
    assert!(matches!(
        err.inner(),
        InnerParseError::ExpectedButGot(TokenKind::Semicolon, _)
    ));
}

#[test]
fn test_const_function_rejected() {
    let err = parse_source("const int f() { return 1; }").unwrap_err();
    assert_eq!(&InnerParseError::ConstFunction, err.inner());
}
