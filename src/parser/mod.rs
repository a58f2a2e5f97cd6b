mod cursor;
mod parse_error;
#[cfg(test)]
mod parser_tests;

use crate::ast::*;
use crate::lexer::{Token, TokenKind};
use cursor::Cursor;
pub use parse_error::{InnerParseError, ParseError, Result};

/// Binding power for the precedence-climbing expression loop. All binary
/// operators are left-associative.
fn get_prec(kind: TokenKind) -> u64 {
    match kind {
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 50,
        TokenKind::Plus | TokenKind::Minus => 45,
        TokenKind::IsLessThan
        | TokenKind::IsLessThanOrEqual
        | TokenKind::IsGreaterThan
        | TokenKind::IsGreaterThanOrEqual => 35,
        TokenKind::IsEqual | TokenKind::IsNotEqual => 30,
        TokenKind::LogicalAnd => 10,
        TokenKind::LogicalOr => 5,
        _ => 0,
    }
}

impl TryFrom<TokenKind> for BinaryOp {
    type Error = ();
    fn try_from(kind: TokenKind) -> std::result::Result<Self, ()> {
        match kind {
            TokenKind::Plus => Ok(Self::Add),
            TokenKind::Minus => Ok(Self::Sub),
            TokenKind::Star => Ok(Self::Mul),
            TokenKind::Slash => Ok(Self::Div),
            TokenKind::Percent => Ok(Self::Mod),
            TokenKind::IsLessThan => Ok(Self::LessThan),
            TokenKind::IsGreaterThan => Ok(Self::GreaterThan),
            TokenKind::IsLessThanOrEqual => Ok(Self::LessOrEqual),
            TokenKind::IsGreaterThanOrEqual => Ok(Self::GreaterOrEqual),
            TokenKind::IsEqual => Ok(Self::IsEqual),
            TokenKind::IsNotEqual => Ok(Self::IsNotEqual),
            TokenKind::LogicalAnd => Ok(Self::LogicalAnd),
            TokenKind::LogicalOr => Ok(Self::LogicalOr),
            _ => Err(()),
        }
    }
}

fn span_of(token: &Token) -> Span {
    Span::new(token.line, token.col)
}

fn parse_type(cursor: &mut Cursor) -> Result<Type> {
    let next = cursor.peek();
    let ty = match next.kind {
        TokenKind::Int => Type::Int,
        TokenKind::Bool => Type::Bool,
        TokenKind::Void => Type::Void,
        _ => return Err(InnerParseError::ExpectedType(next.clone()).at_token(next)),
    };
    cursor.advance();
    Ok(ty)
}

fn parse_int_literal(token: &Token) -> Result<i64> {
    token
        .lexeme
        .parse::<i64>()
        .map_err(|_| InnerParseError::IntLiteralOutOfRange(token.lexeme.clone()).at_token(token))
}

fn parse_primary(cursor: &mut Cursor) -> Result<Expr> {
    let next = cursor.peek();
    let span = span_of(next);
    match next.kind {
        TokenKind::IntLiteral => {
            let value = parse_int_literal(next)?;
            cursor.advance();
            Ok(Expr::new(ExprKind::IntLit(value), span))
        }
        TokenKind::FloatLiteral => {
            let value = next
                .lexeme
                .parse::<f64>()
                .expect("digits dot digits always parses");
            cursor.advance();
            Ok(Expr::new(ExprKind::FloatLit(value), span))
        }
        TokenKind::True => {
            cursor.advance();
            Ok(Expr::new(ExprKind::BoolLit(true), span))
        }
        TokenKind::False => {
            cursor.advance();
            Ok(Expr::new(ExprKind::BoolLit(false), span))
        }
        TokenKind::ReadInt => {
            cursor.advance();
            cursor.expect(TokenKind::OpenParen)?;
            cursor.expect(TokenKind::CloseParen)?;
            Ok(Expr::new(ExprKind::ReadInt, span))
        }
        TokenKind::Identifier => {
            let name = cursor.advance().lexeme.clone();
            Ok(Expr::new(ExprKind::Ident(name), span))
        }
        TokenKind::OpenParen => {
            cursor.advance();
            let expr = parse_expr(cursor, 0)?;
            cursor.expect(TokenKind::CloseParen)?;
            Ok(expr)
        }
        _ => Err(InnerParseError::ExpectedExpression(next.clone()).at_token(next)),
    }
}

fn parse_arguments(cursor: &mut Cursor) -> Result<Vec<Expr>> {
    let mut args = Vec::new();

    if cursor.peek_kind() != TokenKind::CloseParen {
        loop {
            args.push(parse_expr(cursor, 0)?);
            if !cursor.bump_if(TokenKind::Comma) {
                break;
            }
        }
    }

    Ok(args)
}

/// Postfix suffixes bind tightest: call, index, `++`/`--`.
fn parse_postfix(cursor: &mut Cursor) -> Result<Expr> {
    let mut expr = parse_primary(cursor)?;

    loop {
        let next = cursor.peek();
        match next.kind {
            TokenKind::OpenParen => {
                let ExprKind::Ident(name) = expr.kind else {
                    return Err(InnerParseError::ExpectedExpression(next.clone()).at_token(next));
                };
                cursor.advance();
                let args = parse_arguments(cursor)?;
                cursor.expect(TokenKind::CloseParen)?;
                expr = Expr::new(ExprKind::Call(name, args), expr.span);
            }
            TokenKind::OpenBracket => {
                let ExprKind::Ident(name) = expr.kind else {
                    return Err(InnerParseError::InvalidAssignTarget.at_token(next));
                };
                cursor.advance();
                let index = parse_expr(cursor, 0)?;
                cursor.expect(TokenKind::CloseBracket)?;
                expr = Expr::new(ExprKind::ArrayLoad(name, Box::new(index)), expr.span);
            }
            TokenKind::Increment | TokenKind::Decrement => {
                if !expr.is_lvalue() {
                    return Err(InnerParseError::InvalidAssignTarget.at_token(next));
                }
                let op = if next.kind == TokenKind::Increment {
                    UnaryOp::PostfixIncrement
                } else {
                    UnaryOp::PostfixDecrement
                };
                cursor.advance();
                expr = Expr::new(ExprKind::Unary(op, Box::new(expr)), span_of(next));
            }
            _ => break,
        }
    }

    Ok(expr)
}

fn parse_unary(cursor: &mut Cursor) -> Result<Expr> {
    let next = cursor.peek();
    let span = span_of(next);
    match next.kind {
        TokenKind::Minus => {
            cursor.advance();
            let operand = parse_unary(cursor).map(Box::new)?;
            Ok(Expr::new(ExprKind::Unary(UnaryOp::Negate, operand), span))
        }
        TokenKind::LogicalNot => {
            cursor.advance();
            let operand = parse_unary(cursor).map(Box::new)?;
            Ok(Expr::new(
                ExprKind::Unary(UnaryOp::LogicalNot, operand),
                span,
            ))
        }
        TokenKind::Increment | TokenKind::Decrement => {
            let op = if next.kind == TokenKind::Increment {
                UnaryOp::PrefixIncrement
            } else {
                UnaryOp::PrefixDecrement
            };
            cursor.advance();
            let operand = parse_postfix(cursor)?;
            if !operand.is_lvalue() {
                return Err(InnerParseError::InvalidAssignTarget.at_token(cursor.peek()));
            }
            Ok(Expr::new(ExprKind::Unary(op, Box::new(operand)), span))
        }
        _ => parse_postfix(cursor),
    }
}

fn parse_expr(cursor: &mut Cursor, min_prec: u64) -> Result<Expr> {
    let mut left = parse_unary(cursor)?;

    loop {
        let next = cursor.peek();
        if !next.kind.is_binaryop() {
            break;
        }
        let prec = get_prec(next.kind);
        if prec < min_prec {
            break;
        }
        let op = BinaryOp::try_from(next.kind).expect("is_binaryop filtered");
        let span = span_of(next);
        cursor.advance();
        let right = parse_expr(cursor, prec + 1)?;
        left = Expr::new(ExprKind::Binary(op, Box::new(left), Box::new(right)), span);
    }

    Ok(left)
}

/// Rest of a variable declaration, after `[const] type IDENT` has been
/// consumed: `('[' INT ']')? ('=' expr)? ';'`.
fn parse_var_decl_rest(
    cursor: &mut Cursor,
    ty: Type,
    name: String,
    is_const: bool,
    span: Span,
) -> Result<VarDecl> {
    if cursor.bump_if(TokenKind::OpenBracket) {
        let size_token = cursor.peek();
        if size_token.kind != TokenKind::IntLiteral {
            return Err(InnerParseError::BadArraySize(size_token.clone()).at_token(size_token));
        }
        let size = parse_int_literal(size_token)? as usize;
        cursor.advance();
        cursor.expect(TokenKind::CloseBracket)?;
        cursor.expect(TokenKind::Semicolon)?;
        return Ok(VarDecl {
            ty,
            name,
            is_const,
            init: None,
            array_size: Some(size),
            span,
        });
    }

    let init = if cursor.bump_if(TokenKind::Assign) {
        Some(parse_expr(cursor, 0)?)
    } else {
        None
    };
    cursor.expect(TokenKind::Semicolon)?;

    Ok(VarDecl {
        ty,
        name,
        is_const,
        init,
        array_size: None,
        span,
    })
}

fn parse_params(cursor: &mut Cursor) -> Result<Vec<Param>> {
    let mut params = Vec::new();

    if cursor.peek_kind() != TokenKind::CloseParen {
        loop {
            let span = span_of(cursor.peek());
            let ty = parse_type(cursor)?;
            let name = cursor.expect_identifier()?.lexeme.clone();
            params.push(Param { ty, name, span });
            if !cursor.bump_if(TokenKind::Comma) {
                break;
            }
        }
    }

    Ok(params)
}

/// `[const] type IDENT` then either a function (rejecting `const`) or the
/// variable-declaration tail.
fn parse_declaration(cursor: &mut Cursor) -> Result<Declaration> {
    let first = cursor.peek();
    let span = span_of(first);
    let is_const = cursor.bump_if(TokenKind::Const);
    let ty = parse_type(cursor)?;
    let name_token = cursor.expect_identifier()?;
    let name = name_token.lexeme.clone();

    if cursor.peek_kind() == TokenKind::OpenParen {
        if is_const {
            return Err(InnerParseError::ConstFunction.at_token(name_token));
        }
        cursor.advance();
        let params = parse_params(cursor)?;
        cursor.expect(TokenKind::CloseParen)?;
        let body = parse_block(cursor)?;
        return Ok(Declaration::Fun(FunDecl {
            return_type: ty,
            name,
            params,
            body,
            span,
        }));
    }

    let vardec = parse_var_decl_rest(cursor, ty, name, is_const, span)?;
    Ok(Declaration::Var(vardec))
}

fn parse_block(cursor: &mut Cursor) -> Result<Block> {
    let open = cursor.expect(TokenKind::OpenBrace)?;
    let span = span_of(open);
    let mut stmts = Vec::new();

    while !cursor.bump_if(TokenKind::CloseBrace) {
        if cursor.at_end() {
            let eof = cursor.peek();
            return Err(
                InnerParseError::ExpectedButGot(TokenKind::CloseBrace, eof.clone()).at_token(eof),
            );
        }
        stmts.push(parse_statement(cursor)?);
    }

    Ok(Block { stmts, span })
}

fn parse_if(cursor: &mut Cursor) -> Result<Statement> {
    let kw = cursor.expect(TokenKind::If)?;
    cursor.expect(TokenKind::OpenParen)?;
    let condition = parse_expr(cursor, 0)?;
    cursor.expect(TokenKind::CloseParen)?;
    let then = parse_statement(cursor).map(Box::new)?;
    let els = if cursor.bump_if(TokenKind::Else) {
        Some(parse_statement(cursor).map(Box::new)?)
    } else {
        None
    };

    Ok(Statement::If(If {
        condition,
        then,
        els,
        span: span_of(kw),
    }))
}

fn parse_while(cursor: &mut Cursor) -> Result<Statement> {
    let kw = cursor.expect(TokenKind::While)?;
    cursor.expect(TokenKind::OpenParen)?;
    let condition = parse_expr(cursor, 0)?;
    cursor.expect(TokenKind::CloseParen)?;
    let body = parse_statement(cursor).map(Box::new)?;

    Ok(Statement::While(While {
        condition,
        body,
        span: span_of(kw),
    }))
}

fn parse_for(cursor: &mut Cursor) -> Result<Statement> {
    let kw = cursor.expect(TokenKind::For)?;
    cursor.expect(TokenKind::OpenParen)?;

    let init = if cursor.bump_if(TokenKind::Semicolon) {
        None
    } else if cursor.peek_kind().starts_declaration() {
        let span = span_of(cursor.peek());
        let is_const = cursor.bump_if(TokenKind::Const);
        let ty = parse_type(cursor)?;
        let name = cursor.expect_identifier()?.lexeme.clone();
        let vardec = parse_var_decl_rest(cursor, ty, name, is_const, span)?;
        Some(Box::new(Statement::Decl(vardec)))
    } else {
        Some(Box::new(parse_expr_or_assign_statement(cursor)?))
    };

    let condition = if cursor.peek_kind() == TokenKind::Semicolon {
        None
    } else {
        Some(parse_expr(cursor, 0)?)
    };
    cursor.expect(TokenKind::Semicolon)?;

    let update = if cursor.peek_kind() == TokenKind::CloseParen {
        None
    } else {
        Some(parse_expr(cursor, 0)?)
    };
    cursor.expect(TokenKind::CloseParen)?;

    let body = parse_statement(cursor).map(Box::new)?;

    Ok(Statement::For(For {
        init,
        condition,
        update,
        body,
        span: span_of(kw),
    }))
}

fn parse_return(cursor: &mut Cursor) -> Result<Statement> {
    let kw = cursor.expect(TokenKind::Return)?;
    let value = if cursor.peek_kind() == TokenKind::Semicolon {
        None
    } else {
        Some(parse_expr(cursor, 0)?)
    };
    cursor.expect(TokenKind::Semicolon)?;

    Ok(Statement::Return(value, span_of(kw)))
}

fn parse_print(cursor: &mut Cursor) -> Result<Statement> {
    let kw = cursor.expect(TokenKind::Print)?;
    cursor.expect(TokenKind::OpenParen)?;
    let expr = parse_expr(cursor, 0)?;
    cursor.expect(TokenKind::CloseParen)?;
    cursor.expect(TokenKind::Semicolon)?;

    Ok(Statement::Print(expr, span_of(kw)))
}

/// Assignment is a statement, not an expression: parse an expression, and a
/// following `=` requires it to be a variable or array access.
fn parse_expr_or_assign_statement(cursor: &mut Cursor) -> Result<Statement> {
    let expr = parse_expr(cursor, 0)?;

    if cursor.peek_kind() == TokenKind::Assign {
        let eq = cursor.peek();
        let span = expr.span;
        let statement = match expr.kind {
            ExprKind::Ident(target) => {
                cursor.advance();
                let value = parse_expr(cursor, 0)?;
                Statement::Assign(Assign {
                    target,
                    value,
                    span,
                })
            }
            ExprKind::ArrayLoad(array, index) => {
                cursor.advance();
                let value = parse_expr(cursor, 0)?;
                Statement::ArrayStore(ArrayStore {
                    array,
                    index: *index,
                    value,
                    span,
                })
            }
            _ => return Err(InnerParseError::InvalidAssignTarget.at_token(eq)),
        };
        cursor.expect(TokenKind::Semicolon)?;
        return Ok(statement);
    }

    cursor.expect(TokenKind::Semicolon)?;
    Ok(Statement::Expr(expr))
}

fn parse_statement(cursor: &mut Cursor) -> Result<Statement> {
    let next = cursor.peek();
    match next.kind {
        TokenKind::OpenBrace => parse_block(cursor).map(Statement::Compound),
        TokenKind::If => parse_if(cursor),
        TokenKind::While => parse_while(cursor),
        TokenKind::For => parse_for(cursor),
        TokenKind::Return => parse_return(cursor),
        TokenKind::Print => parse_print(cursor),
        TokenKind::Break => {
            let kw = cursor.advance();
            cursor.expect(TokenKind::Semicolon)?;
            Ok(Statement::Break(span_of(kw)))
        }
        TokenKind::Continue => {
            let kw = cursor.advance();
            cursor.expect(TokenKind::Semicolon)?;
            Ok(Statement::Continue(span_of(kw)))
        }
        k if k.starts_declaration() => {
            let span = span_of(next);
            let is_const = cursor.bump_if(TokenKind::Const);
            let ty = parse_type(cursor)?;
            let name = cursor.expect_identifier()?.lexeme.clone();
            let vardec = parse_var_decl_rest(cursor, ty, name, is_const, span)?;
            Ok(Statement::Decl(vardec))
        }
        _ => parse_expr_or_assign_statement(cursor),
    }
}

/// Parse a whole translation unit. Declarations come out in source order;
/// nothing orders functions against each other (hoisting happens later).
pub fn parse(tokens: &[Token]) -> Result<Program> {
    let mut declarations = Vec::new();
    let mut cursor = Cursor::new(tokens);

    while !cursor.at_end() {
        declarations.push(parse_declaration(&mut cursor)?);
    }

    Ok(Program { declarations })
}
