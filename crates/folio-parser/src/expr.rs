//! Expression parsing.
//!
//! Pratt-style precedence climbing over the operator ladder, lowest first:
//! `||`, `&&`, equality (`==` `!=` `===` `!==`), comparison, additive,
//! multiplicative, unary (`not`, `-`), postfix (member access and calls),
//! primary. Equality binds looser than comparison, so `a < b == c < d`
//! groups as `(a < b) == (c < d)`.

use crate::error::ParseError;
use crate::stream::TokenStream;
use folio_ast::expr::{Arg, BinaryOp, Expr, ExprKind, UnaryOp};
use folio_ast::Value;
use folio_lexer::TokenKind;

pub fn parse_expr(ts: &mut TokenStream) -> Result<Expr, ParseError> {
    parse_binary(ts, 0)
}

/// Binding power per tier; `None` for non-operators.
fn binary_op(kind: &TokenKind) -> Option<(BinaryOp, u8)> {
    Some(match kind {
        TokenKind::PipePipe => (BinaryOp::Or, 1),
        TokenKind::AmpAmp => (BinaryOp::And, 2),
        TokenKind::EqEq => (BinaryOp::Eq, 3),
        TokenKind::BangEq => (BinaryOp::Ne, 3),
        TokenKind::EqEqEq => (BinaryOp::StrictEq, 3),
        TokenKind::BangEqEq => (BinaryOp::StrictNe, 3),
        TokenKind::Lt => (BinaryOp::Lt, 4),
        TokenKind::Le => (BinaryOp::Le, 4),
        TokenKind::Gt => (BinaryOp::Gt, 4),
        TokenKind::Ge => (BinaryOp::Ge, 4),
        TokenKind::Plus => (BinaryOp::Add, 5),
        TokenKind::Minus => (BinaryOp::Sub, 5),
        TokenKind::Star => (BinaryOp::Mul, 6),
        TokenKind::Slash => (BinaryOp::Div, 6),
        TokenKind::Percent => (BinaryOp::Mod, 6),
        _ => return None,
    })
}

fn parse_binary(ts: &mut TokenStream, min_power: u8) -> Result<Expr, ParseError> {
    let mut left = parse_unary(ts)?;
    while let Some((op, power)) = binary_op(&ts.peek().kind) {
        if power <= min_power {
            break;
        }
        let pos = ts.pos();
        ts.advance();
        // All tiers are left-associative.
        let right = parse_binary(ts, power)?;
        left = Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            pos,
        );
    }
    Ok(left)
}

fn parse_unary(ts: &mut TokenStream) -> Result<Expr, ParseError> {
    let token = ts.peek();
    let op = match token.kind {
        TokenKind::Not => Some(UnaryOp::Not),
        TokenKind::Minus => Some(UnaryOp::Neg),
        _ => None,
    };
    if let Some(op) = op {
        let pos = ts.pos();
        ts.advance();
        let operand = parse_unary(ts)?;
        return Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            pos,
        ));
    }
    parse_postfix(ts)
}

fn parse_postfix(ts: &mut TokenStream) -> Result<Expr, ParseError> {
    let mut expr = parse_primary(ts)?;
    loop {
        match ts.peek().kind {
            TokenKind::Dot => {
                let pos = ts.pos();
                ts.advance();
                let (field, _) = ts.expect_ident("a member name after '.'")?;
                expr = Expr::new(
                    ExprKind::Member {
                        object: Box::new(expr),
                        field,
                    },
                    pos,
                );
            }
            TokenKind::LParen => {
                let pos = ts.pos();
                ts.advance();
                let args = parse_args(ts)?;
                ts.expect(&TokenKind::RParen)?;
                expr = finish_call(expr, args, pos);
            }
            _ => break,
        }
    }
    Ok(expr)
}

/// Calls through the `neighbors` namespace become a dedicated node so the
/// runtime resolves them against the current cell without callee sniffing.
fn finish_call(callee: Expr, args: Vec<Arg>, pos: folio_ast::Pos) -> Expr {
    if let ExprKind::Member { object, field } = &callee.kind {
        if matches!(&object.kind, ExprKind::Ident { name } if name == "neighbors") {
            return Expr::new(
                ExprKind::NeighborsCall {
                    method: field.clone(),
                    args,
                },
                callee.pos,
            );
        }
    }
    Expr::new(
        ExprKind::Call {
            callee: Box::new(callee),
            args,
        },
        pos,
    )
}

/// Comma-separated call arguments. An argument is named when an identifier
/// is directly followed by a single `=` (one-token lookahead; `==` lexes
/// as its own token so equality never false-positives).
fn parse_args(ts: &mut TokenStream) -> Result<Vec<Arg>, ParseError> {
    let mut args = Vec::new();
    if ts.check(&TokenKind::RParen) {
        return Ok(args);
    }
    loop {
        let name = match (&ts.peek().kind, &ts.peek_nth(1).kind) {
            (TokenKind::Ident(name), TokenKind::Eq) => {
                let name = name.clone();
                ts.advance();
                ts.advance();
                Some(name)
            }
            _ => None,
        };
        let value = parse_expr(ts)?;
        args.push(Arg { name, value });
        if !ts.eat(&TokenKind::Comma) {
            break;
        }
        if ts.check(&TokenKind::RParen) {
            break;
        }
    }
    Ok(args)
}

fn parse_primary(ts: &mut TokenStream) -> Result<Expr, ParseError> {
    let pos = ts.pos();
    let token = ts.peek();
    match &token.kind {
        TokenKind::Int(v) => {
            let v = *v;
            ts.advance();
            Ok(Expr::new(ExprKind::Literal { value: Value::Int(v) }, pos))
        }
        TokenKind::Float(v) => {
            let v = *v;
            ts.advance();
            Ok(Expr::new(ExprKind::Literal { value: Value::Float(v) }, pos))
        }
        TokenKind::Inf => {
            ts.advance();
            Ok(Expr::new(
                ExprKind::Literal {
                    value: Value::Float(f64::INFINITY),
                },
                pos,
            ))
        }
        TokenKind::Str(s) => {
            let s = s.clone();
            ts.advance();
            Ok(Expr::new(ExprKind::Literal { value: Value::Str(s) }, pos))
        }
        TokenKind::True => {
            ts.advance();
            Ok(Expr::new(
                ExprKind::Literal {
                    value: Value::Bool(true),
                },
                pos,
            ))
        }
        TokenKind::False => {
            ts.advance();
            Ok(Expr::new(
                ExprKind::Literal {
                    value: Value::Bool(false),
                },
                pos,
            ))
        }
        TokenKind::Ident(name) => {
            let name = name.clone();
            ts.advance();
            Ok(Expr::new(ExprKind::Ident { name }, pos))
        }
        TokenKind::LParen => {
            ts.advance();
            let expr = parse_expr(ts)?;
            ts.expect(&TokenKind::RParen)?;
            Ok(expr)
        }
        // Brace-grouped sub-expression, interchangeable with parens.
        TokenKind::LBrace => {
            ts.advance();
            let expr = parse_expr(ts)?;
            ts.expect(&TokenKind::RBrace)?;
            Ok(expr)
        }
        TokenKind::LBracket => {
            ts.advance();
            let mut items = Vec::new();
            if !ts.check(&TokenKind::RBracket) {
                loop {
                    items.push(parse_expr(ts)?);
                    if !ts.eat(&TokenKind::Comma) {
                        break;
                    }
                    if ts.check(&TokenKind::RBracket) {
                        break;
                    }
                }
            }
            ts.expect(&TokenKind::RBracket)?;
            Ok(Expr::new(ExprKind::List { items }, pos))
        }
        _ => Err(ParseError::expected(token, "an expression")),
    }
}
