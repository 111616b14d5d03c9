//! Rule declarations: `rule <name>(mode=..., grid=..., on="...") { ... }`.
//!
//! The body is a `when / else when / else` chain flattened into ordered
//! branches. Branch order is evaluation order; the first branch whose
//! condition holds fires and the rest are skipped.

use crate::error::ParseError;
use crate::expr::parse_expr;
use crate::stream::TokenStream;
use folio_ast::{AssignTarget, Rule, RuleBranch, RuleMode, RuleScope, Stmt};
use folio_lexer::TokenKind;

pub fn parse_rule(ts: &mut TokenStream) -> Result<Rule, ParseError> {
    let (name, pos) = ts.expect_ident("a rule name")?;
    let header = ts.peek();
    let mut mode = RuleMode::Docstep;
    let mut scope = RuleScope::default();
    let mut on = None;

    if ts.eat(&TokenKind::LParen) {
        while !ts.check(&TokenKind::RParen) && !ts.at_eof() {
            let (key, _) = ts.expect_ident("a rule header key")?;
            ts.expect(&TokenKind::Eq)?;
            match key.as_str() {
                "mode" => {
                    let token = ts.peek();
                    let (tag, _) = ts.expect_ident("a rule mode")?;
                    mode = match tag.as_str() {
                        "docstep" => RuleMode::Docstep,
                        "event" => RuleMode::Event,
                        "timer" => RuleMode::Timer,
                        other => {
                            return Err(ParseError::at(
                                token,
                                format!("unknown rule mode '{other}'"),
                            ))
                        }
                    };
                }
                "grid" => {
                    let (grid, _) = ts.expect_ident("a grid name")?;
                    scope.grid = Some(grid);
                }
                "on" => {
                    on = Some(ts.expect_str("an event name string")?);
                }
                // Unknown header key: skip its value up to ',' or ')'.
                _ => skip_header_value(ts),
            }
            if !ts.eat(&TokenKind::Comma) {
                break;
            }
        }
        ts.expect(&TokenKind::RParen)?;
    }

    if mode == RuleMode::Event && on.is_none() {
        return Err(ParseError::at(
            header,
            format!("rule '{name}' has mode=event but no on=\"...\" event name"),
        ));
    }

    let branches = parse_branches(ts)?;
    let condition = branches.first().and_then(|b| b.condition.clone());
    let then_branch = branches.first().map(|b| b.body.clone()).unwrap_or_default();

    Ok(Rule {
        name,
        mode,
        scope,
        on,
        branches,
        condition,
        then_branch,
        pos,
    })
}

fn skip_header_value(ts: &mut TokenStream) {
    let mut depth: u32 = 0;
    loop {
        match &ts.peek().kind {
            TokenKind::Eof => return,
            TokenKind::Comma if depth == 0 => return,
            TokenKind::RParen if depth == 0 => return,
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                depth += 1;
                ts.advance();
            }
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                depth = depth.saturating_sub(1);
                ts.advance();
            }
            _ => {
                ts.advance();
            }
        }
    }
}

fn parse_branches(ts: &mut TokenStream) -> Result<Vec<RuleBranch>, ParseError> {
    ts.expect(&TokenKind::LBrace)?;
    let mut branches = Vec::new();

    ts.expect(&TokenKind::When)?;
    let condition = parse_expr(ts)?;
    ts.expect(&TokenKind::Then)?;
    branches.push(RuleBranch {
        condition: Some(condition),
        body: parse_stmt_block(ts)?,
    });

    while ts.check(&TokenKind::Else) {
        ts.advance();
        if ts.eat(&TokenKind::When) {
            let condition = parse_expr(ts)?;
            ts.expect(&TokenKind::Then)?;
            branches.push(RuleBranch {
                condition: Some(condition),
                body: parse_stmt_block(ts)?,
            });
        } else {
            // Trailing `else { ... }` is unconditional and final.
            branches.push(RuleBranch {
                condition: None,
                body: parse_stmt_block(ts)?,
            });
            break;
        }
    }

    ts.expect(&TokenKind::RBrace)?;
    Ok(branches)
}

fn parse_stmt_block(ts: &mut TokenStream) -> Result<Vec<Stmt>, ParseError> {
    ts.expect(&TokenKind::LBrace)?;
    let mut stmts = Vec::new();
    while !ts.check(&TokenKind::RBrace) && !ts.at_eof() {
        stmts.push(parse_stmt(ts)?);
    }
    ts.expect(&TokenKind::RBrace)?;
    Ok(stmts)
}

fn parse_stmt(ts: &mut TokenStream) -> Result<Stmt, ParseError> {
    // `let name = expr;` parses but is a no-op at this kernel version.
    if ts.eat(&TokenKind::Let) {
        let (name, _) = ts.expect_ident("a binding name")?;
        ts.expect(&TokenKind::Eq)?;
        let value = parse_expr(ts)?;
        ts.expect(&TokenKind::Semi)?;
        return Ok(Stmt::Let { name, value });
    }

    // `advanceDocstep();` is an accepted marker, also a no-op: docsteps
    // advance only through the runtime's advance sources.
    if ts.check_kw("advanceDocstep") && ts.peek_nth(1).kind == TokenKind::LParen {
        ts.advance();
        ts.expect(&TokenKind::LParen)?;
        ts.expect(&TokenKind::RParen)?;
        ts.expect(&TokenKind::Semi)?;
        return Ok(Stmt::AdvanceDocstep);
    }

    let target = parse_assign_target(ts)?;
    ts.expect(&TokenKind::Eq)?;
    let value = parse_expr(ts)?;
    ts.expect(&TokenKind::Semi)?;
    Ok(Stmt::Assign { target, value })
}

fn parse_assign_target(ts: &mut TokenStream) -> Result<AssignTarget, ParseError> {
    let (first, _) = ts.expect_ident("an assignment target")?;
    let mut path = vec![first];
    while ts.eat(&TokenKind::Dot) {
        let (seg, _) = ts.expect_ident("a path segment after '.'")?;
        path.push(seg);
    }
    Ok(AssignTarget { path })
}
