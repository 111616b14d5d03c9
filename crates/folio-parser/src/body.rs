//! The `body { ... }` tree of renderable nodes.
//!
//! A node is `<kind> <id> { ... }`. Inside a node, `Ident Ident {`
//! (two-token lookahead) starts a child node; `Ident =` starts a property.
//! Properties are literal values unless prefixed with `@`, which switches
//! to the expression grammar. `refresh`, `reserve` and `fit` are reserved
//! field names with dedicated shapes rather than open properties.

use crate::error::ParseError;
use crate::expr::parse_expr;
use crate::stream::TokenStream;
use crate::values::{parse_duration, parse_literal_value, parse_number};
use folio_ast::node::{DocumentNode, PropValue, RefreshPolicy, SlotConfig, SlotFit, SlotReserve};
use folio_ast::BodyDecl;
use folio_lexer::TokenKind;

pub fn parse_body(ts: &mut TokenStream, body: &mut BodyDecl) -> Result<(), ParseError> {
    ts.expect(&TokenKind::LBrace)?;
    while !ts.check(&TokenKind::RBrace) && !ts.at_eof() {
        body.nodes.push(parse_node(ts)?);
    }
    ts.expect(&TokenKind::RBrace)?;
    Ok(())
}

fn parse_node(ts: &mut TokenStream) -> Result<DocumentNode, ParseError> {
    let (kind, pos) = ts.expect_ident("a node kind")?;
    let (id, _) = ts.expect_ident("a node id")?;
    ts.expect(&TokenKind::LBrace)?;

    let mut node = DocumentNode::new(kind, id);
    node.pos = pos;

    while !ts.check(&TokenKind::RBrace) && !ts.at_eof() {
        let token = ts.peek();
        let name = match &token.kind {
            TokenKind::Ident(s) => s.clone(),
            _ => return Err(ParseError::expected(token, "a property or child node")),
        };

        // Child node: `kind id {`.
        let is_child = matches!(ts.peek_nth(1).kind, TokenKind::Ident(_))
            && ts.peek_nth(2).kind == TokenKind::LBrace;
        if is_child {
            node.children.push(parse_node(ts)?);
            continue;
        }

        if ts.peek_nth(1).kind != TokenKind::Eq {
            return Err(ParseError::expected(token, "'=' after a property name"));
        }

        match name.as_str() {
            "refresh" => {
                ts.advance();
                ts.advance();
                node.refresh = Some(parse_refresh(ts)?);
                ts.expect(&TokenKind::Semi)?;
            }
            "reserve" => {
                ts.advance();
                ts.advance();
                let reserve = parse_reserve(ts)?;
                node.slot.get_or_insert_with(SlotConfig::default).reserve = Some(reserve);
                ts.expect(&TokenKind::Semi)?;
            }
            "fit" => {
                ts.advance();
                ts.advance();
                let fit = parse_fit(ts)?;
                node.slot.get_or_insert_with(SlotConfig::default).fit = Some(fit);
                ts.expect(&TokenKind::Semi)?;
            }
            _ => {
                ts.advance();
                ts.advance();
                let value = if ts.eat(&TokenKind::At) {
                    PropValue::Dynamic {
                        expr: parse_expr(ts)?,
                    }
                } else {
                    PropValue::Literal {
                        value: parse_literal_value(ts)?,
                    }
                };
                ts.expect(&TokenKind::Semi)?;
                node.props.insert(name, value);
            }
        }
    }
    ts.expect(&TokenKind::RBrace)?;
    Ok(node)
}

fn parse_refresh(ts: &mut TokenStream) -> Result<RefreshPolicy, ParseError> {
    let token = ts.peek();
    let (tag, _) = ts.expect_ident("a refresh policy")?;
    match tag.as_str() {
        "onLoad" => Ok(RefreshPolicy::OnLoad),
        "onDocstep" => Ok(RefreshPolicy::OnDocstep),
        "never" => Ok(RefreshPolicy::Never),
        "every" => {
            ts.expect(&TokenKind::LParen)?;
            let d = parse_duration(ts)?;
            ts.expect(&TokenKind::RParen)?;
            Ok(RefreshPolicy::Every(d))
        }
        other => Err(ParseError::at(
            token,
            format!("unknown refresh policy '{other}'"),
        )),
    }
}

fn parse_reserve(ts: &mut TokenStream) -> Result<SlotReserve, ParseError> {
    let token = ts.peek();
    let (tag, _) = ts.expect_ident("a reserve shape")?;
    match tag.as_str() {
        "fixed" => {
            ts.expect(&TokenKind::LParen)?;
            let width = parse_number(ts, false, "a reserve width")?;
            ts.expect(&TokenKind::Comma)?;
            let height = parse_number(ts, false, "a reserve height")?;
            let units = parse_units_arg(ts)?;
            ts.expect(&TokenKind::RParen)?;
            Ok(SlotReserve::Fixed {
                width,
                height,
                units,
            })
        }
        "fixedWidth" => {
            ts.expect(&TokenKind::LParen)?;
            let width = parse_number(ts, false, "a reserve width")?;
            let units = parse_units_arg(ts)?;
            ts.expect(&TokenKind::RParen)?;
            Ok(SlotReserve::FixedWidth { width, units })
        }
        other => Err(ParseError::at(
            token,
            format!("unknown reserve shape '{other}'"),
        )),
    }
}

/// Optional trailing `, <units>` inside a reserve call; defaults to `pt`.
fn parse_units_arg(ts: &mut TokenStream) -> Result<String, ParseError> {
    if ts.eat(&TokenKind::Comma) {
        let (units, _) = ts.expect_ident("a unit name")?;
        Ok(units)
    } else {
        Ok("pt".to_string())
    }
}

fn parse_fit(ts: &mut TokenStream) -> Result<SlotFit, ParseError> {
    let token = ts.peek();
    let (tag, _) = ts.expect_ident("a fit mode")?;
    match tag.as_str() {
        "clip" => Ok(SlotFit::Clip),
        "ellipsis" => Ok(SlotFit::Ellipsis),
        "shrink" => Ok(SlotFit::Shrink),
        "scaleDown" => Ok(SlotFit::ScaleDown),
        other => Err(ParseError::at(token, format!("unknown fit mode '{other}'"))),
    }
}
