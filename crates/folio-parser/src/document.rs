//! Top-level `document { ... }` parsing.

use crate::blocks;
use crate::body::parse_body;
use crate::error::ParseError;
use crate::rules::parse_rule;
use crate::stream::TokenStream;
use folio_ast::Document;
use folio_lexer::{Token, TokenKind};

/// Parse a lexed token stream into a [`Document`].
///
/// Unknown top-level blocks are hard errors; unknown fields inside known
/// blocks are tolerantly skipped so older engines can read newer sources.
pub fn parse_document(tokens: &[Token]) -> Result<Document, ParseError> {
    let mut ts = TokenStream::new(tokens);
    let mut doc = Document::default();

    let kw = ts.peek();
    if !ts.check_kw("document") {
        return Err(ParseError::expected(kw, "'document'"));
    }
    ts.advance();
    ts.expect(&TokenKind::LBrace)?;

    while !ts.check(&TokenKind::RBrace) && !ts.at_eof() {
        let token = ts.peek();
        let name = match &token.kind {
            TokenKind::Ident(s) => s.clone(),
            _ => return Err(ParseError::expected(token, "a block name")),
        };
        match name.as_str() {
            "meta" => {
                ts.advance();
                blocks::parse_meta(&mut ts, &mut doc)?;
            }
            "state" => {
                ts.advance();
                blocks::parse_state(&mut ts, &mut doc.state)?;
            }
            "pageConfig" => {
                ts.advance();
                doc.page_config = Some(blocks::parse_page_config(&mut ts)?);
            }
            "grid" => {
                ts.advance();
                doc.grids.push(blocks::parse_grid(&mut ts)?);
            }
            "rule" => {
                ts.advance();
                doc.rules.push(parse_rule(&mut ts)?);
            }
            "runtime" => {
                ts.advance();
                blocks::parse_runtime(&mut ts, &mut doc)?;
            }
            "assets" => {
                ts.advance();
                blocks::parse_assets(&mut ts, &mut doc.assets)?;
            }
            "materials" => {
                ts.advance();
                blocks::parse_materials(&mut ts, &mut doc.materials)?;
            }
            "body" => {
                ts.advance();
                parse_body(&mut ts, &mut doc.body)?;
            }
            other => {
                return Err(ParseError::at(
                    token,
                    format!("unknown top-level block '{other}'"),
                ))
            }
        }
    }
    ts.expect(&TokenKind::RBrace)?;
    ts.expect(&TokenKind::Eof)?;
    Ok(doc)
}
