//! Parser for the Folio document language.
//!
//! Recursive descent over the token stream from `folio-lexer`: one cursor
//! type ([`stream::TokenStream`]), a Pratt expression parser and a family
//! of block parsers. The parser is strict about structure (unknown
//! top-level blocks, malformed known fields) and tolerant about vocabulary
//! (unknown fields inside known blocks are skipped), so documents written
//! for a newer engine still load.

mod blocks;
mod body;
mod document;
mod error;
mod expr;
mod rules;
mod stream;
mod values;

pub use document::parse_document;
pub use error::ParseError;

use folio_ast::expr::Expr;
use folio_ast::Document;
use folio_lexer::Token;

/// Lex-or-parse failure from [`parse_source`].
#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    Lex(folio_lexer::LexError),
    Parse(ParseError),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Lex(e) => write!(f, "{e}"),
            SourceError::Parse(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SourceError {}

impl SourceError {
    /// 1-based position of the failure.
    pub fn position(&self) -> (u32, u32) {
        match self {
            SourceError::Lex(e) => (e.line, e.column),
            SourceError::Parse(e) => (e.line, e.column),
        }
    }
}

/// Tokenize and parse a source string in one step.
pub fn parse_source(source: &str) -> Result<Document, SourceError> {
    let tokens = folio_lexer::tokenize(source).map_err(SourceError::Lex)?;
    parse_document(&tokens).map_err(SourceError::Parse)
}

/// Parse a standalone expression from a token stream. Exposed for tooling
/// and tests; document sources reach expressions only through `@` props
/// and rule conditions.
pub fn parse_expression(tokens: &[Token]) -> Result<Expr, ParseError> {
    let mut ts = stream::TokenStream::new(tokens);
    let expr = expr::parse_expr(&mut ts)?;
    ts.expect(&folio_lexer::TokenKind::Eof)?;
    Ok(expr)
}
