//! Parse errors.

use folio_lexer::Token;

/// A fatal parse error, positioned at the token that broke the grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub line: u32,
    pub column: u32,
    /// Rendering of the offending token, e.g. `'}'` or `end of input`.
    pub near: String,
    pub message: String,
}

impl ParseError {
    pub fn at(token: &Token, message: impl Into<String>) -> Self {
        Self {
            line: token.line,
            column: token.column,
            near: token.kind.describe(),
            message: message.into(),
        }
    }

    pub fn expected(token: &Token, what: &str) -> Self {
        Self::at(token, format!("expected {what}, found {}", token.kind.describe()))
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {} (near {})", self.line, self.column, self.message, self.near)
    }
}

impl std::error::Error for ParseError {}
