//! Token cursor.

use crate::error::ParseError;
use folio_ast::Pos;
use folio_lexer::{Token, TokenKind};

/// A cursor over the lexed token slice. The slice always ends in
/// [`TokenKind::Eof`], so `peek` never runs off the end.
pub struct TokenStream<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenStream<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        debug_assert!(matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)));
        Self { tokens, pos: 0 }
    }

    pub fn peek(&self) -> &'a Token {
        self.nth(0)
    }

    pub fn peek_nth(&self, n: usize) -> &'a Token {
        self.nth(n)
    }

    fn nth(&self, n: usize) -> &'a Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    /// Consume and return the current token. Parked at `Eof` once reached.
    pub fn advance(&mut self) -> &'a Token {
        let token = &self.tokens[self.pos];
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    pub fn pos(&self) -> Pos {
        let t = self.peek();
        Pos::new(t.line, t.column)
    }

    /// True when the current token matches `kind` exactly.
    pub fn check(&self, kind: &TokenKind) -> bool {
        self.peek().kind == *kind
    }

    /// Consume the current token when it matches `kind`.
    pub fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, kind: &TokenKind) -> Result<&'a Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::expected(self.peek(), &kind.describe()))
        }
    }

    /// Expect any identifier and return its name with position.
    pub fn expect_ident(&mut self, what: &str) -> Result<(String, Pos), ParseError> {
        let token = self.peek();
        match &token.kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let pos = Pos::new(token.line, token.column);
                self.advance();
                Ok((name, pos))
            }
            _ => Err(ParseError::expected(token, what)),
        }
    }

    /// Expect a string literal.
    pub fn expect_str(&mut self, what: &str) -> Result<String, ParseError> {
        let token = self.peek();
        match &token.kind {
            TokenKind::Str(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            _ => Err(ParseError::expected(token, what)),
        }
    }

    /// Current token is the identifier `name` (keywords excluded).
    pub fn check_kw(&self, name: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Ident(s) if s == name)
    }

    /// Skip a malformed or unknown field: everything up to and including
    /// the next `;` at nesting depth zero, or up to (not including) the
    /// enclosing `}`. Brackets of all three kinds nest.
    pub fn skip_unknown_field(&mut self) {
        let mut depth: u32 = 0;
        loop {
            match &self.peek().kind {
                TokenKind::Eof => return,
                TokenKind::Semi if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::LBrace | TokenKind::LBracket | TokenKind::LParen => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::RBrace => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    self.advance();
                    // A close brace back at depth zero ends the field even
                    // without a trailing semicolon.
                    if depth == 0 {
                        self.eat(&TokenKind::Semi);
                        return;
                    }
                }
                TokenKind::RBracket | TokenKind::RParen => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }
    }
}
