//! Lexer for Folio document sources.
//!
//! Uses logos for tokenization, then pairs every token with the 1-based
//! line/column of its first character (diagnostic formatting everywhere
//! else depends on those positions). `tokenize` is total over any input:
//! it either returns a token stream ending in [`TokenKind::Eof`] or fails
//! with a [`LexError`].

use logos::Logos;

/// Raw token classes.
///
/// Multi-character operators win by maximal munch, so `&` / `|` outside a
/// pair have no token and surface as lex errors.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum TokenKind {
    // === Keywords ===
    #[token("true")]
    True,
    #[token("false")]
    False,
    /// Open-range sentinel for parameter bounds; `f64::INFINITY` in
    /// expression position.
    #[token("inf")]
    Inf,
    #[token("not")]
    Not,
    #[token("when")]
    When,
    #[token("then")]
    Then,
    #[token("else")]
    Else,
    #[token("let")]
    Let,

    // === Literals ===
    /// Integer literal. A trailing `.` only counts as a float when a digit
    /// follows it, so `3.foo` lexes as `3` `.` `foo`.
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok(), priority = 2)]
    Int(i64),

    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok(), priority = 3)]
    Float(f64),

    /// String literal with `\"` and `\\` escapes only (no Unicode escapes);
    /// embedded newlines are tolerated.
    #[regex(r#""([^"\\]|\\["\\])*""#, |lex| unescape(lex.slice()))]
    Str(String),

    // === Identifiers ===
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // === Operators ===
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("===")]
    EqEqEq,
    #[token("!==")]
    BangEqEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Eq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("@")]
    At,

    // === Punctuation ===
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    /// A `/*` comment that never closes. Matched so `tokenize` can report
    /// it cleanly instead of lexing the body as stray tokens; a closed
    /// comment always out-matches this and hits the skip rule.
    #[regex(r"/\*([^*]|\*+[^*/])*\**")]
    UnterminatedComment,

    /// End-of-input marker; always the last token of a successful lex.
    Eof,
}

impl TokenKind {
    /// Lexeme-ish rendering for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::True => "'true'".into(),
            TokenKind::False => "'false'".into(),
            TokenKind::Inf => "'inf'".into(),
            TokenKind::Not => "'not'".into(),
            TokenKind::When => "'when'".into(),
            TokenKind::Then => "'then'".into(),
            TokenKind::Else => "'else'".into(),
            TokenKind::Let => "'let'".into(),
            TokenKind::Int(v) => format!("'{v}'"),
            TokenKind::Float(v) => format!("'{v}'"),
            TokenKind::Str(s) => format!("string \"{s}\""),
            TokenKind::Ident(s) => format!("'{s}'"),
            TokenKind::AmpAmp => "'&&'".into(),
            TokenKind::PipePipe => "'||'".into(),
            TokenKind::EqEqEq => "'==='".into(),
            TokenKind::BangEqEq => "'!=='".into(),
            TokenKind::EqEq => "'=='".into(),
            TokenKind::BangEq => "'!='".into(),
            TokenKind::Le => "'<='".into(),
            TokenKind::Ge => "'>='".into(),
            TokenKind::Lt => "'<'".into(),
            TokenKind::Gt => "'>'".into(),
            TokenKind::Eq => "'='".into(),
            TokenKind::Plus => "'+'".into(),
            TokenKind::Minus => "'-'".into(),
            TokenKind::Star => "'*'".into(),
            TokenKind::Slash => "'/'".into(),
            TokenKind::Percent => "'%'".into(),
            TokenKind::At => "'@'".into(),
            TokenKind::Semi => "';'".into(),
            TokenKind::Comma => "','".into(),
            TokenKind::Dot => "'.'".into(),
            TokenKind::LParen => "'('".into(),
            TokenKind::RParen => "')'".into(),
            TokenKind::LBrace => "'{'".into(),
            TokenKind::RBrace => "'}'".into(),
            TokenKind::LBracket => "'['".into(),
            TokenKind::RBracket => "']'".into(),
            TokenKind::UnterminatedComment => "unterminated comment".into(),
            TokenKind::Eof => "end of input".into(),
        }
    }
}

/// A token with the 1-based position of its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
}

/// Error during lexing.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for LexError {}

/// Tokenize a source string. Total over any input.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let line_map = LineMap::new(source);
    let mut lexer = TokenKind::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let (line, column) = line_map.position(lexer.span().start);
        match result {
            Ok(TokenKind::UnterminatedComment) => {
                return Err(LexError {
                    line,
                    column,
                    message: "unterminated '/*' comment".to_string(),
                });
            }
            Ok(kind) => tokens.push(Token { kind, line, column }),
            Err(()) => {
                let slice = lexer.slice();
                let message = match slice {
                    "&" => "unpaired '&' (did you mean '&&'?)".to_string(),
                    "|" => "unpaired '|' (did you mean '||'?)".to_string(),
                    "" => "unexpected end of input".to_string(),
                    other => format!("unexpected character(s) '{other}'"),
                };
                return Err(LexError {
                    line,
                    column,
                    message,
                });
            }
        }
    }

    let (line, column) = line_map.position(source.len());
    tokens.push(Token {
        kind: TokenKind::Eof,
        line,
        column,
    });
    Ok(tokens)
}

/// Remove the surrounding quotes and decode `\"` / `\\` escapes.
fn unescape(slice: &str) -> String {
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            // The regex guarantees the next char is '"' or '\\'.
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Byte-offset to 1-based line/column conversion.
struct LineMap {
    /// Byte offset of the start of each line.
    line_starts: Vec<usize>,
    source_len: usize,
    text: Vec<u8>,
}

impl LineMap {
    fn new(source: &str) -> Self {
        let mut line_starts = vec![0usize];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            line_starts,
            source_len: source.len(),
            text: source.as_bytes().to_vec(),
        }
    }

    fn position(&self, offset: usize) -> (u32, u32) {
        let offset = offset.min(self.source_len);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line_start = self.line_starts[line_idx];
        // Column in characters, not bytes.
        let column = self.text[line_start..offset]
            .iter()
            .filter(|b| (**b & 0xC0) != 0x80)
            .count();
        (line_idx as u32 + 1, column as u32 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn ends_with_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(
            kinds("x"),
            vec![TokenKind::Ident("x".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn int_vs_float_classification() {
        assert_eq!(
            kinds("42 3.14"),
            vec![TokenKind::Int(42), TokenKind::Float(3.14), TokenKind::Eof]
        );
        // A dot not followed by a digit is member access, not a float.
        assert_eq!(
            kinds("3.foo"),
            vec![
                TokenKind::Int(3),
                TokenKind::Dot,
                TokenKind::Ident("foo".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn bool_and_inf_keywords() {
        assert_eq!(
            kinds("true false inf"),
            vec![
                TokenKind::True,
                TokenKind::False,
                TokenKind::Inf,
                TokenKind::Eof
            ]
        );
        // Prefix of a longer identifier stays an identifier.
        assert_eq!(
            kinds("infinity"),
            vec![TokenKind::Ident("infinity".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#""he \"said\" \\ ok""#),
            vec![TokenKind::Str(r#"he "said" \ ok"#.into()), TokenKind::Eof]
        );
    }

    #[test]
    fn string_embedded_newline() {
        assert_eq!(
            kinds("\"a\nb\""),
            vec![TokenKind::Str("a\nb".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn multi_char_operators_greedy() {
        assert_eq!(
            kinds("=== == = !== != <= >= && ||"),
            vec![
                TokenKind::EqEqEq,
                TokenKind::EqEq,
                TokenKind::Eq,
                TokenKind::BangEqEq,
                TokenKind::BangEq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unpaired_amp_is_an_error() {
        let err = tokenize("a & b").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 3);
        assert!(err.message.contains("unpaired '&'"));

        let err = tokenize("a | b").unwrap_err();
        assert!(err.message.contains("unpaired '|'"));
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("a // line\nb /* multi\nline */ c"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Ident("b".into()),
                TokenKind::Ident("c".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let err = tokenize("a /* never closed").unwrap_err();
        assert_eq!((err.line, err.column), (1, 3));
        assert!(err.message.contains("unterminated"));

        // Trailing stars do not count as a terminator.
        let err = tokenize("/* almost **").unwrap_err();
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn star_heavy_comments_still_close() {
        assert_eq!(kinds("/* a **/ x /***/ y"), vec![
            TokenKind::Ident("x".into()),
            TokenKind::Ident("y".into()),
            TokenKind::Eof
        ]);
    }

    #[test]
    fn positions_are_one_based() {
        let tokens = tokenize("ab cd\n  ef").unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (1, 4));
        assert_eq!((tokens[2].line, tokens[2].column), (2, 3));
    }

    #[test]
    fn position_after_multiline_string() {
        let tokens = tokenize("\"a\nb\" x").unwrap();
        let x = &tokens[1];
        assert_eq!((x.line, x.column), (2, 4));
    }
}
