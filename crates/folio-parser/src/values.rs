//! Literal values and durations.
//!
//! Literal values appear on the right-hand side of `name = value;` fields:
//! numbers (optionally negated), strings, booleans, bare identifiers
//! (kept as strings) and bracketed lists thereof. No call or operator
//! forms; those belong to the expression grammar behind `@`.

use crate::error::ParseError;
use crate::stream::TokenStream;
use folio_ast::{Duration, TimeUnit, Value};
use folio_lexer::TokenKind;

pub fn parse_literal_value(ts: &mut TokenStream) -> Result<Value, ParseError> {
    let token = ts.peek();
    match &token.kind {
        TokenKind::Int(v) => {
            let v = *v;
            ts.advance();
            Ok(Value::Int(v))
        }
        TokenKind::Float(v) => {
            let v = *v;
            ts.advance();
            Ok(Value::Float(v))
        }
        TokenKind::Minus => {
            ts.advance();
            let token = ts.peek();
            match &token.kind {
                TokenKind::Int(v) => {
                    let v = *v;
                    ts.advance();
                    Ok(Value::Int(-v))
                }
                TokenKind::Float(v) => {
                    let v = *v;
                    ts.advance();
                    Ok(Value::Float(-v))
                }
                TokenKind::Inf => {
                    ts.advance();
                    Ok(Value::Float(f64::NEG_INFINITY))
                }
                _ => Err(ParseError::expected(token, "a number after '-'")),
            }
        }
        TokenKind::Inf => {
            ts.advance();
            Ok(Value::Float(f64::INFINITY))
        }
        TokenKind::Str(s) => {
            let s = s.clone();
            ts.advance();
            Ok(Value::Str(s))
        }
        TokenKind::True => {
            ts.advance();
            Ok(Value::Bool(true))
        }
        TokenKind::False => {
            ts.advance();
            Ok(Value::Bool(false))
        }
        // Bare identifiers are enum-ish string values (`topology = rect;`).
        TokenKind::Ident(s) => {
            let s = s.clone();
            ts.advance();
            Ok(Value::Str(s))
        }
        TokenKind::LBracket => {
            ts.advance();
            let mut items = Vec::new();
            if !ts.check(&TokenKind::RBracket) {
                loop {
                    items.push(parse_literal_value(ts)?);
                    if !ts.eat(&TokenKind::Comma) {
                        break;
                    }
                    // Trailing comma.
                    if ts.check(&TokenKind::RBracket) {
                        break;
                    }
                }
            }
            ts.expect(&TokenKind::RBracket)?;
            Ok(Value::List(items))
        }
        _ => Err(ParseError::expected(token, "a literal value")),
    }
}

/// Numeric field value: int or float, with `inf` / `-inf` accepted when
/// `allow_inf` is set (parameter bounds).
pub fn parse_number(ts: &mut TokenStream, allow_inf: bool, what: &str) -> Result<f64, ParseError> {
    let token = ts.peek();
    match parse_literal_value(ts)? {
        Value::Int(v) => Ok(v as f64),
        Value::Float(v) if v.is_finite() || allow_inf => Ok(v),
        _ => Err(ParseError::expected(token, what)),
    }
}

/// A duration: `<number> <unit>`, e.g. `8 s` or `120 ms`.
pub fn parse_duration(ts: &mut TokenStream) -> Result<Duration, ParseError> {
    let amount = parse_number(ts, false, "a duration amount")?;
    let token = ts.peek();
    let (name, _) = ts.expect_ident("a duration unit")?;
    let unit = normalize_unit(&name)
        .ok_or_else(|| ParseError::at(token, format!("unknown duration unit '{name}'")))?;
    Ok(Duration { amount, unit })
}

/// Fold accepted unit spellings onto canonical tags.
pub fn normalize_unit(name: &str) -> Option<TimeUnit> {
    Some(match name {
        "ms" | "millisecond" | "milliseconds" => TimeUnit::Ms,
        "s" | "sec" | "secs" | "second" | "seconds" => TimeUnit::S,
        "m" | "min" | "mins" | "minute" | "minutes" => TimeUnit::M,
        "h" | "hr" | "hrs" | "hour" | "hours" => TimeUnit::H,
        "beat" | "beats" => TimeUnit::Beats,
        "bar" | "bars" | "measure" | "measures" => TimeUnit::Bars,
        "sub" | "subs" | "subdivision" | "subdivisions" => TimeUnit::Subs,
        "tick" | "ticks" => TimeUnit::Ticks,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_lexer::tokenize;

    fn value(src: &str) -> Value {
        let tokens = tokenize(src).unwrap();
        let mut ts = TokenStream::new(&tokens);
        parse_literal_value(&mut ts).unwrap()
    }

    #[test]
    fn scalars() {
        assert_eq!(value("42"), Value::Int(42));
        assert_eq!(value("-3"), Value::Int(-3));
        assert_eq!(value("2.5"), Value::Float(2.5));
        assert_eq!(value("true"), Value::Bool(true));
        assert_eq!(value("\"hi\""), Value::Str("hi".into()));
        assert_eq!(value("rect"), Value::Str("rect".into()));
        assert_eq!(value("inf"), Value::Float(f64::INFINITY));
        assert_eq!(value("-inf"), Value::Float(f64::NEG_INFINITY));
    }

    #[test]
    fn lists_nest_and_allow_trailing_comma() {
        assert_eq!(
            value("[1, [2, 3], \"x\",]"),
            Value::List(vec![
                Value::Int(1),
                Value::List(vec![Value::Int(2), Value::Int(3)]),
                Value::Str("x".into()),
            ])
        );
    }

    #[test]
    fn duration_spellings_normalize() {
        let tokens = tokenize("8 seconds").unwrap();
        let mut ts = TokenStream::new(&tokens);
        let d = parse_duration(&mut ts).unwrap();
        assert_eq!(d.amount, 8.0);
        assert_eq!(d.unit, TimeUnit::S);

        let tokens = tokenize("3 measures").unwrap();
        let mut ts = TokenStream::new(&tokens);
        assert_eq!(parse_duration(&mut ts).unwrap().unit, TimeUnit::Bars);
    }

    #[test]
    fn unknown_duration_unit_is_an_error() {
        let tokens = tokenize("8 fortnights").unwrap();
        let mut ts = TokenStream::new(&tokens);
        let err = parse_duration(&mut ts).unwrap_err();
        assert!(err.message.contains("unknown duration unit"));
    }
}
