//! Hard-error cases and diagnostic positions.

use folio_parser::{parse_source, SourceError};

fn parse_err(src: &str) -> folio_parser::ParseError {
    match parse_source(src) {
        Err(SourceError::Parse(e)) => e,
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn unknown_top_level_block_is_fatal() {
    let err = parse_err(
        r#"
        document {
          meta { version = "1"; }
          wormhole { depth = 3; }
        }
        "#,
    );
    assert!(err.message.contains("unknown top-level block 'wormhole'"));
    assert_eq!(err.line, 4);
}

#[test]
fn event_rule_requires_event_name() {
    let err = parse_err(
        r#"
        document {
          meta { version = "1"; }
          rule r(mode=event) {
            when true then { x = 1; }
          }
        }
        "#,
    );
    assert!(err.message.contains("mode=event"));
    assert!(err.message.contains("'r'"));
}

#[test]
fn unknown_duration_unit_is_fatal() {
    let err = parse_err(
        r#"
        document {
          meta { version = "1"; }
          body { text t { refresh = every(3 moons); } }
        }
        "#,
    );
    assert!(err.message.contains("unknown duration unit 'moons'"));
}

#[test]
fn param_requires_type_and_initial() {
    let err = parse_err(
        r#"
        document {
          meta { version = "1"; }
          state { param p { initial = 1; } }
        }
        "#,
    );
    assert!(err.message.contains("missing 'type'"));

    let err = parse_err(
        r#"
        document {
          meta { version = "1"; }
          state { param p { type = int; } }
        }
        "#,
    );
    assert!(err.message.contains("missing 'initial'"));
}

#[test]
fn unknown_param_type_is_fatal() {
    let err = parse_err(
        r#"
        document {
          meta { version = "1"; }
          state { param p { type = quantum; initial = 1; } }
        }
        "#,
    );
    assert!(err.message.contains("unknown parameter type 'quantum'"));
}

#[test]
fn grid_counts_must_fit_32_bits() {
    let err = parse_err(
        r#"
        document {
          meta { version = "1"; }
          grid g { rows = 4294967296; cols = 2; }
        }
        "#,
    );
    assert!(err.message.contains("out of range"));
}

#[test]
fn missing_semicolon_reports_the_offending_token() {
    let err = parse_err(
        r#"
        document {
          meta { version = "1" }
        }
        "#,
    );
    assert!(err.message.contains("expected ';'"));
    assert_eq!(err.near, "'}'");
}

#[test]
fn unknown_fit_mode_is_fatal() {
    let err = parse_err(
        r#"
        document {
          meta { version = "1"; }
          body { slot s { fit = origami; } }
        }
        "#,
    );
    assert!(err.message.contains("unknown fit mode 'origami'"));
}

#[test]
fn lex_errors_surface_with_positions() {
    let err = parse_source("document { meta { version = \"1\"; } x = a & b; }").unwrap_err();
    match err {
        SourceError::Lex(e) => assert!(e.message.contains("unpaired '&'")),
        other => panic!("expected a lex error, got {other:?}"),
    }
}

#[test]
fn error_display_format() {
    let err = parse_err("page { }");
    assert!(err.to_string().starts_with("1:1:"));
    assert!(err.to_string().contains("expected 'document'"));
}

#[test]
fn missing_document_keyword() {
    let err = parse_err("meta { }");
    assert!(err.message.contains("expected 'document'"));
}

#[test]
fn pageconfig_requires_dimensions() {
    let err = parse_err(
        r#"
        document {
          meta { version = "1"; }
          pageConfig { units = pt; }
        }
        "#,
    );
    assert!(err.message.contains("missing 'width'"));
}
