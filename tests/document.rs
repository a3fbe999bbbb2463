#![allow(missing_docs)]

use facet_cfg::{CfgErrorKind, Value, parse_document};
use indoc::indoc;

fn parse(text: &str) -> Value {
    parse_document(text.as_bytes()).unwrap()
}

fn error_line(text: &str) -> usize {
    let err = parse_document(text.as_bytes()).unwrap_err();
    match err.kind() {
        CfgErrorKind::Document { line, .. } => *line,
        other => panic!("expected a document error, got {other}"),
    }
}

#[test]
fn document_nested() {
    let value = parse(indoc! {r#"
        # leading comment
        name: plain value # trailing comment
        "quoted key": 'it''s'
        list:
          - one
          -
            inner: "a # b"
        empty:
        gone: ~
    "#});

    assert_eq!(
        value.to_string(),
        "{empty: null, gone: null, list: [one, {inner: a # b}], name: plain value, quoted key: it's}"
    );
    assert_eq!(value.get("name").and_then(Value::as_str), Some("plain value"));
    assert_eq!(value.get("list").and_then(Value::as_sequence).map(<[_]>::len), Some(2));
}

#[test]
fn document_escapes() {
    let value = parse(r#""k": "tab\there \"q\" \\ \/""#);

    assert_eq!(value.get("k").and_then(Value::as_str), Some("tab\there \"q\" \\ /"));
}

/// Booleans and numbers stay text until they meet a typed field.
#[test]
fn document_typed_scalars_keep_their_text() {
    let value = parse(indoc! {r#"
        port: 8080
        ratio: 0.25
        negative: -3
        verbose: true
        1: numeric key
    "#});

    assert_eq!(
        value.to_string(),
        "{1: numeric key, negative: -3, port: 8080, ratio: 0.25, verbose: true}"
    );
    assert_eq!(value.get("port").and_then(Value::as_str), Some("8080"));
}

#[test]
fn document_empty_is_null() {
    assert!(parse("").is_null());
    assert!(parse("# only a comment\n\n").is_null());
    assert!(parse("~\n").is_null());
}

#[test]
fn document_errors_report_lines() {
    assert!(error_line("a: 1\n- 2\n") >= 2);
    assert!(error_line("a: 1\nb: \"open\n") >= 2);
    assert!(error_line("a:\n\tb: 2\n") >= 2);
}

#[test]
fn document_non_scalar_key_fails() {
    let err = parse_document("? [a, b]\n: c\n".as_bytes()).unwrap_err();

    assert!(matches!(err.kind(), CfgErrorKind::Document { .. }));
}
