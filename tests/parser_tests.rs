//! Parsing of grading-language source.

use gradus::syntax::parser::parse;
use gradus::syntax::Expr;
use gradus::{ErrorCategory, SourceContext};
use pretty_assertions::assert_eq;

fn source(text: &str) -> SourceContext {
    SourceContext::from_file("test.gr", text)
}

#[test]
fn parses_literals() {
    let text = "42 -3.5 true false \"hi\" name";
    let nodes = parse(text, source(text)).expect("parses");
    assert_eq!(nodes.len(), 6);

    assert_eq!(*nodes[0].value, Expr::Number(42.0));
    assert_eq!(*nodes[1].value, Expr::Number(-3.5));
    assert_eq!(*nodes[2].value, Expr::Bool(true));
    assert_eq!(*nodes[3].value, Expr::Bool(false));
    assert_eq!(*nodes[4].value, Expr::Str("hi".into()));
    assert_eq!(*nodes[5].value, Expr::Symbol("name".into()));
}

#[test]
fn parses_nested_lists_with_spans() {
    let text = "(+ 1 (* 2 3))";
    let nodes = parse(text, source(text)).expect("parses");
    assert_eq!(nodes.len(), 1);

    let items = nodes[0].as_list().expect("outer list");
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_symbol(), Some("+"));
    let inner = items[2].as_list().expect("inner list");
    assert_eq!(inner[0].as_symbol(), Some("*"));

    assert_eq!(nodes[0].span.start, 0);
    assert_eq!(nodes[0].span.end, text.len());
}

#[test]
fn skips_comments_and_blank_lines() {
    let text = "; a header comment\n(list 1 2) ; trailing\n\n; done\n";
    let nodes = parse(text, source(text)).expect("parses");
    assert_eq!(nodes.len(), 1);
}

#[test]
fn unescapes_string_literals() {
    let text = r#""line one\nline two\t\"quoted\"""#;
    let nodes = parse(text, source(text)).expect("parses");
    assert_eq!(
        *nodes[0].value,
        Expr::Str("line one\nline two\t\"quoted\"".into())
    );
}

#[test]
fn boolean_prefix_is_still_a_symbol() {
    let text = "truthy";
    let nodes = parse(text, source(text)).expect("parses");
    assert_eq!(*nodes[0].value, Expr::Symbol("truthy".into()));
}

#[test]
fn empty_source_parses_to_nothing() {
    let nodes = parse("   \n ; only a comment\n", source("")).expect("parses");
    assert!(nodes.is_empty());
}

#[test]
fn unclosed_list_is_a_parse_error() {
    let text = "(define (broken";
    let error = parse(text, source(text)).expect_err("must not parse");
    assert_eq!(error.kind.category(), ErrorCategory::Parse);
}

#[test]
fn stray_closing_paren_is_a_parse_error() {
    let text = "(+ 1 2))";
    let error = parse(text, source(text)).expect_err("must not parse");
    assert_eq!(error.kind.category(), ErrorCategory::Parse);
}
