//! Grading-Language Parser - Clean, Minimal Implementation
//!
//! Converts grading-language source code into AST nodes with source location
//! tracking. This parser is purely syntactic - no semantic analysis.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::errors::{to_source_span, ErrorKind, ErrorReporting, ReportingContext, SourceContext};
use crate::syntax::{AstNode, Expr, Span};
use crate::GraderError;

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct GradingParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parse grading-language source code into AST nodes
pub fn parse(source_text: &str, source_context: SourceContext) -> Result<Vec<AstNode>, GraderError> {
    if source_text.trim().is_empty() {
        return Ok(vec![]);
    }

    let pairs = GradingParser::parse(Rule::program, source_text)
        .map_err(|e| convert_parse_error(e, &source_context))?;

    let program = pairs.peek().expect("pest guarantees the program rule");

    program
        .into_inner()
        .filter(|p| p.as_rule() != Rule::EOI)
        .map(|p| build_ast_node(p, &source_context))
        .collect()
}

/// Wrap multiple AST nodes in a (do ...) form if needed
pub fn wrap_in_do(nodes: Vec<AstNode>) -> AstNode {
    match nodes.len() {
        0 => AstNode::new(Expr::List(vec![]), Span::default()),
        1 => nodes.into_iter().next().expect("length checked"),
        _ => {
            let span = enclosing_span(&nodes);
            let do_symbol = AstNode::new(Expr::Symbol("do".to_string()), span);
            let mut items = Vec::with_capacity(nodes.len() + 1);
            items.push(do_symbol);
            items.extend(nodes);
            AstNode::new(Expr::List(items), span)
        }
    }
}

// ============================================================================
// AST BUILDERS
// ============================================================================

fn build_ast_node(pair: Pair<Rule>, source: &SourceContext) -> Result<AstNode, GraderError> {
    let span = get_span(&pair);

    match pair.as_rule() {
        Rule::list => {
            let items = pair
                .into_inner()
                .map(|p| build_ast_node(p, source))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(AstNode::new(Expr::List(items), span))
        }
        Rule::number => {
            let text = pair.as_str();
            let value: f64 = text.parse().map_err(|_| {
                parse_context(source).report(
                    ErrorKind::InvalidLiteral {
                        literal_type: "number".to_string(),
                        value: text.to_string(),
                    },
                    to_source_span(span),
                )
            })?;
            Ok(AstNode::new(Expr::Number(value), span))
        }
        Rule::boolean => Ok(AstNode::new(Expr::Bool(pair.as_str() == "true"), span)),
        Rule::string => {
            let raw = pair.as_str();
            let inner = &raw[1..raw.len() - 1];
            Ok(AstNode::new(Expr::Str(unescape(inner)), span))
        }
        Rule::symbol => Ok(AstNode::new(Expr::Symbol(pair.as_str().to_string()), span)),
        other => Err(parse_context(source).malformed_construct(
            &format!("unexpected grammar rule {:?}", other),
            to_source_span(span),
        )),
    }
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

// ============================================================================
// SPANS AND ERRORS
// ============================================================================

fn get_span(pair: &Pair<Rule>) -> Span {
    let s = pair.as_span();
    Span {
        start: s.start(),
        end: s.end(),
    }
}

fn enclosing_span(nodes: &[AstNode]) -> Span {
    let start = nodes.first().map(|n| n.span.start).unwrap_or(0);
    let end = nodes.last().map(|n| n.span.end).unwrap_or(start);
    Span { start, end }
}

fn parse_context(source: &SourceContext) -> ReportingContext {
    ReportingContext::new(source.clone(), "parse")
}

fn convert_parse_error(error: pest::error::Error<Rule>, source: &SourceContext) -> GraderError {
    let span = match &error.location {
        pest::error::InputLocation::Pos(pos) => Span {
            start: *pos,
            end: *pos + 1,
        },
        pest::error::InputLocation::Span((start, end)) => Span {
            start: *start,
            end: *end,
        },
    };

    let (expected, found) = match &error.variant {
        pest::error::ErrorVariant::ParsingError {
            positives,
            negatives: _,
        } => {
            let expected = if positives.is_empty() {
                "expression".to_string()
            } else {
                positives
                    .iter()
                    .map(|r| format!("{:?}", r))
                    .collect::<Vec<_>>()
                    .join(" | ")
            };
            (expected, error.line().trim().to_string())
        }
        pest::error::ErrorVariant::CustomError { message } => {
            (message.clone(), error.line().trim().to_string())
        }
    };

    parse_context(source).report(
        ErrorKind::UnexpectedToken { expected, found },
        to_source_span(span),
    )
}
