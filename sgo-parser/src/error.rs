// SGo parse error handling with miette integration.

use crate::ast::Span;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ParseError {
    #[error("invalid token")]
    #[diagnostic(
        code(sgo::parse::invalid_token),
        help("{message}")
    )]
    InvalidToken {
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
        message: String,
    },

    #[error("unexpected token")]
    #[diagnostic(
        code(sgo::parse::unexpected_token),
        help("expected {expected}")
    )]
    UnexpectedToken {
        #[source_code]
        src: String,
        #[label("found {found}")]
        span: SourceSpan,
        expected: String,
        found: String,
    },

    #[error("expression expected")]
    #[diagnostic(
        code(sgo::parse::expected_expression),
        help("this position requires an expression or type")
    )]
    ExpectedExpression {
        #[source_code]
        src: String,
        #[label("found {found}")]
        span: SourceSpan,
        found: String,
    },

    #[error("misplaced entangle separator")]
    #[diagnostic(
        code(sgo::parse::misplaced_entangle),
        help("'\\' separates the values of a list from a single trailing declaration")
    )]
    MisplacedEntangle {
        #[source_code]
        src: String,
        #[label("second '\\' in the same list")]
        span: SourceSpan,
    },
}

impl ParseError {
    pub fn invalid_token(src: String, span: Span, message: String) -> Self {
        ParseError::InvalidToken {
            src,
            span: to_source_span(span),
            message,
        }
    }

    pub fn unexpected_token(src: String, span: Span, expected: String, found: String) -> Self {
        ParseError::UnexpectedToken {
            src,
            span: to_source_span(span),
            expected,
            found,
        }
    }

    pub fn expected_expression(src: String, span: Span, found: String) -> Self {
        ParseError::ExpectedExpression {
            src,
            span: to_source_span(span),
            found,
        }
    }

    pub fn misplaced_entangle(src: String, span: Span) -> Self {
        ParseError::MisplacedEntangle {
            src,
            span: to_source_span(span),
        }
    }
}

pub fn to_source_span(span: Span) -> SourceSpan {
    SourceSpan::new(span.start.into(), span.end.saturating_sub(span.start))
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;
