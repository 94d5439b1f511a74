//! The diagnostic taxonomy.
//!
//! Every error carries a source position and a stable kind code. The
//! SGo-specific kinds come first; the base-checker kinds the new rules
//! compose with follow. `AliasDisablesNarrowing` is advisory: the checker
//! still reports the underlying `OptionalUse` when it happens.

use miette::{Diagnostic, SourceSpan};
use sgo_parser::Span;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug, Clone)]
pub enum TypeError {
    #[error("cannot make {typ} optional")]
    #[diagnostic(
        code(sgo::typecheck::not_optionable),
        help("only pointer, map, interface, channel and function types admit '?'")
    )]
    NotOptionable {
        typ: String,
        #[label("'?' applied here")]
        span: SourceSpan,
    },

    #[error("cannot {op} {name} of optional type {typ}")]
    #[diagnostic(
        code(sgo::typecheck::optional_use),
        help("prove {name} != nil first; only == and != against nil apply to an optional")
    )]
    OptionalUse {
        op: String,
        name: String,
        typ: String,
        #[label("optional used here")]
        span: SourceSpan,
    },

    #[error("{name} may be used before it has a value")]
    #[diagnostic(
        code(sgo::typecheck::used_uninitialized),
        help("{name}'s type has no zero value; assign to it, or prove its entangled tail first")
    )]
    UsedUninitialized {
        name: String,
        #[label("read here")]
        span: SourceSpan,
    },

    #[error("missing initialization for {field} of {typ}")]
    #[diagnostic(
        code(sgo::typecheck::missing_init),
        help("fields and elements of unwrapped pointer, map, interface, channel or function type must be given a value")
    )]
    MissingInit {
        typ: String,
        field: String,
        #[label("literal here")]
        span: SourceSpan,
    },

    #[error("wrong number of values on one side of \\ (want {want}, got {got})")]
    #[diagnostic(code(sgo::typecheck::entangle_arity))]
    EntangleArity {
        want: usize,
        got: usize,
        #[label("in this entangled form")]
        span: SourceSpan,
    },

    #[error("{message}")]
    #[diagnostic(
        code(sgo::typecheck::entangle_misuse),
        help("an entangled tail is produced by completing exactly one side of '\\'")
    )]
    EntangleMisuse {
        message: String,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("narrowing of {name} is disabled because its address was taken")]
    #[diagnostic(
        severity(warning),
        code(sgo::typecheck::alias_disables_narrowing),
        help("a variable whose address escapes cannot be narrowed by nil checks")
    )]
    AliasDisablesNarrowing {
        name: String,
        #[label("used here")]
        span: SourceSpan,
    },

    #[error("cannot assert to {typ}: {path} cannot be checked at runtime")]
    #[diagnostic(
        code(sgo::typecheck::assertion_uncheckable_path),
        help("wrap the position in '?' or assert to a type whose optionable positions are all runtime-checkable")
    )]
    AssertionHasUncheckablePath {
        typ: String,
        path: String,
        #[label("assertion here")]
        span: SourceSpan,
    },

    #[error("malformed SGo annotation: {message}")]
    #[diagnostic(code(sgo::typecheck::import_annotation_parse))]
    ImportAnnotationParse {
        message: String,
        #[label("while importing here")]
        span: SourceSpan,
    },

    // Base-checker kinds

    #[error("undeclared name: {name}")]
    #[diagnostic(code(sgo::typecheck::undeclared))]
    Undeclared {
        name: String,
        #[label("not found in this scope")]
        span: SourceSpan,
    },

    #[error("{name} redeclared in this block")]
    #[diagnostic(code(sgo::typecheck::redeclared))]
    Redeclared {
        name: String,
        #[label("redeclaration")]
        span: SourceSpan,
    },

    #[error("cannot use {found} as {want}")]
    #[diagnostic(code(sgo::typecheck::mismatch))]
    Mismatch {
        want: String,
        found: String,
        #[label("this expression")]
        span: SourceSpan,
    },

    #[error("invalid operation: {message}")]
    #[diagnostic(code(sgo::typecheck::invalid_op))]
    InvalidOp {
        message: String,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("assignment count mismatch ({lhs} vs {rhs})")]
    #[diagnostic(code(sgo::typecheck::assign_count))]
    AssignCount {
        lhs: usize,
        rhs: usize,
        #[label("in this assignment")]
        span: SourceSpan,
    },

    #[error("wrong number of return values (want {want}, got {got})")]
    #[diagnostic(code(sgo::typecheck::return_count))]
    ReturnCount {
        want: usize,
        got: usize,
        #[label("this return")]
        span: SourceSpan,
    },

    #[error("wrong number of arguments (want {want}, got {got})")]
    #[diagnostic(code(sgo::typecheck::argument_count))]
    ArgumentCount {
        want: usize,
        got: usize,
        #[label("this call")]
        span: SourceSpan,
    },

    #[error("use of untyped nil")]
    #[diagnostic(
        code(sgo::typecheck::untyped_nil),
        help("nil needs an optional type to take its value from")
    )]
    UntypedNil {
        #[label("nil here")]
        span: SourceSpan,
    },

    #[error("initialization cycle")]
    #[diagnostic(code(sgo::typecheck::init_cycle))]
    InitializationCycle {
        names: String,
        #[label("cycle through {names}")]
        span: SourceSpan,
    },

    #[error("could not import {path}: {message}")]
    #[diagnostic(code(sgo::typecheck::import_failed))]
    ImportFailed {
        path: String,
        message: String,
        #[label("imported here")]
        span: SourceSpan,
    },

    #[error("internal consistency failure: {message}")]
    #[diagnostic(code(sgo::typecheck::internal))]
    Internal {
        message: String,
        #[label("while processing this")]
        span: SourceSpan,
    },
}

impl TypeError {
    pub fn span(&self) -> SourceSpan {
        use TypeError::*;
        match self {
            NotOptionable { span, .. }
            | OptionalUse { span, .. }
            | UsedUninitialized { span, .. }
            | MissingInit { span, .. }
            | EntangleArity { span, .. }
            | EntangleMisuse { span, .. }
            | AliasDisablesNarrowing { span, .. }
            | AssertionHasUncheckablePath { span, .. }
            | ImportAnnotationParse { span, .. }
            | Undeclared { span, .. }
            | Redeclared { span, .. }
            | Mismatch { span, .. }
            | InvalidOp { span, .. }
            | AssignCount { span, .. }
            | ReturnCount { span, .. }
            | ArgumentCount { span, .. }
            | UntypedNil { span, .. }
            | InitializationCycle { span, .. }
            | ImportFailed { span, .. }
            | Internal { span, .. } => *span,
        }
    }

    /// Advisory diagnostics do not fail the check on their own.
    pub fn is_advisory(&self) -> bool {
        matches!(self, TypeError::AliasDisablesNarrowing { .. })
    }
}

pub fn to_source_span(span: Span) -> SourceSpan {
    SourceSpan::new(span.start.into(), span.end.saturating_sub(span.start))
}

/// All diagnostics of one translation unit, with source context for
/// rendering. Errors are kept in source order and are stable under
/// re-runs.
#[derive(Error, Diagnostic, Debug)]
#[error("type checking failed with {} error(s)", self.error_count())]
pub struct TypeErrorReport {
    #[source_code]
    pub src: miette::NamedSource<String>,
    #[related]
    pub errors: Vec<TypeError>,
}

impl TypeErrorReport {
    pub fn new(mut errors: Vec<TypeError>, src: String, filename: String) -> Self {
        errors.sort_by_key(|e| e.span().offset());
        Self {
            src: miette::NamedSource::new(filename, src),
            errors,
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors.iter().filter(|e| !e.is_advisory()).count()
    }

    pub fn type_errors(&self) -> &[TypeError] {
        &self.errors
    }

    pub fn has_kind(&self, code_suffix: &str) -> bool {
        self.errors.iter().any(|e| {
            e.code()
                .map(|c| c.to_string().ends_with(code_suffix))
                .unwrap_or(false)
        })
    }
}

/// Result type for checking operations.
pub type TypeResult<T> = Result<T, TypeErrorReport>;
