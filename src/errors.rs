//! Unified error handling for the grading harness.
//!
//! Every failure mode in the crate is represented by a single [`GraderError`]
//! carrying a kind, source information for diagnostics, and an error code.
//! Contexts that can fail implement [`ErrorReporting`] so errors are always
//! minted with the right source attached.

use std::fmt;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use thiserror::Error;

use crate::syntax::Span;

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// Represents source context for error reporting with explicit hierarchy
/// between real sources (preferred) and fallbacks (tolerated when necessary)
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    /// Create a source context from real file content
    /// This is the preferred method for error reporting
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Create a fallback when real source is unavailable
    /// Use only when real source cannot be obtained
    pub fn fallback(context: &str) -> Self {
        Self {
            name: "fallback".to_string(),
            content: format!("; {}", context),
        }
    }

    /// Convert to NamedSource for use with miette error reporting
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        Self::fallback("default context")
    }
}

/// The single error type - no wrapper, no variants, just essential data
#[derive(Debug, Clone)]
pub struct GraderError {
    /// What went wrong (type-specific data)
    pub kind: ErrorKind,
    /// Where it happened (context-specific source information)
    pub source_info: SourceInfo,
    /// How to help (auto-populated based on context)
    pub diagnostic_info: DiagnosticInfo,
}

/// All error types as a clean enum - no duplicate fields
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    // Parse errors - structural and syntactic issues in grading-language source
    #[error("parse error: expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("parse error: invalid {literal_type} '{value}'")]
    InvalidLiteral { literal_type: String, value: String },
    #[error("parse error: malformed {construct}")]
    MalformedConstruct { construct: String },

    // Runtime errors - evaluation failures inside loaded modules
    #[error("runtime error: undefined symbol '{symbol}'")]
    UndefinedSymbol { symbol: String },
    #[error("type error: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("runtime error: incorrect arity, expected {expected}, got {actual}")]
    ArityMismatch { expected: String, actual: usize },
    #[error("runtime error: division by zero")]
    DivisionByZero,
    #[error("runtime error: recursion limit exceeded")]
    RecursionLimit,
    #[error("error raised: {message}")]
    Raised { message: String },

    // Load errors - candidate/reference module resolution
    #[error("cannot resolve a loadable module from `{path}`")]
    SpecResolution { path: String },
    #[error("could not load module `{module}`")]
    ModuleNotFound { module: String },

    // Configuration errors - grading declarations, always programmer errors
    #[error("cannot resolve grading attribute `{attribute}`; consulted {consulted}")]
    ConfigurationMissing { attribute: String, consulted: String },
    #[error("duplicate declaration of {role}")]
    DuplicateDeclaration { role: String },

    // Grading outcomes
    #[error("assertion failed: {message}")]
    AssertionFailure { message: String },

    // External report consumption
    #[error("malformed report: {detail}")]
    MalformedReport { detail: String },
    #[error("failed to invoke external suite: {detail}")]
    SuiteInvocation { detail: String },
}

/// Context-specific source information
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub primary_span: SourceSpan,
    pub phase: String,
}

/// Diagnostic enhancement data
#[derive(Debug, Clone)]
pub struct DiagnosticInfo {
    pub help: Option<String>,
    pub error_code: String,
}

/// Context-aware error creation - each context knows how to create appropriate errors
pub trait ErrorReporting {
    /// Create an error with context-appropriate enhancements
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> GraderError;

    /// Convenience methods for common error types
    fn undefined_symbol(&self, symbol: &str, span: SourceSpan) -> GraderError {
        self.report(
            ErrorKind::UndefinedSymbol {
                symbol: symbol.into(),
            },
            span,
        )
    }

    fn type_mismatch(&self, expected: &str, actual: &str, span: SourceSpan) -> GraderError {
        self.report(
            ErrorKind::TypeMismatch {
                expected: expected.into(),
                actual: actual.into(),
            },
            span,
        )
    }

    fn arity_mismatch(&self, expected: &str, actual: usize, span: SourceSpan) -> GraderError {
        self.report(
            ErrorKind::ArityMismatch {
                expected: expected.into(),
                actual,
            },
            span,
        )
    }

    fn assertion_failure(&self, message: impl Into<String>) -> GraderError {
        self.report(
            ErrorKind::AssertionFailure {
                message: message.into(),
            },
            unspanned(),
        )
    }

    fn malformed_construct(&self, construct: &str, span: SourceSpan) -> GraderError {
        self.report(
            ErrorKind::MalformedConstruct {
                construct: construct.into(),
            },
            span,
        )
    }
}

impl ErrorKind {
    /// Get the error category for test assertions
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnexpectedToken { .. }
            | Self::InvalidLiteral { .. }
            | Self::MalformedConstruct { .. } => ErrorCategory::Parse,

            Self::UndefinedSymbol { .. }
            | Self::TypeMismatch { .. }
            | Self::ArityMismatch { .. }
            | Self::DivisionByZero
            | Self::RecursionLimit
            | Self::Raised { .. } => ErrorCategory::Runtime,

            Self::SpecResolution { .. } | Self::ModuleNotFound { .. } => ErrorCategory::Load,

            Self::ConfigurationMissing { .. } | Self::DuplicateDeclaration { .. } => {
                ErrorCategory::Config
            }

            Self::AssertionFailure { .. } => ErrorCategory::Grading,

            Self::MalformedReport { .. } | Self::SuiteInvocation { .. } => ErrorCategory::Report,
        }
    }

    /// Get error code suffix for diagnostic codes
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::UnexpectedToken { .. } => "unexpected_token",
            Self::InvalidLiteral { .. } => "invalid_literal",
            Self::MalformedConstruct { .. } => "malformed_construct",
            Self::UndefinedSymbol { .. } => "undefined_symbol",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::ArityMismatch { .. } => "arity_mismatch",
            Self::DivisionByZero => "division_by_zero",
            Self::RecursionLimit => "recursion_limit",
            Self::Raised { .. } => "raised",
            Self::SpecResolution { .. } => "spec_resolution",
            Self::ModuleNotFound { .. } => "module_not_found",
            Self::ConfigurationMissing { .. } => "configuration_missing",
            Self::DuplicateDeclaration { .. } => "duplicate_declaration",
            Self::AssertionFailure { .. } => "assertion_failure",
            Self::MalformedReport { .. } => "malformed_report",
            Self::SuiteInvocation { .. } => "suite_invocation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Parse,
    Runtime,
    Load,
    Config,
    Grading,
    Report,
}

impl std::error::Error for GraderError {}

impl fmt::Display for GraderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl Diagnostic for GraderError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.diagnostic_info.error_code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic_info
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = vec![LabeledSpan::new_with_span(
            Some(self.primary_label()),
            self.source_info.primary_span,
        )];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.source_info.source)
    }
}

impl GraderError {
    fn primary_label(&self) -> String {
        match &self.kind {
            ErrorKind::UnexpectedToken { .. } => "unexpected token".into(),
            ErrorKind::InvalidLiteral { .. } => "invalid literal".into(),
            ErrorKind::MalformedConstruct { .. } => "malformed syntax".into(),
            ErrorKind::UndefinedSymbol { .. } => "undefined symbol".into(),
            ErrorKind::TypeMismatch { .. } => "type mismatch".into(),
            ErrorKind::ArityMismatch { .. } => "arity mismatch".into(),
            ErrorKind::DivisionByZero => "division by zero".into(),
            ErrorKind::RecursionLimit => "recursion limit exceeded".into(),
            ErrorKind::Raised { .. } => "raised here".into(),
            ErrorKind::SpecResolution { .. } => "unresolvable module".into(),
            ErrorKind::ModuleNotFound { .. } => "module not found".into(),
            ErrorKind::ConfigurationMissing { .. } => "missing configuration".into(),
            ErrorKind::DuplicateDeclaration { .. } => "duplicate declaration".into(),
            ErrorKind::AssertionFailure { .. } => "assertion failed here".into(),
            ErrorKind::MalformedReport { .. } => "malformed report".into(),
            ErrorKind::SuiteInvocation { .. } => "suite invocation failed".into(),
        }
    }

    /// True if this error reports that a requested logical module was absent,
    /// as opposed to present-but-broken.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::ModuleNotFound { .. })
    }

    /// Attach a help message, returning the modified error.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.diagnostic_info.help = Some(help.into());
        self
    }
}

/// Creates a placeholder span for errors not tied to a specific source code
/// location, such as I/O errors or harness-state failures.
pub fn unspanned() -> SourceSpan {
    SourceSpan::from(0..0)
}

/// Converts a grading-language AST span to a miette SourceSpan.
pub fn to_source_span(span: Span) -> SourceSpan {
    SourceSpan::from(span.start..span.end)
}

/// General-purpose error creation context used where no richer context
/// (evaluation state, module source) is available.
pub struct ReportingContext {
    pub source: SourceContext,
    pub phase: String,
}

impl ReportingContext {
    pub fn new(source: SourceContext, phase: impl Into<String>) -> Self {
        Self {
            source,
            phase: phase.into(),
        }
    }

    /// A context for harness-internal failures with no real source text.
    pub fn internal(phase: impl Into<String>) -> Self {
        let phase = phase.into();
        Self {
            source: SourceContext::fallback(&phase),
            phase,
        }
    }
}

impl ErrorReporting for ReportingContext {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> GraderError {
        let error_code = format!("gradus::{}::{}", self.phase, kind.code_suffix());

        GraderError {
            kind,
            source_info: SourceInfo {
                source: self.source.to_named_source(),
                primary_span: span,
                phase: self.phase.clone(),
            },
            diagnostic_info: DiagnosticInfo {
                help: None,
                error_code,
            },
        }
    }
}

/// Prints a GraderError with full miette diagnostics
///
/// This provides rich error formatting with source spans, suggestions, and
/// context. Use this for user-facing error display.
pub fn print_error(error: GraderError) {
    use miette::Report;
    let report = Report::new(error);
    eprintln!("{report:?}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_cover_every_kind() {
        let kind = ErrorKind::ModuleNotFound {
            module: "fib".into(),
        };
        assert_eq!(kind.category(), ErrorCategory::Load);
        assert_eq!(kind.code_suffix(), "module_not_found");

        let kind = ErrorKind::ConfigurationMissing {
            attribute: "reference".into(),
            consulted: "local override".into(),
        };
        assert_eq!(kind.category(), ErrorCategory::Config);
    }

    #[test]
    fn reporting_context_stamps_error_code() {
        let ctx = ReportingContext::internal("load");
        let err = ctx.report(
            ErrorKind::SpecResolution {
                path: "nowhere.gr".into(),
            },
            unspanned(),
        );
        assert_eq!(err.diagnostic_info.error_code, "gradus::load::spec_resolution");
        assert!(err.to_string().contains("nowhere.gr"));
    }
}
