//! Common imports shared across the crate and its tests.

pub use std::rc::Rc;

pub use crate::errors::{
    to_source_span, unspanned, ErrorCategory, ErrorKind, ErrorReporting, GraderError,
    SourceContext,
};
pub use crate::grading::{
    CaseConfig, CaseOutcome, ConfigKey, ConfigLayer, ConfigValue, Differential, GradingContext,
};
pub use crate::loader::{LoadFailure, Module, ModuleHandle};
pub use crate::runtime::{SharedOutput, Value};
pub use crate::session::GradingSession;
pub use crate::syntax::{AstNode, Expr, Span};
