pub use crate::errors::{
    ErrorCategory, ErrorKind, ErrorReporting, GraderError, ReportingContext, SourceContext,
};
pub use crate::session::GradingSession;

pub mod errors;
pub mod grading;
pub mod loader;
pub mod prelude;
pub mod report;
pub mod runtime;
pub mod session;
pub mod syntax;
