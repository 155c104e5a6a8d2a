//! Isolated module loading: the loader, the core-owned module registry,
//! the scoped search path, deferred failure accumulation, and the
//! submission layout.

pub mod failures;
#[allow(clippy::module_inception)]
pub mod loader;
pub mod path_scope;
pub mod registry;
pub mod submission;

pub use failures::{FailureLog, LoadFailure};
pub use loader::{load_from_file, Module, ModuleHandle};
pub use path_scope::PathScope;
pub use registry::ModuleRegistry;
pub use submission::{
    module_to_path, path_to_module, resolve_submission_root, submitted_sources, SOURCE_EXTENSION,
    SUBMISSION_PATH_VAR,
};
