//! Submission layout: where candidate source files live and how logical
//! module names map to paths.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use walkdir::WalkDir;

use crate::errors::{unspanned, ErrorKind, ErrorReporting, ReportingContext};
use crate::GraderError;

/// File extension of grading-language sources.
pub const SOURCE_EXTENSION: &str = "gr";

/// Environment variable consulted when no explicit submission root is set.
pub const SUBMISSION_PATH_VAR: &str = "SUBMISSION_PATH";

static DEFAULT_SUBMISSION_ROOT: Lazy<PathBuf> =
    Lazy::new(|| PathBuf::from("/autograder/submission"));

/// Returns the candidate submission root.
///
/// The root is searched for in the following way:
/// - Use the explicit override if one is set
/// - Use the `SUBMISSION_PATH` environment variable if it is set
/// - Otherwise, use the default submission root `/autograder/submission`
pub fn resolve_submission_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Some(path) = std::env::var_os(SUBMISSION_PATH_VAR) {
        return PathBuf::from(path);
    }

    DEFAULT_SUBMISSION_ROOT.clone()
}

/// Get the absolute path of a module.
///
/// `module`: the logical name of the module.
/// `search_path`: the directory in which to search for the module.
pub fn module_to_path(module: &str, search_path: &Path) -> Result<PathBuf, GraderError> {
    let candidate = search_path.join(format!("{}.{}", module, SOURCE_EXTENSION));
    if !candidate.is_file() {
        return Err(ReportingContext::internal("load").report(
            ErrorKind::ModuleNotFound {
                module: module.to_string(),
            },
            unspanned(),
        )
        .with_help(format!(
            "no `{}.{}` under `{}`",
            module,
            SOURCE_EXTENSION,
            search_path.display()
        )));
    }
    Ok(candidate)
}

/// Convert from a path to a logical module name.
///
/// `module_file`: the path to the source file.
/// `search_path`: where the module can be found; for a single-file source
/// this is the file's directory.
pub fn path_to_module(module_file: &Path, search_path: &Path) -> Result<String, GraderError> {
    let ctx = ReportingContext::internal("load");

    if module_file.extension().map_or(true, |ext| ext != SOURCE_EXTENSION) {
        return Err(ctx.report(
            ErrorKind::SpecResolution {
                path: module_file.display().to_string(),
            },
            unspanned(),
        )
        .with_help(format!("not a `.{}` source file", SOURCE_EXTENSION)));
    }

    let relative = if module_file.is_absolute() {
        module_file.strip_prefix(search_path).map_err(|_| {
            ctx.report(
                ErrorKind::SpecResolution {
                    path: module_file.display().to_string(),
                },
                unspanned(),
            )
            .with_help(format!("outside the search path `{}`", search_path.display()))
        })?
    } else {
        module_file
    };

    if relative.components().count() != 1 {
        return Err(ctx.report(
            ErrorKind::SpecResolution {
                path: module_file.display().to_string(),
            },
            unspanned(),
        )
        .with_help("nested module paths are not supported"));
    }

    Ok(relative
        .with_extension("")
        .to_string_lossy()
        .into_owned())
}

/// List all submitted grading-language sources under a root, sorted for
/// deterministic reporting.
pub fn submitted_sources(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION))
        .collect();
    files.sort();
    files
}
