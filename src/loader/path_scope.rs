//! Scoped acquisition of a modified module search path.
//!
//! A [`PathScope`] borrows the session mutably for its whole lifetime, so
//! nested scopes restore the search path in strict LIFO order by
//! construction. On exit the scope removes its entry only if it is still at
//! the expected position; a disturbed path produces a warning, never
//! further corruption. Module names that became newly registered inside the
//! scope are mangled on exit so a later scope can load a same-named module.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::errors::{unspanned, ErrorKind, ErrorReporting, ReportingContext};
use crate::loader::failures::LoadFailure;
use crate::loader::loader::{load_from_file, ModuleHandle};
use crate::loader::submission::SOURCE_EXTENSION;
use crate::runtime::SharedOutput;
use crate::session::GradingSession;
use crate::GraderError;

/// Position at which scope paths are spliced into the search path:
/// immediately after the highest-priority entry.
const INSERT_INDEX: usize = 1;

pub struct PathScope<'s> {
    session: &'s mut GradingSession,
    inserted: PathBuf,
    before: HashSet<String>,
    mangle_new: bool,
}

impl<'s> PathScope<'s> {
    pub(crate) fn enter(
        session: &'s mut GradingSession,
        path: &Path,
        mangle_new: bool,
    ) -> Result<Self, GraderError> {
        let inserted = std::fs::canonicalize(path).map_err(|io| {
            ReportingContext::internal("load")
                .report(
                    ErrorKind::SpecResolution {
                        path: path.display().to_string(),
                    },
                    unspanned(),
                )
                .with_help(io.to_string())
        })?;

        let before = session.registry().names();
        session.insert_search_path(INSERT_INDEX, inserted.clone());

        Ok(Self {
            session,
            inserted,
            before,
            mangle_new,
        })
    }

    /// The search-path entry this scope inserted.
    pub fn path(&self) -> &Path {
        &self.inserted
    }

    pub fn session(&mut self) -> &mut GradingSession {
        self.session
    }

    /// Enter a nested scope. The borrow rules make release strictly LIFO.
    pub fn enter_path(
        &mut self,
        path: &Path,
        mangle_new: bool,
    ) -> Result<PathScope<'_>, GraderError> {
        PathScope::enter(self.session, path, mangle_new)
    }

    /// Load `<name>.gr` from this scope's directory, deferring any failure
    /// to the session's failure log.
    ///
    /// Candidate load failures are expected operational conditions: they
    /// must never crash the grading session. The grading container reports
    /// them when its cases run.
    pub fn load_candidate(&mut self, name: &str) -> Option<ModuleHandle> {
        let path = self.candidate_path(name);
        match load_from_file(self.session, &path, name) {
            Ok(module) => Some(module),
            Err(error) => {
                let missing = error.is_not_found();
                let filename = format!("{}.{}", name, SOURCE_EXTENSION);
                tracing::debug!(module = name, missing, "deferred candidate load failure");
                self.session
                    .failures_mut()
                    .record(LoadFailure::new(filename, error, missing));
                None
            }
        }
    }

    /// Load `<name>.gr` with the module's top-level output suppressed,
    /// failing fast instead of deferring to the failure log.
    ///
    /// Untrusted top-level print statements must not corrupt the grading
    /// session's own output, so the session sink is swapped for a null sink
    /// for the duration of the load and restored on every exit path.
    pub fn load_isolated(&mut self, name: &str) -> Result<ModuleHandle, GraderError> {
        let path = self.candidate_path(name);
        let result = {
            let _quiet = self.session.redirect_output(SharedOutput::null());
            load_from_file(self.session, &path, name)
        };

        result.map_err(|error| {
            if error.is_not_found() {
                error.with_help(format!(
                    "Could not load module `{}`. Did you name your file correctly \
                     and include it in your submission?",
                    name
                ))
            } else {
                error
            }
        })
    }

    fn candidate_path(&self, name: &str) -> PathBuf {
        self.inserted
            .join(format!("{}.{}", name, SOURCE_EXTENSION))
    }
}

impl Drop for PathScope<'_> {
    fn drop(&mut self) {
        match self.session.search_path().get(INSERT_INDEX) {
            Some(entry) if *entry == self.inserted => {
                self.session.remove_search_path(INSERT_INDEX);
            }
            _ => {
                tracing::warn!(
                    path = %self.inserted.display(),
                    "did not remove search path entry because it was no longer at its \
                     expected position"
                );
            }
        }

        if self.mangle_new {
            // Only names that arrived during the scope are mangled;
            // modules resident before entry are never renamed.
            let mut new_names: Vec<String> = self
                .session
                .registry()
                .names()
                .difference(&self.before)
                .cloned()
                .collect();
            new_names.sort();
            for name in new_names {
                let _ = self.session.registry_mut().mangle(&name, None);
            }
        }
    }
}
