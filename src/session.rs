//! The grading session: explicitly owned state for one candidate.
//!
//! Everything that was ambient process state in a conventional grading
//! setup - the loaded-module table, the search path, the accumulated load
//! failures, the output sink - lives here and is injected into the
//! components that need it. Independent sessions therefore cannot leak
//! state into each other.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::loader::{
    load_from_file, resolve_submission_root, FailureLog, ModuleHandle, ModuleRegistry, PathScope,
};
use crate::runtime::{
    build_default_atom_registry, AtomRegistry, OutputRedirect, OutputSink, SharedOutput,
};
use crate::GraderError;

pub struct GradingSession {
    registry: ModuleRegistry,
    failures: FailureLog,
    search_path: Vec<PathBuf>,
    submission_override: Option<PathBuf>,
    atoms: Rc<AtomRegistry>,
    output: Rc<RefCell<SharedOutput>>,
    max_depth: usize,
}

impl GradingSession {
    pub fn new() -> Self {
        Self::with_shared_output(SharedOutput::stdout())
    }

    pub fn with_output(sink: impl OutputSink + 'static) -> Self {
        Self::with_shared_output(SharedOutput::new(sink))
    }

    pub fn with_shared_output(output: SharedOutput) -> Self {
        let origin = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            registry: ModuleRegistry::new(),
            failures: FailureLog::new(),
            search_path: vec![origin],
            submission_override: None,
            atoms: Rc::new(build_default_atom_registry()),
            output: Rc::new(RefCell::new(output)),
            max_depth: 1000,
        }
    }

    // ------------------------------------------------------------------
    // Submission layout
    // ------------------------------------------------------------------

    /// The candidate submission root: explicit override, else the
    /// `SUBMISSION_PATH` environment variable, else the fixed default.
    pub fn submission_root(&self) -> PathBuf {
        resolve_submission_root(self.submission_override.as_deref())
    }

    pub fn set_submission_root(&mut self, path: impl Into<PathBuf>) {
        self.submission_override = Some(path.into());
    }

    // ------------------------------------------------------------------
    // Scoped search path
    // ------------------------------------------------------------------

    /// Enter a scope with `path` spliced into the search path. New module
    /// names registered inside the scope are mangled on exit when
    /// `mangle_new` is set.
    pub fn enter_path(
        &mut self,
        path: &Path,
        mangle_new: bool,
    ) -> Result<PathScope<'_>, GraderError> {
        PathScope::enter(self, path, mangle_new)
    }

    /// Enter a scope over the submission root with mangling enabled; the
    /// standard way to load candidate code.
    pub fn enter_submission(&mut self) -> Result<PathScope<'_>, GraderError> {
        let root = self.submission_root();
        self.enter_path(&root, true)
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    pub(crate) fn insert_search_path(&mut self, index: usize, path: PathBuf) {
        let index = index.min(self.search_path.len());
        self.search_path.insert(index, path);
    }

    pub(crate) fn remove_search_path(&mut self, index: usize) {
        if index < self.search_path.len() {
            self.search_path.remove(index);
        }
    }

    // ------------------------------------------------------------------
    // Modules and failures
    // ------------------------------------------------------------------

    /// Load a trusted module directly from a path, bypassing scope
    /// bookkeeping. Reference implementations are loaded this way.
    pub fn load_module(
        &mut self,
        path: &Path,
        name: &str,
    ) -> Result<ModuleHandle, GraderError> {
        load_from_file(self, path, name)
    }

    pub fn module(&self, name: &str) -> Option<ModuleHandle> {
        self.registry.get(name)
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.registry
    }

    pub fn failures(&self) -> &FailureLog {
        &self.failures
    }

    pub fn failures_mut(&mut self) -> &mut FailureLog {
        &mut self.failures
    }

    /// Clear accumulated load failures, typically at the start of a new
    /// grading run over the same session.
    pub fn reset_failures(&mut self) {
        self.failures.reset();
    }

    // ------------------------------------------------------------------
    // Evaluation plumbing
    // ------------------------------------------------------------------

    pub fn atoms(&self) -> Rc<AtomRegistry> {
        self.atoms.clone()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    /// The sink module output currently flows to.
    pub fn current_output(&self) -> SharedOutput {
        self.output.borrow().clone()
    }

    /// Redirect module output until the returned guard drops.
    pub fn redirect_output(&self, sink: SharedOutput) -> OutputRedirect {
        OutputRedirect::install(self.output.clone(), sink)
    }
}

impl Default for GradingSession {
    fn default() -> Self {
        Self::new()
    }
}
