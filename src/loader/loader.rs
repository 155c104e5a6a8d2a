//! Loading a single source file as a named, registered module.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::errors::{unspanned, ErrorKind, ErrorReporting, ReportingContext, SourceContext};
use crate::loader::submission::SOURCE_EXTENSION;
use crate::runtime::{execute_top_level, new_scope, EvaluationContext, ModuleScope, Value};
use crate::session::GradingSession;
use crate::syntax::parser;
use crate::GraderError;

/// A loaded unit: the module's exported bindings plus enough context to
/// diagnose errors raised from inside it.
pub struct Module {
    pub name: String,
    pub path: PathBuf,
    pub scope: ModuleScope,
    pub source: SourceContext,
}

pub type ModuleHandle = Rc<Module>;

impl Module {
    /// Look up an exported entity by name.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.scope.borrow().get(name).cloned()
    }

    pub fn exports(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scope.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish()
    }
}

/// Load a file as a named module: parse it, register it under `name`, and
/// execute its top-level code against the module scope.
///
/// The module is registered before execution and left registered on
/// failure, mirroring how a partially executed unit stays resident; the
/// caller decides whether a broken module is fatal.
pub fn load_from_file(
    session: &mut GradingSession,
    path: &Path,
    name: &str,
) -> Result<ModuleHandle, GraderError> {
    let ctx = ReportingContext::internal("load");

    if !path.is_file() {
        return Err(ctx
            .report(
                ErrorKind::ModuleNotFound {
                    module: name.to_string(),
                },
                unspanned(),
            )
            .with_help(format!("expected source file at `{}`", path.display())));
    }

    if path.extension().map_or(true, |ext| ext != SOURCE_EXTENSION) {
        return Err(ctx.report(
            ErrorKind::SpecResolution {
                path: path.display().to_string(),
            },
            unspanned(),
        )
        .with_help(format!("not a `.{}` source file", SOURCE_EXTENSION)));
    }

    let content = std::fs::read_to_string(path).map_err(|io| {
        ctx.report(
            ErrorKind::SpecResolution {
                path: path.display().to_string(),
            },
            unspanned(),
        )
        .with_help(io.to_string())
    })?;

    let source = SourceContext::from_file(path.display().to_string(), content.clone());
    let ast = parser::parse(&content, source.clone())?;

    let module = Rc::new(Module {
        name: name.to_string(),
        path: path.to_path_buf(),
        scope: new_scope(),
        source: source.clone(),
    });
    session.registry_mut().insert(name, module.clone());

    let mut eval_ctx = EvaluationContext::with_settings(
        module.scope.clone(),
        session.current_output(),
        source,
        session.atoms(),
        session.max_depth(),
    );
    execute_top_level(&ast, &mut eval_ctx)?;

    tracing::debug!(module = name, path = %path.display(), "loaded module");
    Ok(module)
}
