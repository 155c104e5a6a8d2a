//! The differential comparison engine: scope-chain configuration,
//! differential cases, the comparison matrix, grading containers, and
//! report formatting.

pub mod config;
pub mod container;
pub mod differential;
pub mod formatting;
pub mod matrix;

pub use config::{CaseConfig, ConfigKey, ConfigLayer, ConfigSource, ConfigValue};
pub use container::{CaseReport, ContainerReport, Grader};
pub use differential::{assertions, normalizers, CaseOutcome, Differential, DifferentialCase};
pub use matrix::{ComparisonMatrix, CtorSpec, Direction, MatrixBinding, MatrixOutcome, PairResult};

use std::rc::Rc;

use crate::errors::{ErrorReporting, SourceContext};
use crate::loader::ModuleHandle;
use crate::runtime::{call_callable, AtomRegistry, EvaluationContext, SharedOutput, Value};
use crate::session::GradingSession;
use crate::syntax::Span;
use crate::GraderError;

/// Execution context handed to grading templates: enough of the session to
/// invoke entities in loaded modules, plus the per-run instance
/// configuration the scope chain binds against.
pub struct GradingContext {
    atoms: Rc<AtomRegistry>,
    output: SharedOutput,
    max_depth: usize,
    pub instance: Option<ConfigLayer>,
}

impl GradingContext {
    pub fn new(session: &GradingSession) -> Self {
        Self {
            atoms: session.atoms(),
            output: session.current_output(),
            max_depth: session.max_depth(),
            instance: None,
        }
    }

    /// Bind a per-run instance layer for scope-chain resolution.
    pub fn with_instance(mut self, instance: ConfigLayer) -> Self {
        self.instance = Some(instance);
        self
    }

    pub fn output(&self) -> SharedOutput {
        self.output.clone()
    }

    /// Invoke an exported operation of a module.
    pub fn call(
        &self,
        module: &ModuleHandle,
        name: &str,
        args: &[Value],
    ) -> Result<Value, GraderError> {
        let callable = module.get(name).ok_or_else(|| {
            let ctx = self.eval_context(module.scope.clone(), module.source.clone());
            ctx.undefined_symbol(name, crate::errors::unspanned())
                .with_help(format!("module `{}` exports no `{}`", module.name, name))
        })?;
        let mut ctx = self.eval_context(module.scope.clone(), module.source.clone());
        call_callable(&callable, args, &Span::default(), &mut ctx)
    }

    /// Invoke a callable value directly.
    pub fn call_function(&self, callable: &Value, args: &[Value]) -> Result<Value, GraderError> {
        let scope = match callable {
            Value::Lambda(lambda) => lambda.scope.clone(),
            _ => crate::runtime::new_scope(),
        };
        let mut ctx = self.eval_context(scope, SourceContext::fallback("grading call"));
        call_callable(callable, args, &Span::default(), &mut ctx)
    }

    fn eval_context(
        &self,
        scope: crate::runtime::ModuleScope,
        source: SourceContext,
    ) -> EvaluationContext {
        EvaluationContext::with_settings(
            scope,
            self.output.clone(),
            source,
            self.atoms.clone(),
            self.max_depth,
        )
    }
}
