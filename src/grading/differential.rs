//! The differential runner: execute one template against the reference and
//! candidate sides and certify equivalence.
//!
//! A differential case is declared through a small builder and resolved
//! eagerly into one concrete runnable value. Sides are either supplied
//! explicitly or resolved through the scope chain at run time, so mutating
//! a closer scope between runs takes precedence on the next resolution.

use std::rc::Rc;

use crate::grading::config::{CaseConfig, ConfigKey, ConfigLayer};
use crate::grading::formatting;
use crate::grading::GradingContext;
use crate::loader::ModuleHandle;
use crate::runtime::Value;
use crate::GraderError;

pub type Template = Box<dyn Fn(&GradingContext, &ModuleHandle) -> Result<Value, GraderError>>;
pub type Normalizer = Box<dyn Fn(Value) -> Value>;
pub type Assertion = Box<dyn Fn(&Value, &Value, Option<&str>) -> Result<(), GraderError>>;

/// Outcome of one grading case.
///
/// `Failed` means the candidate produced a wrong but well-formed answer;
/// `Errored` means the template or the candidate itself raised. Reports
/// must be able to tell the two apart.
#[derive(Debug)]
pub enum CaseOutcome {
    Passed,
    Failed(GraderError),
    Errored(GraderError),
}

impl CaseOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, CaseOutcome::Passed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            CaseOutcome::Passed => "PASS",
            CaseOutcome::Failed(_) => "FAIL",
            CaseOutcome::Errored(_) => "ERROR",
        }
    }
}

enum Sides {
    Explicit {
        reference: ModuleHandle,
        candidate: ModuleHandle,
    },
    Chained(Rc<CaseConfig>),
}

/// Builder for a differential case.
pub struct Differential {
    sides: Sides,
    normalize: Option<Normalizer>,
    assertion: Option<Assertion>,
    message: Option<String>,
}

impl Differential {
    /// Compare an explicit (reference, candidate) pair.
    pub fn over(reference: ModuleHandle, candidate: ModuleHandle) -> Self {
        Self {
            sides: Sides::Explicit {
                reference,
                candidate,
            },
            normalize: None,
            assertion: None,
            message: None,
        }
    }

    /// Resolve the (reference, candidate) pair through the scope chain on
    /// every run.
    pub fn from_chain(config: Rc<CaseConfig>) -> Self {
        Self {
            sides: Sides::Chained(config),
            normalize: None,
            assertion: None,
            message: None,
        }
    }

    /// Normalize both results before comparison.
    pub fn normalize(mut self, normalizer: impl Fn(Value) -> Value + 'static) -> Self {
        self.normalize = Some(Box::new(normalizer));
        self
    }

    /// Replace the structural-equality assertion.
    pub fn assert_with(
        mut self,
        assertion: impl Fn(&Value, &Value, Option<&str>) -> Result<(), GraderError> + 'static,
    ) -> Self {
        self.assertion = Some(Box::new(assertion));
        self
    }

    /// Message forwarded to the assertion on failure.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Finish the declaration with the template to run on each side.
    pub fn case(
        self,
        template: impl Fn(&GradingContext, &ModuleHandle) -> Result<Value, GraderError> + 'static,
    ) -> DifferentialCase {
        DifferentialCase {
            sides: self.sides,
            normalize: self.normalize,
            assertion: self.assertion,
            message: self.message,
            template: Box::new(template),
        }
    }
}

/// One concrete runnable differential case.
pub struct DifferentialCase {
    sides: Sides,
    normalize: Option<Normalizer>,
    assertion: Option<Assertion>,
    message: Option<String>,
    template: Template,
}

impl DifferentialCase {
    /// Bind the owning container's configuration; a no-op for explicit
    /// sides, one-time for chained sides.
    pub fn bind_container(&self, container: Rc<ConfigLayer>) -> Result<(), GraderError> {
        match &self.sides {
            Sides::Chained(config) => config.bind_container(container),
            Sides::Explicit { .. } => Ok(()),
        }
    }

    pub fn run(&self, ctx: &GradingContext) -> CaseOutcome {
        let (reference, candidate) = match self.resolve_sides(ctx) {
            Ok(pair) => pair,
            Err(error) => return CaseOutcome::Errored(error),
        };

        // The template itself is never caught here: a raising candidate is
        // a distinct outcome from a wrong answer.
        let expected = match (self.template)(ctx, &reference) {
            Ok(value) => value,
            Err(error) => return CaseOutcome::Errored(error),
        };
        let actual = match (self.template)(ctx, &candidate) {
            Ok(value) => value,
            Err(error) => return CaseOutcome::Errored(error),
        };

        let (expected, actual) = match &self.normalize {
            Some(normalize) => (normalize(expected), normalize(actual)),
            None => (expected, actual),
        };

        let verdict = match &self.assertion {
            Some(assertion) => assertion(&expected, &actual, self.message.as_deref()),
            None => assertions::equal(&expected, &actual, self.message.as_deref()),
        };

        match verdict {
            Ok(()) => CaseOutcome::Passed,
            Err(error) => CaseOutcome::Failed(error),
        }
    }

    fn resolve_sides(
        &self,
        ctx: &GradingContext,
    ) -> Result<(ModuleHandle, ModuleHandle), GraderError> {
        match &self.sides {
            Sides::Explicit {
                reference,
                candidate,
            } => Ok((reference.clone(), candidate.clone())),
            Sides::Chained(config) => {
                let instance = ctx.instance.as_ref();
                let reference = config
                    .resolve(ConfigKey::Reference, instance)?
                    .as_module()?;
                let candidate = config
                    .resolve(ConfigKey::Candidate, instance)?
                    .as_module()?;
                Ok((reference, candidate))
            }
        }
    }
}

/// Stock equivalence assertions.
pub mod assertions {
    use super::*;
    use crate::errors::{ErrorReporting, ReportingContext};

    fn grading() -> ReportingContext {
        ReportingContext::internal("grading")
    }

    /// Structural equality, the default. Failure messages carry a line
    /// diff of the two renderings.
    pub fn equal(expected: &Value, actual: &Value, msg: Option<&str>) -> Result<(), GraderError> {
        if expected == actual {
            return Ok(());
        }
        let mut message = format!(
            "reference and candidate diverge\n{}",
            formatting::render_value_diff(expected, actual)
        );
        if let Some(msg) = msg {
            message = format!("{}\n{}", msg, message);
        }
        Err(grading().assertion_failure(message))
    }

    /// Numeric comparison rounded to `places` decimal places, for results
    /// where floating error is acceptable.
    pub fn almost_equal(places: i32) -> Assertion {
        Box::new(move |expected, actual, msg| {
            let (Some(a), Some(b)) = (expected.as_number(), actual.as_number()) else {
                return Err(grading().assertion_failure(format!(
                    "almost-equal comparison requires numbers, got {} and {}",
                    expected.type_name(),
                    actual.type_name()
                )));
            };
            let tolerance = 0.5 * 10f64.powi(-places);
            if (a - b).abs() < tolerance {
                return Ok(());
            }
            let mut message = format!("{} != {} within {} places", a, b, places);
            if let Some(msg) = msg {
                message = format!("{}\n{}", msg, message);
            }
            Err(grading().assertion_failure(message))
        })
    }
}

/// Stock result normalizers.
pub mod normalizers {
    use super::*;

    /// Strip leading and trailing whitespace from string results.
    pub fn trimmed() -> Normalizer {
        Box::new(|value| match value {
            Value::String(s) => Value::String(s.trim().to_string()),
            other => other,
        })
    }
}
