//! Grading containers: named cases run sequentially against one session.
//!
//! A container's setup phase consults the session's failure log before any
//! case runs. Accumulated load failures produce an itemized report on the
//! session output plus one unconditional failing case, so a candidate whose
//! files never loaded still receives a coherent result.

use std::rc::Rc;

use crate::errors::{ErrorReporting, ReportingContext};
use crate::grading::config::ConfigLayer;
use crate::grading::differential::{CaseOutcome, DifferentialCase};
use crate::grading::formatting;
use crate::grading::GradingContext;
use crate::session::GradingSession;
use crate::GraderError;

/// Result of one case.
#[derive(Debug)]
pub struct CaseReport {
    pub name: String,
    pub outcome: CaseOutcome,
    /// Inert grading metadata; carried through to reports, never
    /// interpreted here.
    pub weight: Option<f64>,
}

/// Result of one container run.
#[derive(Debug)]
pub struct ContainerReport {
    pub container: String,
    pub cases: Vec<CaseReport>,
}

impl ContainerReport {
    pub fn success(&self) -> bool {
        self.cases.iter().all(|case| case.outcome.is_pass())
    }

    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.outcome.is_pass()).count()
    }

    pub fn failed(&self) -> usize {
        self.cases
            .iter()
            .filter(|c| matches!(c.outcome, CaseOutcome::Failed(_)))
            .count()
    }

    pub fn errored(&self) -> usize {
        self.cases
            .iter()
            .filter(|c| matches!(c.outcome, CaseOutcome::Errored(_)))
            .count()
    }
}

type CaseFn = Box<dyn Fn(&GradingContext) -> CaseOutcome>;

struct RegisteredCase {
    name: String,
    weight: Option<f64>,
    run: CaseFn,
}

/// A named collection of grading cases sharing one container configuration.
pub struct Grader {
    name: String,
    config: Rc<ConfigLayer>,
    cases: Vec<RegisteredCase>,
}

impl Grader {
    pub fn new(name: impl Into<String>, config: ConfigLayer) -> Self {
        Self {
            name: name.into(),
            config: Rc::new(config),
            cases: Vec::new(),
        }
    }

    /// The container configuration cases bind against.
    pub fn config(&self) -> Rc<ConfigLayer> {
        self.config.clone()
    }

    /// Install an arbitrary runnable case.
    pub fn add_case(
        &mut self,
        name: impl Into<String>,
        run: impl Fn(&GradingContext) -> CaseOutcome + 'static,
    ) -> &mut Self {
        self.cases.push(RegisteredCase {
            name: name.into(),
            weight: None,
            run: Box::new(run),
        });
        self
    }

    /// Install a case carrying inert weight metadata.
    pub fn add_weighted_case(
        &mut self,
        name: impl Into<String>,
        weight: f64,
        run: impl Fn(&GradingContext) -> CaseOutcome + 'static,
    ) -> &mut Self {
        self.cases.push(RegisteredCase {
            name: name.into(),
            weight: Some(weight),
            run: Box::new(run),
        });
        self
    }

    /// Install a differential case, binding this container into its scope
    /// chain. Binding is one-time; installing the same chained case into a
    /// second container fails fast.
    pub fn install_differential(
        &mut self,
        name: impl Into<String>,
        case: DifferentialCase,
    ) -> Result<&mut Self, GraderError> {
        case.bind_container(self.config.clone())?;
        self.cases.push(RegisteredCase {
            name: name.into(),
            weight: None,
            run: Box::new(move |ctx| case.run(ctx)),
        });
        Ok(self)
    }

    /// Run the setup check and every installed case, in order.
    pub fn run(&self, session: &mut GradingSession) -> ContainerReport {
        let mut reports = Vec::new();

        if !session.failures().is_empty() {
            let failures = session.failures().snapshot();
            let listing = formatting::render_load_failures(&failures);
            session.current_output().emit(&listing, None);

            reports.push(CaseReport {
                name: "candidate modules load".to_string(),
                outcome: CaseOutcome::Failed(
                    ReportingContext::internal("grading").assertion_failure(format!(
                        "{} candidate module(s) failed to load",
                        failures.len()
                    )),
                ),
                weight: None,
            });
        }

        let ctx = GradingContext::new(session);
        for case in &self.cases {
            let outcome = (case.run)(&ctx);
            reports.push(CaseReport {
                name: case.name.clone(),
                outcome,
                weight: case.weight,
            });
        }

        ContainerReport {
            container: self.name.clone(),
            cases: reports,
        }
    }
}
