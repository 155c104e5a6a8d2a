//! The comparison matrix: drive one differential run per ordered pair of
//! constructor configurations.
//!
//! For a spec list of length `n`, the target operation is invoked exactly
//! `n * n` times per side - once per ordered pair, self-pairs included.
//! A bidirectional single-pair variant checks both directions of an
//! asymmetric relation individually.

use crate::errors::{ErrorReporting, ReportingContext};
use crate::grading::config::{CaseConfig, ConfigKey, ConfigLayer};
use crate::grading::differential::{CaseOutcome, Differential};
use crate::grading::GradingContext;
use crate::loader::ModuleHandle;
use crate::runtime::Value;
use crate::GraderError;

/// One constructor configuration: positional arguments plus optional
/// keyword arguments. The grading language has no keyword calls, so kwargs
/// are passed to the constructor as one trailing map argument.
#[derive(Debug, Clone, Default)]
pub struct CtorSpec {
    pub args: Vec<Value>,
    pub kwargs: Vec<(String, Value)>,
}

impl CtorSpec {
    pub fn positional(args: Vec<Value>) -> Self {
        Self {
            args,
            kwargs: Vec::new(),
        }
    }

    pub fn with_kwargs(args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Self {
        Self { args, kwargs }
    }

    fn ctor_args(&self) -> Vec<Value> {
        let mut args = self.args.clone();
        if !self.kwargs.is_empty() {
            let mut map = im::HashMap::new();
            for (key, value) in &self.kwargs {
                map.insert(key.clone(), value.clone());
            }
            args.push(Value::Map(map));
        }
        args
    }
}

/// The resolved (reference, candidate, constructor, operation) binding a
/// matrix runs against.
#[derive(Clone)]
pub struct MatrixBinding {
    pub reference: ModuleHandle,
    pub candidate: ModuleHandle,
    pub constructor: String,
    pub operation: String,
}

impl MatrixBinding {
    /// Resolve the sides and operation name through the scope chain; the
    /// constructor name identifies the entity under comparison within each
    /// side.
    pub fn from_chain(
        config: &CaseConfig,
        instance: Option<&ConfigLayer>,
        constructor: impl Into<String>,
    ) -> Result<Self, GraderError> {
        Ok(Self {
            reference: config.resolve(ConfigKey::Reference, instance)?.as_module()?,
            candidate: config.resolve(ConfigKey::Candidate, instance)?.as_module()?,
            constructor: constructor.into(),
            operation: config
                .resolve(ConfigKey::Operation, instance)?
                .as_text()?
                .to_string(),
        })
    }
}

/// Direction of one operation invocation within a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

/// Outcome of one ordered pair.
#[derive(Debug)]
pub struct PairResult {
    pub lhs: usize,
    pub rhs: usize,
    pub direction: Direction,
    pub outcome: CaseOutcome,
}

/// Aggregated outcomes over the whole matrix.
#[derive(Debug, Default)]
pub struct MatrixOutcome {
    pub pairs: Vec<PairResult>,
}

impl MatrixOutcome {
    pub fn passed(&self) -> bool {
        self.pairs.iter().all(|pair| pair.outcome.is_pass())
    }

    /// Collapse into one case outcome: errors dominate, then divergences,
    /// then success.
    pub fn into_outcome(self) -> CaseOutcome {
        let mut failing: Vec<String> = Vec::new();
        for pair in self.pairs {
            match pair.outcome {
                CaseOutcome::Passed => {}
                CaseOutcome::Errored(error) => return CaseOutcome::Errored(error),
                CaseOutcome::Failed(_) => failing.push(format!(
                    "({}, {}){}",
                    pair.lhs,
                    pair.rhs,
                    match pair.direction {
                        Direction::Forward => "",
                        Direction::Reverse => " reversed",
                    }
                )),
            }
        }

        if failing.is_empty() {
            CaseOutcome::Passed
        } else {
            CaseOutcome::Failed(ReportingContext::internal("grading").assertion_failure(
                format!("comparison matrix diverged for pairs: {}", failing.join(", ")),
            ))
        }
    }
}

/// Expands constructor argument sets into the full Cartesian product of
/// ordered pairs and runs one differential comparison per pair.
pub struct ComparisonMatrix {
    specs: Vec<CtorSpec>,
}

impl ComparisonMatrix {
    pub fn new(specs: Vec<CtorSpec>) -> Self {
        Self { specs }
    }

    /// Run the full `n * n` matrix.
    pub fn run(&self, ctx: &GradingContext, binding: &MatrixBinding) -> MatrixOutcome {
        let mut outcome = MatrixOutcome::default();
        for (i, lhs) in self.specs.iter().enumerate() {
            for (j, rhs) in self.specs.iter().enumerate() {
                let result = run_pair(ctx, binding, lhs, rhs, Direction::Forward);
                outcome.pairs.push(PairResult {
                    lhs: i,
                    rhs: j,
                    direction: Direction::Forward,
                    outcome: result,
                });
            }
        }
        outcome
    }

    /// Check a single pair in both directions; each direction must match
    /// the reference individually. Catches candidates whose relation
    /// ignores its operands.
    pub fn run_bidirectional(
        ctx: &GradingContext,
        binding: &MatrixBinding,
        lhs: &CtorSpec,
        rhs: &CtorSpec,
    ) -> MatrixOutcome {
        let mut outcome = MatrixOutcome::default();
        for direction in [Direction::Forward, Direction::Reverse] {
            let result = run_pair(ctx, binding, lhs, rhs, direction);
            outcome.pairs.push(PairResult {
                lhs: 0,
                rhs: 1,
                direction,
                outcome: result,
            });
        }
        outcome
    }
}

/// One differential run: construct a fresh object per operand per side and
/// invoke the operation exactly once per side.
fn run_pair(
    ctx: &GradingContext,
    binding: &MatrixBinding,
    lhs: &CtorSpec,
    rhs: &CtorSpec,
    direction: Direction,
) -> CaseOutcome {
    let constructor = binding.constructor.clone();
    let operation = binding.operation.clone();
    let lhs_args = lhs.ctor_args();
    let rhs_args = rhs.ctor_args();

    let case = Differential::over(binding.reference.clone(), binding.candidate.clone()).case(
        move |ctx, side| {
            let lhs_obj = ctx.call(side, &constructor, &lhs_args)?;
            let rhs_obj = ctx.call(side, &constructor, &rhs_args)?;
            let (a, b) = match direction {
                Direction::Forward => (lhs_obj, rhs_obj),
                Direction::Reverse => (rhs_obj, lhs_obj),
            };
            ctx.call(side, &operation, &[a, b])
        },
    );

    case.run(ctx)
}
