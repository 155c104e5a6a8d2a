//! The comparison matrix: Cartesian pairing, invocation exactness, and the
//! bidirectional variant.

mod common;

use std::rc::Rc;

use common::write_module;
use gradus::grading::{
    CaseConfig, CaseOutcome, ComparisonMatrix, ConfigKey, ConfigLayer, ConfigValue, CtorSpec,
    Direction, GradingContext, MatrixBinding,
};
use gradus::runtime::{OutputBuffer, SharedOutput, Value};
use gradus::GradingSession;
use tempfile::TempDir;

/// Reference side: ordering relation over wrapped numbers, tagged "R" on
/// every invocation so tests can count calls.
const REFERENCE_SRC: &str = "
(define (make v) (map \"v\" v))
(define (before a b)
  (do (print \"R\")
      (< (get a \"v\") (get b \"v\"))))";

/// Candidate with identical behavior, tagged "C".
const CANDIDATE_OK_SRC: &str = "
(define (make v) (map \"v\" v))
(define (before a b)
  (do (print \"C\")
      (< (get a \"v\") (get b \"v\"))))";

/// Candidate that treats the relation as non-strict; diverges on self-pairs.
const CANDIDATE_LE_SRC: &str = "
(define (make v) (map \"v\" v))
(define (before a b)
  (do (print \"C\")
      (<= (get a \"v\") (get b \"v\"))))";

/// Candidate whose relation ignores its operands entirely.
const CANDIDATE_ALWAYS_SRC: &str = "
(define (make v) (map \"v\" v))
(define (before a b)
  (do (print \"C\") true))";

struct Fixture {
    session: GradingSession,
    binding: MatrixBinding,
    capture: std::rc::Rc<std::cell::RefCell<OutputBuffer>>,
    _dir: TempDir,
}

impl Fixture {
    fn with_candidate(candidate_src: &str) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let ref_path = write_module(dir.path(), "reference", REFERENCE_SRC);
        let cand_path = write_module(dir.path(), "candidate", candidate_src);

        let (output, capture) = SharedOutput::buffered();
        let mut session = GradingSession::with_shared_output(output);
        let reference = session.load_module(&ref_path, "reference").expect("loads");
        let candidate = session.load_module(&cand_path, "candidate").expect("loads");

        Self {
            session,
            binding: MatrixBinding {
                reference,
                candidate,
                constructor: "make".to_string(),
                operation: "before".to_string(),
            },
            capture,
            _dir: dir,
        }
    }

    fn ctx(&self) -> GradingContext {
        GradingContext::new(&self.session)
    }

    fn count_calls(&self, tag: &str) -> usize {
        self.capture
            .borrow()
            .as_str()
            .lines()
            .filter(|line| *line == tag)
            .count()
    }
}

fn number_specs(values: &[f64]) -> Vec<CtorSpec> {
    values
        .iter()
        .map(|v| CtorSpec::positional(vec![Value::Number(*v)]))
        .collect()
}

#[test]
fn equivalent_sides_pass_the_full_matrix() {
    let fixture = Fixture::with_candidate(CANDIDATE_OK_SRC);
    let matrix = ComparisonMatrix::new(number_specs(&[1.0, 2.0, 3.0]));

    let outcome = matrix.run(&fixture.ctx(), &fixture.binding);
    assert!(outcome.passed());
    assert_eq!(outcome.pairs.len(), 9);
    assert!(outcome.into_outcome().is_pass());
}

#[test]
fn operation_runs_exactly_n_squared_times_per_side() {
    let fixture = Fixture::with_candidate(CANDIDATE_OK_SRC);
    let matrix = ComparisonMatrix::new(number_specs(&[1.0, 2.0, 3.0]));
    matrix.run(&fixture.ctx(), &fixture.binding);

    assert_eq!(fixture.count_calls("R"), 9);
    assert_eq!(fixture.count_calls("C"), 9);
}

#[test]
fn single_spec_matrix_invokes_once_per_side() {
    let fixture = Fixture::with_candidate(CANDIDATE_OK_SRC);
    let matrix = ComparisonMatrix::new(number_specs(&[5.0]));
    let outcome = matrix.run(&fixture.ctx(), &fixture.binding);

    assert_eq!(outcome.pairs.len(), 1);
    assert_eq!(fixture.count_calls("R"), 1);
    assert_eq!(fixture.count_calls("C"), 1);
}

#[test]
fn self_pair_divergence_is_caught_and_named() {
    let fixture = Fixture::with_candidate(CANDIDATE_LE_SRC);
    let matrix = ComparisonMatrix::new(number_specs(&[1.0, 2.0]));

    let outcome = matrix.run(&fixture.ctx(), &fixture.binding);
    assert!(!outcome.passed());

    let failing: Vec<(usize, usize)> = outcome
        .pairs
        .iter()
        .filter(|pair| !pair.outcome.is_pass())
        .map(|pair| (pair.lhs, pair.rhs))
        .collect();
    // `<=` differs from `<` exactly on the self-pairs.
    assert_eq!(failing, vec![(0, 0), (1, 1)]);

    let CaseOutcome::Failed(error) = outcome.into_outcome() else {
        panic!("divergence must collapse into a failure");
    };
    assert!(error.to_string().contains("(0, 0)"));
}

#[test]
fn bidirectional_check_catches_an_operand_blind_candidate() {
    let fixture = Fixture::with_candidate(CANDIDATE_ALWAYS_SRC);
    let lhs = CtorSpec::positional(vec![Value::Number(1.0)]);
    let rhs = CtorSpec::positional(vec![Value::Number(2.0)]);

    let outcome =
        ComparisonMatrix::run_bidirectional(&fixture.ctx(), &fixture.binding, &lhs, &rhs);

    assert!(!outcome.passed());
    // The forward direction happens to agree; the reverse diverges.
    let forward = &outcome.pairs[0];
    let reverse = &outcome.pairs[1];
    assert_eq!(forward.direction, Direction::Forward);
    assert!(forward.outcome.is_pass());
    assert_eq!(reverse.direction, Direction::Reverse);
    assert!(!reverse.outcome.is_pass());
}

#[test]
fn kwargs_reach_the_constructor_as_a_trailing_map() {
    let dir = TempDir::new().expect("tempdir");
    let src = "
(define (make v opts) (map \"v\" v \"flag\" (get opts \"flag\")))
(define (before a b) (and (get a \"flag\") (get b \"flag\")))";
    let ref_path = write_module(dir.path(), "reference", src);
    let cand_path = write_module(dir.path(), "candidate", src);

    let mut session = GradingSession::with_output(gradus::runtime::NullSink);
    let reference = session.load_module(&ref_path, "reference").expect("loads");
    let candidate = session.load_module(&cand_path, "candidate").expect("loads");
    let binding = MatrixBinding {
        reference,
        candidate,
        constructor: "make".to_string(),
        operation: "before".to_string(),
    };

    let spec = CtorSpec::with_kwargs(
        vec![Value::Number(1.0)],
        vec![("flag".to_string(), Value::Bool(true))],
    );
    let matrix = ComparisonMatrix::new(vec![spec]);
    let ctx = GradingContext::new(&session);

    assert!(matrix.run(&ctx, &binding).passed());
}

#[test]
fn binding_resolves_through_the_scope_chain() {
    let fixture = Fixture::with_candidate(CANDIDATE_OK_SRC);

    let container = Rc::new(
        ConfigLayer::named("container")
            .with(
                ConfigKey::Reference,
                ConfigValue::Module(fixture.binding.reference.clone()),
            )
            .with(
                ConfigKey::Candidate,
                ConfigValue::Module(fixture.binding.candidate.clone()),
            )
            .with(ConfigKey::Operation, ConfigValue::Text("before".into())),
    );
    let config = CaseConfig::new();
    config.bind_container(container).expect("binds once");

    let binding = MatrixBinding::from_chain(&config, None, "make").expect("resolves");
    assert_eq!(binding.operation, "before");

    let matrix = ComparisonMatrix::new(number_specs(&[1.0, 2.0]));
    assert!(matrix.run(&fixture.ctx(), &binding).passed());
}
