//! Grading containers: the deferred-failure setup check and case
//! aggregation.

mod common;

use std::rc::Rc;

use common::{buffered_session, fixture_dir, write_module};
use gradus::errors::unspanned;
use gradus::grading::{
    formatting, CaseConfig, CaseOutcome, ConfigKey, ConfigLayer, ConfigValue, Differential, Grader,
    GradingContext,
};
use gradus::loader::ModuleHandle;
use gradus::runtime::Value;
use gradus::{ErrorKind, ErrorReporting, ReportingContext};
use tempfile::TempDir;

#[test]
fn accumulated_load_failures_produce_one_failing_setup_case() {
    let (mut session, capture) = buffered_session();

    {
        let mut scope = session
            .enter_path(&fixture_dir("submission"), true)
            .expect("scope enters");
        assert!(scope.load_candidate("non_existent").is_none());
        assert!(scope.load_candidate("top_level_error").is_none());
    }

    let mut grader = Grader::new("hw1", ConfigLayer::named("hw1"));
    grader.add_case("always passes", |_| CaseOutcome::Passed);

    let report = grader.run(&mut session);

    assert!(!report.success());
    assert_eq!(report.cases.len(), 2);
    assert_eq!(report.cases[0].name, "candidate modules load");
    assert!(matches!(report.cases[0].outcome, CaseOutcome::Failed(_)));
    assert!(report.cases[1].outcome.is_pass());

    let printed = capture.borrow().as_str().to_string();
    assert!(printed.contains("Failed to load the following files"));
    assert!(printed.contains("'non_existent.gr'"));
    assert!(printed.contains("appear to be missing"));
    assert!(printed.contains("'top_level_error.gr'"));
    assert!(printed.contains("An error occurred while loading"));
    // One single-level trace per failure, behind a rule.
    assert!(printed.contains(&formatting::h_rule()));
    assert!(printed.contains("While loading 'top_level_error.gr':"));
    assert!(printed.contains("boom at load time"));
}

#[test]
fn a_clean_session_runs_cases_without_the_setup_failure() {
    let (mut session, _capture) = buffered_session();

    let mut grader = Grader::new("hw1", ConfigLayer::named("hw1"));
    grader.add_case("passes", |_| CaseOutcome::Passed);
    grader.add_weighted_case("fails", 2.5, |_| {
        CaseOutcome::Failed(ReportingContext::internal("grading").report(
            ErrorKind::AssertionFailure {
                message: "nope".into(),
            },
            unspanned(),
        ))
    });

    let report = grader.run(&mut session);

    assert_eq!(report.cases.len(), 2);
    assert_eq!(report.passed(), 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.errored(), 0);
    assert_eq!(report.cases[1].weight, Some(2.5));
    assert!(!report.success());
}

#[test]
fn failures_persist_across_independent_containers_until_reset() {
    let (mut session, _capture) = buffered_session();

    {
        let mut scope = session
            .enter_path(&fixture_dir("submission"), true)
            .expect("scope enters");
        assert!(scope.load_candidate("non_existent").is_none());
    }

    let grader_a = Grader::new("part a", ConfigLayer::named("part a"));
    let grader_b = Grader::new("part b", ConfigLayer::named("part b"));

    // Both containers observe the failure that occurred before either ran.
    assert!(!grader_a.run(&mut session).success());
    assert!(!grader_b.run(&mut session).success());

    session.reset_failures();
    assert!(grader_a.run(&mut session).success());
}

#[test]
fn installed_differential_cases_bind_the_container_once() {
    let dir = TempDir::new().expect("tempdir");
    let ref_path = write_module(dir.path(), "reference", "(define (answer) 3)");
    let cand_path = write_module(dir.path(), "candidate", "(define (answer) 3)");

    let (mut session, _capture) = buffered_session();
    let reference: ModuleHandle = session.load_module(&ref_path, "reference").expect("loads");
    let candidate: ModuleHandle = session.load_module(&cand_path, "candidate").expect("loads");

    let container_config = ConfigLayer::named("hw2")
        .with(ConfigKey::Reference, ConfigValue::Module(reference))
        .with(ConfigKey::Candidate, ConfigValue::Module(candidate));

    let mut grader = Grader::new("hw2", container_config);
    let case = Differential::from_chain(Rc::new(CaseConfig::new()))
        .case(|ctx, side| ctx.call(side, "answer", &[]));
    grader
        .install_differential("answer matches", case)
        .expect("install binds the container");

    let report = grader.run(&mut session);
    assert!(report.success());
    assert_eq!(report.cases[0].name, "answer matches");

    // A chain shared by two declarations still binds its container exactly
    // once; the second install fails fast.
    let shared = Rc::new(CaseConfig::new());
    let case_a = Differential::from_chain(shared.clone())
        .case(|ctx, side| ctx.call(side, "answer", &[]));
    let mut second = Grader::new("second", ConfigLayer::named("second"));
    second.install_differential("case", case_a).expect("install");

    let case_b =
        Differential::from_chain(shared).case(|ctx, side| ctx.call(side, "answer", &[]));
    let mut third = Grader::new("third", ConfigLayer::named("third"));
    assert!(third.install_differential("case", case_b).is_err());
}

#[test]
fn a_template_value_round_trips_through_the_context() {
    let dir = TempDir::new().expect("tempdir");
    let ref_path = write_module(dir.path(), "reference", "(define (id x) x)");

    let (mut session, _capture) = buffered_session();
    let module = session.load_module(&ref_path, "reference").expect("loads");

    let ctx = GradingContext::new(&session);
    let result = ctx
        .call(&module, "id", &[Value::List(vec![Value::Number(1.0)])])
        .expect("call succeeds");
    assert_eq!(result, Value::List(vec![Value::Number(1.0)]));
}
