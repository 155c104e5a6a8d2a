//! Out-of-process execution of the candidate's held-out test suite, and
//! consumption of its line-delimited report log.
//!
//! The external tool is a collaborator: it consumes a test file path and
//! emits a JSONL report log plus an optional JSON coverage document. The
//! harness extracts the overall success signal and the failing node ids.

use std::collections::BTreeSet;
use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use tempfile::NamedTempFile;

use crate::errors::{unspanned, ErrorKind, ErrorReporting, ReportingContext};
use crate::grading::{CaseOutcome, CaseReport, ContainerReport};
use crate::loader::module_to_path;
use crate::report::coverage::{CoverageDoc, CoverageReport};
use crate::session::GradingSession;
use crate::GraderError;

/// Name of the external test tool.
const SUITE_COMMAND: &str = "pytest";

/// One line of the report log. Records are tagged with a `$report_type`
/// discriminator; the fields the harness cares about are optional on every
/// record and probed by presence.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportRecord {
    #[serde(rename = "$report_type", default)]
    pub report_type: Option<String>,
    #[serde(default)]
    pub exitstatus: Option<i64>,
    #[serde(default)]
    pub nodeid: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
}

/// Parse a line-delimited report log.
pub fn parse_report_log(text: &str) -> Result<Vec<ReportRecord>, GraderError> {
    let ctx = report_context();
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| {
                ctx.report(
                    ErrorKind::MalformedReport {
                        detail: e.to_string(),
                    },
                    unspanned(),
                )
            })
        })
        .collect()
}

/// The extracted signal of one suite run.
#[derive(Debug, Clone)]
pub struct SuiteReport {
    /// Whether the suite as a whole succeeded.
    pub success: bool,
    /// The text the tool wrote to its console, for display.
    pub pretty: String,
    pub failed_tests: BTreeSet<String>,
    pub raw: Vec<ReportRecord>,
}

impl SuiteReport {
    pub fn from_raw(
        captured_stdout: String,
        raw: Vec<ReportRecord>,
    ) -> Result<Self, GraderError> {
        let success = Self::read_success(&raw)?;
        let failed_tests = Self::read_failed_tests(&raw);

        Ok(Self {
            success,
            pretty: captured_stdout,
            failed_tests,
            raw,
        })
    }

    fn read_success(raw: &[ReportRecord]) -> Result<bool, GraderError> {
        for record in raw {
            if let Some(exitstatus) = record.exitstatus {
                return Ok(exitstatus == 0);
            }
        }

        Err(report_context().report(
            ErrorKind::MalformedReport {
                detail: "cannot find exitstatus in suite report log".to_string(),
            },
            unspanned(),
        ))
    }

    fn read_failed_tests(raw: &[ReportRecord]) -> BTreeSet<String> {
        let mut failed = BTreeSet::new();
        for record in raw {
            let (Some(nodeid), Some(outcome)) = (&record.nodeid, &record.outcome) else {
                continue;
            };
            if nodeid.is_empty() {
                continue;
            }
            if outcome == "failed" {
                failed.insert(nodeid.clone());
            }
        }
        failed
    }
}

/// Run the external suite over a test file, optionally collecting coverage
/// for the given modules.
///
/// Blocks until the subprocess terminates; timeout policy belongs to the
/// surrounding infrastructure. The coverage document may be absent even
/// when modules were requested, if the run imported none of them.
pub fn run_suite(
    root: &Path,
    test_file: &Path,
    cov_modules: &BTreeSet<String>,
) -> Result<(String, Vec<ReportRecord>, Option<CoverageDoc>), GraderError> {
    let ctx = report_context();
    let invocation_error = |detail: String| {
        ctx.report(ErrorKind::SuiteInvocation { detail }, unspanned())
    };

    let log_file = NamedTempFile::new().map_err(|e| invocation_error(e.to_string()))?;
    let cov_file = NamedTempFile::new().map_err(|e| invocation_error(e.to_string()))?;

    let mut command = Command::new(SUITE_COMMAND);
    command.arg(format!("--report-log={}", log_file.path().display()));

    if !cov_modules.is_empty() {
        for module in cov_modules {
            command.arg(format!("--cov={}", module));
        }
        command.arg(format!("--cov-report=json:{}", cov_file.path().display()));
    }

    command.arg(test_file);
    command.current_dir(root);

    let output = command
        .output()
        .map_err(|e| invocation_error(format!("{}: {}", SUITE_COMMAND, e)))?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

    let log_text = std::fs::read_to_string(log_file.path())
        .map_err(|e| invocation_error(e.to_string()))?;
    let raw = parse_report_log(&log_text)?;

    let raw_cov = if cov_modules.is_empty() {
        None
    } else {
        let cov_text = std::fs::read_to_string(cov_file.path())
            .map_err(|e| invocation_error(e.to_string()))?;
        if cov_text.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&cov_text).map_err(|e| {
                ctx.report(
                    ErrorKind::MalformedReport {
                        detail: e.to_string(),
                    },
                    unspanned(),
                )
            })?)
        }
    };

    Ok((stdout, raw, raw_cov))
}

/// Everything produced by one suite-grading run.
#[derive(Debug)]
pub struct SuiteRun {
    pub report: ContainerReport,
    pub suite: SuiteReport,
    pub coverage: CoverageReport,
}

/// A grading container gated on the candidate's own test suite: one case
/// for the suite outcome, one coverage case per declared module.
#[derive(Debug)]
pub struct SuiteGrader {
    name: String,
    suite_module: Option<String>,
    coverage_modules: BTreeSet<String>,
}

impl SuiteGrader {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            suite_module: None,
            coverage_modules: BTreeSet::new(),
        }
    }

    /// Declare the module holding the candidate's test suite. Exactly one
    /// is supported; a second declaration fails fast.
    pub fn suite_module(mut self, module: impl Into<String>) -> Result<Self, GraderError> {
        if self.suite_module.is_some() {
            return Err(report_context().report(
                ErrorKind::DuplicateDeclaration {
                    role: "suite module".to_string(),
                },
                unspanned(),
            ));
        }
        self.suite_module = Some(module.into());
        Ok(self)
    }

    /// Declare a module whose coverage must be complete.
    pub fn coverage_module(mut self, module: impl Into<String>) -> Self {
        self.coverage_modules.insert(module.into());
        self
    }

    /// Run the external suite once and derive all cases from its reports.
    pub fn run(&self, session: &mut GradingSession) -> Result<SuiteRun, GraderError> {
        let suite_module = self.suite_module.as_deref().ok_or_else(|| {
            report_context().report(
                ErrorKind::ConfigurationMissing {
                    attribute: "suite module".to_string(),
                    consulted: format!("suite grader {}", self.name),
                },
                unspanned(),
            )
        })?;

        let root = session.submission_root();
        let test_file = module_to_path(suite_module, &root)?;
        let (stdout, raw, raw_cov) = run_suite(&root, &test_file, &self.coverage_modules)?;

        let suite = SuiteReport::from_raw(stdout, raw)?;
        let coverage = CoverageReport::build(&self.coverage_modules, raw_cov.as_ref(), &root)?;

        session.current_output().emit(&coverage.to_string(), None);

        let mut cases = Vec::new();
        cases.push(self.suite_case(suite_module, &suite));
        for module in &self.coverage_modules {
            cases.push(self.coverage_case(module, &coverage));
        }

        Ok(SuiteRun {
            report: ContainerReport {
                container: self.name.clone(),
                cases,
            },
            suite,
            coverage,
        })
    }

    fn suite_case(&self, suite_module: &str, suite: &SuiteReport) -> CaseReport {
        let outcome = if suite.success {
            CaseOutcome::Passed
        } else {
            let failing: Vec<&str> = suite
                .failed_tests
                .iter()
                .map(String::as_str)
                .collect();
            CaseOutcome::Failed(report_context().assertion_failure(format!(
                "held-out suite reported failures: [{}]",
                failing.join(", ")
            )))
        };

        CaseReport {
            name: format!("suite {}", suite_module),
            outcome,
            weight: None,
        }
    }

    fn coverage_case(&self, module: &str, coverage: &CoverageReport) -> CaseReport {
        let outcome = match coverage.modules.get(module) {
            Some(cov) if cov.is_complete() => CaseOutcome::Passed,
            Some(cov) if !cov.imported => CaseOutcome::Failed(
                report_context()
                    .assertion_failure(format!("module `{}` was never imported", module)),
            ),
            Some(cov) => {
                let lines: Vec<String> = cov
                    .missing_lines
                    .iter()
                    .flatten()
                    .map(|line| line.to_string())
                    .collect();
                CaseOutcome::Failed(report_context().assertion_failure(format!(
                    "module `{}` has uncovered lines: [{}]",
                    module,
                    lines.join(", ")
                )))
            }
            None => CaseOutcome::Errored(report_context().report(
                ErrorKind::MalformedReport {
                    detail: format!("coverage report omits module `{}`", module),
                },
                unspanned(),
            )),
        };

        CaseReport {
            name: format!("coverage {}", module),
            outcome,
            weight: None,
        }
    }
}

fn report_context() -> ReportingContext {
    ReportingContext::internal("report")
}
