//! Consumption of external test and coverage reports, and the suite-gated
//! grading container built on them.

pub mod coverage;
pub mod suite;

pub use coverage::{CoverageDoc, CoverageReport, FileCoverage, ModuleCoverage};
pub use suite::{parse_report_log, run_suite, ReportRecord, SuiteGrader, SuiteReport, SuiteRun};
