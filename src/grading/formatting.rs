//! Handles user-facing output for grading reports.
//!
//! Rendering is split from printing so containers can emit listings into
//! any output sink; the colored printers are for terminal use.

use difference::{Changeset, Difference};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::grading::container::ContainerReport;
use crate::grading::differential::CaseOutcome;
use crate::loader::LoadFailure;
use crate::runtime::Value;

pub fn h_rule() -> String {
    "-".repeat(80)
}

pub fn quoted_listing<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    items
        .into_iter()
        .map(|item| format!("'{}'", item))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Itemized report of failed candidate loads, split into apparently-missing
/// and raised-during-load categories, with a single-level diagnostic line
/// per failure. Never includes the full error chain: the grading harness
/// is not a debugger for candidate code.
pub fn render_load_failures(failures: &[LoadFailure]) -> String {
    let mut out = String::new();

    let files: Vec<&str> = failures.iter().map(|f| f.filename.as_str()).collect();
    out.push_str(&format!(
        "Failed to load the following files: [{}].\n\n",
        quoted_listing(files)
    ));

    let missing: Vec<&str> = failures
        .iter()
        .filter(|f| f.missing)
        .map(|f| f.filename.as_str())
        .collect();
    if !missing.is_empty() {
        out.push_str(&format!(
            "The following files appear to be missing: [{}]\n",
            quoted_listing(missing)
        ));
        out.push_str(
            "Make sure you have submitted the correct files and that you have \
             named your files properly.\n\n",
        );
    }

    let broken: Vec<&str> = failures
        .iter()
        .filter(|f| !f.missing)
        .map(|f| f.filename.as_str())
        .collect();
    if !broken.is_empty() {
        out.push_str(&format!(
            "An error occurred while loading the following files: [{}]\n\n",
            quoted_listing(broken)
        ));
    }

    for failure in failures {
        out.push_str(&h_rule());
        out.push('\n');
        out.push_str(&format!("While loading '{}':\n", failure.filename));
        out.push_str(&format!("  {}\n", failure.summary()));
    }

    out
}

/// Line diff of two value renderings for assertion-failure messages.
pub fn render_value_diff(expected: &Value, actual: &Value) -> String {
    let changeset = Changeset::new(&expected.to_string(), &actual.to_string(), "\n");
    let mut out = String::new();
    for diff in &changeset.diffs {
        match diff {
            Difference::Same(text) => {
                for line in text.lines() {
                    out.push_str(&format!(" {}\n", line));
                }
            }
            Difference::Add(text) => {
                for line in text.lines() {
                    out.push_str(&format!("+{}\n", line));
                }
            }
            Difference::Rem(text) => {
                for line in text.lines() {
                    out.push_str(&format!("-{}\n", line));
                }
            }
        }
    }
    out.trim_end().to_string()
}

/// Prints a container report to the terminal with colored outcome labels.
pub fn print_report(report: &ContainerReport) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    let _ = stdout.set_color(ColorSpec::new().set_bold(true));
    println!("{}", report.container);
    let _ = stdout.reset();

    for case in &report.cases {
        let color = match case.outcome {
            CaseOutcome::Passed => Color::Green,
            CaseOutcome::Failed(_) => Color::Red,
            CaseOutcome::Errored(_) => Color::Yellow,
        };
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
        print!("{:>5}", case.outcome.label());
        let _ = stdout.reset();
        println!("  {}", case.name);

        match &case.outcome {
            CaseOutcome::Failed(error) | CaseOutcome::Errored(error) => {
                for line in error.to_string().lines() {
                    println!("       {}", line);
                }
            }
            CaseOutcome::Passed => {}
        }
    }

    println!(
        "{} passed, {} failed, {} errored",
        report.passed(),
        report.failed(),
        report.errored()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_listing_quotes_each_item() {
        assert_eq!(quoted_listing(["a.gr", "b.gr"]), "'a.gr', 'b.gr'");
    }

    #[test]
    fn value_diff_marks_divergent_lines() {
        let diff = render_value_diff(
            &Value::String("hello".into()),
            &Value::String("goodbye".into()),
        );
        assert!(diff.contains("-hello"));
        assert!(diff.contains("+goodbye"));
    }
}
