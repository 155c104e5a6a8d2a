//! Consumption of the external coverage document.
//!
//! The coverage tool emits a JSON document keyed by file path; each entry
//! carries the source lines the test run never exercised. The harness maps
//! paths back to logical module names and synthesizes a "not imported"
//! entry for any requested module absent from the document.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::loader::path_to_module;
use crate::GraderError;

/// Raw coverage document as emitted by the external tool.
#[derive(Debug, Clone, Deserialize)]
pub struct CoverageDoc {
    pub files: BTreeMap<String, FileCoverage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileCoverage {
    #[serde(default)]
    pub missing_lines: Vec<u64>,
}

/// Coverage of one logical module.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleCoverage {
    pub imported: bool,
    pub missing_lines: Option<BTreeSet<u64>>,
}

impl ModuleCoverage {
    fn from_file_coverage(info: &FileCoverage) -> Self {
        Self {
            imported: true,
            missing_lines: Some(info.missing_lines.iter().copied().collect()),
        }
    }

    /// Fully covered: imported with no unexercised lines.
    pub fn is_complete(&self) -> bool {
        self.imported
            && self
                .missing_lines
                .as_ref()
                .is_some_and(|lines| lines.is_empty())
    }
}

/// Coverage report over the requested modules, including files listed but
/// never imported by the test run.
#[derive(Debug, Clone)]
pub struct CoverageReport {
    pub modules: BTreeMap<String, ModuleCoverage>,
}

impl CoverageReport {
    /// Build a report from the raw document. The document may be absent
    /// entirely when the run imported none of the requested files.
    pub fn build(
        cov_modules: &BTreeSet<String>,
        raw: Option<&CoverageDoc>,
        search_path: &Path,
    ) -> Result<Self, GraderError> {
        let mut modules = BTreeMap::new();
        let mut included = BTreeSet::new();

        if let Some(doc) = raw {
            for (file_name, info) in &doc.files {
                let mod_name = path_to_module(Path::new(file_name), search_path)?;
                included.insert(mod_name.clone());
                modules.insert(mod_name, ModuleCoverage::from_file_coverage(info));
            }
        }

        for module in cov_modules.difference(&included) {
            modules.insert(
                module.clone(),
                ModuleCoverage {
                    imported: false,
                    missing_lines: None,
                },
            );
        }

        Ok(Self { modules })
    }
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Coverage:")?;
        for (name, coverage) in &self.modules {
            if !coverage.imported {
                writeln!(f, "  {}: never imported by the test run", name)?;
                continue;
            }
            match &coverage.missing_lines {
                Some(lines) if lines.is_empty() => writeln!(f, "  {}: fully covered", name)?,
                Some(lines) => {
                    let rendered: Vec<String> =
                        lines.iter().map(|line| line.to_string()).collect();
                    writeln!(f, "  {}: lines not covered: [{}]", name, rendered.join(", "))?;
                }
                None => writeln!(f, "  {}: no line data", name)?,
            }
        }
        Ok(())
    }
}
