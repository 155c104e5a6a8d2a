//! Shared helpers for the integration tests.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use gradus::runtime::{OutputBuffer, SharedOutput};
use gradus::GradingSession;

/// Path to a checked-in fixture directory.
#[allow(dead_code)]
pub fn fixture_dir(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// A session whose module output is captured in a buffer.
#[allow(dead_code)]
pub fn buffered_session() -> (GradingSession, Rc<RefCell<OutputBuffer>>) {
    let (output, capture) = SharedOutput::buffered();
    (GradingSession::with_shared_output(output), capture)
}

/// Write a grading-language module into a directory, returning its path.
#[allow(dead_code)]
pub fn write_module(dir: &Path, name: &str, source: &str) -> PathBuf {
    let path = dir.join(format!("{}.gr", name));
    std::fs::write(&path, source).expect("write fixture module");
    path
}
