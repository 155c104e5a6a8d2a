//! Output sinks for module and grading output.
//!
//! All printing performed by loaded modules goes through an [`OutputSink`],
//! which makes untrusted top-level output suppressible and test output
//! capturable without touching process-level stdout.

use std::cell::RefCell;
use std::rc::Rc;

use crate::syntax::Span;

/// Output sink for `print`, to make module I/O testable and injectable.
pub trait OutputSink {
    fn emit(&mut self, text: &str, span: Option<&Span>);
}

/// A null output sink: swallows everything. Used while executing untrusted
/// top-level candidate code.
pub struct NullSink;

impl OutputSink for NullSink {
    fn emit(&mut self, _text: &str, _span: Option<&Span>) {}
}

/// OutputBuffer: collects output into a String for testing or programmatic
/// capture.
pub struct OutputBuffer {
    pub buffer: String,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for OutputBuffer {
    fn emit(&mut self, text: &str, _span: Option<&Span>) {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(text);
    }
}

/// StdoutSink: writes output to stdout for default runner use.
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn emit(&mut self, text: &str, _span: Option<&Span>) {
        println!("{}", text);
    }
}

/// Shared, clonable handle to an output sink.
#[derive(Clone)]
pub struct SharedOutput(pub Rc<RefCell<dyn OutputSink>>);

impl SharedOutput {
    pub fn new(sink: impl OutputSink + 'static) -> Self {
        Self(Rc::new(RefCell::new(sink)))
    }

    pub fn null() -> Self {
        Self::new(NullSink)
    }

    pub fn stdout() -> Self {
        Self::new(StdoutSink)
    }

    /// A buffer sink plus a handle for reading what was captured.
    pub fn buffered() -> (Self, Rc<RefCell<OutputBuffer>>) {
        let buffer = Rc::new(RefCell::new(OutputBuffer::new()));
        (Self(buffer.clone()), buffer)
    }

    pub fn emit(&self, text: &str, span: Option<&Span>) {
        self.0.borrow_mut().emit(text, span);
    }
}

/// Scoped redirection of a session's output slot, restored on every exit
/// path including unwinding.
pub struct OutputRedirect {
    slot: Rc<RefCell<SharedOutput>>,
    saved: Option<SharedOutput>,
}

impl OutputRedirect {
    pub fn install(slot: Rc<RefCell<SharedOutput>>, sink: SharedOutput) -> Self {
        let saved = slot.replace(sink);
        Self {
            slot,
            saved: Some(saved),
        }
    }
}

impl Drop for OutputRedirect {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.slot.replace(saved);
        }
    }
}
