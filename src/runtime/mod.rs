//! Runtime for the grading language: values, output sinks, builtin atoms,
//! and the evaluator.

pub mod atoms;
pub mod eval;
pub mod output;
pub mod value;

pub use atoms::{build_default_atom_registry, AtomFn, AtomRegistry};
pub use eval::{call_callable, call_lambda, evaluate, execute_top_level, EvaluationContext};
pub use output::{NullSink, OutputBuffer, OutputRedirect, OutputSink, SharedOutput, StdoutSink};
pub use value::{new_scope, LambdaValue, ModuleScope, Value};
