//! Evaluation of the grading language: atoms, special forms, and error
//! propagation.

use std::rc::Rc;

use pretty_assertions::assert_eq;

use gradus::runtime::{
    build_default_atom_registry, evaluate, new_scope, EvaluationContext, SharedOutput, Value,
};
use gradus::syntax::parser::parse;
use gradus::{ErrorCategory, ErrorKind, GraderError, SourceContext};

fn eval_program_with(source: &str, output: SharedOutput) -> Result<Value, GraderError> {
    let context = SourceContext::from_file("test.gr", source);
    let nodes = parse(source, context.clone())?;

    let mut ctx = EvaluationContext::new(
        new_scope(),
        output,
        context,
        Rc::new(build_default_atom_registry()),
    );

    let mut last = Value::Nil;
    for node in &nodes {
        last = evaluate(node, &mut ctx)?;
    }
    Ok(last)
}

fn eval_program(source: &str) -> Result<Value, GraderError> {
    eval_program_with(source, SharedOutput::null())
}

#[test]
fn arithmetic_atoms() {
    assert_eq!(eval_program("(+ 1 2 3)").unwrap(), Value::Number(6.0));
    assert_eq!(eval_program("(- 10 4 1)").unwrap(), Value::Number(5.0));
    assert_eq!(eval_program("(- 3)").unwrap(), Value::Number(-3.0));
    assert_eq!(eval_program("(* 2 3.5)").unwrap(), Value::Number(7.0));
    assert_eq!(eval_program("(/ 10 4)").unwrap(), Value::Number(2.5));
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let error = eval_program("(/ 1 0)").expect_err("must fail");
    assert_eq!(error.kind, ErrorKind::DivisionByZero);
    assert_eq!(error.kind.category(), ErrorCategory::Runtime);
}

#[test]
fn comparison_and_logic_atoms() {
    assert_eq!(eval_program("(= 2 2 2)").unwrap(), Value::Bool(true));
    assert_eq!(eval_program("(!= 2 3)").unwrap(), Value::Bool(true));
    assert_eq!(eval_program("(< 1 2 3)").unwrap(), Value::Bool(true));
    assert_eq!(eval_program("(>= 3 3 2)").unwrap(), Value::Bool(true));
    assert_eq!(eval_program("(not nil)").unwrap(), Value::Bool(true));
    assert_eq!(eval_program("(and true 1 \"x\")").unwrap(), Value::Bool(true));
    assert_eq!(eval_program("(or false 0)").unwrap(), Value::Bool(false));
}

#[test]
fn list_and_string_atoms() {
    assert_eq!(
        eval_program("(nth (list 10 20 30) 1)").unwrap(),
        Value::Number(20.0)
    );
    assert_eq!(eval_program("(len (list 1 2 3))").unwrap(), Value::Number(3.0));
    assert_eq!(
        eval_program("(append (list 1) 2 3)").unwrap(),
        Value::List(vec![
            Value::Number(1.0),
            Value::Number(2.0),
            Value::Number(3.0)
        ])
    );
    assert_eq!(
        eval_program("(str \"a=\" (+ 1 1))").unwrap(),
        Value::String("a=2".into())
    );
    assert_eq!(
        eval_program("(upper \"abc\")").unwrap(),
        Value::String("ABC".into())
    );
    assert_eq!(
        eval_program("(trim \"  x \")").unwrap(),
        Value::String("x".into())
    );
}

#[test]
fn map_atoms() {
    assert_eq!(
        eval_program("(get (map \"a\" 1 \"b\" 2) \"b\")").unwrap(),
        Value::Number(2.0)
    );
    assert_eq!(
        eval_program("(get (assoc (map) \"k\" 9) \"k\")").unwrap(),
        Value::Number(9.0)
    );
    assert_eq!(eval_program("(get (map \"a\" 1) \"z\")").unwrap(), Value::Nil);
}

#[test]
fn define_and_call() {
    let source = "(define (double x) (* x 2)) (double 21)";
    assert_eq!(eval_program(source).unwrap(), Value::Number(42.0));
}

#[test]
fn module_level_recursion_resolves_at_call_time() {
    let source = "
        (define (fib n)
          (if (< n 2)
              n
              (+ (fib (- n 1)) (fib (- n 2)))))
        (fib 10)";
    assert_eq!(eval_program(source).unwrap(), Value::Number(55.0));
}

#[test]
fn lambda_values_are_callable() {
    assert_eq!(
        eval_program("((lambda (x) (+ x 1)) 2)").unwrap(),
        Value::Number(3.0)
    );

    let source = "
        (define inc (lambda (x) (+ x 1)))
        (inc 41)";
    assert_eq!(eval_program(source).unwrap(), Value::Number(42.0));
}

#[test]
fn let_bindings_shadow_in_order() {
    let source = "(let ((x 2) (y (* x 3))) (+ x y))";
    assert_eq!(eval_program(source).unwrap(), Value::Number(8.0));
}

#[test]
fn if_branches_on_truthiness() {
    assert_eq!(eval_program("(if 0 \"t\" \"f\")").unwrap(), Value::String("f".into()));
    assert_eq!(eval_program("(if (list) \"t\" \"f\")").unwrap(), Value::String("t".into()));
    assert_eq!(eval_program("(if false 1)").unwrap(), Value::Nil);
}

#[test]
fn undefined_symbol_reports_its_name() {
    let error = eval_program("(mystery 1)").expect_err("must fail");
    assert_eq!(
        error.kind,
        ErrorKind::UndefinedSymbol {
            symbol: "mystery".into()
        }
    );
}

#[test]
fn arity_mismatch_is_reported() {
    let error = eval_program("(define (one x) x) (one 1 2)").expect_err("must fail");
    assert!(matches!(error.kind, ErrorKind::ArityMismatch { actual: 2, .. }));
}

#[test]
fn error_atom_raises() {
    let error = eval_program("(error \"boom\" 7)").expect_err("must fail");
    assert_eq!(
        error.kind,
        ErrorKind::Raised {
            message: "boom 7".into()
        }
    );
}

#[test]
fn runaway_recursion_hits_the_depth_limit() {
    let error = eval_program("(define (loop) (loop)) (loop)").expect_err("must fail");
    assert_eq!(error.kind, ErrorKind::RecursionLimit);
}

#[test]
fn print_writes_to_the_injected_sink() {
    let (output, capture) = SharedOutput::buffered();
    eval_program_with("(print \"score:\" (+ 1 2)) (print \"done\")", output).unwrap();
    assert_eq!(capture.borrow().as_str(), "score: 3\ndone");
}
