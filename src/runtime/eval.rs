//! Core evaluator for the grading language.
//!
//! The evaluator is deliberately small: literals, symbols, calls, and the
//! handful of special forms module authors need (`define`, `lambda`, `if`,
//! `do`, `let`, `and`, `or`). Module-level bindings live in a shared
//! [`ModuleScope`] so recursion and cross-function references resolve at
//! call time.

use std::collections::HashMap;
use std::rc::Rc;

use crate::errors::{to_source_span, ErrorKind, ErrorReporting, SourceContext};
use crate::errors::{DiagnosticInfo, SourceInfo};
use crate::runtime::atoms::AtomRegistry;
use crate::runtime::output::SharedOutput;
use crate::runtime::value::{LambdaValue, ModuleScope, Value};
use crate::syntax::{parser, AstNode, Expr, Span};
use crate::GraderError;

/// Evaluation state for one call chain.
pub struct EvaluationContext {
    pub env: HashMap<String, Value>,
    pub scope: ModuleScope,
    pub output: SharedOutput,
    pub source: SourceContext,
    pub atoms: Rc<AtomRegistry>,
    pub depth: usize,
    pub max_depth: usize,
}

impl EvaluationContext {
    pub fn new(
        scope: ModuleScope,
        output: SharedOutput,
        source: SourceContext,
        atoms: Rc<AtomRegistry>,
    ) -> Self {
        let mut env = HashMap::new();
        env.insert("nil".to_string(), Value::Nil);

        Self {
            env,
            scope,
            output,
            source,
            atoms,
            depth: 0,
            max_depth: 1000,
        }
    }

    pub fn with_settings(
        scope: ModuleScope,
        output: SharedOutput,
        source: SourceContext,
        atoms: Rc<AtomRegistry>,
        max_depth: usize,
    ) -> Self {
        let mut ctx = Self::new(scope, output, source, atoms);
        ctx.max_depth = max_depth;
        ctx
    }

    /// Create a new lexical frame sharing this context's module scope.
    fn child(&self, env: HashMap<String, Value>) -> Self {
        Self {
            env,
            scope: self.scope.clone(),
            output: self.output.clone(),
            source: self.source.clone(),
            atoms: self.atoms.clone(),
            depth: self.depth + 1,
            max_depth: self.max_depth,
        }
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.env.get(name) {
            return Some(value.clone());
        }
        self.scope.borrow().get(name).cloned()
    }
}

impl ErrorReporting for EvaluationContext {
    fn report(&self, kind: ErrorKind, span: miette::SourceSpan) -> GraderError {
        GraderError {
            source_info: SourceInfo {
                source: self.source.to_named_source(),
                primary_span: span,
                phase: "eval".to_string(),
            },
            diagnostic_info: DiagnosticInfo {
                help: None,
                error_code: format!("gradus::eval::{}", kind.code_suffix()),
            },
            kind,
        }
    }
}

// ============================================================================
// CORE EVALUATION
// ============================================================================

/// Main evaluation entry point.
pub fn evaluate(expr: &AstNode, ctx: &mut EvaluationContext) -> Result<Value, GraderError> {
    if ctx.depth > ctx.max_depth {
        return Err(ctx.report(ErrorKind::RecursionLimit, to_source_span(expr.span)));
    }

    match &*expr.value {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Symbol(name) => ctx
            .lookup(name)
            .ok_or_else(|| ctx.undefined_symbol(name, to_source_span(expr.span))),
        Expr::List(items) => evaluate_form(items, expr.span, ctx),
    }
}

/// Execute a module's top-level forms in order. `define` forms populate the
/// context's module scope; every other form runs for effect.
pub fn execute_top_level(
    nodes: &[AstNode],
    ctx: &mut EvaluationContext,
) -> Result<(), GraderError> {
    for node in nodes {
        evaluate(node, ctx)?;
    }
    Ok(())
}

fn evaluate_form(
    items: &[AstNode],
    span: Span,
    ctx: &mut EvaluationContext,
) -> Result<Value, GraderError> {
    let Some(head) = items.first() else {
        return Ok(Value::Nil);
    };
    let tail = &items[1..];

    if let Some(name) = head.as_symbol() {
        match name {
            "define" => return special_define(tail, span, ctx),
            "lambda" => return special_lambda(tail, span, ctx),
            "if" => return special_if(tail, span, ctx),
            "do" => return special_do(tail, ctx),
            "let" => return special_let(tail, span, ctx),
            "and" => return special_and(tail, ctx),
            "or" => return special_or(tail, ctx),
            _ => {}
        }

        if let Some(callable) = ctx.lookup(name) {
            let args = evaluate_args(tail, ctx)?;
            return call_callable(&callable, &args, &head.span, ctx);
        }

        if let Some(atom) = ctx.atoms.get(name) {
            let args = evaluate_args(tail, ctx)?;
            return atom(&args, ctx, &head.span);
        }

        return Err(ctx.undefined_symbol(name, to_source_span(head.span)));
    }

    let callable = evaluate(head, ctx)?;
    let args = evaluate_args(tail, ctx)?;
    call_callable(&callable, &args, &head.span, ctx)
}

fn evaluate_args(
    args: &[AstNode],
    ctx: &mut EvaluationContext,
) -> Result<Vec<Value>, GraderError> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(evaluate(arg, ctx)?);
    }
    Ok(values)
}

/// Invoke a callable value with already-evaluated arguments.
pub fn call_callable(
    callable: &Value,
    args: &[Value],
    span: &Span,
    ctx: &mut EvaluationContext,
) -> Result<Value, GraderError> {
    match callable {
        Value::Lambda(lambda) => call_lambda(lambda, args, span, ctx),
        other => Err(ctx.type_mismatch("callable", other.type_name(), to_source_span(*span))),
    }
}

/// Call a lambda: bind parameters over its captured frame and evaluate the
/// body against the lambda's own module scope.
pub fn call_lambda(
    lambda: &LambdaValue,
    args: &[Value],
    span: &Span,
    ctx: &mut EvaluationContext,
) -> Result<Value, GraderError> {
    if args.len() != lambda.params.len() {
        return Err(ctx.arity_mismatch(
            &lambda.params.len().to_string(),
            args.len(),
            to_source_span(*span),
        ));
    }

    let mut env = lambda.captured.clone();
    env.insert("nil".to_string(), Value::Nil);
    for (param, arg) in lambda.params.iter().zip(args) {
        env.insert(param.clone(), arg.clone());
    }

    let mut child = ctx.child(env);
    child.scope = lambda.scope.clone();
    evaluate(&lambda.body, &mut child)
}

// ============================================================================
// SPECIAL FORMS
// ============================================================================

fn special_define(
    tail: &[AstNode],
    span: Span,
    ctx: &mut EvaluationContext,
) -> Result<Value, GraderError> {
    let Some(target) = tail.first() else {
        return Err(ctx.malformed_construct("define form", to_source_span(span)));
    };

    match &*target.value {
        // (define name expr)
        Expr::Symbol(name) => {
            if tail.len() != 2 {
                return Err(ctx.malformed_construct("define form", to_source_span(span)));
            }
            let value = evaluate(&tail[1], ctx)?;
            ctx.scope.borrow_mut().insert(name.clone(), value);
            Ok(Value::Nil)
        }
        // (define (name params...) body...)
        Expr::List(signature) => {
            let Some(name) = signature.first().and_then(AstNode::as_symbol) else {
                return Err(ctx.malformed_construct("define signature", to_source_span(span)));
            };
            let params = parameter_names(&signature[1..], span, ctx)?;
            if tail.len() < 2 {
                return Err(ctx.malformed_construct("define body", to_source_span(span)));
            }
            let body = parser::wrap_in_do(tail[1..].to_vec());
            let lambda = Value::Lambda(Rc::new(LambdaValue {
                params,
                body,
                captured: ctx.env.clone(),
                scope: ctx.scope.clone(),
            }));
            ctx.scope.borrow_mut().insert(name.to_string(), lambda);
            Ok(Value::Nil)
        }
        _ => Err(ctx.malformed_construct("define form", to_source_span(span))),
    }
}

fn special_lambda(
    tail: &[AstNode],
    span: Span,
    ctx: &mut EvaluationContext,
) -> Result<Value, GraderError> {
    let Some(param_list) = tail.first().and_then(AstNode::as_list) else {
        return Err(ctx.malformed_construct("lambda parameter list", to_source_span(span)));
    };
    if tail.len() < 2 {
        return Err(ctx.malformed_construct("lambda body", to_source_span(span)));
    }

    let params = parameter_names(param_list, span, ctx)?;
    let body = parser::wrap_in_do(tail[1..].to_vec());
    Ok(Value::Lambda(Rc::new(LambdaValue {
        params,
        body,
        captured: ctx.env.clone(),
        scope: ctx.scope.clone(),
    })))
}

fn special_if(
    tail: &[AstNode],
    span: Span,
    ctx: &mut EvaluationContext,
) -> Result<Value, GraderError> {
    if tail.len() < 2 || tail.len() > 3 {
        return Err(ctx.malformed_construct("if form", to_source_span(span)));
    }
    let condition = evaluate(&tail[0], ctx)?;
    if condition.is_truthy() {
        evaluate(&tail[1], ctx)
    } else if let Some(else_branch) = tail.get(2) {
        evaluate(else_branch, ctx)
    } else {
        Ok(Value::Nil)
    }
}

fn special_do(tail: &[AstNode], ctx: &mut EvaluationContext) -> Result<Value, GraderError> {
    let mut result = Value::Nil;
    for node in tail {
        result = evaluate(node, ctx)?;
    }
    Ok(result)
}

fn special_let(
    tail: &[AstNode],
    span: Span,
    ctx: &mut EvaluationContext,
) -> Result<Value, GraderError> {
    let Some(bindings) = tail.first().and_then(AstNode::as_list) else {
        return Err(ctx.malformed_construct("let bindings", to_source_span(span)));
    };
    if tail.len() < 2 {
        return Err(ctx.malformed_construct("let body", to_source_span(span)));
    }

    let mut child = ctx.child(ctx.env.clone());
    for binding in bindings {
        let Some(pair) = binding.as_list() else {
            return Err(ctx.malformed_construct("let binding", to_source_span(binding.span)));
        };
        let (Some(name), 2) = (pair.first().and_then(AstNode::as_symbol), pair.len()) else {
            return Err(ctx.malformed_construct("let binding", to_source_span(binding.span)));
        };
        let value = evaluate(&pair[1], &mut child)?;
        child.env.insert(name.to_string(), value);
    }

    let body = parser::wrap_in_do(tail[1..].to_vec());
    evaluate(&body, &mut child)
}

fn special_and(tail: &[AstNode], ctx: &mut EvaluationContext) -> Result<Value, GraderError> {
    for node in tail {
        if !evaluate(node, ctx)?.is_truthy() {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn special_or(tail: &[AstNode], ctx: &mut EvaluationContext) -> Result<Value, GraderError> {
    for node in tail {
        if evaluate(node, ctx)?.is_truthy() {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn parameter_names(
    nodes: &[AstNode],
    span: Span,
    ctx: &EvaluationContext,
) -> Result<Vec<String>, GraderError> {
    nodes
        .iter()
        .map(|node| {
            node.as_symbol().map(str::to_string).ok_or_else(|| {
                ctx.malformed_construct("parameter name", to_source_span(span))
            })
        })
        .collect()
}
