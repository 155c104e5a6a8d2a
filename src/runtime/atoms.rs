//! Builtin atoms of the grading language.
//!
//! Atoms receive already-evaluated arguments. The registry is the single
//! source of truth for builtins: it is constructed once per session through
//! [`build_default_atom_registry`] and shared by every evaluation context.

use std::collections::HashMap;

use crate::errors::{to_source_span, ErrorKind, ErrorReporting};
use crate::runtime::eval::EvaluationContext;
use crate::runtime::value::Value;
use crate::syntax::Span;
use crate::GraderError;

/// Signature of a builtin atom.
pub type AtomFn = fn(&[Value], &mut EvaluationContext, &Span) -> Result<Value, GraderError>;

/// Registry for all atoms, inspectable at runtime.
#[derive(Default, Clone)]
pub struct AtomRegistry {
    atoms: HashMap<String, AtomFn>,
}

impl AtomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<AtomFn> {
        self.atoms.get(name).copied()
    }

    pub fn has(&self, name: &str) -> bool {
        self.atoms.contains_key(name)
    }

    pub fn register(&mut self, name: &str, func: AtomFn) {
        self.atoms.insert(name.to_string(), func);
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.atoms.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Builds and returns a fully populated atom registry with all standard
/// atoms registered.
pub fn build_default_atom_registry() -> AtomRegistry {
    let mut registry = AtomRegistry::new();

    registry.register("+", atom_add);
    registry.register("-", atom_sub);
    registry.register("*", atom_mul);
    registry.register("/", atom_div);

    registry.register("=", atom_eq);
    registry.register("!=", atom_ne);
    registry.register("<", atom_lt);
    registry.register(">", atom_gt);
    registry.register("<=", atom_le);
    registry.register(">=", atom_ge);
    registry.register("not", atom_not);

    registry.register("list", atom_list);
    registry.register("nth", atom_nth);
    registry.register("len", atom_len);
    registry.register("append", atom_append);

    registry.register("str", atom_str);
    registry.register("upper", atom_upper);
    registry.register("lower", atom_lower);
    registry.register("trim", atom_trim);

    registry.register("map", atom_map);
    registry.register("get", atom_get);
    registry.register("assoc", atom_assoc);

    registry.register("print", atom_print);
    registry.register("error", atom_error);

    registry
}

// ============================================================================
// HELPERS
// ============================================================================

fn expect_number(
    value: &Value,
    ctx: &EvaluationContext,
    span: &Span,
) -> Result<f64, GraderError> {
    value
        .as_number()
        .ok_or_else(|| ctx.type_mismatch("Number", value.type_name(), to_source_span(*span)))
}

fn expect_string<'v>(
    value: &'v Value,
    ctx: &EvaluationContext,
    span: &Span,
) -> Result<&'v str, GraderError> {
    value
        .as_str()
        .ok_or_else(|| ctx.type_mismatch("String", value.type_name(), to_source_span(*span)))
}

fn expect_arity(
    args: &[Value],
    expected: usize,
    ctx: &EvaluationContext,
    span: &Span,
) -> Result<(), GraderError> {
    if args.len() != expected {
        return Err(ctx.arity_mismatch(&expected.to_string(), args.len(), to_source_span(*span)));
    }
    Ok(())
}

// ============================================================================
// ARITHMETIC
// ============================================================================

fn atom_add(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    let mut total = 0.0;
    for arg in args {
        total += expect_number(arg, ctx, span)?;
    }
    Ok(Value::Number(total))
}

fn atom_sub(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    match args {
        [] => Err(ctx.arity_mismatch("at least 1", 0, to_source_span(*span))),
        [only] => Ok(Value::Number(-expect_number(only, ctx, span)?)),
        [first, rest @ ..] => {
            let mut total = expect_number(first, ctx, span)?;
            for arg in rest {
                total -= expect_number(arg, ctx, span)?;
            }
            Ok(Value::Number(total))
        }
    }
}

fn atom_mul(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    let mut total = 1.0;
    for arg in args {
        total *= expect_number(arg, ctx, span)?;
    }
    Ok(Value::Number(total))
}

fn atom_div(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    let [first, rest @ ..] = args else {
        return Err(ctx.arity_mismatch("at least 2", args.len(), to_source_span(*span)));
    };
    if rest.is_empty() {
        return Err(ctx.arity_mismatch("at least 2", args.len(), to_source_span(*span)));
    }

    let mut total = expect_number(first, ctx, span)?;
    for arg in rest {
        let divisor = expect_number(arg, ctx, span)?;
        if divisor == 0.0 {
            return Err(ctx.report(ErrorKind::DivisionByZero, to_source_span(*span)));
        }
        total /= divisor;
    }
    Ok(Value::Number(total))
}

// ============================================================================
// COMPARISON AND LOGIC
// ============================================================================

fn atom_eq(args: &[Value], _ctx: &mut EvaluationContext, _span: &Span) -> Result<Value, GraderError> {
    let all_equal = args.windows(2).all(|w| w[0] == w[1]);
    Ok(Value::Bool(all_equal))
}

fn atom_ne(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    expect_arity(args, 2, ctx, span)?;
    Ok(Value::Bool(args[0] != args[1]))
}

fn numeric_chain(
    args: &[Value],
    ctx: &mut EvaluationContext,
    span: &Span,
    cmp: fn(f64, f64) -> bool,
) -> Result<Value, GraderError> {
    if args.len() < 2 {
        return Err(ctx.arity_mismatch("at least 2", args.len(), to_source_span(*span)));
    }
    for pair in args.windows(2) {
        let lhs = expect_number(&pair[0], ctx, span)?;
        let rhs = expect_number(&pair[1], ctx, span)?;
        if !cmp(lhs, rhs) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn atom_lt(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    numeric_chain(args, ctx, span, |a, b| a < b)
}

fn atom_gt(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    numeric_chain(args, ctx, span, |a, b| a > b)
}

fn atom_le(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    numeric_chain(args, ctx, span, |a, b| a <= b)
}

fn atom_ge(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    numeric_chain(args, ctx, span, |a, b| a >= b)
}

fn atom_not(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    expect_arity(args, 1, ctx, span)?;
    Ok(Value::Bool(!args[0].is_truthy()))
}

// ============================================================================
// LISTS
// ============================================================================

fn atom_list(args: &[Value], _ctx: &mut EvaluationContext, _span: &Span) -> Result<Value, GraderError> {
    Ok(Value::List(args.to_vec()))
}

fn atom_nth(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    expect_arity(args, 2, ctx, span)?;
    let items = args[0]
        .as_list()
        .ok_or_else(|| ctx.type_mismatch("List", args[0].type_name(), to_source_span(*span)))?;
    let index = expect_number(&args[1], ctx, span)? as usize;
    Ok(items.get(index).cloned().unwrap_or(Value::Nil))
}

fn atom_len(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    expect_arity(args, 1, ctx, span)?;
    let len = match &args[0] {
        Value::List(items) => items.len(),
        Value::String(s) => s.chars().count(),
        Value::Map(m) => m.len(),
        other => {
            return Err(ctx.type_mismatch(
                "List, String, or Map",
                other.type_name(),
                to_source_span(*span),
            ))
        }
    };
    Ok(Value::Number(len as f64))
}

fn atom_append(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    let [first, rest @ ..] = args else {
        return Err(ctx.arity_mismatch("at least 1", 0, to_source_span(*span)));
    };
    let mut items = first
        .as_list()
        .ok_or_else(|| ctx.type_mismatch("List", first.type_name(), to_source_span(*span)))?
        .to_vec();
    items.extend(rest.iter().cloned());
    Ok(Value::List(items))
}

// ============================================================================
// STRINGS
// ============================================================================

fn atom_str(args: &[Value], _ctx: &mut EvaluationContext, _span: &Span) -> Result<Value, GraderError> {
    let mut out = String::new();
    for arg in args {
        out.push_str(&arg.to_string());
    }
    Ok(Value::String(out))
}

fn atom_upper(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    expect_arity(args, 1, ctx, span)?;
    Ok(Value::String(expect_string(&args[0], ctx, span)?.to_uppercase()))
}

fn atom_lower(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    expect_arity(args, 1, ctx, span)?;
    Ok(Value::String(expect_string(&args[0], ctx, span)?.to_lowercase()))
}

fn atom_trim(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    expect_arity(args, 1, ctx, span)?;
    Ok(Value::String(expect_string(&args[0], ctx, span)?.trim().to_string()))
}

// ============================================================================
// MAPS
// ============================================================================

fn atom_map(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    if args.len() % 2 != 0 {
        return Err(ctx.arity_mismatch("an even number of", args.len(), to_source_span(*span)));
    }
    let mut map = im::HashMap::new();
    for pair in args.chunks(2) {
        let key = expect_string(&pair[0], ctx, span)?;
        map.insert(key.to_string(), pair[1].clone());
    }
    Ok(Value::Map(map))
}

fn atom_get(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    expect_arity(args, 2, ctx, span)?;
    let map = args[0]
        .as_map()
        .ok_or_else(|| ctx.type_mismatch("Map", args[0].type_name(), to_source_span(*span)))?;
    let key = expect_string(&args[1], ctx, span)?;
    Ok(map.get(key).cloned().unwrap_or(Value::Nil))
}

fn atom_assoc(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    expect_arity(args, 3, ctx, span)?;
    let mut map = args[0]
        .as_map()
        .ok_or_else(|| ctx.type_mismatch("Map", args[0].type_name(), to_source_span(*span)))?
        .clone();
    let key = expect_string(&args[1], ctx, span)?;
    map.insert(key.to_string(), args[2].clone());
    Ok(Value::Map(map))
}

// ============================================================================
// EFFECTS
// ============================================================================

fn atom_print(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    let text = args
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    ctx.output.emit(&text, Some(span));
    Ok(Value::Nil)
}

fn atom_error(args: &[Value], ctx: &mut EvaluationContext, span: &Span) -> Result<Value, GraderError> {
    let message = args
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    Err(ctx.report(ErrorKind::Raised { message }, to_source_span(*span)))
}
