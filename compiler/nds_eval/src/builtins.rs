//! Global-frame seeding: constants and host functions.
//!
//! Arabic aliases bind the same [`BuiltinFn`] under a second name.

use crate::environment::Environment;
use crate::errors::{arity_mismatch, math_domain_error, type_mismatch, EvalResult};
use crate::value::{BuiltinFn, BuiltinFnPtr, Value};

pub const CONSTANTS: &[(&str, f64)] = &[
    ("π", std::f64::consts::PI),
    ("pi", std::f64::consts::PI),
    ("e", std::f64::consts::E),
    ("φ", 1.618_033_988_749_895),
    ("phi", 1.618_033_988_749_895),
    ("h", 6.626_070_15e-34),
    ("ħ", 1.054_571_817_646_156_5e-34),
    ("hbar", 1.054_571_817_646_156_5e-34),
];

/// Speed of light in m/s; the only integral constant.
pub const SPEED_OF_LIGHT: i64 = 299_792_458;

const FUNCTIONS: &[(&str, &str, BuiltinFnPtr)] = &[
    // (bound name, canonical name, implementation)
    ("abs", "abs", builtin_abs),
    ("min", "min", builtin_min),
    ("max", "max", builtin_max),
    ("round", "round", builtin_round),
    ("len", "len", builtin_len),
    ("sin", "sin", builtin_sin),
    ("cos", "cos", builtin_cos),
    ("tan", "tan", builtin_tan),
    ("sqrt", "sqrt", builtin_sqrt),
    ("log", "log", builtin_log),
    ("exp", "exp", builtin_exp),
    ("pow", "pow", builtin_pow),
    ("جذر", "sqrt", builtin_sqrt),
    ("لوغ", "log", builtin_log),
    ("أس", "exp", builtin_exp),
    ("قوة", "pow", builtin_pow),
    ("مطلق", "abs", builtin_abs),
    ("أدنى", "min", builtin_min),
    ("أعلى", "max", builtin_max),
];

/// Bind every constant and builtin in `env`.
pub fn seed_globals(env: &Environment) {
    for &(name, value) in CONSTANTS {
        env.define(name, Value::Float(value));
    }
    env.define("c", Value::Int(SPEED_OF_LIGHT));
    for &(bound, name, func) in FUNCTIONS {
        env.define(bound, Value::Builtin(BuiltinFn { name, func }));
    }
}

/// Whether `name` still holds the value `seed_globals` gave it.
pub fn is_seeded(name: &str, value: &Value) -> bool {
    match value {
        Value::Builtin(_) => true,
        Value::Int(n) => name == "c" && *n == SPEED_OF_LIGHT,
        Value::Float(x) => CONSTANTS
            .iter()
            .any(|&(constant, seeded)| constant == name && seeded.to_bits() == x.to_bits()),
        _ => false,
    }
}

fn expect_args(name: &str, args: &[Value], count: usize) -> EvalResult<()> {
    if args.len() == count {
        Ok(())
    } else {
        Err(arity_mismatch(name, count, args.len()))
    }
}

fn number(value: &Value) -> EvalResult<f64> {
    if value.is_number() {
        value
            .as_float()
            .ok_or_else(|| type_mismatch("number", value.type_name()))
    } else {
        Err(type_mismatch("number", value.type_name()))
    }
}

fn unary_float(name: &str, args: &[Value], f: fn(f64) -> f64) -> EvalResult {
    expect_args(name, args, 1)?;
    Ok(Value::Float(f(number(&args[0])?)))
}

fn builtin_abs(args: &[Value]) -> EvalResult {
    expect_args("abs", args, 1)?;
    match &args[0] {
        Value::Int(n) => Ok(n
            .checked_abs()
            .map_or(Value::Float((*n as f64).abs()), Value::Int)),
        Value::Float(x) => Ok(Value::Float(x.abs())),
        other => Err(type_mismatch("number", other.type_name())),
    }
}

/// `min(a, b, ...)` or `min(list)`.
fn extremum(name: &str, args: &[Value], prefer_left: fn(f64, f64) -> bool) -> EvalResult {
    let items: &[Value] = match args {
        [Value::List(items)] => items,
        _ => args,
    };
    let Some((first, rest)) = items.split_first() else {
        return Err(arity_mismatch(name, 1, 0));
    };
    let mut best = first;
    let mut best_key = number(first)?;
    for item in rest {
        let key = number(item)?;
        if prefer_left(key, best_key) {
            best = item;
            best_key = key;
        }
    }
    Ok(best.clone())
}

fn builtin_min(args: &[Value]) -> EvalResult {
    extremum("min", args, |candidate, best| candidate < best)
}

fn builtin_max(args: &[Value]) -> EvalResult {
    extremum("max", args, |candidate, best| candidate > best)
}

/// `round(x)` rounds half to even and yields an int; `round(x, digits)` a float.
fn builtin_round(args: &[Value]) -> EvalResult {
    match args {
        [Value::Int(n)] => Ok(Value::Int(*n)),
        [x] => {
            let rounded = number(x)?.round_ties_even();
            if rounded.is_finite() && rounded.abs() < 9.0e18 {
                Ok(Value::Int(rounded as i64))
            } else {
                Ok(Value::Float(rounded))
            }
        }
        [x, digits] => {
            let digits = digits
                .as_int()
                .ok_or_else(|| type_mismatch("int", digits.type_name()))?;
            let scale = 10f64.powi(digits.clamp(-300, 300) as i32);
            Ok(Value::Float((number(x)? * scale).round_ties_even() / scale))
        }
        _ => Err(arity_mismatch("round", 1, args.len())),
    }
}

fn builtin_len(args: &[Value]) -> EvalResult {
    expect_args("len", args, 1)?;
    let len = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.len(),
        other => return Err(type_mismatch("str or list", other.type_name())),
    };
    Ok(Value::Int(i64::try_from(len).unwrap_or(i64::MAX)))
}

fn builtin_sin(args: &[Value]) -> EvalResult {
    unary_float("sin", args, f64::sin)
}

fn builtin_cos(args: &[Value]) -> EvalResult {
    unary_float("cos", args, f64::cos)
}

fn builtin_tan(args: &[Value]) -> EvalResult {
    unary_float("tan", args, f64::tan)
}

fn builtin_exp(args: &[Value]) -> EvalResult {
    unary_float("exp", args, f64::exp)
}

fn builtin_sqrt(args: &[Value]) -> EvalResult {
    expect_args("sqrt", args, 1)?;
    let x = number(&args[0])?;
    if x < 0.0 {
        return Err(math_domain_error("sqrt"));
    }
    Ok(Value::Float(x.sqrt()))
}

/// `log(x)` is the natural log; `log(x, base)` uses `base`.
fn builtin_log(args: &[Value]) -> EvalResult {
    let (x, base) = match args {
        [x] => (number(x)?, None),
        [x, base] => (number(x)?, Some(number(base)?)),
        _ => return Err(arity_mismatch("log", 1, args.len())),
    };
    if x <= 0.0 || base.is_some_and(|b| b <= 0.0 || b == 1.0) {
        return Err(math_domain_error("log"));
    }
    Ok(Value::Float(base.map_or(x.ln(), |b| x.ln() / b.ln())))
}

fn builtin_pow(args: &[Value]) -> EvalResult {
    expect_args("pow", args, 2)?;
    if let (Value::Int(base), Value::Int(exp)) = (&args[0], &args[1]) {
        if let Some(result) = u32::try_from(*exp)
            .ok()
            .and_then(|exp| base.checked_pow(exp))
        {
            return Ok(Value::Int(result));
        }
    }
    Ok(Value::Float(number(&args[0])?.powf(number(&args[1])?)))
}

#[cfg(test)]
mod tests;
