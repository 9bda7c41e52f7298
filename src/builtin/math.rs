//! `sass:math` plus the global legacy aliases dart-sass still exposes for
//! the same functions, and the calc-function folding helpers used by
//! `calc()`/`min()`/`max()`/`clamp()`/`sin()`/… (§4.F).

use codemap::Span;

use crate::common::Op;
use crate::error::{SassError, SassErrorKind, SassResult};
use crate::unit::Unit;
use crate::value::{CalcOperation, CalcValue, Calculation, SassNumber, Value};

use super::{BoundArgs, BuiltinFn};

pub(crate) const FUNCTIONS: &[(&str, &str, BuiltinFn)] = &[
    ("ceil", "$number", ceil),
    ("floor", "$number", floor),
    ("round", "$number", round),
    ("abs", "$number", abs),
    ("min", "$numbers...", min),
    ("max", "$numbers...", max),
    ("clamp", "$min, $number, $max", clamp),
    ("sqrt", "$number", sqrt),
    ("pow", "$base, $exponent", pow),
    ("log", "$number, $base: null", log),
    ("div", "$number1, $number2", div),
    ("percentage", "$number", percentage),
    ("random", "$limit: null", random),
    ("compatible", "$number1, $number2", compatible),
    ("is-unitless", "$number", is_unitless),
    ("unit", "$number", unit),
];

fn one_number(args: &BoundArgs, span: Span) -> SassResult<SassNumber> {
    Ok(args.get("number").assert_number(span)?.clone())
}

fn ceil(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let n = one_number(args, span)?;
    Ok(Value::Number(SassNumber::new(n.value.ceil(), n.unit)))
}

fn floor(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let n = one_number(args, span)?;
    Ok(Value::Number(SassNumber::new(n.value.floor(), n.unit)))
}

fn round(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let n = one_number(args, span)?;
    Ok(Value::Number(SassNumber::new(n.value.round(), n.unit)))
}

fn abs(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let n = one_number(args, span)?;
    Ok(Value::Number(SassNumber::new(n.value.abs(), n.unit)))
}

fn min(args: &BoundArgs, span: Span) -> SassResult<Value> {
    extremum(args, span, "min", |a, b| a < b)
}

fn max(args: &BoundArgs, span: Span) -> SassResult<Value> {
    extremum(args, span, "max", |a, b| a > b)
}

fn extremum(args: &BoundArgs, span: Span, name: &str, better: fn(f64, f64) -> bool) -> SassResult<Value> {
    let list = args.get("numbers").as_list_items();
    if list.is_empty() {
        return Err(SassError::new(
            SassErrorKind::MissingArgument,
            format!("At least one argument must be passed to {}().", name),
            span,
        ));
    }
    let mut best = list[0].assert_number(span)?.clone();
    for v in &list[1..] {
        let n = v.assert_number(span)?;
        if !n.unit.comparable(&best.unit) {
            return Err(SassError::new(
                SassErrorKind::UnitMismatch,
                format!("Incompatible units {} and {}.", best.unit, n.unit),
                span,
            ));
        }
        let converted = n.unit.convert(n.value, &best.unit);
        if better(converted, best.value) {
            best = SassNumber::new(converted, best.unit.clone());
        }
    }
    Ok(Value::Number(best))
}

fn clamp(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let min = args.get("min").assert_number(span)?.clone();
    let number = args.get("number").assert_number(span)?.clone();
    let max = args.get("max").assert_number(span)?.clone();
    if !min.unit.comparable(&number.unit) || !min.unit.comparable(&max.unit) {
        return Err(SassError::new(
            SassErrorKind::UnitMismatch,
            "clamp() arguments must have compatible units.".to_string(),
            span,
        ));
    }
    let lo = min.value;
    let hi = max.unit.convert(max.value, &min.unit);
    let x = number.unit.convert(number.value, &min.unit);
    Ok(Value::Number(SassNumber::new(x.clamp(lo.min(hi), lo.max(hi)), min.unit)))
}

fn sqrt(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let n = one_number(args, span)?;
    unitless_or_calc("sqrt", &n, n.value.sqrt(), span)
}

fn pow(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let base = args.get("base").assert_number(span)?.clone();
    let exp = args.get("exponent").assert_number(span)?.clone();
    if !matches!(base.unit, Unit::None) || !matches!(exp.unit, Unit::None) {
        return Err(SassError::new(
            SassErrorKind::UnitMismatch,
            "pow() is only defined for unitless numbers.".to_string(),
            span,
        ));
    }
    Ok(Value::Number(SassNumber::new(base.value.powf(exp.value), Unit::None)))
}

fn log(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let n = one_number(args, span)?;
    let base = args.get("base");
    let result = match base {
        Value::Null => n.value.ln(),
        other => {
            let b = other.assert_number(span)?;
            n.value.log(b.value)
        }
    };
    unitless_or_calc("log", &n, result, span)
}

fn unitless_or_calc(name: &str, input: &SassNumber, result: f64, span: Span) -> SassResult<Value> {
    if !matches!(input.unit, Unit::None) {
        return Err(SassError::new(
            SassErrorKind::UnitMismatch,
            format!("{}() is only defined for unitless numbers.", name),
            span,
        ));
    }
    Ok(Value::Number(SassNumber::new(result, Unit::None)))
}

fn div(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let a = args.get("number1").assert_number(span)?.clone();
    let b = args.get("number2").assert_number(span)?.clone();
    Ok(Value::Number(a.div(&b)))
}

fn percentage(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let n = one_number(args, span)?;
    if !matches!(n.unit, Unit::None) {
        return Err(SassError::new(
            SassErrorKind::UnitMismatch,
            "percentage() is only defined for unitless numbers.".to_string(),
            span,
        ));
    }
    Ok(Value::Number(SassNumber::new(n.value * 100.0, Unit::Percent)))
}

/// A small xorshift generator seeded from the system clock. `math.random`
/// has no correctness invariant in spec.md beyond "returns a number in
/// range", so this avoids pulling in an RNG crate the rest of the corpus
/// doesn't otherwise need.
fn next_random() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x9E3779B97F4A7C15);
    let mut x = seed ^ 0x2545_F491_4F6C_DD1D;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    (x as f64 / u64::MAX as f64).clamp(0.0, 1.0)
}

fn random(args: &BoundArgs, span: Span) -> SassResult<Value> {
    match args.get("limit") {
        Value::Null => Ok(Value::Number(SassNumber::new(next_random(), Unit::None))),
        limit => {
            let limit = limit.assert_number(span)?;
            let max = limit.assert_int(span, crate::value::DEFAULT_EPSILON)?;
            if max < 1 {
                return Err(SassError::new(
                    SassErrorKind::InvalidCssValue,
                    format!("$limit: must be greater than 0, was {}.", max),
                    span,
                ));
            }
            let n = 1 + (next_random() * max as f64) as i64;
            Ok(Value::Number(SassNumber::new(n.min(max) as f64, Unit::None)))
        }
    }
}

fn compatible(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let a = args.get("number1").assert_number(span)?.clone();
    let b = args.get("number2").assert_number(span)?.clone();
    Ok(Value::Bool(a.unit.comparable(&b.unit)))
}

fn is_unitless(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let n = one_number(args, span)?;
    Ok(Value::Bool(matches!(n.unit, Unit::None)))
}

fn unit(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let n = one_number(args, span)?;
    Ok(Value::String(n.unit.to_string(), crate::common::QuoteKind::Quoted))
}

/// Fold a calc-family call (§4.F): if every argument reduced to a plain
/// number with mutually compatible units, perform the operation and
/// return a `Number`; otherwise return an unevaluated `Calculation` that
/// serializes as `name(args...)`.
pub(crate) fn build_calculation(name: &str, args: Vec<CalcValue>, span: Span) -> SassResult<Value> {
    if let Some(numbers) = all_plain_numbers(&args) {
        if let Some(folded) = fold_known(name, &numbers, span)? {
            return Ok(Value::Number(folded));
        }
    }
    Ok(Value::Calculation(Calculation {
        name: name.to_string(),
        args,
    }))
}

fn all_plain_numbers(args: &[CalcValue]) -> Option<Vec<SassNumber>> {
    let mut out = Vec::with_capacity(args.len());
    for a in args {
        match a {
            CalcValue::Value(v) => match v.as_ref() {
                Value::Number(n) => out.push(n.clone()),
                _ => return None,
            },
            CalcValue::Operation(_) => return None,
        }
    }
    Some(out)
}

fn fold_known(name: &str, n: &[SassNumber], span: Span) -> SassResult<Option<SassNumber>> {
    if n.is_empty() {
        return Ok(None);
    }
    let unitless = |x: &SassNumber| -> SassResult<f64> {
        if matches!(x.unit, Unit::None) {
            Ok(x.value)
        } else {
            Err(SassError::new(
                SassErrorKind::IncompatibleCalcValue,
                format!("{}() requires unitless arguments.", name),
                span,
            ))
        }
    };
    let one = |f: fn(f64) -> f64| -> SassResult<Option<SassNumber>> {
        if n.len() != 1 {
            return Ok(None);
        }
        Ok(Some(SassNumber::new(f(unitless(&n[0])?), Unit::None)))
    };
    match name {
        "sin" => one(f64::sin),
        "cos" => one(f64::cos),
        "tan" => one(f64::tan),
        "asin" => one(f64::asin),
        "acos" => one(f64::acos),
        "atan" => one(f64::atan),
        "exp" => one(f64::exp),
        "sign" => one(f64::signum),
        "atan2" if n.len() == 2 && n[0].unit.comparable(&n[1].unit) => Ok(Some(SassNumber::new(
            n[0].value.atan2(n[1].unit.convert(n[1].value, &n[0].unit)),
            Unit::None,
        ))),
        "hypot" if n.iter().all(|x| x.unit.comparable(&n[0].unit)) => {
            let sum_sq: f64 = n
                .iter()
                .map(|x| {
                    let v = x.unit.convert(x.value, &n[0].unit);
                    v * v
                })
                .sum();
            Ok(Some(SassNumber::new(sum_sq.sqrt(), n[0].unit.clone())))
        }
        "mod" | "rem" if n.len() == 2 && n[0].unit.comparable(&n[1].unit) => {
            let rhs = n[1].unit.convert(n[1].value, &n[0].unit);
            Ok(Some(SassNumber::new(n[0].value % rhs, n[0].unit.clone())))
        }
        "min" | "max" if n.iter().all(|x| x.unit.comparable(&n[0].unit)) => {
            let better: fn(f64, f64) -> bool = if name == "min" { |a, b| a < b } else { |a, b| a > b };
            let mut best = n[0].clone();
            for x in &n[1..] {
                let converted = x.unit.convert(x.value, &best.unit);
                if better(converted, best.value) {
                    best = SassNumber::new(converted, best.unit.clone());
                }
            }
            Ok(Some(best))
        }
        _ => Ok(None),
    }
}

/// Build a `CalcOperation` node for `+ - * /` inside a `calc()` argument
/// (§4.F — these never perform runtime arithmetic directly).
pub(crate) fn calc_operation(op: Op, lhs: CalcValue, rhs: CalcValue) -> CalcValue {
    CalcValue::Operation(CalcOperation {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        let mut map = codemap::CodeMap::new();
        map.add_file("t".into(), "x".into()).span
    }

    #[test]
    fn ceil_rounds_up_and_keeps_unit() {
        let bound = BoundArgs(vec![("number".to_string(), Value::Number(SassNumber::new(1.2, Unit::Px)))]);
        assert_eq!(ceil(&bound, span()).unwrap(), Value::Number(SassNumber::new(2.0, Unit::Px)));
    }

    #[test]
    fn build_calculation_folds_all_plain_numbers() {
        let args = vec![
            CalcValue::Value(Box::new(Value::Number(SassNumber::new(1.0, Unit::None)))),
            CalcValue::Value(Box::new(Value::Number(SassNumber::new(2.0, Unit::None)))),
        ];
        let result = build_calculation("min", args, span()).unwrap();
        assert_eq!(result, Value::Number(SassNumber::new(1.0, Unit::None)));
    }

    #[test]
    fn build_calculation_keeps_calculation_when_not_foldable() {
        let args = vec![CalcValue::Value(Box::new(Value::String("50%".into(), crate::common::QuoteKind::None)))];
        let result = build_calculation("calc", args, span()).unwrap();
        assert!(matches!(result, Value::Calculation(_)));
    }
}
