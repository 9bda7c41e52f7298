//! `sass:string` plus the global aliases (§4.F). String indices are
//! 1-based Sass indices (not byte offsets) over Unicode scalar values,
//! matching `str-index`/`str-slice`'s documented behavior.

use std::cell::Cell;

use codemap::Span;

use crate::common::QuoteKind;
use crate::error::{SassError, SassErrorKind, SassResult};
use crate::unit::Unit;
use crate::value::{SassNumber, Value};

use super::{BoundArgs, BuiltinFn};

pub(crate) const FUNCTIONS: &[(&str, &str, BuiltinFn)] = &[
    ("quote", "$string", quote),
    ("unquote", "$string", unquote),
    ("str-length", "$string", str_length),
    ("str-insert", "$string, $insert, $index", str_insert),
    ("str-index", "$string, $substring", str_index),
    ("str-slice", "$string, $start-at, $end-at: -1", str_slice),
    ("to-upper-case", "$string", to_upper_case),
    ("to-lower-case", "$string", to_lower_case),
    ("unique-id", "", unique_id),
];

fn quote(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let (s, _) = args.get("string").assert_string(span)?;
    Ok(Value::String(s, QuoteKind::Quoted))
}

fn unquote(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let (s, _) = args.get("string").assert_string(span)?;
    Ok(Value::String(s, QuoteKind::None))
}

fn str_length(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let (s, _) = args.get("string").assert_string(span)?;
    Ok(Value::Number(SassNumber::new(s.chars().count() as f64, Unit::None)))
}

/// Clamp a 1-based, possibly-negative Sass string index onto `0..=len`
/// (a valid *insertion point*, unlike `list::resolve_index` which must
/// land on an existing element).
fn clamp_insert_index(i: i64, len: usize) -> usize {
    if i >= 0 {
        (i as usize).min(len)
    } else {
        let from_end = i.unsigned_abs() as usize;
        len.saturating_sub(from_end.saturating_sub(1)).min(len)
    }
}

fn str_insert(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let (s, q) = args.get("string").assert_string(span)?;
    let (insert, _) = args.get("insert").assert_string(span)?;
    let idx = args.get("index").assert_number(span)?.assert_int(span, crate::value::DEFAULT_EPSILON)?;
    let chars: Vec<char> = s.chars().collect();
    let at = clamp_insert_index(idx, chars.len());
    let mut out: String = chars[..at].iter().collect();
    out.push_str(&insert);
    out.extend(&chars[at..]);
    Ok(Value::String(out, q))
}

fn str_index(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let (s, _) = args.get("string").assert_string(span)?;
    let (needle, _) = args.get("substring").assert_string(span)?;
    let chars: Vec<char> = s.chars().collect();
    let needle_chars: Vec<char> = needle.chars().collect();
    if needle_chars.is_empty() {
        return Ok(Value::Number(SassNumber::new(1.0, Unit::None)));
    }
    for start in 0..=chars.len().saturating_sub(needle_chars.len()) {
        if chars[start..start + needle_chars.len()] == needle_chars[..] {
            return Ok(Value::Number(SassNumber::new((start + 1) as f64, Unit::None)));
        }
    }
    Ok(Value::Null)
}

/// Resolve a Sass string slice bound (1-based, negative-from-end) to a
/// `0..=len` offset, clamping out-of-range values rather than erroring
/// (matches `str-slice`'s documented forgiving behavior).
fn clamp_slice_bound(i: i64, len: usize) -> usize {
    if i > 0 {
        ((i - 1) as usize).min(len)
    } else if i == 0 {
        0
    } else {
        len.saturating_sub(i.unsigned_abs() as usize - 1).min(len)
    }
}

fn str_slice(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let (s, q) = args.get("string").assert_string(span)?;
    let start = args
        .get("start-at")
        .assert_number(span)?
        .assert_int(span, crate::value::DEFAULT_EPSILON)?;
    let end = match args.get("end-at") {
        Value::Null => -1,
        other => other.assert_number(span)?.assert_int(span, crate::value::DEFAULT_EPSILON)?,
    };
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    if start == 0 {
        return Err(SassError::new(
            SassErrorKind::InvalidCssValue,
            "$start-at: String index may not be 0.".to_string(),
            span,
        ));
    }
    let lo = clamp_slice_bound(start, len);
    let hi_raw = if end < 0 { len as i64 + end + 1 } else { end };
    let hi = (hi_raw.max(0) as usize).min(len);
    if lo >= hi {
        return Ok(Value::String(String::new(), q));
    }
    Ok(Value::String(chars[lo..hi].iter().collect(), q))
}

fn to_upper_case(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let (s, q) = args.get("string").assert_string(span)?;
    Ok(Value::String(s.to_uppercase(), q))
}

fn to_lower_case(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let (s, q) = args.get("string").assert_string(span)?;
    Ok(Value::String(s.to_lowercase(), q))
}

thread_local! {
    static UNIQUE_ID_COUNTER: Cell<u64> = Cell::new(0);
}

/// Generates a CSS-identifier-safe string that has never been returned
/// before in this process (§4.F `unique-id`); a counter is sufficient
/// since spec.md only requires uniqueness, not unpredictability.
fn unique_id(_args: &BoundArgs, _span: Span) -> SassResult<Value> {
    let n = UNIQUE_ID_COUNTER.with(|c| {
        let next = c.get() + 1;
        c.set(next);
        next
    });
    Ok(Value::String(format!("u{:x}", n), QuoteKind::None))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        let mut map = codemap::CodeMap::new();
        map.add_file("t".into(), "x".into()).span
    }

    #[test]
    fn str_slice_handles_negative_end() {
        let bound = BoundArgs(vec![
            ("string".to_string(), Value::String("Helloooo".into(), QuoteKind::Quoted)),
            ("start-at".to_string(), Value::Number(SassNumber::new(1.0, Unit::None))),
            ("end-at".to_string(), Value::Number(SassNumber::new(-5.0, Unit::None))),
        ]);
        assert_eq!(str_slice(&bound, span()).unwrap(), Value::String("Hell".into(), QuoteKind::Quoted));
    }

    #[test]
    fn str_index_finds_substring_one_based() {
        let bound = BoundArgs(vec![
            ("string".to_string(), Value::String("Hello, Sam".into(), QuoteKind::Quoted)),
            ("substring".to_string(), Value::String("Sam".into(), QuoteKind::Quoted)),
        ]);
        assert_eq!(str_index(&bound, span()).unwrap(), Value::Number(SassNumber::new(8.0, Unit::None)));
    }

    #[test]
    fn unique_id_never_repeats() {
        let a = unique_id(&BoundArgs(vec![]), span()).unwrap();
        let b = unique_id(&BoundArgs(vec![]), span()).unwrap();
        assert_ne!(a, b);
    }
}
