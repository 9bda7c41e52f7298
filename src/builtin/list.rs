//! `sass:list` plus the global aliases (§4.F). Every value is "a list of
//! itself" per `Value::as_list_items`, so these operate uniformly over
//! lists, arg-lists, maps (as two-element pairs), and scalars.

use codemap::Span;

use crate::common::{Brackets, ListSeparator};
use crate::error::{SassError, SassErrorKind, SassResult};
use crate::unit::Unit;
use crate::value::{SassNumber, Value};

use super::{BoundArgs, BuiltinFn};

pub(crate) const FUNCTIONS: &[(&str, &str, BuiltinFn)] = &[
    ("length", "$list", length),
    ("nth", "$list, $n", nth),
    ("set-nth", "$list, $n, $value", set_nth),
    ("join", "$list1, $list2, $separator: null, $bracketed: null", join),
    ("append", "$list, $val, $separator: null", append),
    ("index", "$list, $value", index),
    ("zip", "$lists...", zip),
    ("list-separator", "$list", list_separator),
    ("is-bracketed", "$list", is_bracketed),
];

fn length(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let _ = span;
    Ok(Value::Number(SassNumber::new(
        args.get("list").length_as_list() as f64,
        Unit::None,
    )))
}

/// Sass list indices are 1-based and accept negative values counting from
/// the end (`-1` is the last element).
fn resolve_index(n: &SassNumber, len: usize, span: Span) -> SassResult<usize> {
    let i = n.assert_int(span, crate::value::DEFAULT_EPSILON)?;
    if i == 0 || i.unsigned_abs() as usize > len {
        return Err(SassError::new(
            SassErrorKind::InvalidCssValue,
            format!("Invalid index {} for a list with {} elements.", i, len),
            span,
        ));
    }
    Ok(if i > 0 {
        (i - 1) as usize
    } else {
        len - i.unsigned_abs() as usize
    })
}

fn nth(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let list = args.get("list").as_list_items();
    let n = args.get("n").assert_number(span)?.clone();
    let idx = resolve_index(&n, list.len(), span)?;
    Ok(list[idx].clone())
}

fn set_nth(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let list = args.get("list");
    let mut items = list.as_list_items();
    let n = args.get("n").assert_number(span)?.clone();
    let idx = resolve_index(&n, items.len(), span)?;
    items[idx] = args.get("value");
    Ok(Value::List(items, list.separator(), bracketed(&list)))
}

fn bracketed(v: &Value) -> Brackets {
    if v.has_brackets() {
        Brackets::Bracketed
    } else {
        Brackets::None
    }
}

fn separator_arg(args: &BoundArgs, fallback: ListSeparator, span: Span) -> SassResult<ListSeparator> {
    match args.get("separator") {
        Value::Null => Ok(fallback),
        Value::String(s, _) => match s.as_str() {
            "comma" => Ok(ListSeparator::Comma),
            "space" => Ok(ListSeparator::Space),
            "slash" => Ok(ListSeparator::Slash),
            "auto" => Ok(fallback),
            other => Err(SassError::new(
                SassErrorKind::InvalidCssValue,
                format!("$separator: Must be \"space\", \"comma\", \"slash\", or \"auto\", was \"{}\".", other),
                span,
            )),
        },
        other => Err(SassError::new(
            SassErrorKind::InvalidCssValue,
            format!("$separator: {} is not a string.", other.inspect(10)),
            span,
        )),
    }
}

fn join(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let list1 = args.get("list1");
    let list2 = args.get("list2");
    let sep = separator_arg(
        args,
        if list1.length_as_list() != 0 {
            list1.separator()
        } else {
            list2.separator()
        },
        span,
    )?;
    let mut items = list1.as_list_items();
    items.extend(list2.as_list_items());
    let brackets = match args.get("bracketed") {
        Value::Null => bracketed(&list1),
        other if other.is_truthy() => Brackets::Bracketed,
        _ => Brackets::None,
    };
    Ok(Value::List(items, sep, brackets))
}

fn append(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let list = args.get("list");
    let sep = separator_arg(args, list.separator(), span)?;
    let mut items = list.as_list_items();
    items.push(args.get("val"));
    Ok(Value::List(items, sep, bracketed(&list)))
}

fn index(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let list = args.get("list").as_list_items();
    let needle = args.get("value");
    match list.iter().position(|v| v.equals(&needle, span).unwrap_or(false)) {
        Some(i) => Ok(Value::Number(SassNumber::new((i + 1) as f64, Unit::None))),
        None => Ok(Value::Null),
    }
}

fn zip(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let _ = span;
    let lists: Vec<Vec<Value>> = args.get("lists").as_list_items().iter().map(Value::as_list_items).collect();
    let min_len = lists.iter().map(Vec::len).min().unwrap_or(0);
    let mut rows = Vec::with_capacity(min_len);
    for i in 0..min_len {
        let row: Vec<Value> = lists.iter().map(|l| l[i].clone()).collect();
        rows.push(Value::List(row, ListSeparator::Space, Brackets::None));
    }
    Ok(Value::List(rows, ListSeparator::Comma, Brackets::None))
}

fn list_separator(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let _ = span;
    let name = match args.get("list").separator() {
        ListSeparator::Comma => "comma",
        ListSeparator::Space => "space",
        ListSeparator::Slash => "slash",
        ListSeparator::Undecided => "space",
    };
    Ok(Value::String(name.to_string(), crate::common::QuoteKind::Quoted))
}

fn is_bracketed(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let _ = span;
    Ok(Value::Bool(args.get("list").has_brackets()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        let mut map = codemap::CodeMap::new();
        map.add_file("t".into(), "x".into()).span
    }

    fn list(items: Vec<Value>) -> Value {
        Value::List(items, ListSeparator::Comma, Brackets::None)
    }

    #[test]
    fn nth_accepts_negative_index_from_end() {
        let bound = BoundArgs(vec![
            ("list".to_string(), list(vec![Value::Bool(true), Value::Bool(false)])),
            ("n".to_string(), Value::Number(SassNumber::new(-1.0, Unit::None))),
        ]);
        assert_eq!(nth(&bound, span()).unwrap(), Value::Bool(false));
    }

    #[test]
    fn index_returns_null_when_absent() {
        let bound = BoundArgs(vec![
            ("list".to_string(), list(vec![Value::Bool(true)])),
            ("value".to_string(), Value::Bool(false)),
        ]);
        assert_eq!(index(&bound, span()).unwrap(), Value::Null);
    }

    #[test]
    fn join_concatenates_preserving_first_separator() {
        let bound = BoundArgs(vec![
            ("list1".to_string(), list(vec![Value::Bool(true)])),
            ("list2".to_string(), Value::List(vec![Value::Bool(false)], ListSeparator::Space, Brackets::None)),
            ("separator".to_string(), Value::Null),
            ("bracketed".to_string(), Value::Null),
        ]);
        let joined = join(&bound, span()).unwrap();
        assert_eq!(joined.length_as_list(), 2);
        assert_eq!(joined.separator(), ListSeparator::Comma);
    }
}
