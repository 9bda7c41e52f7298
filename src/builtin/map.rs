//! `sass:map` plus the global aliases (§4.F).

use codemap::Span;

use crate::error::SassResult;
use crate::value::{SassMap, Value};

use super::{BoundArgs, BuiltinFn};

pub(crate) const FUNCTIONS: &[(&str, &str, BuiltinFn)] = &[
    ("map-get", "$map, $key, $keys...", map_get),
    ("map-merge", "$map1, $map2", map_merge),
    ("map-remove", "$map, $keys...", map_remove),
    ("map-keys", "$map", map_keys),
    ("map-values", "$map", map_values),
    ("map-has-key", "$map, $key, $keys...", map_has_key),
];

fn nested_get(map: SassMap, key: Value, rest: &[Value]) -> Option<Value> {
    let found = map.get(&key)?;
    if rest.is_empty() {
        return Some(found);
    }
    match found {
        Value::Map(m) => nested_get(m, rest[0].clone(), &rest[1..]),
        _ => None,
    }
}

fn map_get(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let map = args.get("map").assert_map(span)?;
    let key = args.get("key");
    let rest = args.get("keys").as_list_items();
    Ok(nested_get(map, key, &rest).unwrap_or(Value::Null))
}

fn map_merge(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let mut a = args.get("map1").assert_map(span)?;
    let b = args.get("map2").assert_map(span)?;
    a.merge(b);
    Ok(Value::Map(a))
}

fn map_remove(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let mut map = args.get("map").assert_map(span)?;
    map.remove(&args.get("key"));
    for k in args.get("keys").as_list_items() {
        map.remove(&k);
    }
    Ok(Value::Map(map))
}

fn map_keys(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let map = args.get("map").assert_map(span)?;
    Ok(Value::List(map.keys(), crate::common::ListSeparator::Comma, crate::common::Brackets::None))
}

fn map_values(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let map = args.get("map").assert_map(span)?;
    Ok(Value::List(map.values(), crate::common::ListSeparator::Comma, crate::common::Brackets::None))
}

fn map_has_key(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let map = args.get("map").assert_map(span)?;
    let key = args.get("key");
    let rest = args.get("keys").as_list_items();
    Ok(Value::Bool(nested_get(map, key, &rest).is_some()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::QuoteKind;

    fn span() -> Span {
        let mut map = codemap::CodeMap::new();
        map.add_file("t".into(), "x".into()).span
    }

    fn sample_map() -> SassMap {
        let mut m = SassMap::new();
        m.insert(Value::String("a".into(), QuoteKind::Quoted), Value::Bool(true));
        m
    }

    #[test]
    fn map_get_returns_null_for_missing_key() {
        let bound = BoundArgs(vec![
            ("map".to_string(), Value::Map(sample_map())),
            ("key".to_string(), Value::String("z".into(), QuoteKind::Quoted)),
            ("keys".to_string(), Value::Null),
        ]);
        assert_eq!(map_get(&bound, span()).unwrap(), Value::Null);
    }

    #[test]
    fn map_merge_overwrites_shared_keys() {
        let mut other = SassMap::new();
        other.insert(Value::String("a".into(), QuoteKind::Quoted), Value::Bool(false));
        let bound = BoundArgs(vec![
            ("map1".to_string(), Value::Map(sample_map())),
            ("map2".to_string(), Value::Map(other)),
        ]);
        let merged = map_merge(&bound, span()).unwrap();
        assert_eq!(
            merged,
            Value::Map({
                let mut m = SassMap::new();
                m.insert(Value::String("a".into(), QuoteKind::Quoted), Value::Bool(false));
                m
            })
        );
    }
}
