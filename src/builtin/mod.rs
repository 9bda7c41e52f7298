//! Built-in function registry (§4.F). Each sibling module declares its
//! functions as `(name, signature, BuiltinFn)` triples using the same
//! `"$a, $b: default, $rest..."` signature strings `FuncArgs::parse_signature`
//! already knows how to read; `mod.rs` flattens them into a global table
//! consulted by the evaluator before it falls back to a user-defined
//! `@function`, and exposes the same tables per-namespace for `@use
//! "sass:math"`-style module access.

pub(crate) mod color;
pub(crate) mod list;
pub(crate) mod map;
pub(crate) mod math;
pub(crate) mod meta;
pub(crate) mod string;

use codemap::Span;

use crate::args::{CallArgs, FuncArgs};
use crate::common::normalize;
use crate::error::{SassError, SassErrorKind, SassResult};
use crate::value::{ArgList, Value};

/// A name-indexed view over a built-in call's bound arguments (§4.F call
/// protocol step 5 — built-ins read parameters by name, not position).
/// Built-in defaults aren't stored on the `FuncArgs` declaration (there's
/// no source expression to re-parse for a Rust-side default), so a param
/// declared `$x: ...` that wasn't passed comes through here as
/// `Value::Null`; each function applies its own real default for that case.
#[derive(Debug)]
pub(crate) struct BoundArgs(Vec<(String, Value)>);

impl BoundArgs {
    pub fn get(&self, name: &str) -> Value {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .unwrap_or(Value::Null)
    }

    fn rest_arglists(&self) -> Vec<ArgList> {
        self.0
            .iter()
            .filter_map(|(_, v)| match v {
                Value::ArgList(a) => Some(a.clone()),
                _ => None,
            })
            .collect()
    }
}

pub(crate) type BuiltinFn = fn(&BoundArgs, Span) -> SassResult<Value>;

type Table = &'static [(&'static str, &'static str, BuiltinFn)];

const ALL_MODULE_TABLES: &[Table] = &[
    math::FUNCTIONS,
    list::FUNCTIONS,
    map::FUNCTIONS,
    string::FUNCTIONS,
    meta::FUNCTIONS,
    color::FUNCTIONS,
];

pub(crate) fn module_functions(module: &str) -> Option<Table> {
    match module {
        "math" => Some(math::FUNCTIONS),
        "list" => Some(list::FUNCTIONS),
        "map" => Some(map::FUNCTIONS),
        "string" => Some(string::FUNCTIONS),
        "meta" => Some(meta::FUNCTIONS),
        "color" => Some(color::FUNCTIONS),
        _ => None,
    }
}

fn lookup(table: Table, name: &str) -> Option<(&'static str, BuiltinFn)> {
    let key = normalize(name);
    table
        .iter()
        .find(|(n, ..)| normalize(n) == key)
        .map(|(_, sig, f)| (*sig, *f))
}

fn lookup_global(name: &str) -> Option<(&'static str, BuiltinFn)> {
    ALL_MODULE_TABLES.iter().find_map(|table| lookup(table, name))
}

fn invoke(sig: &str, f: BuiltinFn, name: &str, args: &CallArgs, span: Span) -> SassResult<Value> {
    let decl = FuncArgs::parse_signature(sig);
    let bound = args.bind_builtin(&decl, name)?;
    let bound = BoundArgs(bound);
    let rest_args = bound.rest_arglists();
    let result = f(&bound, span)?;

    for rest in &rest_args {
        if !rest.keywords.is_empty() && !rest.keywords_were_accessed() {
            let keys = rest.keywords.iter().map(|(k, _)| format!("${}", k)).collect::<Vec<_>>().join(", ");
            return Err(SassError::new(
                SassErrorKind::TooManyArguments,
                format!("{}() has no argument(s) named {}.", name, keys),
                span,
            ));
        }
    }

    Ok(result)
}

/// Resolve and invoke a global (unprefixed) built-in by name, if one is
/// registered; `None` means the evaluator should fall through to a
/// user-defined function instead.
pub(crate) fn call_global(name: &str, args: &CallArgs, span: Span) -> Option<SassResult<Value>> {
    let (sig, f) = lookup_global(name)?;
    Some(invoke(sig, f, name, args, span))
}

/// Resolve and invoke `module.name(...)` (`@use "sass:math"` etc).
pub(crate) fn call_in_module(
    module: &str,
    name: &str,
    args: &CallArgs,
    span: Span,
) -> Option<SassResult<Value>> {
    let table = module_functions(module)?;
    let (sig, f) = lookup(table, name)?;
    Some(invoke(sig, f, name, args, span))
}

/// Existence checks backing `meta.function-exists` — same name resolution
/// as `call_global`/`call_in_module`, without actually invoking anything.
pub(crate) fn exists_global(name: &str) -> bool {
    lookup_global(name).is_some()
}

pub(crate) fn exists_in_module(module: &str, name: &str) -> bool {
    module_functions(module).and_then(|t| lookup(t, name)).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        let mut map = codemap::CodeMap::new();
        map.add_file("t".into(), "x".into()).span
    }

    #[test]
    fn global_lookup_finds_list_function() {
        let mut args = CallArgs::new(span());
        args.push_positional(Value::List(
            vec![Value::Bool(true), Value::Bool(false)],
            crate::common::ListSeparator::Comma,
            crate::common::Brackets::None,
        ));
        let result = call_global("length", &args, span()).unwrap().unwrap();
        assert_eq!(result, Value::Number(crate::value::SassNumber::new(2.0, crate::unit::Unit::None)));
    }

    #[test]
    fn module_lookup_is_namespace_scoped() {
        assert!(module_functions("math").is_some());
        assert!(module_functions("nonexistent").is_none());
        assert!(call_in_module("list", "length", &CallArgs::new(span()), span()).is_some());
    }

    #[test]
    fn unknown_global_name_returns_none() {
        assert!(call_global("definitely-not-a-function", &CallArgs::new(span()), span()).is_none());
    }
}
