//! `sass:meta` plus the global aliases (§4.F). Most of these need access
//! to the evaluator's environment (variable/function/mixin existence,
//! `@content` presence, dynamic `call()`) rather than just their own
//! arguments; they're registered here with the pure subset implemented
//! directly, and the environment-dependent ones left as `NotYetBound`
//! placeholders the evaluator overrides by checking the function name
//! before falling through to this table (`src/evaluator.rs`, §4.H).

use codemap::Span;

use crate::common::QuoteKind;
use crate::error::{SassError, SassErrorKind, SassResult};
use crate::value::{ArgList, SassNumber, Value};

use super::{BoundArgs, BuiltinFn};

pub(crate) const FUNCTIONS: &[(&str, &str, BuiltinFn)] = &[
    ("type-of", "$value", type_of),
    ("inspect", "$value", inspect),
    ("keywords", "$args", keywords),
    ("feature-exists", "$feature", feature_exists),
    // The following are resolved against live environment state the
    // evaluator holds, not against this table's bound args: they're
    // registered so `meta.*` namespacing and arity checking still work,
    // but `environment_dependent` marks them for the evaluator's
    // pre-dispatch so they never actually reach `not_yet_bound`.
    ("variable-exists", "$name", not_yet_bound),
    ("global-variable-exists", "$name", not_yet_bound),
    ("function-exists", "$name", not_yet_bound),
    ("mixin-exists", "$name", not_yet_bound),
    ("content-exists", "", not_yet_bound),
    ("call", "$function, $args...", not_yet_bound),
    ("get-function", "$name, $css: false, $module: null", not_yet_bound),
];

/// Functions in `FUNCTIONS` whose real implementation requires the
/// evaluator's scope/module state; `src/evaluator.rs` checks this before
/// dispatching a `meta.*`/global call so `not_yet_bound` is never
/// actually invoked in a complete build.
pub(crate) const ENVIRONMENT_DEPENDENT: &[&str] = &[
    "variable-exists",
    "global-variable-exists",
    "function-exists",
    "mixin-exists",
    "content-exists",
    "call",
    "get-function",
];

fn not_yet_bound(_args: &BoundArgs, span: Span) -> SassResult<Value> {
    Err(SassError::new(
        SassErrorKind::UndefinedFunction,
        "this function requires evaluator context and was dispatched incorrectly".to_string(),
        span,
    ))
}

fn type_of(args: &BoundArgs, _span: Span) -> SassResult<Value> {
    Ok(Value::String(args.get("value").type_name().to_string(), QuoteKind::None))
}

fn inspect(args: &BoundArgs, _span: Span) -> SassResult<Value> {
    Ok(Value::String(args.get("value").inspect(10), QuoteKind::None))
}

fn keywords(args: &BoundArgs, span: Span) -> SassResult<Value> {
    match args.get("args") {
        Value::ArgList(a) => {
            a.mark_keywords_accessed();
            let mut map = crate::value::SassMap::new();
            for (k, v) in &a.keywords {
                map.insert(Value::String(k.clone(), QuoteKind::Quoted), v.clone());
            }
            Ok(Value::Map(map))
        }
        other => Err(SassError::new(
            SassErrorKind::InvalidCssValue,
            format!("$args: {} is not an argument list.", other.inspect(10)),
            span,
        )),
    }
}

fn feature_exists(args: &BoundArgs, _span: Span) -> SassResult<Value> {
    let (name, _) = match args.get("feature") {
        Value::String(s, q) => (s, q),
        _ => return Ok(Value::Bool(false)),
    };
    let known = matches!(
        name.as_str(),
        "global-variable-shadowing" | "extend-selector-pseudoclass" | "units-level-3" | "at-error"
    );
    Ok(Value::Bool(known))
}

/// Helper the evaluator uses to build a `keywords()`-compatible
/// `ArgList` from a call's unused named arguments.
pub(crate) fn unused_named_arglist(named: Vec<(String, Value)>) -> ArgList {
    ArgList::new(Vec::new(), named, crate::common::ListSeparator::Comma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::Unit;

    fn span() -> Span {
        let mut map = codemap::CodeMap::new();
        map.add_file("t".into(), "x".into()).span
    }

    #[test]
    fn type_of_names_match_value_variants() {
        let bound = BoundArgs(vec![("value".to_string(), Value::Number(SassNumber::new(1.0, Unit::None)))]);
        assert_eq!(type_of(&bound, span()).unwrap(), Value::String("number".into(), QuoteKind::None));
    }

    #[test]
    fn keywords_builds_map_from_arglist_keywords() {
        let arglist = ArgList::new(
            Vec::new(),
            vec![("color".to_string(), Value::Bool(true))],
            crate::common::ListSeparator::Comma,
        );
        let bound = BoundArgs(vec![("args".to_string(), Value::ArgList(arglist))]);
        let result = keywords(&bound, span()).unwrap();
        match result {
            Value::Map(m) => assert_eq!(m.get(&Value::String("color".into(), QuoteKind::Quoted)), Some(Value::Bool(true))),
            _ => panic!("expected map"),
        }
    }
}
