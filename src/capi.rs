//! Callback-capability surface (§6.2, supplement): an internal seam for
//! host-provided custom functions and importers, modeled the way the
//! evaluator would invoke them if this crate grew an embedding API.
//!
//! This is deliberately *not* an `extern "C"` boundary — no ABI, no
//! `#[no_mangle]`, no raw pointers. A C-style plugin interface is out of
//! scope (§1); what's modeled here is the narrower thing the evaluator
//! actually needs: a way to call a host-supplied Rust closure with bound
//! `Value` arguments and get a `Value` back, stored as a trait object
//! alongside the built-in function tables in `builtin/mod.rs`.

use std::fmt;
use std::rc::Rc;

use codemap::Span;

use crate::error::SassResult;
use crate::value::Value;

/// A host-registered function callable from Sass source as though it
/// were a built-in (`@use`-free, resolved before user `@function`s, same
/// as `builtin::call_global`). Implemented by closures via the blanket
/// impl below; implement directly for host types that need to carry
/// their own state (a resolver cache, a logger handle, ...).
pub trait CustomFunction {
    fn call(&self, args: &[Value], span: Span) -> SassResult<Value>;
}

impl<F> CustomFunction for F
where
    F: Fn(&[Value], Span) -> SassResult<Value>,
{
    fn call(&self, args: &[Value], span: Span) -> SassResult<Value> {
        self(args, span)
    }
}

/// Opaque handle to a registered custom function, returned by
/// `FunctionRegistry::register` so a host can look its own function back
/// up without holding the trait object directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionHandle(usize);

/// Name-indexed table of host-provided functions, consulted by the
/// evaluator after built-ins and user `@function`s both miss (mirrors
/// `builtin::call_global`'s `Option<SassResult<Value>>` contract so the
/// evaluator's fallback chain doesn't need a special case for this
/// source).
#[derive(Default)]
pub struct FunctionRegistry {
    entries: Vec<(String, Rc<dyn CustomFunction>)>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("names", &self.entries.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

impl FunctionRegistry {
    pub fn new() -> Self {
        FunctionRegistry { entries: Vec::new() }
    }

    pub fn register(&mut self, name: impl Into<String>, func: impl CustomFunction + 'static) -> FunctionHandle {
        let handle = FunctionHandle(self.entries.len());
        self.entries.push((name.into(), Rc::new(func)));
        handle
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn CustomFunction>> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, f)| Rc::clone(f))
    }

    pub fn by_handle(&self, handle: FunctionHandle) -> Option<&Rc<dyn CustomFunction>> {
        self.entries.get(handle.0).map(|(_, f)| f)
    }

    pub fn call(&self, name: &str, args: &[Value], span: Span) -> Option<SassResult<Value>> {
        self.get(name).map(|f| f.call(args, span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        let mut map = codemap::CodeMap::new();
        map.add_file("t".into(), "x".into()).span
    }

    #[test]
    fn registered_closure_is_callable_by_name() {
        let mut registry = FunctionRegistry::new();
        registry.register("double", |args: &[Value], _span: Span| {
            Ok(args.first().cloned().unwrap_or(Value::Null))
        });
        let result = registry.call("double", &[Value::Bool(true)], span()).unwrap().unwrap();
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn unknown_name_returns_none() {
        let registry = FunctionRegistry::new();
        assert!(registry.call("missing", &[], span()).is_none());
    }

    #[test]
    fn handle_round_trips_to_same_function() {
        let mut registry = FunctionRegistry::new();
        let handle = registry.register("id", |args: &[Value], _span: Span| {
            Ok(args.first().cloned().unwrap_or(Value::Null))
        });
        assert!(registry.by_handle(handle).is_some());
    }
}
