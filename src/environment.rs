use std::rc::Rc;

use codemap::Spanned;

use crate::args::FuncArgs;
use crate::atrule::{Function, Mixin};
use crate::common::normalize;
use crate::error::{SassError, SassErrorKind, SassResult};
use crate::value::Value;

/// What a frame is for, which governs how lookups and assignments cross
/// it (§4.D / §9 "Frames"):
///
/// - `Module`: a `@use`d module's root. Lookups never cross a `Module`
///   boundary implicitly; only through namespaced access.
/// - `Block`: an ordinary `{ }` nesting (style rule, mixin body, …) —
///   opaque: declarations inside don't leak to the parent.
/// - `Import`: an `@import`ed file's root — permeable for *everything*.
/// - `Permeable`: `@if`/`@for`/`@each`/`@while` bodies — assignments to an
///   already-existing outer variable flow through; new variables stay
///   local unless `!global`.
/// - `Loop`: a fresh per-iteration scope (`@while`'s per-iteration rule);
///   behaves like `Permeable` for lookups.
/// - `Internal`: built-in function/mixin scope, never user-visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameKind {
    Module,
    Block,
    Import,
    Permeable,
    Loop,
    Internal,
}

impl FrameKind {
    const fn is_permeable(self) -> bool {
        matches!(self, FrameKind::Permeable | FrameKind::Loop | FrameKind::Import)
    }
}

#[derive(Debug, Clone)]
struct Frame {
    kind: FrameKind,
    vars: Vec<(String, Value)>,
    funcs: Vec<(String, Rc<Function>)>,
    mixins: Vec<(String, Rc<Mixin>)>,
    parent: Option<Box<Frame>>,
}

impl Frame {
    fn new(kind: FrameKind, parent: Option<Box<Frame>>) -> Self {
        Frame {
            kind,
            vars: Vec::new(),
            funcs: Vec::new(),
            mixins: Vec::new(),
            parent,
        }
    }
}

/// A lexically-scoped chain of frames (§4.D). Kept as an explicit
/// singly-linked list (generalizing the teacher's flat `Scope`) so
/// `FrameKind` can govern shadowing/permeability per-hop instead of
/// relying on a single global thread-local.
#[derive(Debug, Clone)]
pub(crate) struct Scope {
    top: Frame,
}

impl Scope {
    pub fn new() -> Self {
        Scope {
            top: Frame::new(FrameKind::Block, None),
        }
    }

    pub fn new_module_root() -> Self {
        Scope {
            top: Frame::new(FrameKind::Module, None),
        }
    }

    /// Push a new child frame of `kind`, returning the scope with the new
    /// frame on top.
    #[must_use]
    pub fn push(&self, kind: FrameKind) -> Self {
        let parent = Box::new(self.top.clone());
        Scope {
            top: Frame::new(kind, Some(parent)),
        }
    }

    /// Pop back to the parent frame (scope exit). Frames are owned, not
    /// reference counted, so this simply drops the child in reverse
    /// order of creation (§5 "guaranteed release semantics").
    #[must_use]
    pub fn pop(&self) -> Self {
        match &self.top.parent {
            Some(parent) => Scope {
                top: (**parent).clone(),
            },
            None => self.clone(),
        }
    }

    fn find_var<'a>(frame: &'a Frame, name: &str) -> Option<&'a Value> {
        frame.vars.iter().rev().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_var(&self, name: &str) -> SassResult<Value> {
        let key = normalize(name);
        let mut frame = Some(&self.top);
        while let Some(f) = frame {
            if let Some(v) = Self::find_var(f, &key) {
                return Ok(v.clone());
            }
            frame = f.parent.as_deref();
        }
        Err(SassError::new(
            SassErrorKind::UndefinedVariable,
            format!("Undefined variable: \"${}\".", name),
            fallback_span(),
        ))
    }

    pub fn var_exists(&self, name: &str) -> bool {
        self.get_var(name).is_ok()
    }

    /// Insert/overwrite a variable in the *nearest non-permeable* frame,
    /// per §4.D "assignment flows to the nearest enclosing non-permeable
    /// frame" — this is what makes `@if`/loops able to mutate an outer
    /// variable without declaring a new one.
    #[must_use]
    pub fn insert_var(mut self, name: &str, value: Value) -> Self {
        let key = normalize(name);
        {
            let mut frame = &mut self.top;
            loop {
                if !frame.kind.is_permeable() || frame.parent.is_none() {
                    break;
                }
                // descend into parent only if name doesn't already exist
                // locally; otherwise mutate here.
                if Self::find_var(frame, &key).is_some() {
                    break;
                }
                match frame.parent.as_deref_mut() {
                    Some(p) => frame = p,
                    None => break,
                }
            }
            upsert(&mut frame.vars, key, value);
        }
        self
    }

    /// `!global` — assign in the outermost (module root) frame.
    #[must_use]
    pub fn insert_global_var(mut self, name: &str, value: Value) -> Self {
        let key = normalize(name);
        {
            let mut frame = &mut self.top;
            while let Some(p) = frame.parent.as_deref_mut() {
                frame = p;
            }
            upsert(&mut frame.vars, key, value);
        }
        self
    }

    /// `!default` — only assign if the slot is currently absent or null.
    #[must_use]
    pub fn insert_default_var(self, name: &str, value: Value) -> Self {
        match self.get_var(name) {
            Ok(Value::Null) | Err(_) => self.insert_var(name, value),
            Ok(_) => self,
        }
    }

    pub fn insert_fn(&mut self, name: &str, func: Function) {
        upsert(&mut self.top.funcs, normalize(name), Rc::new(func));
    }

    pub fn get_fn(&self, name: &str) -> Option<Rc<Function>> {
        let key = normalize(name);
        let mut frame = Some(&self.top);
        while let Some(f) = frame {
            if let Some((_, v)) = f.funcs.iter().rev().find(|(n, _)| *n == key) {
                return Some(Rc::clone(v));
            }
            frame = f.parent.as_deref();
        }
        None
    }

    pub fn fn_exists(&self, name: &str) -> bool {
        self.get_fn(name).is_some()
    }

    pub fn insert_mixin(&mut self, name: &str, mixin: Mixin) {
        upsert(&mut self.top.mixins, normalize(name), Rc::new(mixin));
    }

    pub fn get_mixin(&self, name: &str) -> Option<Rc<Mixin>> {
        let key = normalize(name);
        let mut frame = Some(&self.top);
        while let Some(f) = frame {
            if let Some((_, v)) = f.mixins.iter().rev().find(|(n, _)| *n == key) {
                return Some(Rc::clone(v));
            }
            frame = f.parent.as_deref();
        }
        None
    }

    pub fn mixin_exists(&self, name: &str) -> bool {
        self.get_mixin(name).is_some()
    }

    pub fn extend(&mut self, other: Scope) {
        self.top.vars.extend(other.top.vars);
        self.top.funcs.extend(other.top.funcs);
        self.top.mixins.extend(other.top.mixins);
    }

    /// `@forward ... show/hide` plus `as <prefix>-*` — like `extend`, but
    /// filters `other`'s names through `show`/`hide` and applies `prefix`
    /// before merging (§4.D forwarding). Returns the final (post-prefix)
    /// names actually merged, for `Module::forwarded_*` bookkeeping.
    pub fn extend_filtered(
        &mut self,
        other: Scope,
        show: Option<&[String]>,
        hide: Option<&[String]>,
        prefix: Option<&str>,
    ) -> Vec<String> {
        let keep = |name: &str| -> bool {
            let key = normalize(name);
            if let Some(show) = show {
                return show.iter().any(|n| normalize(n) == key);
            }
            if let Some(hide) = hide {
                return !hide.iter().any(|n| normalize(n) == key);
            }
            true
        };
        let apply_prefix = |name: &str| -> String {
            match prefix {
                Some(p) => format!("{}{}", p, name),
                None => name.to_string(),
            }
        };

        let mut merged = Vec::new();
        for (name, value) in other.top.vars {
            if keep(&name) {
                let final_name = apply_prefix(&name);
                upsert(&mut self.top.vars, final_name.clone(), value);
                merged.push(final_name);
            }
        }
        for (name, func) in other.top.funcs {
            if keep(&name) {
                let final_name = apply_prefix(&name);
                upsert(&mut self.top.funcs, final_name.clone(), func);
                merged.push(final_name);
            }
        }
        for (name, mixin) in other.top.mixins {
            if keep(&name) {
                let final_name = apply_prefix(&name);
                upsert(&mut self.top.mixins, final_name.clone(), mixin);
                merged.push(final_name);
            }
        }
        merged
    }
}

impl Default for Scope {
    fn default() -> Self {
        Scope::new()
    }
}

fn upsert<V>(vec: &mut Vec<(String, V)>, key: String, value: V) {
    if let Some(slot) = vec.iter_mut().find(|(n, _)| *n == key) {
        slot.1 = value;
    } else {
        vec.push((key, value));
    }
}

/// `get_var`'s error needs *a* span even though `Scope` itself is
/// span-agnostic; callers (the evaluator) immediately replace it with the
/// real use-site span via `map_err`/`with_span`. This keeps `Scope`
/// decoupled from `codemap::CodeMap` ownership.
fn fallback_span() -> codemap::Span {
    thread_local! {
        static DUMMY: codemap::Span = {
            let mut m = codemap::CodeMap::new();
            m.add_file("<scope>".into(), String::new()).span
        };
    }
    DUMMY.with(|s| *s)
}

/// A parsed, loaded stylesheet's module: a root frame plus the
/// forwarded-name maps `@forward` exposes to downstream consumers
/// (§3.4/§4.D). `@use` does not expose these; only a `@forward` chain
/// does, which is why they're tracked separately from `scope`.
#[derive(Debug, Clone)]
pub(crate) struct Module {
    pub scope: Scope,
    pub forwarded_vars: Vec<String>,
    pub forwarded_mixins: Vec<String>,
    pub forwarded_funcs: Vec<String>,
    pub upstream: Vec<String>,
}

impl Module {
    pub fn new(scope: Scope) -> Self {
        Module {
            scope,
            forwarded_vars: Vec::new(),
            forwarded_mixins: Vec::new(),
            forwarded_funcs: Vec::new(),
            upstream: Vec::new(),
        }
    }
}

#[allow(dead_code)]
pub(crate) type VarDecl = Spanned<Value>;
#[allow(dead_code)]
pub(crate) type FnArgsDecl = FuncArgs;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_law_keeps_existing_value() {
        let scope = Scope::new().insert_var("x", Value::Bool(true));
        let scope = scope.insert_default_var("x", Value::Bool(false));
        assert_eq!(scope.get_var("x").unwrap(), Value::Bool(true));
    }

    #[test]
    fn default_law_sets_when_null() {
        let scope = Scope::new().insert_var("x", Value::Null);
        let scope = scope.insert_default_var("x", Value::Bool(true));
        assert_eq!(scope.get_var("x").unwrap(), Value::Bool(true));
    }

    #[test]
    fn permeable_frame_assignment_flows_outward() {
        let outer = Scope::new().insert_var("x", Value::Bool(false));
        let inner = outer.push(FrameKind::Permeable);
        let inner = inner.insert_var("x", Value::Bool(true));
        let outer_again = inner.pop();
        assert_eq!(outer_again.get_var("x").unwrap(), Value::Bool(true));
    }

    #[test]
    fn block_frame_shadows_without_leaking() {
        let outer = Scope::new().insert_var("x", Value::Bool(false));
        let inner = outer.push(FrameKind::Block);
        let inner = inner.insert_var("x", Value::Bool(true));
        assert_eq!(inner.get_var("x").unwrap(), Value::Bool(true));
        let outer_again = inner.pop();
        assert_eq!(outer_again.get_var("x").unwrap(), Value::Bool(false));
    }

    #[test]
    fn extend_filtered_respects_hide_and_prefix() {
        let source = Scope::new()
            .insert_var("a", Value::Bool(true))
            .insert_var("b", Value::Bool(false));
        let mut dest = Scope::new();
        let merged = dest.extend_filtered(source, None, Some(&["b".to_string()]), Some("lib-"));
        assert_eq!(merged, vec!["lib-a".to_string()]);
        assert_eq!(dest.get_var("lib-a").unwrap(), Value::Bool(true));
        assert!(dest.get_var("lib-b").is_err());
    }
}
