use codemap::Span;

use crate::ast::Expr;
use crate::common::normalize;
use crate::error::{SassError, SassErrorKind, SassResult};
use crate::value::Value;

/// A single declared parameter (`$a`, `$b: default`, `$rest...`). The
/// default is kept as an unevaluated `Expr` (not a `Value`) since it may
/// reference earlier parameters or call a function (§4.F) — `bind`
/// evaluates it lazily, only when the caller didn't supply that argument.
#[derive(Debug, Clone)]
pub(crate) struct Param {
    pub name: String,
    pub default: Option<Expr>,
    pub is_variadic: bool,
}

/// Evaluate a default expression with no evaluator context. Built-in
/// signature strings only ever spell out literal defaults (numbers,
/// colors, strings, `null`, `true`/`false`, literal lists), so this
/// covers every case `invoke` actually needs; anything else falls back to
/// `null` rather than failing a call that didn't even request it.
pub(crate) fn eval_literal_expr(expr: &Expr) -> SassResult<Value> {
    Ok(match expr {
        Expr::Null => Value::Null,
        Expr::True => Value::Bool(true),
        Expr::False => Value::Bool(false),
        Expr::Number(n, unit) => Value::Number(crate::value::SassNumber::new(*n, unit.clone())),
        Expr::Color(c) => Value::Color(c.clone()),
        Expr::Str(interp, quote) => Value::String(interp.as_plain().unwrap_or_default(), *quote),
        Expr::List(items, sep, brackets) => {
            let values = items.iter().map(eval_literal_expr).collect::<SassResult<Vec<_>>>()?;
            Value::List(values, *sep, *brackets)
        }
        Expr::Paren(inner) => eval_literal_expr(inner)?,
        _ => Value::Null,
    })
}

fn dummy_span() -> Span {
    thread_local! {
        static DUMMY: Span = {
            let mut m = codemap::CodeMap::new();
            m.add_file("<args>".into(), String::new()).span
        };
    }
    DUMMY.with(|s| *s)
}

/// The parsed parameter list of a mixin/function/built-in declaration —
/// what spec.md §4.F calls an `ArgumentDeclaration`, parsed once from a
/// signature string (or, for user code, directly from the `@mixin`/
/// `@function` header) and reused on every call.
#[derive(Debug, Clone, Default)]
pub(crate) struct FuncArgs(pub Vec<Param>);

impl FuncArgs {
    pub fn new() -> Self {
        FuncArgs(Vec::new())
    }

    pub fn has_variadic(&self) -> bool {
        self.0.last().map_or(false, |p| p.is_variadic)
    }

    /// Parse a signature string like `"$a, $b: 1px, $rest..."`, the
    /// format built-ins are registered with (§4.F).
    pub fn parse_signature(sig: &str) -> FuncArgs {
        let mut params = Vec::new();
        for raw in split_top_level_commas(sig) {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let raw = raw.strip_prefix('$').unwrap_or(raw);
            if let Some(name) = raw.strip_suffix("...") {
                params.push(Param {
                    name: normalize(name.trim()),
                    default: None,
                    is_variadic: true,
                });
            } else if let Some((name, default_src)) = raw.split_once(':') {
                let default = crate::parser::parse_value_str(default_src.trim(), dummy_span()).unwrap_or(Expr::Null);
                params.push(Param {
                    name: normalize(name.trim()),
                    default: Some(default),
                    is_variadic: false,
                });
            } else {
                params.push(Param {
                    name: normalize(raw.trim()),
                    default: None,
                    is_variadic: false,
                });
            }
        }
        FuncArgs(params)
    }
}

fn split_top_level_commas(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut cur = String::new();
    for c in s.chars() {
        match c {
            '(' | '[' => {
                depth += 1;
                cur.push(c);
            }
            ')' | ']' => {
                depth -= 1;
                cur.push(c);
            }
            ',' if depth == 0 => {
                out.push(std::mem::take(&mut cur));
            }
            _ => cur.push(c),
        }
    }
    if !cur.trim().is_empty() {
        out.push(cur);
    }
    out
}

/// A positional/named argument as evaluated at the call site, before
/// binding against a `FuncArgs` declaration.
#[derive(Debug, Clone)]
pub(crate) enum CallArg {
    Positional(Value),
    Named(String, Value),
}

/// The evaluated argument list at a call site (§4.F call protocol, steps
/// 1-4). `rest` holds whatever was passed via `...` expansion, already
/// flattened into `positional`/`named` by the time binding runs.
#[derive(Debug, Clone, Default)]
pub(crate) struct CallArgs {
    pub positional: Vec<Value>,
    pub named: Vec<(String, Value)>,
    span: Option<Span>,
}

impl CallArgs {
    pub fn new(span: Span) -> Self {
        CallArgs {
            positional: Vec::new(),
            named: Vec::new(),
            span: Some(span),
        }
    }

    pub fn span(&self) -> Span {
        self.span.expect("CallArgs::span used before being set")
    }

    pub fn push_positional(&mut self, v: Value) {
        self.positional.push(v);
    }

    pub fn push_named(&mut self, name: &str, v: Value) {
        self.named.push((normalize(name), v));
    }

    pub fn get_positional(&self, idx: usize) -> Option<Value> {
        self.positional.get(idx).cloned()
    }

    pub fn get_named(&self, name: &str) -> Option<Value> {
        let key = normalize(name);
        self.named.iter().find(|(n, _)| *n == key).map(|(_, v)| v.clone())
    }

    /// Bind against `decl`, applying the call protocol: positional, then
    /// named, then default, then rest (§4.F). Returns the bound
    /// `(name, value)` pairs in declaration order, ready to install into
    /// a fresh `Scope`. `eval_default` evaluates a parameter's default
    /// expression only when the caller didn't supply that argument,
    /// keeping this module decoupled from the evaluator (same pattern as
    /// `If::select_branch`'s `is_truthy` callback).
    pub fn bind<F>(&self, decl: &FuncArgs, fn_name: &str, mut eval_default: F) -> SassResult<Vec<(String, Value)>>
    where
        F: FnMut(&Expr) -> SassResult<Value>,
    {
        let span = self.span();
        let mut bound = Vec::with_capacity(decl.0.len());
        let mut used_named: Vec<bool> = vec![false; self.named.len()];
        let mut next_positional = 0usize;

        for param in &decl.0 {
            if param.is_variadic {
                let mut rest_positional = Vec::new();
                while next_positional < self.positional.len() {
                    rest_positional.push(self.positional[next_positional].clone());
                    next_positional += 1;
                }
                let mut rest_keywords = Vec::new();
                for (i, used) in used_named.iter_mut().enumerate() {
                    if !*used {
                        rest_keywords.push(self.named[i].clone());
                        *used = true;
                    }
                }
                let arglist = crate::value::ArgList::new(
                    rest_positional,
                    rest_keywords,
                    crate::common::ListSeparator::Comma,
                );
                bound.push((param.name.clone(), Value::ArgList(arglist)));
                continue;
            }

            if next_positional < self.positional.len() {
                bound.push((param.name.clone(), self.positional[next_positional].clone()));
                next_positional += 1;
                continue;
            }

            if let Some(pos) = self.named.iter().position(|(n, _)| *n == param.name) {
                if used_named[pos] {
                    return Err(SassError::new(
                        SassErrorKind::ArgumentGivenTwice,
                        format!("Argument ${} was passed both by position and by name.", param.name),
                        span,
                    ));
                }
                used_named[pos] = true;
                bound.push((param.name.clone(), self.named[pos].1.clone()));
                continue;
            }

            if let Some(default) = &param.default {
                bound.push((param.name.clone(), eval_default(default)?));
                continue;
            }

            return Err(SassError::new(
                SassErrorKind::MissingArgument,
                format!("Missing argument ${}.", param.name),
                span,
            ));
        }

        if !decl.has_variadic() {
            if next_positional < self.positional.len() {
                return Err(SassError::new(
                    SassErrorKind::TooManyArguments,
                    format!(
                        "{} only takes {} argument{}.",
                        fn_name,
                        decl.0.len(),
                        if decl.0.len() == 1 { "" } else { "s" }
                    ),
                    span,
                ));
            }
            for (i, used) in used_named.iter().enumerate() {
                if !used {
                    return Err(SassError::new(
                        SassErrorKind::UnknownNamedArgument,
                        format!("No argument named ${}.", self.named[i].0),
                        span,
                    ));
                }
            }
        }

        Ok(bound)
    }

    /// `bind` for built-ins, whose signature-string defaults are always
    /// literal (§4.F) and never need evaluator context.
    pub fn bind_builtin(&self, decl: &FuncArgs, fn_name: &str) -> SassResult<Vec<(String, Value)>> {
        self.bind(decl, fn_name, |e| eval_literal_expr(e))
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
    fn missing_required_argument_errors() {
        let decl = FuncArgs(vec![Param {
            name: "a".into(),
            default: None,
            is_variadic: false,
        }]);
        let args = CallArgs::new(span());
        let err = args.bind_builtin(&decl, "foo").unwrap_err();
        assert_eq!(err.kind(), SassErrorKind::MissingArgument);
    }

    #[test]
    fn positional_then_named_then_default() {
        let decl = FuncArgs(vec![
            Param {
                name: "a".into(),
                default: None,
                is_variadic: false,
            },
            Param {
                name: "b".into(),
                default: Some(Expr::False),
                is_variadic: false,
            },
        ]);
        let mut args = CallArgs::new(span());
        args.push_positional(Value::Bool(true));
        let bound = args.bind_builtin(&decl, "foo").unwrap();
        assert_eq!(bound[0], ("a".to_string(), Value::Bool(true)));
        assert_eq!(bound[1], ("b".to_string(), Value::Bool(false)));
    }

    #[test]
    fn unknown_named_argument_errors() {
        let decl = FuncArgs(vec![Param {
            name: "a".into(),
            default: None,
            is_variadic: false,
        }]);
        let mut args = CallArgs::new(span());
        args.push_named("a", Value::Bool(true));
        args.push_named("z", Value::Bool(true));
        let err = args.bind_builtin(&decl, "foo").unwrap_err();
        assert_eq!(err.kind(), SassErrorKind::UnknownNamedArgument);
    }

    #[test]
    fn default_expression_is_evaluated_lazily() {
        let decl = FuncArgs::parse_signature("$a: 1px");
        let args = CallArgs::new(span());
        let bound = args.bind(&decl, "foo", |e| crate::args::eval_literal_expr(e)).unwrap();
        assert_eq!(
            bound[0],
            ("a".to_string(), Value::Number(crate::value::SassNumber::new(1.0, crate::unit::Unit::Px)))
        );
    }
}
