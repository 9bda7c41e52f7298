pub(crate) mod arglist;
pub(crate) mod calculation;
pub(crate) mod color;
pub(crate) mod map;
pub(crate) mod number;

use std::fmt;
use std::hash::{Hash, Hasher};

use codemap::Span;

pub(crate) use arglist::ArgList;
pub(crate) use calculation::{CalcOperation, CalcValue, Calculation};
pub(crate) use color::SassColor;
pub(crate) use map::SassMap;
pub(crate) use number::{SassNumber, DEFAULT_EPSILON};

use crate::common::{Brackets, ListSeparator, QuoteKind};
use crate::error::{SassError, SassErrorKind, SassResult};

/// Every value a Sass expression can reduce to (§3.3). Shared by
/// reference at the AST/evaluator boundary (`Rc` wrapping happens at the
/// call sites that need it, e.g. `Scope`); the type itself stays a plain
/// value so equality/hash are straightforward structural operations.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(SassNumber),
    Color(SassColor),
    String(String, QuoteKind),
    List(Vec<Value>, ListSeparator, Brackets),
    Map(SassMap),
    ArgList(ArgList),
    Function(String),
    Mixin(String),
    Calculation(Calculation),
}

impl Value {
    pub const fn true_() -> Value {
        Value::Bool(true)
    }

    pub const fn false_() -> Value {
        Value::Bool(false)
    }

    /// Only `false` and `null` are falsy (§3.3 value equality / §8.1).
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false) | Value::Null)
    }

    pub fn is_true(&self, _span: Span) -> SassResult<bool> {
        Ok(self.is_truthy())
    }

    /// `null` and unquoted-empty-string are "blank".
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s, QuoteKind::None) => s.is_empty(),
            Value::List(items, ..) => items.iter().all(Value::is_blank),
            _ => false,
        }
    }

    pub fn separator(&self) -> ListSeparator {
        match self {
            Value::List(_, sep, _) => *sep,
            Value::ArgList(a) => a.separator,
            _ => ListSeparator::Undecided,
        }
    }

    pub fn has_brackets(&self) -> bool {
        matches!(self, Value::List(_, _, Brackets::Bracketed))
    }

    /// Treat any value as a one-(or-more)-element list for indexing
    /// purposes (every value is "a list of itself" per Sass semantics).
    pub fn as_list_items(&self) -> Vec<Value> {
        match self {
            Value::List(items, ..) => items.clone(),
            Value::ArgList(a) => a.positional.clone(),
            Value::Map(m) => m.clone().as_list(),
            Value::Null => Vec::new(),
            other => vec![other.clone()],
        }
    }

    pub fn length_as_list(&self) -> usize {
        self.as_list_items().len()
    }

    pub fn get_value_at(&self, index: usize) -> Option<Value> {
        self.as_list_items().into_iter().nth(index)
    }

    pub fn equals(&self, other: &Value, _span: Span) -> SassResult<bool> {
        Ok(self == other)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(..) => "bool",
            Value::Number(..) => "number",
            Value::Color(..) => "color",
            Value::String(..) => "string",
            Value::List(..) => "list",
            Value::Map(..) => "map",
            Value::ArgList(..) => "arglist",
            Value::Function(..) => "function",
            Value::Mixin(..) => "mixin",
            Value::Calculation(..) => "calculation",
        }
    }

    pub fn assert_number(&self, span: Span) -> SassResult<&SassNumber> {
        match self {
            Value::Number(n) => Ok(n),
            other => Err(SassError::new(
                SassErrorKind::InvalidCssValue,
                format!("{} is not a number.", other.inspect(10)),
                span,
            )),
        }
    }

    pub fn assert_string(&self, span: Span) -> SassResult<(String, QuoteKind)> {
        match self {
            Value::String(s, q) => Ok((s.clone(), *q)),
            other => Err(SassError::new(
                SassErrorKind::InvalidCssValue,
                format!("{} is not a string.", other.inspect(10)),
                span,
            )),
        }
    }

    pub fn assert_map(&self, span: Span) -> SassResult<SassMap> {
        match self {
            Value::Map(m) => Ok(m.clone()),
            Value::List(items, ..) if items.is_empty() => Ok(SassMap::new()),
            other => Err(SassError::new(
                SassErrorKind::InvalidCssValue,
                format!("{} is not a map.", other.inspect(10)),
                span,
            )),
        }
    }

    /// Render as it would appear in CSS output; `quoted` controls whether
    /// a quoted string keeps its quotes (used when the string sits inside
    /// an already-quoted context vs. directly as a declaration value).
    pub fn to_css_string(&self, span: Span) -> SassResult<String> {
        match self {
            Value::Null => Ok(String::new()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Number(n) => Ok(crate::serializer::format_number(n.value, 10) + &n.unit.to_string()),
            Value::Color(c) => Ok(c.to_css_string()),
            Value::String(s, QuoteKind::None) => Ok(s.clone()),
            Value::String(s, QuoteKind::Quoted) => Ok(quote_string(s)),
            Value::List(items, sep, brackets) => {
                let visible: Vec<&Value> = items.iter().filter(|v| !matches!(v, Value::Null)).collect();
                if visible.is_empty() && matches!(brackets, Brackets::None) {
                    return Err(SassError::new(
                        SassErrorKind::InvalidCssValue,
                        "() isn't a valid CSS value.".to_string(),
                        span,
                    ));
                }
                let mut rendered = Vec::with_capacity(visible.len());
                for v in &visible {
                    rendered.push(v.to_css_string(span)?);
                }
                let joined = rendered.join(sep.as_str());
                Ok(if matches!(brackets, Brackets::Bracketed) {
                    format!("[{}]", joined)
                } else {
                    joined
                })
            }
            Value::Map(..) => Err(SassError::new(
                SassErrorKind::InvalidCssValue,
                format!("{} isn't a valid CSS value.", self.inspect(10)),
                span,
            )),
            Value::ArgList(a) => a.as_list().to_css_string(span),
            Value::Function(name) => Ok(format!("get-function(\"{}\")", name)),
            Value::Mixin(name) => Ok(name.clone()),
            Value::Calculation(c) => Ok(c.to_string()),
        }
    }

    /// Debug/`inspect()`-style rendering: unlike `to_css_string`, every
    /// value (including maps and `null`) renders to *something*.
    pub fn inspect(&self, precision: usize) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => {
                crate::serializer::format_number(n.value, precision) + &n.unit.to_string()
            }
            Value::Color(c) => c.to_css_string(),
            Value::String(s, QuoteKind::None) => s.clone(),
            Value::String(s, QuoteKind::Quoted) => quote_string(s),
            Value::List(items, sep, brackets) => {
                let rendered: Vec<String> = items.iter().map(|v| v.inspect(precision)).collect();
                let joined = rendered.join(match sep {
                    ListSeparator::Comma => ", ",
                    _ => sep.as_str(),
                });
                let joined = if items.len() == 1 && matches!(sep, ListSeparator::Comma) {
                    format!("{},", joined)
                } else {
                    joined
                };
                if matches!(brackets, Brackets::Bracketed) {
                    format!("[{}]", joined)
                } else if items.is_empty() {
                    "()".to_string()
                } else {
                    joined
                }
            }
            Value::Map(m) => {
                let entries: Vec<String> = m
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.inspect(precision), v.inspect(precision)))
                    .collect();
                format!("({})", entries.join(", "))
            }
            Value::ArgList(a) => a.as_list().inspect(precision),
            Value::Function(name) => format!("get-function(\"{}\")", name),
            Value::Mixin(name) => name.clone(),
            Value::Calculation(c) => c.to_string(),
        }
    }
}

fn quote_string(s: &str) -> String {
    if s.contains('"') && !s.contains('\'') {
        format!("'{}'", s)
    } else {
        format!("\"{}\"", s.replace('"', "\\\""))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a.fuzzy_eq(b, DEFAULT_EPSILON),
            (Value::Color(a), Value::Color(b)) => a.eq_rgba(b),
            (Value::String(a, _), Value::String(b, _)) => a == b,
            (Value::List(a, sa, ba), Value::List(b, sb, bb)) => {
                if a.is_empty() && b.is_empty() {
                    return ba == bb;
                }
                a == b && sa == sb && ba == bb
            }
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::ArgList(a), Value::ArgList(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Mixin(a), Value::Mixin(b)) => a == b,
            (Value::Calculation(a), Value::Calculation(b)) => a == b,
            _ => false,
        }
    }
}
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0u8.hash(state),
            Value::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Number(n) => {
                2u8.hash(state);
                // hash on the rounded-to-epsilon bit pattern so fuzzily-equal
                // numbers still hash consistently (invariant 2, §8.1).
                ((n.value * 1e10).round() as i64).hash(state);
                n.unit.to_string().hash(state);
            }
            Value::Color(c) => {
                3u8.hash(state);
                (c.red(), c.green(), c.blue()).hash(state);
                ((c.alpha() * 1000.0).round() as i64).hash(state);
            }
            Value::String(s, _) => {
                4u8.hash(state);
                s.hash(state);
            }
            Value::List(items, sep, brackets) => {
                5u8.hash(state);
                for item in items {
                    item.hash(state);
                }
                (*sep as u8).hash(state);
                matches!(brackets, Brackets::Bracketed).hash(state);
            }
            Value::Map(m) => {
                6u8.hash(state);
                // Combine per-entry hashes order-independently (XOR) so
                // two maps with the same entries in different insertion
                // order still hash equal, matching `SassMap`'s key-wise
                // `PartialEq` (invariant 2, §8.1).
                let mut combined: u64 = 0;
                for (k, v) in m.iter() {
                    let mut entry_hasher = std::collections::hash_map::DefaultHasher::new();
                    k.hash(&mut entry_hasher);
                    v.hash(&mut entry_hasher);
                    combined ^= entry_hasher.finish();
                }
                combined.hash(state);
            }
            Value::ArgList(a) => {
                7u8.hash(state);
                for v in &a.positional {
                    v.hash(state);
                }
            }
            Value::Function(name) | Value::Mixin(name) => {
                8u8.hash(state);
                name.hash(state);
            }
            Value::Calculation(c) => {
                9u8.hash(state);
                c.to_string().hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inspect(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::Unit;

    #[test]
    fn only_false_and_null_are_falsy() {
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(SassNumber::new(0.0, Unit::None)).is_truthy());
        assert!(Value::String(String::new(), QuoteKind::None).is_truthy());
    }

    #[test]
    fn maps_compare_regardless_of_order() {
        let mut a = SassMap::new();
        a.insert(Value::String("a".into(), QuoteKind::Quoted), Value::Bool(true));
        a.insert(Value::String("b".into(), QuoteKind::Quoted), Value::Bool(false));

        let mut b = SassMap::new();
        b.insert(Value::String("b".into(), QuoteKind::Quoted), Value::Bool(false));
        b.insert(Value::String("a".into(), QuoteKind::Quoted), Value::Bool(true));

        assert_eq!(Value::Map(a), Value::Map(b));
    }

    #[test]
    fn empty_lists_ignore_separator() {
        let a = Value::List(vec![], ListSeparator::Comma, Brackets::None);
        let b = Value::List(vec![], ListSeparator::Space, Brackets::None);
        assert_eq!(a, b);
    }
}
