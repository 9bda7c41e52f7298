pub(crate) mod extend;

use std::fmt;

use codemap::Span;

use crate::error::{SassError, SassErrorKind, SassResult};

/// A single simple selector (§3.2 "Selectors"). `Pseudo`'s argument, when
/// present, may itself wrap a nested `SelectorList` (`:not(.a, .b)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum SimpleSelector {
    Type(String),
    Universal,
    Id(String),
    Class(String),
    Attribute(String),
    PseudoClass {
        name: String,
        args: Option<String>,
        selector: Option<Box<SelectorList>>,
    },
    PseudoElement {
        name: String,
        args: Option<String>,
    },
    Parent,
    Placeholder(String),
}

impl fmt::Display for SimpleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimpleSelector::Type(t) => write!(f, "{}", t),
            SimpleSelector::Universal => write!(f, "*"),
            SimpleSelector::Id(s) => write!(f, "#{}", s),
            SimpleSelector::Class(s) => write!(f, ".{}", s),
            SimpleSelector::Attribute(s) => write!(f, "[{}]", s),
            SimpleSelector::PseudoClass { name, args, selector } => {
                write!(f, ":{}", name)?;
                if let Some(sel) = selector {
                    write!(f, "({})", sel)
                } else if let Some(args) = args {
                    write!(f, "({})", args)
                } else {
                    Ok(())
                }
            }
            SimpleSelector::PseudoElement { name, args } => {
                write!(f, "::{}", name)?;
                if let Some(args) = args {
                    write!(f, "({})", args)?;
                }
                Ok(())
            }
            SimpleSelector::Parent => write!(f, "&"),
            SimpleSelector::Placeholder(s) => write!(f, "%{}", s),
        }
    }
}

/// A run of simple selectors with no combinator between them (`.a.b:hover`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub(crate) struct CompoundSelector(pub Vec<SimpleSelector>);

impl CompoundSelector {
    pub fn new() -> Self {
        CompoundSelector(Vec::new())
    }

    pub fn contains_parent_ref(&self) -> bool {
        self.0.iter().any(|s| matches!(s, SimpleSelector::Parent))
    }

    pub fn contains(&self, simple: &SimpleSelector) -> bool {
        self.0.contains(simple)
    }

    /// Substitute every `&` in this compound with `prefix`'s *last*
    /// compound (concatenated onto the parent compound) — the common case
    /// `&.foo`/`.foo&`. Preceding components of `prefix` are returned
    /// separately so the caller can splice them before this compound.
    pub fn resolve_parent(&self, parent_last: &CompoundSelector) -> CompoundSelector {
        let mut out = Vec::new();
        for s in &self.0 {
            if matches!(s, SimpleSelector::Parent) {
                out.extend(parent_last.0.iter().cloned());
            } else {
                out.push(s.clone());
            }
        }
        CompoundSelector(out)
    }
}

impl fmt::Display for CompoundSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "&");
        }
        for s in &self.0 {
            write!(f, "{}", s)?;
        }
        Ok(())
    }
}

/// Combinator joining two compound selectors in a complex selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

impl Combinator {
    /// Weave compatibility: combining `self` (outer/earlier) followed by
    /// `other` (inner/later) collapses to a single combinator when they
    /// describe the same relationship once composed; `None` means the
    /// pair cannot be merged into one combinator (§4.I weave).
    pub fn compose(self, other: Combinator) -> Option<Combinator> {
        use Combinator::*;
        match (self, other) {
            (a, b) if a == b => Some(a),
            (Child, Descendant) | (Descendant, Child) => Some(Child),
            _ => None,
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Combinator::Descendant => " ",
            Combinator::Child => " > ",
            Combinator::NextSibling => " + ",
            Combinator::SubsequentSibling => " ~ ",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ComplexComponent {
    Compound(CompoundSelector),
    Combinator(Combinator),
}

/// A sequence of compound selectors joined by combinators (`.a > .b`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub(crate) struct ComplexSelector(pub Vec<ComplexComponent>);

impl ComplexSelector {
    pub fn new() -> Self {
        ComplexSelector(Vec::new())
    }

    pub fn compounds(&self) -> impl Iterator<Item = &CompoundSelector> {
        self.0.iter().filter_map(|c| match c {
            ComplexComponent::Compound(cs) => Some(cs),
            ComplexComponent::Combinator(_) => None,
        })
    }

    pub fn last_compound(&self) -> Option<&CompoundSelector> {
        self.compounds().last()
    }

    pub fn contains_parent_ref(&self) -> bool {
        self.compounds().any(CompoundSelector::contains_parent_ref)
    }

    pub fn contains(&self, simple: &SimpleSelector) -> bool {
        self.compounds().any(|c| c.contains(simple))
    }

    /// `super.zip(child)`: resolve `&` in `self` (the child, logically
    /// nested inside `super_selector`) against `parent`'s selector. If
    /// `self` never mentions `&`, it's implicitly prefixed with a
    /// descendant combinator from `parent` (§4.H "resolve parent
    /// references").
    pub fn resolve_parent(&self, parent: &ComplexSelector) -> ComplexSelector {
        if !self.contains_parent_ref() {
            if parent.0.is_empty() {
                return self.clone();
            }
            let mut out = parent.0.clone();
            if !out.is_empty() {
                out.push(ComplexComponent::Combinator(Combinator::Descendant));
            }
            out.extend(self.0.clone());
            return ComplexSelector(out);
        }

        let parent_last = parent.last_compound().cloned().unwrap_or_default();
        let parent_prefix: Vec<ComplexComponent> = {
            let mut v = Vec::new();
            let mut seen_last = false;
            for c in parent.0.iter().rev() {
                if !seen_last {
                    if matches!(c, ComplexComponent::Compound(_)) {
                        seen_last = true;
                        continue;
                    }
                }
                v.push(c.clone());
            }
            v.reverse();
            v
        };

        let mut out = Vec::new();
        for comp in &self.0 {
            match comp {
                ComplexComponent::Compound(cs) if cs.contains_parent_ref() => {
                    out.extend(parent_prefix.clone());
                    out.push(ComplexComponent::Compound(cs.resolve_parent(&parent_last)));
                }
                other => out.push(other.clone()),
            }
        }
        ComplexSelector(out)
    }
}

impl fmt::Display for ComplexSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for comp in &self.0 {
            match comp {
                ComplexComponent::Compound(cs) => {
                    if !first {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", cs)?;
                }
                ComplexComponent::Combinator(c) => {
                    write!(f, "{}", c)?;
                    continue;
                }
            }
            first = false;
        }
        Ok(())
    }
}

/// A comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub(crate) struct SelectorList(pub Vec<ComplexSelector>);

impl SelectorList {
    pub fn new() -> Self {
        SelectorList(Vec::new())
    }

    pub fn resolve_parent(&self, parent: &SelectorList) -> SelectorList {
        if parent.0.is_empty() {
            return self.clone();
        }
        let mut out = Vec::new();
        for child in &self.0 {
            if child.contains_parent_ref() {
                for p in &parent.0 {
                    out.push(child.resolve_parent(p));
                }
            } else {
                for p in &parent.0 {
                    out.push(child.resolve_parent(p));
                }
            }
        }
        SelectorList(out)
    }

    pub fn contains_parent_ref(&self) -> bool {
        self.0.iter().any(ComplexSelector::contains_parent_ref)
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", rendered.join(", "))
    }
}

/// Top-level handle the evaluator threads around; `Selector::new()` is the
/// "no enclosing selector" sentinel used at the document root, mirroring
/// the teacher's `Selector::new()` used as the initial `super_selector`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Selector(pub SelectorList);

impl Selector {
    pub fn new() -> Self {
        Selector(SelectorList::new())
    }

    pub fn from_list(list: SelectorList) -> Self {
        Selector(list)
    }

    /// Resolve `child`'s parent references against `self`. Errors if
    /// `child` uses `&` but `self` is the top-level (no enclosing rule) —
    /// the "top-level parent reference" error (§7).
    pub fn zip(&self, child: &Selector, span: Span) -> SassResult<Selector> {
        if child.0.contains_parent_ref() && self.0 .0.is_empty() {
            return Err(SassError::new(
                SassErrorKind::TopLevelParentReference,
                "Top-level selectors may not contain the parent selector \"&\".".to_string(),
                span,
            ));
        }
        Ok(Selector(child.0.resolve_parent(&self.0)))
    }

    pub fn is_empty(&self) -> bool {
        self.0 .0.is_empty()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str) -> CompoundSelector {
        CompoundSelector(vec![SimpleSelector::Class(name.to_string())])
    }

    fn complex(c: CompoundSelector) -> ComplexSelector {
        ComplexSelector(vec![ComplexComponent::Compound(c)])
    }

    #[test]
    fn parent_ref_is_replaced_with_ampersand_compound() {
        let parent = complex(class("a"));
        let mut child_compound = class("hover");
        child_compound.0.insert(0, SimpleSelector::Parent);
        let child = complex(child_compound);
        let resolved = child.resolve_parent(&parent);
        assert_eq!(resolved.to_string(), ".a.hover");
    }

    #[test]
    fn implicit_descendant_nesting_without_ampersand() {
        let parent = complex(class("a"));
        let child = complex(class("b"));
        let resolved = child.resolve_parent(&parent);
        assert_eq!(resolved.to_string(), ".a .b");
    }
}
