use codemap::Span;
use indexmap::IndexMap;

use crate::css::NodeId;
use crate::error::{SassError, SassErrorKind, SassResult};
use crate::selector::{Combinator, ComplexComponent, ComplexSelector, CompoundSelector, SelectorList, SimpleSelector};

/// A media-query context snapshot, compared only for equality (two
/// contexts are "compatible" iff they're textually identical — a
/// simplification of the full media-query subsumption check dart-sass
/// performs, adequate for the `extend across media` diagnostic in §4.I).
pub(crate) type MediaContext = Option<String>;

#[derive(Debug, Clone)]
struct Extension {
    extender: ComplexSelector,
    media: MediaContext,
    is_optional: bool,
    span: Span,
}

/// Implements `@extend` (§4.I): selectors seen so far, the extensions
/// registered against them, and the media context each selector was seen
/// under. Extension is iterated to a fixed point so that extending an
/// already-extended selector keeps working (transitive `@extend`).
#[derive(Debug, Default)]
pub(crate) struct Extender {
    /// every complex selector ever registered via `add_selector`, along
    /// with the media context active when it was registered and the CSS
    /// node whose selector it came from (so `finalize` can hand the
    /// evaluator back a result keyed by node rather than a flat list that
    /// loses which style rule each complex selector belongs to).
    selectors: Vec<(ComplexSelector, MediaContext, NodeId)>,
    /// target simple selector -> extensions registered against it.
    extensions: IndexMap<SimpleSelector, Vec<Extension>>,
}

impl Extender {
    pub fn new() -> Self {
        Extender {
            selectors: Vec::new(),
            extensions: IndexMap::new(),
        }
    }

    /// Register a style rule's resolved selector list under its CSS
    /// node. Returns nothing — extension application happens lazily at
    /// `finalize` time so that `@extend`s declared *after* the rule still
    /// apply (source order does not matter for `@extend`, matching
    /// dart-sass).
    pub fn add_selector(&mut self, node: NodeId, list: &SelectorList, media: MediaContext) {
        for complex in &list.0 {
            self.selectors.push((complex.clone(), media.clone(), node));
        }
    }

    pub fn add_extension(
        &mut self,
        extender: ComplexSelector,
        target: SimpleSelector,
        media: MediaContext,
        is_optional: bool,
        span: Span,
    ) {
        self.extensions.entry(target).or_default().push(Extension {
            extender,
            media,
            is_optional,
            span,
        });
    }

    /// Run extension to a fixed point and return, for every CSS node that
    /// registered a selector, its final (possibly multi-way extended)
    /// selector list, grouping per-complex results back by node in
    /// first-registration order (§4.G "substitute the selector list back
    /// into its style rule's selector field"). `unsatisfied` collects
    /// non-optional extensions whose target was never matched by
    /// anything (§4.I finalization).
    pub fn finalize(&self) -> SassResult<Vec<(NodeId, SelectorList)>> {
        let mut per_complex = Vec::with_capacity(self.selectors.len());
        let mut any_target_matched: IndexMap<SimpleSelector, bool> = self
            .extensions
            .keys()
            .map(|k| (k.clone(), false))
            .collect();

        for (complex, media, _node) in &self.selectors {
            let mut frontier = vec![complex.clone()];
            let mut out = vec![complex.clone()];
            let mut seen_cycle_guard = 0usize;

            loop {
                seen_cycle_guard += 1;
                if seen_cycle_guard > 10_000 {
                    return Err(SassError::new(
                        SassErrorKind::EndlessExtend,
                        "Extend loop detected; extension never reaches a fixed point.".to_string(),
                        self.extensions.values().flatten().next().map_or_else(
                            || complex_dummy_span(),
                            |e| e.span,
                        ),
                    ));
                }
                let mut next_frontier = Vec::new();
                for candidate in &frontier {
                    for (target, exts) in &self.extensions {
                        if !candidate.contains(target) {
                            continue;
                        }
                        for ext in exts {
                            if !media_compatible(media, &ext.media) {
                                if ext.is_optional {
                                    continue;
                                }
                                return Err(SassError::new(
                                    SassErrorKind::ExtendAcrossMedia,
                                    "You may not @extend selectors across media queries.".to_string(),
                                    ext.span,
                                ));
                            }
                            if let Some(produced) = weave_extend(candidate, target, &ext.extender) {
                                *any_target_matched.get_mut(target).unwrap() = true;
                                if !out.contains(&produced) {
                                    out.push(produced.clone());
                                    next_frontier.push(produced);
                                }
                            }
                        }
                    }
                }
                if next_frontier.is_empty() {
                    break;
                }
                frontier = next_frontier;
            }
            per_complex.push(out);
        }

        for (target, matched) in &any_target_matched {
            if !matched {
                let unsatisfied_is_optional = self
                    .extensions
                    .get(target)
                    .map(|exts| exts.iter().all(|e| e.is_optional))
                    .unwrap_or(true);
                if !unsatisfied_is_optional {
                    let span = self.extensions[target][0].span;
                    return Err(SassError::new(
                        SassErrorKind::UnsatisfiedExtend,
                        format!("\"{}\" failed to extend any selectors.", target),
                        span,
                    ));
                }
            }
        }

        let mut by_node: IndexMap<NodeId, Vec<ComplexSelector>> = IndexMap::new();
        for ((_, _, node), complexes) in self.selectors.iter().zip(per_complex) {
            by_node.entry(*node).or_default().extend(complexes);
        }
        let results = by_node.into_iter().map(|(node, complexes)| (node, SelectorList(complexes))).collect();

        Ok(results)
    }
}

fn complex_dummy_span() -> Span {
    // Only reached in the endless-extend branch when there happen to be no
    // registered extensions at all, which can't actually trigger that
    // branch; kept as a defensive fallback with the smallest possible span.
    codemap::CodeMap::new().add_file("extend".into(), String::new()).span
}

fn media_compatible(a: &MediaContext, b: &MediaContext) -> bool {
    match (a, b) {
        (None, _) | (_, None) => true,
        (Some(x), Some(y)) => x == y,
    }
}

/// Produce the selector that results from extending `candidate` (which
/// contains `target`) by `extender`, or `None` if `candidate` doesn't
/// actually contain `target` in a compound that can be unified.
///
/// Implements the core of §4.I: the compound containing `target` has
/// `target` replaced by the unification of its remaining simple selectors
/// with `extender`'s last compound, and `extender`'s preceding components
/// are woven onto `candidate`'s prefix.
fn weave_extend(
    candidate: &ComplexSelector,
    target: &SimpleSelector,
    extender: &ComplexSelector,
) -> Option<ComplexSelector> {
    let idx = candidate
        .0
        .iter()
        .position(|c| matches!(c, ComplexComponent::Compound(cs) if cs.contains(target)))?;

    let host = match &candidate.0[idx] {
        ComplexComponent::Compound(cs) => cs,
        ComplexComponent::Combinator(_) => return None,
    };

    let extender_last = extender.last_compound()?.clone();
    let mut unified: Vec<SimpleSelector> = host.0.iter().filter(|s| *s != target).cloned().collect();
    for s in &extender_last.0 {
        if !unified.contains(s) {
            unified.push(s.clone());
        }
    }
    let unified_compound = CompoundSelector(unified);

    let extender_prefix: Vec<ComplexComponent> = {
        let mut v = extender.0.clone();
        // drop the trailing compound (and its immediately preceding
        // combinator, if any) — what remains is woven before `candidate`'s
        // own prefix.
        if let Some(last_compound_pos) = v.iter().rposition(|c| matches!(c, ComplexComponent::Compound(_))) {
            v.truncate(last_compound_pos);
        }
        v
    };

    let mut out = Vec::new();
    out.extend(extender_prefix);
    out.extend(candidate.0[..idx].iter().cloned());
    out.push(ComplexComponent::Compound(unified_compound));
    out.extend(candidate.0[idx + 1..].iter().cloned());

    Some(normalize_combinators(ComplexSelector(out)))
}

/// Collapse adjacent combinators produced by weaving two prefixes
/// together when they describe the same relationship (§4.I
/// `Combinator::compose`); drop a leading/dangling combinator ("bogus
/// combinator", glossary) rather than emit invalid CSS.
fn normalize_combinators(selector: ComplexSelector) -> ComplexSelector {
    let mut out: Vec<ComplexComponent> = Vec::with_capacity(selector.0.len());
    for comp in selector.0 {
        if let (Some(ComplexComponent::Combinator(prev)), ComplexComponent::Combinator(cur)) =
            (out.last().cloned(), &comp)
        {
            if let Some(merged) = prev.compose(*cur) {
                out.pop();
                out.push(ComplexComponent::Combinator(merged));
                continue;
            }
        }
        out.push(comp);
    }
    while matches!(out.first(), Some(ComplexComponent::Combinator(_))) {
        out.remove(0);
    }
    while matches!(out.last(), Some(ComplexComponent::Combinator(_))) {
        out.pop();
    }
    ComplexSelector(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str) -> SimpleSelector {
        SimpleSelector::Class(name.to_string())
    }

    fn complex_of(classes: &[&str]) -> ComplexSelector {
        ComplexSelector(vec![ComplexComponent::Compound(CompoundSelector(
            classes.iter().map(|c| class(c)).collect(),
        ))])
    }

    fn dummy_span() -> Span {
        let mut map = codemap::CodeMap::new();
        map.add_file("t".into(), "x".into()).span
    }

    #[test]
    fn simple_extend_unions_selectors() {
        let mut ext = Extender::new();
        let err = complex_of(&["err"]);
        let fatal = complex_of(&["fatal"]);
        ext.add_selector(0, &SelectorList(vec![err.clone()]), None);
        ext.add_selector(1, &SelectorList(vec![fatal.clone()]), None);
        ext.add_extension(fatal.clone(), class("err"), None, false, dummy_span());

        let finalized = ext.finalize().unwrap();
        assert_eq!(finalized[0], (0, SelectorList(vec![err, fatal.clone()])));
        assert_eq!(finalized[1], (1, SelectorList(vec![fatal])));
    }

    #[test]
    fn unsatisfied_non_optional_extend_errors() {
        let mut ext = Extender::new();
        let a = complex_of(&["a"]);
        ext.add_selector(0, &SelectorList(vec![a]), None);
        ext.add_extension(complex_of(&["b"]), class("nonexistent"), None, false, dummy_span());
        assert!(ext.finalize().is_err());
    }

    #[test]
    fn optional_unsatisfied_extend_does_not_error() {
        let mut ext = Extender::new();
        let a = complex_of(&["a"]);
        ext.add_selector(0, &SelectorList(vec![a]), None);
        ext.add_extension(complex_of(&["b"]), class("nonexistent"), None, true, dummy_span());
        assert!(ext.finalize().is_ok());
    }
}
