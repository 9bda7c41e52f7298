/// Merges two already-resolved `@media` query strings by intersection
/// (§4.H "media merge-by-intersection"): nesting one `@media` inside
/// another means both conditions must hold, which for the plain-text
/// queries this compiler keeps (full media-query-list algebra is out of
/// scope, see DESIGN.md) is simply their conjunction.
pub(crate) fn merge_queries(outer: &str, inner: &str) -> String {
    let outer = outer.trim();
    let inner = inner.trim();
    if outer.is_empty() {
        inner.to_string()
    } else if inner.is_empty() {
        outer.to_string()
    } else {
        format!("{} and {}", outer, inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_two_queries_with_and() {
        assert_eq!(merge_queries("screen", "(min-width: 100px)"), "screen and (min-width: 100px)");
    }

    #[test]
    fn empty_outer_query_passes_inner_through() {
        assert_eq!(merge_queries("", "screen"), "screen");
    }
}
