/// Parsed `@at-root (with: ...)` / `@at-root (without: ...)` query
/// (§4.C `AtRootQueryParser`). Bare `@at-root` (no parens) excludes only
/// style rules, matching `AtRootQuery::default()`.
#[derive(Debug, Clone)]
pub(crate) struct AtRootQuery {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for AtRootQuery {
    fn default() -> Self {
        AtRootQuery {
            include: Vec::new(),
            exclude: vec!["rule".to_string()],
        }
    }
}

impl AtRootQuery {
    /// Parse the contents of `(with: rule media)` / `(without: media)`.
    pub fn parse(text: &str) -> AtRootQuery {
        let text = text.trim();
        let mut query = AtRootQuery { include: Vec::new(), exclude: Vec::new() };
        if let Some(rest) = text.strip_prefix("with:") {
            query.include = rest.split_whitespace().map(str::to_string).collect();
        } else if let Some(rest) = text.strip_prefix("without:") {
            query.exclude = rest.split_whitespace().map(str::to_string).collect();
        } else if text.is_empty() {
            return AtRootQuery::default();
        }
        query
    }

    /// Whether a node of kind `kind` (`"rule"`, `"media"`, `"supports"`,
    /// `"all"`, …) should be excluded from the current context.
    pub fn excludes(&self, kind: &str) -> bool {
        if !self.include.is_empty() {
            return !self.include.iter().any(|k| k == kind || k == "all");
        }
        self.exclude.iter().any(|k| k == kind || k == "all")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_at_root_excludes_only_style_rules() {
        let q = AtRootQuery::default();
        assert!(q.excludes("rule"));
        assert!(!q.excludes("media"));
    }

    #[test]
    fn with_media_includes_only_media() {
        let q = AtRootQuery::parse("with: media");
        assert!(q.excludes("rule"));
        assert!(!q.excludes("media"));
    }

    #[test]
    fn without_all_excludes_everything() {
        let q = AtRootQuery::parse("without: all");
        assert!(q.excludes("rule"));
        assert!(q.excludes("media"));
    }
}
