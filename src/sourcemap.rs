use std::sync::Arc;

use codemap::File;

use crate::common::SourceMapMode;

/// One output-position -> source-position mapping, collected by the
/// serializer as it writes each rule (§4.J "supplement: source-map
/// emission"). Columns are character offsets in their respective line.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Mapping {
    pub dst_line: u32,
    pub dst_col: u32,
    pub src_file: u32,
    pub src_line: u32,
    pub src_col: u32,
}

/// Accumulates mappings while the serializer runs, then builds a v3
/// source map via the `sourcemap` crate. Kept as a thin builder rather
/// than hand-rolling JSON, matching the rest of the pack's preference
/// for a dedicated crate over ad hoc string formatting of a structured
/// format.
#[derive(Debug, Default)]
pub(crate) struct SourceMapBuilder {
    mappings: Vec<Mapping>,
    sources: Vec<String>,
}

impl SourceMapBuilder {
    pub fn new() -> Self {
        SourceMapBuilder::default()
    }

    pub fn add_source(&mut self, name: impl Into<String>) -> u32 {
        let name = name.into();
        if let Some(idx) = self.sources.iter().position(|s| *s == name) {
            return idx as u32;
        }
        self.sources.push(name);
        (self.sources.len() - 1) as u32
    }

    pub fn push(&mut self, mapping: Mapping) {
        self.mappings.push(mapping);
    }

    /// True if the serializer never recorded a single position, e.g. an
    /// all-whitespace/comment-only stylesheet under compressed output.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Serialize to a v3 source map JSON string.
    pub fn build(&self, file: &str) -> String {
        let mut builder = sourcemap::SourceMapBuilder::new(Some(file));
        for (idx, src) in self.sources.iter().enumerate() {
            builder.add_source(src);
            let _ = idx;
        }
        for m in &self.mappings {
            builder.add_raw(m.dst_line, m.dst_col, m.src_line, m.src_col, Some(m.src_file), None);
        }
        let map = builder.into_sourcemap();
        let mut out: Vec<u8> = Vec::new();
        if map.to_writer(&mut out).is_err() {
            return "{}".to_string();
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Render per `SourceMapMode`: `None` suppresses emission entirely,
    /// `Inline` embeds it as a `data:` URI comment, `Link`/`EmbedContents`
    /// both emit a sibling `.css.map` reference (content embedding itself
    /// is a caller concern — this only decides the trailing comment).
    pub fn trailing_comment(&self, mode: SourceMapMode, file: &str, css_file: &str) -> Option<String> {
        match mode {
            SourceMapMode::None => None,
            SourceMapMode::Inline | SourceMapMode::EmbedContents => {
                let json = self.build(file);
                let encoded = base64_encode(json.as_bytes());
                Some(format!(
                    "/*# sourceMappingURL=data:application/json;base64,{} */\n",
                    encoded
                ))
            }
            SourceMapMode::Link => Some(format!("/*# sourceMappingURL={}.map */\n", css_file)),
        }
    }
}

/// Only needed for the inline `data:` URI case; kept tiny and local
/// rather than pulling in a dedicated base64 crate the teacher's stack
/// doesn't otherwise need.
fn base64_encode(data: &[u8]) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = String::with_capacity((data.len() + 2) / 3 * 4);
    for chunk in data.chunks(3) {
        let b0 = chunk[0];
        let b1 = *chunk.get(1).unwrap_or(&0);
        let b2 = *chunk.get(2).unwrap_or(&0);
        out.push(ALPHABET[(b0 >> 2) as usize] as char);
        out.push(ALPHABET[(((b0 & 0x03) << 4) | (b1 >> 4)) as usize] as char);
        out.push(if chunk.len() > 1 {
            ALPHABET[(((b1 & 0x0f) << 2) | (b2 >> 6)) as usize] as char
        } else {
            '='
        });
        out.push(if chunk.len() > 2 {
            ALPHABET[(b2 & 0x3f) as usize] as char
        } else {
            '='
        });
    }
    out
}

#[allow(dead_code)]
pub(crate) fn file_count(map: &CodeMap) -> usize {
    map.files().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_mode_emits_nothing() {
        let b = SourceMapBuilder::new();
        assert!(b.trailing_comment(SourceMapMode::None, "a.scss", "a.css").is_none());
    }

    #[test]
    fn link_mode_points_at_sibling_map_file() {
        let b = SourceMapBuilder::new();
        let comment = b.trailing_comment(SourceMapMode::Link, "a.scss", "a.css").unwrap();
        assert!(comment.contains("a.css.map"));
    }

    #[test]
    fn base64_round_trips_short_strings() {
        assert_eq!(base64_encode(b"Man"), "TWFu");
        assert_eq!(base64_encode(b"Ma"), "TWE=");
    }
}
