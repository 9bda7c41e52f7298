use std::path::{Path, PathBuf};
use std::sync::Arc;

use codemap::{CodeMap, File, Span};

use crate::error::{SassError, SassErrorKind, SassResult};

/// Thin wrapper around `codemap::CodeMap` (§4.A): registers source text
/// under an absolutized path, sniffs for a non-UTF-8 BOM up front so the
/// parser never has to, and hands back `Arc<File>`s the lexer borrows
/// spans from. Write-once per `StyleSheet::new`/`from_path` call — a
/// fresh `SourceRegistry` is created per compilation, never shared,
/// matching §5's "no shared mutable state between compilations".
#[derive(Debug, Default)]
pub(crate) struct SourceRegistry {
    map: CodeMap,
    files: Vec<Arc<File>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        SourceRegistry { map: CodeMap::new(), files: Vec::new() }
    }

    pub fn absolutize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    }

    /// Register source text already known to be UTF-8 (e.g. produced in
    /// memory rather than read from disk).
    pub fn register(&mut self, name: impl Into<String>, contents: String) -> Arc<File> {
        let file = self.map.add_file(name.into(), contents);
        self.files.push(file.clone());
        file
    }

    /// Register raw bytes read from disk, checking for a BOM first
    /// (§6.3). UTF-8's own BOM (`EF BB BF`) is stripped silently; any
    /// other well-known BOM is rejected with the encoding's name since
    /// this compiler only reads UTF-8.
    pub fn register_bytes(&mut self, name: impl Into<String>, bytes: Vec<u8>, span_for_errors: Span) -> SassResult<Arc<File>> {
        let bytes = strip_or_reject_bom(bytes, span_for_errors)?;
        let contents = String::from_utf8(bytes).map_err(|e| crate::error::utf8_error(e, span_for_errors))?;
        let file = self.map.add_file(name.into(), contents);
        self.files.push(file.clone());
        Ok(file)
    }

    pub fn files(&self) -> &[Arc<File>] {
        &self.files
    }

    /// Resolve a span back to `(file name, 0-based line, 0-based column)`
    /// of its start, for source-map emission (§4.J).
    pub fn resolve(&self, span: Span) -> (String, u32, u32) {
        let loc = self.map.look_up_span(span);
        (loc.file.name().to_string(), loc.begin.line as u32, loc.begin.column as u32)
    }
}

fn strip_or_reject_bom(bytes: Vec<u8>, span: Span) -> SassResult<Vec<u8>> {
    const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
    if bytes.starts_with(UTF8_BOM) {
        return Ok(bytes[3..].to_vec());
    }
    let known: &[(&[u8], &str)] = &[
        (&[0x00, 0x00, 0xFE, 0xFF], "UTF-32 (big-endian)"),
        (&[0xFF, 0xFE, 0x00, 0x00], "UTF-32 (little-endian)"),
        (&[0xFE, 0xFF], "UTF-16 (big-endian)"),
        (&[0xFF, 0xFE], "UTF-16 (little-endian)"),
        (&[0x2B, 0x2F, 0x76], "UTF-7"),
        (&[0xF7, 0x64, 0x4C], "UTF-1"),
        (&[0xDD, 0x73, 0x66, 0x73], "UTF-EBCDIC"),
        (&[0x0E, 0xFE, 0xFF], "SCSU"),
        (&[0xFB, 0xEE, 0x28], "BOCU-1"),
        (&[0x84, 0x31, 0x95, 0x33], "GB-18030"),
    ];
    for (magic, name) in known {
        if bytes.starts_with(magic) {
            return Err(SassError::new(
                SassErrorKind::Io,
                format!("Input uses disallowed encoding {}; only UTF-8 is supported.", name),
                span,
            ));
        }
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        let mut map = CodeMap::new();
        map.add_file("t".into(), "x".into()).span
    }

    #[test]
    fn utf8_bom_is_stripped_silently() {
        let mut reg = SourceRegistry::new();
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b".a { color: red; }");
        let file = reg.register_bytes("a.scss", bytes, span()).unwrap();
        assert!(!file.source().starts_with('\u{feff}'));
        assert!(file.source().starts_with(".a"));
    }

    #[test]
    fn utf16_bom_is_rejected() {
        let bytes = vec![0xFEu8, 0xFF, b'x'];
        let err = strip_or_reject_bom(bytes, span()).unwrap_err();
        assert_eq!(err.kind(), SassErrorKind::Io);
    }
}
