//! Module loader (§4.G): resolves `@use`/`@forward`/`@import`/
//! `meta.load-css` requests to parsed stylesheets, honoring Sass's
//! partial/index/extension-fill-in file conventions, caching parsed and
//! compiled modules by canonical path, and tracking an import stack to
//! catch circular loads (§5).
//!
//! Generalizes the teacher's single `import(file_name) -> (Vec<Stmt>,
//! Scope)` free function into a per-compilation `ModuleLoader` that keeps
//! the load-once/re-import-many-times distinction spec.md draws between
//! `@use`/`@forward` and `@import`, and that records the reverse-DFS
//! post-order the serializer needs for module topology (invariant 7).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use codemap::{Span, Spanned};

use crate::ast::Stmt;
use crate::common::Syntax;
use crate::environment::Module;
use crate::error::{SassError, SassErrorKind, SassResult};
use crate::parser::StyleSheetParser;
use crate::source::SourceRegistry;

/// Result of resolving and parsing a `@use`/`@forward`/`load-css` target.
/// `Cached` short-circuits the evaluator straight to the already-built
/// module (spec.md §3: "a module becomes compiled exactly once"); `Fresh`
/// hands back the parsed body for the evaluator to build a `Module` from,
/// which it then reports back via `ModuleLoader::record_compiled`.
pub(crate) enum ModuleLoad {
    Fresh { canonical: PathBuf, stmts: Rc<Vec<Spanned<Stmt>>> },
    Cached(Rc<Module>),
}

/// True for `@import` targets that are never loaded as Sass and instead
/// pass through verbatim as a literal CSS `@import` (plain URLs, `.css`
/// files) — dart-sass's rule for distinguishing the two `ImportArg`
/// shapes the parser already produces one of blindly (`ast::ImportArg`).
pub(crate) fn is_plain_css_import(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://") || url.starts_with("//") || url.ends_with(".css")
}

/// One compilation's module graph and load caches. Constructed fresh per
/// `StyleSheet` build alongside `SourceRegistry` — never shared across
/// compilations, matching §5's "no shared mutable state" rule.
pub(crate) struct ModuleLoader {
    load_paths: Vec<PathBuf>,
    parsed: HashMap<PathBuf, Rc<Vec<Spanned<Stmt>>>>,
    compiled: HashMap<PathBuf, Rc<Module>>,
    loading: Vec<PathBuf>,
    order: Vec<PathBuf>,
}

impl ModuleLoader {
    pub fn new(load_paths: Vec<PathBuf>) -> Self {
        ModuleLoader {
            load_paths,
            parsed: HashMap::new(),
            compiled: HashMap::new(),
            loading: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Step 1 of the load algorithm: resolve `url` (relative to `prev`'s
    /// directory, then each configured load path, in order) to exactly
    /// one file, honoring partials (`_name.scss`), extension fill-in, and
    /// index files (`name/_index.scss`). The first directory that yields
    /// any match wins; zero matches overall is `UnknownImport`, more than
    /// one match within the winning directory is `AmbiguousImport`.
    fn resolve(&self, url: &str, prev: Option<&Path>, span: Span) -> SassResult<(PathBuf, Syntax)> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        if let Some(parent) = prev.and_then(Path::parent) {
            dirs.push(parent.to_path_buf());
        }
        dirs.extend(self.load_paths.iter().cloned());
        if dirs.is_empty() {
            dirs.push(PathBuf::new());
        }

        for dir in &dirs {
            let found = candidates_in_dir(dir, url);
            match found.len() {
                0 => continue,
                1 => {
                    let (path, syntax) = found.into_iter().next().unwrap();
                    return Ok((path.canonicalize().unwrap_or(path), syntax));
                }
                _ => {
                    let list = found.iter().map(|(p, _)| format!("  {}", p.display())).collect::<Vec<_>>().join("\n");
                    return Err(SassError::new(
                        SassErrorKind::AmbiguousImport,
                        format!("It's not clear which file to import for \"{}\". Found:\n{}", url, list),
                        span,
                    ));
                }
            }
        }

        Err(SassError::new(
            SassErrorKind::UnknownImport,
            format!("Can't find stylesheet to import: \"{}\".", url),
            span,
        ))
    }

    /// Step 3 of the load algorithm (and the `@import` re-entry path):
    /// read, register, and parse `canonical`, or hand back an already
    /// parsed copy. Parsing is cached by path regardless of which entry
    /// kind triggered it, so a `@use` and a later `@import` of the same
    /// partial never re-tokenize it.
    fn parse_and_cache(&mut self, canonical: &Path, syntax: Syntax, sources: &mut SourceRegistry, span: Span) -> SassResult<Rc<Vec<Spanned<Stmt>>>> {
        if let Some(cached) = self.parsed.get(canonical) {
            return Ok(Rc::clone(cached));
        }
        let bytes = std::fs::read(canonical)
            .map_err(|e| SassError::new(SassErrorKind::Io, format!("Error reading {}: {}", canonical.display(), e), span))?;
        let file = sources.register_bytes(canonical.to_string_lossy().into_owned(), bytes, span)?;
        let src = file.source().to_string();
        let stmts = Rc::new(StyleSheetParser::new(file, &src, syntax).parse()?);
        self.parsed.insert(canonical.to_path_buf(), Rc::clone(&stmts));
        Ok(stmts)
    }

    /// `@use url as ns with (…)` / `@forward url … with (…)` /
    /// `meta.load-css(url, $with:)` entry point. Direct recursion through
    /// the import stack is always an error for these three (unlike
    /// `@import`) since a module can't depend on its own, still-loading,
    /// root frame.
    pub fn load_module(&mut self, url: &str, prev: Option<&Path>, sources: &mut SourceRegistry, span: Span) -> SassResult<ModuleLoad> {
        let (canonical, syntax) = self.resolve(url, prev, span)?;

        if let Some(module) = self.compiled.get(&canonical) {
            return Ok(ModuleLoad::Cached(Rc::clone(module)));
        }
        if self.loading.contains(&canonical) {
            return Err(SassError::new(
                SassErrorKind::ModuleAlreadyKnown,
                format!("Module loop: {} is already loading.", canonical.display()),
                span,
            ));
        }

        self.loading.push(canonical.clone());
        let result = self.parse_and_cache(&canonical, syntax, sources, span);
        self.loading.pop();
        let stmts = result?;
        Ok(ModuleLoad::Fresh { canonical, stmts })
    }

    /// Record the evaluator's finished `Module` for `canonical`, caching
    /// it for subsequent `@use`s/`load-css`s of the same path and
    /// appending it to the reverse-DFS post-order the serializer
    /// consumes (§4.G topological ordering).
    pub fn record_compiled(&mut self, canonical: PathBuf, module: Rc<Module>) {
        self.order.push(canonical.clone());
        self.compiled.insert(canonical, module);
    }

    /// `@import url` entry point: permeable — re-importing the same file
    /// is allowed and its declarations re-execute at the new call site.
    /// A path already on the loading stack (direct self-recursion) is a
    /// no-op rather than an infinite loop, per §5.
    pub fn load_import(&mut self, url: &str, prev: Option<&Path>, sources: &mut SourceRegistry, span: Span) -> SassResult<Rc<Vec<Spanned<Stmt>>>> {
        let (canonical, syntax) = self.resolve(url, prev, span)?;
        if self.loading.contains(&canonical) {
            return Ok(Rc::new(Vec::new()));
        }
        self.loading.push(canonical.clone());
        let result = self.parse_and_cache(&canonical, syntax, sources, span);
        self.loading.pop();
        result
    }

    /// Reverse-DFS post-order of every `@use`/`@forward`/`load-css`
    /// module compiled so far: a dependency always precedes its
    /// dependents, matching invariant 7 ("module topology").
    pub fn compiled_order(&self) -> &[PathBuf] {
        &self.order
    }
}

/// Split `url`'s final path segment into its parent-relative directory,
/// stem, and an explicit `scss`/`sass`/`css` extension if present.
fn split_url(url: &str) -> (PathBuf, String, Option<&'static str>) {
    let path = Path::new(url);
    let parent = path.parent().map(PathBuf::from).unwrap_or_default();
    let file = path.file_name().and_then(|s| s.to_str()).unwrap_or(url);
    match file.rsplit_once('.') {
        Some((stem, "scss")) => (parent, stem.to_string(), Some("scss")),
        Some((stem, "sass")) => (parent, stem.to_string(), Some("sass")),
        Some((stem, "css")) => (parent, stem.to_string(), Some("css")),
        _ => (parent, file.to_string(), None),
    }
}

fn candidates_in_dir(dir: &Path, url: &str) -> Vec<(PathBuf, Syntax)> {
    let (rel_parent, stem, ext) = split_url(url);
    let target_dir = dir.join(rel_parent);

    let direct = direct_candidates(&target_dir, &stem, ext);
    if !direct.is_empty() {
        return direct;
    }
    if ext.is_none() {
        return index_candidates(&target_dir.join(&stem));
    }
    Vec::new()
}

fn direct_candidates(target_dir: &Path, stem: &str, ext: Option<&'static str>) -> Vec<(PathBuf, Syntax)> {
    let exts: &[(&str, Syntax)] = match ext {
        Some("css") => &[("css", Syntax::Css)],
        Some("scss") => &[("scss", Syntax::Scss)],
        Some("sass") => &[("sass", Syntax::Sass)],
        Some(_) => &[],
        None => &[("scss", Syntax::Scss), ("sass", Syntax::Sass), ("css", Syntax::Css)],
    };
    let mut out = Vec::new();
    for (e, syntax) in exts {
        let plain = target_dir.join(format!("{}.{}", stem, e));
        if plain.is_file() {
            out.push((plain, *syntax));
        }
        if *syntax != Syntax::Css {
            let partial = target_dir.join(format!("_{}.{}", stem, e));
            if partial.is_file() {
                out.push((partial, *syntax));
            }
        }
    }
    out
}

fn index_candidates(as_dir: &Path) -> Vec<(PathBuf, Syntax)> {
    let mut out = Vec::new();
    for (e, syntax) in [("scss", Syntax::Scss), ("sass", Syntax::Sass)] {
        let with_underscore = as_dir.join(format!("_index.{}", e));
        if with_underscore.is_file() {
            out.push((with_underscore, syntax));
        }
        let plain = as_dir.join(format!("index.{}", e));
        if plain.is_file() {
            out.push((plain, syntax));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn span() -> Span {
        let mut map = codemap::CodeMap::new();
        map.add_file("t".into(), "x".into()).span
    }

    #[test]
    fn resolves_partial_over_load_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("_button.scss"), ".btn { color: red; }").unwrap();
        let loader = ModuleLoader::new(vec![dir.path().to_path_buf()]);
        let (path, syntax) = loader.resolve("button", None, span()).unwrap();
        assert_eq!(path, dir.path().join("_button.scss").canonicalize().unwrap());
        assert_eq!(syntax, Syntax::Scss);
    }

    #[test]
    fn ambiguous_plain_and_partial_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("button.scss"), "").unwrap();
        fs::write(dir.path().join("_button.scss"), "").unwrap();
        let loader = ModuleLoader::new(vec![dir.path().to_path_buf()]);
        let err = loader.resolve("button", None, span()).unwrap_err();
        assert_eq!(err.kind(), SassErrorKind::AmbiguousImport);
    }

    #[test]
    fn missing_file_is_unknown_import() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ModuleLoader::new(vec![dir.path().to_path_buf()]);
        let err = loader.resolve("nope", None, span()).unwrap_err();
        assert_eq!(err.kind(), SassErrorKind::UnknownImport);
    }

    #[test]
    fn falls_back_to_index_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("theme")).unwrap();
        fs::write(dir.path().join("theme").join("_index.scss"), "").unwrap();
        let loader = ModuleLoader::new(vec![dir.path().to_path_buf()]);
        let (path, _) = loader.resolve("theme", None, span()).unwrap();
        assert_eq!(path, dir.path().join("theme").join("_index.scss").canonicalize().unwrap());
    }

    #[test]
    fn module_is_cached_after_record_compiled() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("_a.scss"), "$x: 1;").unwrap();
        let mut loader = ModuleLoader::new(vec![dir.path().to_path_buf()]);
        let mut sources = SourceRegistry::new();
        let load = loader.load_module("a", None, &mut sources, span()).unwrap();
        let canonical = match load {
            ModuleLoad::Fresh { canonical, .. } => canonical,
            ModuleLoad::Cached(_) => panic!("expected a fresh load on first entry"),
        };
        loader.record_compiled(canonical.clone(), Rc::new(Module::new(crate::environment::Scope::new_module_root())));
        match loader.load_module("a", None, &mut sources, span()).unwrap() {
            ModuleLoad::Cached(_) => {}
            ModuleLoad::Fresh { .. } => panic!("expected the cached module on re-entry"),
        }
        assert_eq!(loader.compiled_order(), &[canonical]);
    }

    #[test]
    fn direct_use_recursion_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("_a.scss"), "").unwrap();
        let mut loader = ModuleLoader::new(vec![dir.path().to_path_buf()]);
        let mut sources = SourceRegistry::new();
        let canonical = dir.path().join("_a.scss").canonicalize().unwrap();
        loader.loading.push(canonical);
        let err = loader.load_module("a", None, &mut sources, span()).unwrap_err();
        assert_eq!(err.kind(), SassErrorKind::ModuleAlreadyKnown);
    }

    #[test]
    fn direct_import_recursion_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.scss"), "").unwrap();
        let mut loader = ModuleLoader::new(vec![dir.path().to_path_buf()]);
        let mut sources = SourceRegistry::new();
        let canonical = dir.path().join("a.scss").canonicalize().unwrap();
        loader.loading.push(canonical);
        let stmts = loader.load_import("a", None, &mut sources, span()).unwrap();
        assert!(stmts.is_empty());
    }

    #[test]
    fn plain_css_import_urls_are_recognized() {
        assert!(is_plain_css_import("theme.css"));
        assert!(is_plain_css_import("https://fonts.example.com/a"));
        assert!(!is_plain_css_import("theme"));
        assert!(!is_plain_css_import("_theme.scss"));
    }
}
