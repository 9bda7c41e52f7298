use std::path::PathBuf;
use std::rc::Rc;

use crate::common::{OutputStyle, SourceMapMode};
use crate::logger::{DebugLogger, Logger, SilentLogger};

/// Compilation configuration (§6.1). Threaded through the whole
/// pipeline by value/reference instead of the teacher's thread-local
/// `GLOBAL_SCOPE`, so independent `StyleSheet` compilations never share
/// mutable state (§5).
#[derive(Clone)]
pub struct Options {
    pub(crate) precision: usize,
    pub(crate) style: OutputStyle,
    pub(crate) load_paths: Vec<PathBuf>,
    pub(crate) source_map_mode: SourceMapMode,
    pub(crate) quiet: bool,
    pub(crate) recursion_limit: usize,
    pub(crate) logger: Rc<dyn Logger>,
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("precision", &self.precision)
            .field("style", &self.style)
            .field("load_paths", &self.load_paths)
            .field("source_map_mode", &self.source_map_mode)
            .field("quiet", &self.quiet)
            .field("recursion_limit", &self.recursion_limit)
            .finish()
    }
}

impl Default for Options {
    fn default() -> Self {
        Options {
            precision: 10,
            style: OutputStyle::default(),
            load_paths: Vec::new(),
            source_map_mode: SourceMapMode::default(),
            quiet: false,
            recursion_limit: 1024,
            logger: Rc::new(DebugLogger),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Options::default()
    }

    #[must_use]
    pub fn precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    #[must_use]
    pub fn style(mut self, style: OutputStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn load_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.load_paths.push(path.into());
        self
    }

    #[must_use]
    pub fn source_map_mode(mut self, mode: SourceMapMode) -> Self {
        self.source_map_mode = mode;
        self
    }

    /// Suppress the stderr diagnostic channel (`@warn`/`@debug`) without
    /// touching the `log` crate facade.
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        if quiet {
            self.logger = Rc::new(SilentLogger);
        } else {
            self.logger = Rc::new(DebugLogger);
        }
        self
    }

    #[must_use]
    pub fn recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    #[must_use]
    pub fn logger(mut self, logger: Rc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub(crate) fn logger_ref(&self) -> &dyn Logger {
        &*self.logger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_precision_is_ten() {
        assert_eq!(Options::new().precision, 10);
    }

    #[test]
    fn quiet_swaps_in_silent_logger() {
        let opts = Options::new().quiet(true);
        assert!(opts.quiet);
    }
}
