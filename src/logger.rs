use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use codemap::Span;

/// User-facing diagnostic channel (§2 ambient "Logging"), kept separate
/// from the `log` crate facade used for contributor-facing debug tracing.
/// `@warn`/`@debug` and deprecation notices go through here; they never
/// abort compilation the way a `SassError` does.
pub trait Logger: std::fmt::Debug {
    fn warn(&self, message: &str, span: Span);
    fn debug(&self, message: &str, span: Span);
}

/// Default logger: writes to stderr, matching the teacher's bare
/// `eprintln!` calls but routed through a trait object so callers can
/// swap in a silent logger (e.g. for `Options::quiet`) or capture output
/// in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugLogger;

impl Logger for DebugLogger {
    fn warn(&self, message: &str, span: Span) {
        let _ = writeln!(io::stderr(), "Warning: {} at {:?}", message, span);
        log::warn!("{}", message);
    }

    fn debug(&self, message: &str, span: Span) {
        let _ = writeln!(io::stderr(), "{:?} DEBUG: {}", span, message);
        log::debug!("{}", message);
    }
}

/// Discards everything; used when `Options::quiet` suppresses the
/// stderr channel without needing to silence the `log` facade too.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentLogger;

impl Logger for SilentLogger {
    fn warn(&self, message: &str, _span: Span) {
        log::warn!("{}", message);
    }

    fn debug(&self, message: &str, _span: Span) {
        log::debug!("{}", message);
    }
}

/// Wraps another logger and additionally records every `@warn` message, so
/// `Sheet::warnings` (§6.1) can hand them back to the caller instead of
/// only ever reaching stderr.
#[derive(Debug)]
pub(crate) struct CapturingLogger {
    inner: Rc<dyn Logger>,
    warnings: RefCell<Vec<String>>,
}

impl CapturingLogger {
    pub fn new(inner: Rc<dyn Logger>) -> Self {
        CapturingLogger {
            inner,
            warnings: RefCell::new(Vec::new()),
        }
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }
}

impl Logger for CapturingLogger {
    fn warn(&self, message: &str, span: Span) {
        self.warnings.borrow_mut().push(message.to_string());
        self.inner.warn(message, span);
    }

    fn debug(&self, message: &str, span: Span) {
        self.inner.debug(message, span);
    }
}
