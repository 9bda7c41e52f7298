use std::fmt;
use std::io;
use std::string::FromUtf8Error;

use codemap::Span;

/// Stack frame recorded when an error or warning propagates through nested
/// mixin/function/include calls. `transparent` frames are hidden from the
/// user-facing trace (e.g. frames introduced by built-in plumbing).
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub name: String,
    pub span: Span,
    pub transparent: bool,
}

/// Coarse error category. No particular enum discriminant is load-bearing;
/// callers match on this to decide how to report the error, not to recover
/// from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SassErrorKind {
    Parse,
    PlainCssSyntax,
    UnitMismatch,
    IncompatibleCalcValue,
    NoAngleArgument,
    MissingArgument,
    TooManyArguments,
    ArgumentGivenTwice,
    UnknownNamedArgument,
    MixedParamGroups,
    UndefinedVariable,
    UndefinedFunction,
    UndefinedMixin,
    ModuleUnknown,
    ModuleAlreadyKnown,
    InvalidDefaultNamespace,
    InvalidSassIdentifier,
    UnknownImport,
    AmbiguousImport,
    CustomImportError,
    TopLevelParentReference,
    UnsatisfiedExtend,
    EndlessExtend,
    ExtendAcrossMedia,
    DuplicateMapKey,
    InvalidCssValue,
    Io,
    RecursionLimit,
    User,
    ContentWithoutAcceptingMixin,
    ReturnOutsideFunction,
}

#[derive(Debug, Clone)]
pub struct SassError {
    kind: SassErrorKind,
    message: String,
    span: Span,
    trace: Vec<StackFrame>,
}

impl SassError {
    pub fn new(kind: SassErrorKind, message: impl Into<String>, span: Span) -> SassError {
        SassError {
            kind,
            message: message.into(),
            span,
            trace: Vec::new(),
        }
    }

    pub fn kind(&self) -> SassErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn trace(&self) -> &[StackFrame] {
        &self.trace
    }

    #[must_use]
    pub fn with_frame(mut self, name: impl Into<String>, span: Span, transparent: bool) -> Self {
        self.trace.push(StackFrame {
            name: name.into(),
            span,
            transparent,
        });
        self
    }

    /// Single-line message, as shown on the error-reporting channel.
    pub fn to_string_line(&self) -> String {
        format!("Error: {}", self.message)
    }

    /// Multi-line formatted block with stack, for terminal display.
    pub fn to_formatted_string(&self) -> String {
        let mut out = self.to_string_line();
        for frame in self.trace.iter().filter(|f| !f.transparent) {
            out.push_str(&format!("\n    at {}", frame.name));
        }
        out
    }

    /// A CSS document whose body contains the error, for browser display.
    pub fn to_css_string(&self) -> String {
        format!(
            "/* {} */\nbody::before {{\n  font-family: monospace;\n  white-space: pre;\n  content: \"{}\";\n}}\n",
            self.message,
            self.message.replace('"', "\\\"")
        )
    }

    /// JSON-renderable payload: `{status, message, file, line, column, formatted}`.
    pub fn to_json_string(&self, file: &str, line: u64, column: u64) -> String {
        format!(
            "{{\"status\":1,\"message\":\"{}\",\"file\":\"{}\",\"line\":{},\"column\":{},\"formatted\":\"{}\"}}",
            self.message.replace('"', "\\\""),
            file.replace('"', "\\\""),
            line,
            column,
            self.to_formatted_string().replace('"', "\\\"").replace('\n', "\\n"),
        )
    }
}

impl fmt::Display for SassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SassError {}

pub type SassResult<T> = Result<T, SassError>;

impl From<(&str, Span)> for SassError {
    fn from((msg, span): (&str, Span)) -> Self {
        SassError::new(SassErrorKind::Parse, msg, span)
    }
}

impl From<(String, Span)> for SassError {
    fn from((msg, span): (String, Span)) -> Self {
        SassError::new(SassErrorKind::Parse, msg, span)
    }
}

impl From<(SassErrorKind, &str, Span)> for SassError {
    fn from((kind, msg, span): (SassErrorKind, &str, Span)) -> Self {
        SassError::new(kind, msg, span)
    }
}

impl From<(SassErrorKind, String, Span)> for SassError {
    fn from((kind, msg, span): (SassErrorKind, String, Span)) -> Self {
        SassError::new(kind, msg, span)
    }
}

/// IO errors have no natural span; they're attached to a zero-width span at
/// the start of the file that triggered them by the caller, via `map_err`.
pub(crate) fn io_error(e: io::Error, span: Span) -> SassError {
    SassError::new(SassErrorKind::Io, e.to_string(), span)
}

pub(crate) fn utf8_error(e: FromUtf8Error, span: Span) -> SassError {
    SassError::new(SassErrorKind::Io, e.to_string(), span)
}
