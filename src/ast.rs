use codemap::Spanned;

use crate::atrule::{AtRule, Function, Mixin};
use crate::common::{Brackets, ListSeparator, Op, QuoteKind};
use crate::selector::Selector;
use crate::unit::Unit;

/// An interpolation element: either literal source text or an embedded
/// `#{...}` expression (§3.2 "Interpolation" — the universal bridge
/// between text-level and value-level constructs).
#[derive(Debug, Clone)]
pub(crate) enum InterpolationPart {
    Literal(String),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Interpolation(pub Vec<InterpolationPart>);

impl Interpolation {
    pub fn plain(s: impl Into<String>) -> Self {
        Interpolation(vec![InterpolationPart::Literal(s.into())])
    }

    pub fn is_plain(&self) -> bool {
        self.0.iter().all(|p| matches!(p, InterpolationPart::Literal(_)))
    }

    pub fn as_plain(&self) -> Option<String> {
        if self.is_plain() {
            Some(
                self.0
                    .iter()
                    .map(|p| match p {
                        InterpolationPart::Literal(s) => s.as_str(),
                        InterpolationPart::Expr(_) => unreachable!(),
                    })
                    .collect(),
            )
        } else {
            None
        }
    }
}

/// SassScript expression nodes (§3.2 "Expressions"). Kept lazy: binary/
/// unary operators, function calls and `if()` are not reduced until the
/// evaluator walks them, matching spec.md's explicit "if-call (lazy)".
#[derive(Debug, Clone)]
pub(crate) enum Expr {
    Null,
    True,
    False,
    Number(f64, Unit),
    Color(crate::value::SassColor),
    Str(Interpolation, QuoteKind),
    List(Vec<Expr>, ListSeparator, Brackets),
    Map(Vec<(Expr, Expr)>),
    Variable(String),
    /// `namespace.name` access into a `@use`d module.
    NamespacedVariable(String, String),
    FunctionCall(String, Vec<Argument>),
    NamespacedFunctionCall(String, String, Vec<Argument>),
    If(Vec<Argument>),
    BinaryOp(Box<Expr>, Op, Box<Expr>),
    UnaryOp(Op, Box<Expr>),
    Paren(Box<Expr>),
    ParentSelector,
    /// Escape hatch for a value already computed by the evaluator (e.g.
    /// substituted during default-argument resolution).
    ValueWrapper(Box<crate::value::Value>),
    Interpolated(Interpolation),
}

#[derive(Debug, Clone)]
pub(crate) enum Argument {
    Positional(Expr),
    Named(String, Expr),
    /// `...` rest expansion.
    Rest(Expr),
}

/// Statement nodes (§3.2 "Statements"). Every node is wrapped in
/// `Spanned<Stmt>` at the point it's produced so the evaluator can attach
/// precise spans to errors and the serializer can emit source-map
/// mappings.
#[derive(Debug, Clone)]
pub(crate) enum Stmt {
    RuleSet {
        selector: Interpolation,
        body: Vec<Spanned<Stmt>>,
    },
    Declaration {
        property: Interpolation,
        value: Expr,
    },
    /// A nested declaration block: `font: { weight: bold; size: 1em; }`.
    DeclarationBlock {
        property: Interpolation,
        value: Option<Expr>,
        body: Vec<Spanned<Stmt>>,
    },
    Media {
        query: Interpolation,
        body: Vec<Spanned<Stmt>>,
    },
    Supports {
        query: Interpolation,
        body: Vec<Spanned<Stmt>>,
    },
    AtRoot {
        query: Option<Interpolation>,
        body: Vec<Spanned<Stmt>>,
    },
    If(crate::atrule::if_rule::If),
    For {
        var: String,
        from: Expr,
        to: Expr,
        inclusive: bool,
        body: Vec<Spanned<Stmt>>,
    },
    Each {
        vars: Vec<String>,
        iterable: Expr,
        body: Vec<Spanned<Stmt>>,
    },
    While {
        cond: Expr,
        body: Vec<Spanned<Stmt>>,
    },
    Include {
        namespace: Option<String>,
        name: String,
        args: Vec<Argument>,
        content: Option<Vec<Spanned<Stmt>>>,
    },
    MixinDecl(String, Mixin),
    FunctionDecl(String, Function),
    Return(Expr),
    Content(Vec<Argument>),
    Extend {
        selector: Interpolation,
        is_optional: bool,
    },
    Assign {
        namespace: Option<String>,
        name: String,
        value: Expr,
        default: bool,
        global: bool,
    },
    Debug(Expr),
    Warn(Expr),
    Error(Expr),
    Import(Vec<ImportArg>),
    Use {
        url: String,
        namespace: Option<UseNamespace>,
        configuration: Vec<(String, Expr)>,
    },
    Forward {
        url: String,
        prefix: Option<String>,
        show: Option<Vec<String>>,
        hide: Option<Vec<String>>,
        configuration: Vec<(String, Expr)>,
    },
    LoudComment(String),
    SilentComment(String),
    AtRule(AtRule),
}

#[derive(Debug, Clone)]
pub(crate) enum UseNamespace {
    Named(String),
    Star,
}

#[derive(Debug, Clone)]
pub(crate) enum ImportArg {
    Sass(String),
    StaticCss(Interpolation),
}

/// Threaded through the evaluator's style-rule handling; kept here since
/// both the parser (for error messages) and the evaluator reference it.
#[allow(dead_code)]
pub(crate) type SuperSelector = Selector;
