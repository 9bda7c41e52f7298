use codemap::{Span, Spanned};

use crate::args::FuncArgs;
use crate::ast::Stmt;
use crate::environment::Scope;

/// A user-defined `@mixin`. Mirrors `Function`'s data-only shape: the
/// evaluator (`evaluator::call_mixin`) runs the body and threads
/// `@content` through, since that requires recursively evaluating
/// statements the evaluator already owns.
///
/// `accepts_content` records whether the declaration body actually uses
/// `@content` (§4.H) — `@include` is allowed to pass a block only to a
/// mixin that accepts it; passing one to a mixin that doesn't is a
/// `ContentWithoutAcceptingMixin` error at the call site.
#[derive(Debug, Clone)]
pub(crate) struct Mixin {
    pub closure: Scope,
    pub args: FuncArgs,
    pub body: Vec<Spanned<Stmt>>,
    pub accepts_content: bool,
    pub pos: Span,
}

impl PartialEq for Mixin {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos
    }
}

impl Eq for Mixin {}

impl Mixin {
    pub fn new(
        closure: Scope,
        args: FuncArgs,
        body: Vec<Spanned<Stmt>>,
        accepts_content: bool,
        pos: Span,
    ) -> Self {
        Mixin {
            closure,
            args,
            body,
            accepts_content,
            pos,
        }
    }
}
