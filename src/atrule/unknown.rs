use codemap::Spanned;

use crate::ast::{Interpolation, Stmt};

/// Name + interpolated parameter text + body of an at-rule this compiler
/// has no dedicated statement handling for. Generalizes the teacher's
/// `UnknownAtRule`: the teacher eagerly split declarations out into a
/// synthetic leading `RuleSet` at parse time; the expanded evaluator
/// (§4.H "At-rule (generic, unknown)") does that splitting itself during
/// evaluation instead, since whether a declaration needs a wrapping style
/// rule depends on the *enclosing* context (inside a style rule vs. at
/// top level, `@font-face`/keyframes excluded), not on the at-rule alone.
#[derive(Debug, Clone)]
pub(crate) struct UnknownAtRule {
    pub name: String,
    pub params: Interpolation,
    pub body: Vec<Spanned<Stmt>>,
}

impl UnknownAtRule {
    pub fn new(name: String, params: Interpolation, body: Vec<Spanned<Stmt>>) -> Self {
        UnknownAtRule { name, params, body }
    }
}
