use codemap::Spanned;

use crate::ast::{Expr, Stmt};
use crate::error::SassResult;

/// `@if` / `@else if` / `@else` chain (§4.H "Control flow"). Parsing
/// already reduced each branch's condition and body to `Expr`/`Stmt`
/// trees, so this only needs to remember the branches in order plus an
/// optional trailing `@else` with no condition — the same shape as the
/// teacher's `branches: Vec<Branch>, else_: Vec<Token>`, just over parsed
/// nodes instead of raw tokens.
#[derive(Debug, Clone)]
pub(crate) struct If {
    pub branches: Vec<Branch>,
    pub else_branch: Option<Vec<Spanned<Stmt>>>,
}

#[derive(Debug, Clone)]
pub(crate) struct Branch {
    pub cond: Expr,
    pub body: Vec<Spanned<Stmt>>,
}

impl Branch {
    pub fn new(cond: Expr, body: Vec<Spanned<Stmt>>) -> Branch {
        Branch { cond, body }
    }
}

impl If {
    pub fn new(branches: Vec<Branch>, else_branch: Option<Vec<Spanned<Stmt>>>) -> If {
        If {
            branches,
            else_branch,
        }
    }

    /// Walk the branches in order, evaluating each condition with
    /// `is_truthy` until one matches, matching the teacher's `eval`: the
    /// first true condition wins, and nothing past it runs. `is_truthy`
    /// is supplied by the evaluator (the only thing that knows how to
    /// reduce an `Expr` against a live scope), keeping `If` itself free
    /// of a dependency on the evaluator module.
    pub fn select_branch<F>(&self, mut is_truthy: F) -> SassResult<&[Spanned<Stmt>]>
    where
        F: FnMut(&Expr) -> SassResult<bool>,
    {
        for branch in &self.branches {
            if is_truthy(&branch.cond)? {
                return Ok(&branch.body);
            }
        }
        Ok(self.else_branch.as_deref().unwrap_or(&[]))
    }
}
