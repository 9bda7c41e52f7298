use codemap::{Span, Spanned};

use crate::args::FuncArgs;
use crate::ast::Stmt;
use crate::environment::Scope;

/// A user-defined `@function`. Execution (binding arguments, running the
/// body, stopping at the first `@return`) lives in the evaluator
/// (`evaluator::call_user_function`) rather than here, since running a
/// function body means recursively evaluating statements the evaluator
/// already knows how to evaluate — keeping that loop in one place avoids
/// a dependency cycle between `atrule` and `evaluator`. `Function` itself
/// is the data the teacher's original `Function` struct held: the
/// closure's defining scope, its declared arguments, its body, and the
/// span used for the "finished without @return" error.
#[derive(Debug, Clone)]
pub(crate) struct Function {
    pub closure: Scope,
    pub args: FuncArgs,
    pub body: Vec<Spanned<Stmt>>,
    pub pos: Span,
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos
    }
}

impl Eq for Function {}

impl Function {
    pub fn new(closure: Scope, args: FuncArgs, body: Vec<Spanned<Stmt>>, pos: Span) -> Self {
        Function {
            closure,
            args,
            body,
            pos,
        }
    }
}
