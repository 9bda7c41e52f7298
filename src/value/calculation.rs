use std::fmt;

use crate::common::Op;
use crate::value::Value;

/// An unevaluated `+ - * /` node inside a `calc()`-family argument. Built
/// by the parser/evaluator instead of performing runtime arithmetic
/// whenever an operand isn't calc-safe to a plain number (§4.F).
#[derive(Debug, Clone, PartialEq)]
pub struct CalcOperation {
    pub op: Op,
    pub lhs: Box<CalcValue>,
    pub rhs: Box<CalcValue>,
}

/// An operand inside a calculation: either a fully-reduced value or a
/// further unevaluated operation.
#[derive(Debug, Clone, PartialEq)]
pub enum CalcValue {
    Value(Box<Value>),
    Operation(CalcOperation),
}

impl fmt::Display for CalcValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalcValue::Value(v) => write!(f, "{}", v.inspect(10)),
            CalcValue::Operation(op) => {
                let needs_parens_side = |side: &CalcValue| matches!(side, CalcValue::Operation(_));
                if needs_parens_side(&op.lhs) {
                    write!(f, "({})", op.lhs)?;
                } else {
                    write!(f, "{}", op.lhs)?;
                }
                write!(f, " {} ", op.op)?;
                if needs_parens_side(&op.rhs) {
                    write!(f, "({})", op.rhs)
                } else {
                    write!(f, "{}", op.rhs)
                }
            }
        }
    }
}

/// A named calculation (`calc`, `min`, `max`, `clamp`, …) over calc-safe
/// operands, returned instead of a `Number` when at least one argument
/// could not be reduced to a plain number (§4.F).
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub name: String,
    pub args: Vec<CalcValue>,
}

impl fmt::Display for Calculation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}
