use std::fmt;

use codemap::Span;

use crate::error::{SassError, SassErrorKind, SassResult};
use crate::unit::Unit;

/// Epsilon used for fuzzy numeric comparison and integer detection,
/// derived from the compiler's configured precision (§4.E). Default
/// precision is 10 decimal digits, giving 1e-11 as in spec.md invariant 3.
pub const DEFAULT_EPSILON: f64 = 1e-11;

/// A Sass number, optionally carrying the original `a / b` it was produced
/// from via the `/` operator (the "slash pair", used only for the
/// backward-compatibility deprecation warning when the result is later
/// used as a plain number).
#[derive(Debug, Clone)]
pub struct SassNumber {
    pub value: f64,
    pub unit: Unit,
    pub as_slash: Option<Box<(SassNumber, SassNumber)>>,
}

impl SassNumber {
    pub const fn new(value: f64, unit: Unit) -> Self {
        SassNumber {
            value,
            unit,
            as_slash: None,
        }
    }

    pub fn with_slash(value: f64, unit: Unit, num: SassNumber, den: SassNumber) -> Self {
        SassNumber {
            value,
            unit,
            as_slash: Some(Box::new((num, den))),
        }
    }

    /// Strip slash-pair memory; done whenever a number is stored into a
    /// variable or otherwise "observed" as a final value (§4.H assignment).
    #[must_use]
    pub fn without_slash(mut self) -> Self {
        self.as_slash = None;
        self
    }

    pub fn is_int(&self, epsilon: f64) -> bool {
        (self.value - self.value.round()).abs() < epsilon
    }

    pub fn assert_int(&self, span: Span, epsilon: f64) -> SassResult<i64> {
        if self.is_int(epsilon) {
            Ok(self.value.round() as i64)
        } else {
            Err(SassError::new(
                SassErrorKind::InvalidCssValue,
                format!("{} is not an integer.", self.value),
                span,
            ))
        }
    }

    pub fn fuzzy_eq(&self, other: &SassNumber, epsilon: f64) -> bool {
        if !self.unit.comparable(&other.unit) {
            return false;
        }
        let converted = other.unit.convert(other.value, &self.unit);
        (self.value - converted).abs() < epsilon
    }

    fn check_compatible(&self, other: &SassNumber, op: &str, span: Span) -> SassResult<()> {
        if self.unit.comparable(&other.unit) {
            Ok(())
        } else {
            Err(SassError::new(
                SassErrorKind::UnitMismatch,
                format!(
                    "Incompatible units {} and {} for operator \"{}\".",
                    self.unit, other.unit, op
                ),
                span,
            ))
        }
    }

    pub fn add(&self, other: &SassNumber, span: Span) -> SassResult<SassNumber> {
        self.check_compatible(other, "+", span)?;
        let rhs = other.unit.convert(other.value, &self.unit);
        Ok(SassNumber::new(self.value + rhs, self.unit.clone()))
    }

    pub fn sub(&self, other: &SassNumber, span: Span) -> SassResult<SassNumber> {
        self.check_compatible(other, "-", span)?;
        let rhs = other.unit.convert(other.value, &self.unit);
        Ok(SassNumber::new(self.value - rhs, self.unit.clone()))
    }

    /// `number * number`: units multiply. We only fully reduce the common
    /// "one side is unitless" case since Sass does not generally support
    /// compound units beyond that in the core arithmetic path.
    pub fn mul(&self, other: &SassNumber) -> SassNumber {
        let unit = if matches!(self.unit, Unit::None) {
            other.unit.clone()
        } else {
            self.unit.clone()
        };
        SassNumber::new(self.value * other.value, unit)
    }

    /// `number / number`: units cancel when they match; otherwise carried
    /// on the lhs (matching dart-sass's non-strict compound-unit handling).
    pub fn div(&self, other: &SassNumber) -> SassNumber {
        let unit = if self.unit.comparable(&other.unit) && !matches!(other.unit, Unit::None) {
            Unit::None
        } else {
            self.unit.clone()
        };
        let rhs_val = if self.unit.comparable(&other.unit) {
            other.unit.convert(other.value, &self.unit)
        } else {
            other.value
        };
        SassNumber::new(self.value / rhs_val, unit)
    }

    pub fn rem(&self, other: &SassNumber, span: Span) -> SassResult<SassNumber> {
        self.check_compatible(other, "%", span)?;
        let rhs = other.unit.convert(other.value, &self.unit);
        Ok(SassNumber::new(self.value % rhs, self.unit.clone()))
    }

    pub fn neg(&self) -> SassNumber {
        SassNumber::new(-self.value, self.unit.clone())
    }
}

impl PartialEq for SassNumber {
    fn eq(&self, other: &Self) -> bool {
        self.fuzzy_eq(other, DEFAULT_EPSILON)
    }
}

impl fmt::Display for SassNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzzy_eq_across_compatible_units() {
        let a = SassNumber::new(1.0, Unit::In);
        let b = SassNumber::new(96.0, Unit::Px);
        assert!(a.fuzzy_eq(&b, DEFAULT_EPSILON));
    }

    #[test]
    fn without_slash_clears_memory() {
        let n = SassNumber::with_slash(
            5.0,
            Unit::Px,
            SassNumber::new(10.0, Unit::Px),
            SassNumber::new(2.0, Unit::None),
        );
        assert!(n.as_slash.is_some());
        assert!(n.without_slash().as_slash.is_none());
    }
}
