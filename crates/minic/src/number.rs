//! The runtime numeric value: an unsigned 32-bit integer with C-style
//! modular arithmetic.
//!
//! All arithmetic wraps on overflow, division truncates, comparisons yield
//! 0 or 1, and boolean coercion is "nonzero". Division and modulo by zero are
//! the only failing operations; the evaluator attaches the source position to
//! the error.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::ast::Operator;

/// Error produced by a numeric operation, before the evaluator attaches a
/// source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NumericError {
    DivisionByZero,
    ModuloByZero,
}

impl fmt::Display for NumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DivisionByZero => write!(f, "Division by zero"),
            Self::ModuloByZero => write!(f, "Modulo by zero"),
        }
    }
}

/// A fixed-width unsigned 32-bit value with wraparound semantics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Number(u32);

impl Number {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(1);

    #[must_use]
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }

    /// Boolean coercion: any nonzero value is true.
    #[must_use]
    pub fn truthy(self) -> bool {
        self.0 != 0
    }

    /// Logical negation: 1 for zero, 0 otherwise.
    #[must_use]
    pub fn not(self) -> Self {
        Self(u32::from(self.0 == 0))
    }

    /// Two's-complement negation, i.e. `0 - self` with wraparound.
    #[must_use]
    pub fn neg(self) -> Self {
        Self(self.0.wrapping_neg())
    }

    fn from_bool(value: bool) -> Self {
        Self(u32::from(value))
    }

    /// Applies a binary operator. Comparison operators yield 0 or 1; the
    /// logical operators are not handled here because the evaluator
    /// short-circuits them before both operands exist.
    pub(crate) fn binary(self, op: Operator, other: Self) -> Result<Self, NumericError> {
        let result = match op {
            Operator::Add => self + other,
            Operator::Sub => self - other,
            Operator::Mult => self * other,
            Operator::Div => {
                if other.0 == 0 {
                    return Err(NumericError::DivisionByZero);
                }
                Self(self.0 / other.0)
            }
            Operator::Mod => {
                if other.0 == 0 {
                    return Err(NumericError::ModuloByZero);
                }
                Self(self.0 % other.0)
            }
            Operator::Lt => Self::from_bool(self.0 < other.0),
            Operator::LtE => Self::from_bool(self.0 <= other.0),
            Operator::Gt => Self::from_bool(self.0 > other.0),
            Operator::GtE => Self::from_bool(self.0 >= other.0),
            Operator::Eq => Self::from_bool(self.0 == other.0),
            Operator::NotEq => Self::from_bool(self.0 != other.0),
            Operator::BitAnd => Self(self.0 & other.0),
            Operator::BitOr => Self(self.0 | other.0),
            Operator::BitXor => Self(self.0 ^ other.0),
            // Short-circuit forms reduce to truthiness of the decisive operand.
            Operator::And => Self::from_bool(self.truthy() && other.truthy()),
            Operator::Or => Self::from_bool(self.truthy() || other.truthy()),
        };
        Ok(result)
    }
}

impl Add for Number {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0.wrapping_add(other.0))
    }
}

impl AddAssign for Number {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Number {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0.wrapping_sub(other.0))
    }
}

impl SubAssign for Number {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Mul for Number {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Self(self.0.wrapping_mul(other.0))
    }
}

impl From<u32> for Number {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_wraps_modulo_2_pow_32() {
        assert_eq!(Number::new(u32::MAX) + Number::ONE, Number::ZERO);
        assert_eq!(Number::new(0xffff_fff0) + Number::new(0x20), Number::new(0x10));
    }

    #[test]
    fn subtraction_wraps_below_zero() {
        assert_eq!(Number::new(2) - Number::new(5), Number::new(u32::MAX - 2));
    }

    #[test]
    fn division_truncates() {
        let q = Number::new(7).binary(Operator::Div, Number::new(2)).unwrap();
        assert_eq!(q, Number::new(3));
    }

    #[test]
    fn division_by_zero_fails() {
        assert_eq!(
            Number::new(1).binary(Operator::Div, Number::ZERO),
            Err(NumericError::DivisionByZero)
        );
        assert_eq!(
            Number::new(1).binary(Operator::Mod, Number::ZERO),
            Err(NumericError::ModuloByZero)
        );
    }

    #[test]
    fn comparisons_yield_zero_or_one() {
        assert_eq!(Number::new(2).binary(Operator::Lt, Number::new(3)).unwrap(), Number::ONE);
        assert_eq!(Number::new(3).binary(Operator::Lt, Number::new(3)).unwrap(), Number::ZERO);
        assert_eq!(Number::new(3).binary(Operator::Eq, Number::new(3)).unwrap(), Number::ONE);
    }

    #[test]
    fn logical_not_and_truthiness() {
        assert_eq!(Number::ZERO.not(), Number::ONE);
        assert_eq!(Number::new(17).not(), Number::ZERO);
        assert!(Number::new(17).truthy());
        assert!(!Number::ZERO.truthy());
    }
}
