//! Operator overloading for linear expressions
//!
//! Variables and expressions support natural arithmetic notation. Every operator
//! consumes its operands and returns a new [`LinearExpression`]:
//!
//! ```ignore
//! let expr1 = x + y;             // Addition
//! let expr2 = x - y;             // Subtraction
//! let expr3 = -x;                // Negation
//! let expr4 = 2.0 * x;           // Scalar multiplication (left)
//! let expr5 = x * 2.0;           // Scalar multiplication (right)
//! let expr6 = 1.0 - x;           // Constants on either side
//! let total: LinearExpression<_> = days.iter().map(|d| plant[d]).sum();
//! ```
//!
//! Summing an empty iterator gives the zero expression.
//!
//! Comparisons cannot be overloaded to build constraints in Rust, so rules are
//! written with [`Constraint`](super::Constraint) builders or the
//! [`constraint!`](crate::constraint) macro instead.

use std::iter::Sum;
use std::ops::{Add, Mul, Neg, Sub};

use super::{LinearExpression, VariableId};

// ============================================================================
// Operators for LinearExpression
// ============================================================================

impl<Brand> Add<LinearExpression<Brand>> for LinearExpression<Brand> {
    type Output = LinearExpression<Brand>;

    fn add(mut self, other: LinearExpression<Brand>) -> Self::Output {
        for term in other.terms {
            self.add_term(term.coefficient, term.variable);
        }
        self.constant += other.constant;
        self
    }
}

impl<Brand> Add<VariableId<Brand>> for LinearExpression<Brand> {
    type Output = LinearExpression<Brand>;

    fn add(mut self, other: VariableId<Brand>) -> Self::Output {
        self.add_term(1.0, other);
        self
    }
}

impl<Brand> Add<f64> for LinearExpression<Brand> {
    type Output = LinearExpression<Brand>;

    fn add(mut self, other: f64) -> Self::Output {
        self.constant += other;
        self
    }
}

impl<Brand> Sub<LinearExpression<Brand>> for LinearExpression<Brand> {
    type Output = LinearExpression<Brand>;

    fn sub(self, other: LinearExpression<Brand>) -> Self::Output {
        self + (-other)
    }
}

impl<Brand> Sub<VariableId<Brand>> for LinearExpression<Brand> {
    type Output = LinearExpression<Brand>;

    fn sub(mut self, other: VariableId<Brand>) -> Self::Output {
        self.add_term(-1.0, other);
        self
    }
}

impl<Brand> Sub<f64> for LinearExpression<Brand> {
    type Output = LinearExpression<Brand>;

    fn sub(mut self, other: f64) -> Self::Output {
        self.constant -= other;
        self
    }
}

impl<Brand> Mul<f64> for LinearExpression<Brand> {
    type Output = LinearExpression<Brand>;

    fn mul(self, other: f64) -> Self::Output {
        if other == 0.0 {
            return LinearExpression::zero();
        }
        let mut terms = self.terms;
        for term in &mut terms {
            term.coefficient *= other;
        }
        LinearExpression {
            terms,
            constant: self.constant * other,
        }
    }
}

impl<Brand> Neg for LinearExpression<Brand> {
    type Output = LinearExpression<Brand>;

    fn neg(self) -> Self::Output {
        self * -1.0
    }
}

impl<Brand> Sum<LinearExpression<Brand>> for LinearExpression<Brand> {
    fn sum<I: Iterator<Item = LinearExpression<Brand>>>(iter: I) -> Self {
        iter.fold(LinearExpression::zero(), |acc, expr| acc + expr)
    }
}

impl<Brand> Sum<VariableId<Brand>> for LinearExpression<Brand> {
    fn sum<I: Iterator<Item = VariableId<Brand>>>(iter: I) -> Self {
        iter.fold(LinearExpression::zero(), |acc, var| acc + var)
    }
}

impl<'a, Brand> Sum<&'a VariableId<Brand>> for LinearExpression<Brand> {
    fn sum<I: Iterator<Item = &'a VariableId<Brand>>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// ============================================================================
// Operators for VariableId
// ============================================================================

impl<Brand> Add<LinearExpression<Brand>> for VariableId<Brand> {
    type Output = LinearExpression<Brand>;

    fn add(self, other: LinearExpression<Brand>) -> Self::Output {
        LinearExpression::from_variable(self) + other
    }
}

impl<Brand> Add<VariableId<Brand>> for VariableId<Brand> {
    type Output = LinearExpression<Brand>;

    fn add(self, other: VariableId<Brand>) -> Self::Output {
        LinearExpression::from_variable(self) + other
    }
}

impl<Brand> Add<f64> for VariableId<Brand> {
    type Output = LinearExpression<Brand>;

    fn add(self, other: f64) -> Self::Output {
        LinearExpression::from_variable(self) + other
    }
}

impl<Brand> Sub<VariableId<Brand>> for VariableId<Brand> {
    type Output = LinearExpression<Brand>;

    fn sub(self, other: VariableId<Brand>) -> Self::Output {
        LinearExpression::from_variable(self) - other
    }
}

impl<Brand> Sub<LinearExpression<Brand>> for VariableId<Brand> {
    type Output = LinearExpression<Brand>;

    fn sub(self, other: LinearExpression<Brand>) -> Self::Output {
        LinearExpression::from_variable(self) - other
    }
}

impl<Brand> Sub<f64> for VariableId<Brand> {
    type Output = LinearExpression<Brand>;

    fn sub(self, other: f64) -> Self::Output {
        LinearExpression::from_variable(self) - other
    }
}

impl<Brand> Mul<f64> for VariableId<Brand> {
    type Output = LinearExpression<Brand>;

    fn mul(self, other: f64) -> Self::Output {
        LinearExpression::from_variable(self) * other
    }
}

impl<Brand> Neg for VariableId<Brand> {
    type Output = LinearExpression<Brand>;

    fn neg(self) -> Self::Output {
        LinearExpression::from_variable(self) * -1.0
    }
}

// ============================================================================
// Reverse operators for f64
// ============================================================================

impl<Brand> Mul<VariableId<Brand>> for f64 {
    type Output = LinearExpression<Brand>;

    fn mul(self, other: VariableId<Brand>) -> Self::Output {
        other * self
    }
}

impl<Brand> Mul<LinearExpression<Brand>> for f64 {
    type Output = LinearExpression<Brand>;

    fn mul(self, other: LinearExpression<Brand>) -> Self::Output {
        other * self
    }
}

impl<Brand> Add<VariableId<Brand>> for f64 {
    type Output = LinearExpression<Brand>;

    fn add(self, other: VariableId<Brand>) -> Self::Output {
        LinearExpression::from_variable(other) + self
    }
}

impl<Brand> Add<LinearExpression<Brand>> for f64 {
    type Output = LinearExpression<Brand>;

    fn add(self, other: LinearExpression<Brand>) -> Self::Output {
        other + self
    }
}

impl<Brand> Sub<VariableId<Brand>> for f64 {
    type Output = LinearExpression<Brand>;

    fn sub(self, other: VariableId<Brand>) -> Self::Output {
        -other + self
    }
}

impl<Brand> Sub<LinearExpression<Brand>> for f64 {
    type Output = LinearExpression<Brand>;

    fn sub(self, other: LinearExpression<Brand>) -> Self::Output {
        -other + self
    }
}
