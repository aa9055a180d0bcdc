//! Logical implications between constraints
//!
//! An [`Implication`] states "if the antecedent holds then the consequent holds".
//! Solvers only understand linear rows, so [`ImplicationCompiler`] rewrites it
//! with an indicator encoding. For an indicator `z` (a binary variable, or a sum
//! of binaries known to be 0 or 1) and a consequent `lo <= expr <= hi`:
//!
//! ```text
//! expr - M_lo * z >= lo - M_lo
//! expr + M_hi * z <= hi + M_hi
//! ```
//!
//! With `z == 1` both rows reduce to the consequent. With `z == 0` they relax to
//! `expr >= lo - M_lo` and `expr <= hi + M_hi`, which the bounds of the
//! variables in `expr` already guarantee when `M_lo = lo - min(expr)` and
//! `M_hi = max(expr) - hi`. These are the smallest constants with that property,
//! so the rule "`x == 1` implies `2 y1 + y2 <= 1`" becomes `2 y1 + y2 + 2x <= 3`.
//!
//! A side whose constant would be zero or negative is already implied by the
//! variable bounds and is not emitted.
//!
//! Consequents that pin non-negative binaries to zero, such as
//! "`x == 1` implies `y1 + y2 == 0`", are split into one row per binary
//! (`y1 + x <= 1`, `y2 + x <= 1`). The aggregated row `y1 + y2 + 2x <= 2`
//! describes the same integer points but has a weaker relaxation.

use std::fmt;

use tracing::debug;

use super::{
    Constraint, INTEGRALITY_TOLERANCE, LinearExpression, Model, ModelError, VariableId, VariableType,
};

/// "If `antecedent` holds then `consequent` holds"
pub struct Implication<Brand> {
    antecedent: Constraint<Brand>,
    consequent: Constraint<Brand>,
}

impl<Brand> Implication<Brand> {
    pub fn new(antecedent: Constraint<Brand>, consequent: Constraint<Brand>) -> Self {
        Self {
            antecedent,
            consequent,
        }
    }

    pub fn antecedent(&self) -> &Constraint<Brand> {
        &self.antecedent
    }

    pub fn consequent(&self) -> &Constraint<Brand> {
        &self.consequent
    }
}

impl<Brand> Clone for Implication<Brand> {
    fn clone(&self) -> Self {
        Self {
            antecedent: self.antecedent.clone(),
            consequent: self.consequent.clone(),
        }
    }
}

impl<Brand> fmt::Debug for Implication<Brand> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implication")
            .field("antecedent", &self.antecedent)
            .field("consequent", &self.consequent)
            .finish()
    }
}

/// Antecedent shapes that behave as a 0/1 indicator
pub enum Antecedent<Brand> {
    /// `x == 1` (or `x >= 1`) on a binary variable
    SingleBinary(VariableId<Brand>),
    /// `x1 + ... + xn == 1` on binary variables
    ///
    /// The sum itself is used as the indicator, so the caller guarantees it never
    /// exceeds 1 (for instance through a capacity row).
    BinarySum(Vec<VariableId<Brand>>),
}

impl<Brand> Antecedent<Brand> {
    /// Recognise the indicator shape of `constraint`
    pub fn classify(model: &Model<Brand>, constraint: &Constraint<Brand>) -> Result<Self, ModelError> {
        let expression = &constraint.expression;
        let lower = constraint.lower - expression.constant;
        let upper = constraint.upper - expression.constant;
        let unsupported = |reason: &str| {
            ModelError::UnsupportedAntecedent(format!(
                "{} in {}",
                reason,
                constraint.name.as_deref().unwrap_or("unnamed constraint")
            ))
        };

        if expression.is_constant() {
            return Err(unsupported("no variable"));
        }
        for term in &expression.terms {
            let info = model
                .variable(term.variable)
                .ok_or(ModelError::UnknownVariable(term.variable.id))?;
            if info.var_type() != VariableType::Binary {
                return Err(unsupported(&format!("non-binary variable '{}'", info.name())));
            }
            if term.coefficient != 1.0 {
                return Err(unsupported(&format!(
                    "coefficient {} on '{}'",
                    term.coefficient,
                    info.name()
                )));
            }
        }

        let is_one = |bound: f64| (bound - 1.0).abs() < INTEGRALITY_TOLERANCE;
        match expression.terms.as_slice() {
            [single] if is_one(lower) && upper >= 1.0 - INTEGRALITY_TOLERANCE => {
                Ok(Antecedent::SingleBinary(single.variable))
            }
            [_] => Err(unsupported("single variable not compared to 1")),
            terms if is_one(lower) && is_one(upper) => Ok(Antecedent::BinarySum(
                terms.iter().map(|term| term.variable).collect(),
            )),
            _ => Err(unsupported("sum of binaries not equal to 1")),
        }
    }

    /// The expression that is 1 exactly when the antecedent holds
    pub fn indicator(&self) -> LinearExpression<Brand> {
        match self {
            Antecedent::SingleBinary(var) => LinearExpression::from_variable(*var),
            Antecedent::BinarySum(vars) => vars.iter().sum(),
        }
    }

    fn shape(&self) -> &'static str {
        match self {
            Antecedent::SingleBinary(_) => "single binary",
            Antecedent::BinarySum(_) => "binary sum",
        }
    }
}

impl<Brand> fmt::Debug for Antecedent<Brand> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Antecedent::SingleBinary(var) => f.debug_tuple("SingleBinary").field(var).finish(),
            Antecedent::BinarySum(vars) => f.debug_tuple("BinarySum").field(vars).finish(),
        }
    }
}

/// Turns implications into ordinary constraints
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImplicationCompiler {
    /// Used only when no finite constant can be derived from variable bounds
    pub big_m: Option<f64>,
}

impl ImplicationCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_big_m(big_m: f64) -> Self {
        Self { big_m: Some(big_m) }
    }

    /// Compile `implication` into linear constraints
    ///
    /// A consequent pinning non-negative binaries to zero gives one row per
    /// binary, named `<consequent>_hi_<k>` (or `<consequent>_hi` for a single
    /// binary). Anything else gives at most two rows, named `<consequent>_lo`
    /// and `<consequent>_hi`. Rows are unnamed when the consequent is.
    pub fn compile<Brand>(
        &self,
        model: &Model<Brand>,
        implication: &Implication<Brand>,
    ) -> Result<Vec<Constraint<Brand>>, ModelError> {
        let antecedent = Antecedent::classify(model, &implication.antecedent)?;
        let indicator = antecedent.indicator();

        let consequent = &implication.consequent;
        let expression = &consequent.expression;
        let (min, max) = expression_range(model, expression)?;
        let lower = consequent.lower - expression.constant;
        let upper = consequent.upper - expression.constant;

        if let Some(rows) = pinned_binary_rows(model, consequent, &indicator, lower, upper, min) {
            debug!(
                shape = antecedent.shape(),
                rows = rows.len(),
                consequent = consequent.name.as_deref().unwrap_or("-"),
                "implication compiled"
            );
            return Ok(rows);
        }

        let mut compiled = Vec::with_capacity(2);

        if lower.is_finite() {
            let derived = lower - min;
            if derived > INTEGRALITY_TOLERANCE {
                let m = self.big_m_for(model, expression, derived)?;
                compiled.push(compiled_row(
                    Constraint::ge(
                        expression.clone() - indicator.clone() * m,
                        consequent.lower - m,
                    ),
                    consequent,
                    "lo",
                ));
            }
        }

        if upper.is_finite() {
            let derived = max - upper;
            if derived > INTEGRALITY_TOLERANCE {
                let m = self.big_m_for(model, expression, derived)?;
                compiled.push(compiled_row(
                    Constraint::le(expression.clone() + indicator * m, consequent.upper + m),
                    consequent,
                    "hi",
                ));
            }
        }

        debug!(
            shape = antecedent.shape(),
            rows = compiled.len(),
            consequent = consequent.name.as_deref().unwrap_or("-"),
            "implication compiled"
        );
        Ok(compiled)
    }

    fn big_m_for<Brand>(
        &self,
        model: &Model<Brand>,
        expression: &LinearExpression<Brand>,
        derived: f64,
    ) -> Result<f64, ModelError> {
        if derived.is_finite() {
            return Ok(derived);
        }
        match self.big_m {
            Some(m) => Ok(m),
            None => {
                let unbounded = expression
                    .terms
                    .iter()
                    .filter_map(|term| model.variable(term.variable))
                    .find(|info| !info.lower_bound().is_finite() || !info.upper_bound().is_finite())
                    .map_or_else(|| "?".to_string(), |info| info.name().to_string());
                Err(ModelError::UnboundedConsequent(unbounded))
            }
        }
    }

}

fn compiled_row<Brand>(row: Constraint<Brand>, consequent: &Constraint<Brand>, side: &str) -> Constraint<Brand> {
    match &consequent.name {
        Some(name) => row.named(format!("{}_{}", name, side)),
        None => row,
    }
}

/// One `y + z <= 1` row per variable when the consequent pins non-negative
/// binaries to zero
///
/// This is tighter than the aggregated `sum + |W| z <= |W|` row: its LP
/// relaxation forbids fractional `z` from coexisting with any set `y`.
fn pinned_binary_rows<Brand>(
    model: &Model<Brand>,
    consequent: &Constraint<Brand>,
    indicator: &LinearExpression<Brand>,
    lower: f64,
    upper: f64,
    min: f64,
) -> Option<Vec<Constraint<Brand>>> {
    let terms = &consequent.expression.terms;
    if terms.is_empty()
        || !upper.is_finite()
        || (upper - min).abs() > INTEGRALITY_TOLERANCE
        || lower > min + INTEGRALITY_TOLERANCE
    {
        return None;
    }
    let pins_binaries = terms.iter().all(|term| {
        term.coefficient > INTEGRALITY_TOLERANCE
            && model.variable(term.variable).is_some_and(|info| {
                info.var_type() == VariableType::Binary && info.lower_bound() == 0.0
            })
    });
    if !pins_binaries {
        return None;
    }

    let single = terms.len() == 1;
    let rows = terms
        .iter()
        .enumerate()
        .map(|(k, term)| {
            let row = Constraint::le(LinearExpression::from_variable(term.variable) + indicator.clone(), 1.0);
            match &consequent.name {
                Some(name) if single => row.named(format!("{}_hi", name)),
                Some(name) => row.named(format!("{}_hi_{}", name, k + 1)),
                None => row,
            }
        })
        .collect();
    Some(rows)
}

/// Smallest and largest value of the variable part of `expression`
fn expression_range<Brand>(
    model: &Model<Brand>,
    expression: &LinearExpression<Brand>,
) -> Result<(f64, f64), ModelError> {
    let mut min = 0.0;
    let mut max = 0.0;
    for term in &expression.terms {
        let info = model
            .variable(term.variable)
            .ok_or(ModelError::UnknownVariable(term.variable.id))?;
        let (at_lower, at_upper) = (
            term.coefficient * info.lower_bound(),
            term.coefficient * info.upper_bound(),
        );
        if term.coefficient > 0.0 {
            min += at_lower;
            max += at_upper;
        } else {
            min += at_upper;
            max += at_lower;
        }
    }
    Ok((min, max))
}
