//! Solver boundary
//!
//! A [`Model`] is lowered into a [`Problem`]: plain columns and rows addressed by
//! position, with the export names chosen by the model's naming style. Backends
//! implement [`LpSolver`] over this form and answer with a [`RawSolution`];
//! [`Model::solve_with`] turns that into a name-keyed [`Solution`].

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use anyhow::Result;

use super::{INTEGRALITY_TOLERANCE, Model, OptimizationSense, VariableType};

/// Status of the optimization process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Optimal solution found
    Optimal,
    /// Feasible solution found, but not necessarily optimal
    Feasible,
    /// Problem is infeasible (no solution exists)
    Infeasible,
    /// Problem is unbounded
    Unbounded,
    /// Problem is infeasible or unbounded
    InfeasibleOrUnbounded,
    /// The time limit expired before the solver finished
    TimedOut,
    /// The solver stopped abnormally
    Error(&'static str),
}

impl SolveStatus {
    /// Statuses that come with variable values
    pub fn has_values(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "optimal"),
            SolveStatus::Feasible => write!(f, "feasible"),
            SolveStatus::Infeasible => write!(f, "infeasible"),
            SolveStatus::Unbounded => write!(f, "unbounded"),
            SolveStatus::InfeasibleOrUnbounded => write!(f, "infeasible or unbounded"),
            SolveStatus::TimedOut => write!(f, "timed out"),
            SolveStatus::Error(reason) => write!(f, "error ({})", reason),
        }
    }
}

/// Per-solve settings
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolveOptions {
    /// Wall-clock limit handed to the backend
    pub time_limit: Option<Duration>,
}

/// A decision variable as the solver sees it
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    /// Index of the variable in the model
    pub variable: usize,
    pub var_type: VariableType,
    pub lower: f64,
    pub upper: f64,
}

/// A constraint row `lower <= sum(coefficient * column) <= upper`
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub name: String,
    /// `(column position, coefficient)` pairs
    pub coefficients: Vec<(usize, f64)>,
    pub lower: f64,
    pub upper: f64,
}

impl Row {
    pub fn activity(&self, column_values: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .map(|&(col, coefficient)| coefficient * column_values[col])
            .sum()
    }

    pub fn is_satisfied(&self, column_values: &[f64]) -> bool {
        let activity = self.activity(column_values);
        activity >= self.lower - INTEGRALITY_TOLERANCE && activity <= self.upper + INTEGRALITY_TOLERANCE
    }
}

/// Solver-facing form of a model
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    /// `(column position, coefficient)` pairs
    pub objective: Vec<(usize, f64)>,
    pub objective_constant: f64,
    pub sense: OptimizationSense,
    /// Model variables left out because nothing references them
    pub removed: Vec<usize>,
    /// Name of a constraint without variables whose constant violates its bounds
    pub violated_row: Option<String>,
}

impl Problem {
    pub fn objective_value(&self, column_values: &[f64]) -> f64 {
        self.objective
            .iter()
            .map(|&(col, coefficient)| coefficient * column_values[col])
            .sum::<f64>()
            + self.objective_constant
    }
}

/// Backend answer, values indexed by column position
#[derive(Debug, Clone, PartialEq)]
pub struct RawSolution {
    pub status: SolveStatus,
    pub objective_value: Option<f64>,
    pub values: Vec<f64>,
}

impl RawSolution {
    pub fn status_only(status: SolveStatus) -> Self {
        Self {
            status,
            objective_value: None,
            values: Vec::new(),
        }
    }
}

/// Contract of an external solver
///
/// `Err` is reserved for solves that could not run (missing binary, I/O failure,
/// unreadable output). Every answer the solver gives, including infeasibility and
/// time-outs, is an `Ok` with the matching status.
pub trait LpSolver {
    fn name(&self) -> &'static str;

    fn solve(&self, problem: &Problem, options: &SolveOptions) -> Result<RawSolution>;
}

/// Result of solving a model: status and values keyed by variable name
///
/// Only [`SolveStatus::Optimal`] and [`SolveStatus::Feasible`] carry values.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub status: SolveStatus,
    pub objective_value: Option<f64>,
    values: BTreeMap<String, f64>,
}

impl Solution {
    pub fn new(
        status: SolveStatus,
        objective_value: Option<f64>,
        values: impl IntoIterator<Item = (String, f64)>,
    ) -> Self {
        if status.has_values() {
            Self {
                status,
                objective_value,
                values: values.into_iter().collect(),
            }
        } else {
            Self {
                status,
                objective_value: None,
                values: BTreeMap::new(),
            }
        }
    }

    /// Value of the variable with the given model name
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(name, &value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<Brand> Model<Brand> {
    /// Lower the model into its solver-facing form
    ///
    /// Columns and rows keep insertion order. Variables referenced by no
    /// constraint and not by the objective are listed in [`Problem::removed`]
    /// instead of becoming columns. Constraints without variables are dropped,
    /// unless their constant violates the bounds.
    pub fn to_problem(&self) -> Problem {
        let mut referenced = vec![false; self.variables.len()];
        let objective_terms = self
            .objective
            .iter()
            .flat_map(|objective| objective.expression.terms.iter());
        for term in self
            .constraints
            .iter()
            .flat_map(|c| c.expression.terms.iter())
            .chain(objective_terms)
        {
            referenced[term.variable.id] = true;
        }

        let mut column_of = vec![None; self.variables.len()];
        let mut columns = Vec::new();
        let mut removed = Vec::new();
        for (index, var) in self.variables.iter().enumerate() {
            if referenced[index] {
                column_of[index] = Some(columns.len());
                columns.push(Column {
                    name: var.export_name.clone(),
                    variable: index,
                    var_type: var.var_type,
                    lower: var.lower_bound,
                    upper: var.upper_bound,
                });
            } else {
                removed.push(index);
            }
        }
        let lower_terms = |terms: &[super::LinearTerm<Brand>]| -> Vec<(usize, f64)> {
            terms
                .iter()
                .filter_map(|term| column_of[term.variable.id].map(|col| (col, term.coefficient)))
                .collect()
        };

        let mut rows = Vec::new();
        let mut violated_row = None;
        for (constraint, name) in self.constraints.iter().zip(&self.row_names) {
            let constant = constraint.expression.constant;
            if constraint.expression.is_constant() {
                let holds = constant >= constraint.lower - INTEGRALITY_TOLERANCE
                    && constant <= constraint.upper + INTEGRALITY_TOLERANCE;
                if !holds && violated_row.is_none() {
                    violated_row = Some(name.clone());
                }
                continue;
            }
            rows.push(Row {
                name: name.clone(),
                coefficients: lower_terms(&constraint.expression.terms),
                lower: constraint.lower - constant,
                upper: constraint.upper - constant,
            });
        }

        let (objective, objective_constant, sense) = match &self.objective {
            Some(objective) => (
                lower_terms(&objective.expression.terms),
                objective.expression.constant,
                objective.sense,
            ),
            None => (Vec::new(), 0.0, OptimizationSense::Minimize),
        };

        Problem {
            columns,
            rows,
            objective,
            objective_constant,
            sense,
            removed,
            violated_row,
        }
    }
}
