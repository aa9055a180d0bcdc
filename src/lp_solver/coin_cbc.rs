use ::coin_cbc::{Col, Model, Sense};
use anyhow::Result;

use super::output_suppression::StdoutGag;
use super::{LpSolver, OptimizationSense, Problem, RawSolution, SolveOptions, SolveStatus, VariableType};

/// Round a floating-point number to a specified number of significant digits
/// This is an workaround to mask floating point errors in CBC.
fn round_to_sig_digits(value: f64, digits: u32) -> f64 {
    if value == 0.0 {
        return 0.0;
    }

    let magnitude = value.abs().log10().floor() as i32;
    let scale = 10_f64.powi(digits as i32 - magnitude - 1);
    (value * scale).round() / scale
}

/// COIN-OR CBC linked in-process
pub struct CoinCbcSolver;

impl LpSolver for CoinCbcSolver {
    fn name(&self) -> &'static str {
        "coin_cbc"
    }

    fn solve(&self, problem: &Problem, options: &SolveOptions) -> Result<RawSolution> {
        // CBC prints its banner on stdout even with logging off
        let _gag = StdoutGag::acquire()?;

        let mut model = Model::default();
        model.set_parameter("log", "0");
        if let Some(limit) = options.time_limit {
            model.set_parameter("sec", &limit.as_secs_f64().to_string());
        }

        let cols: Vec<Col> = problem
            .columns
            .iter()
            .map(|column| {
                let col = match column.var_type {
                    VariableType::Continuous => model.add_col(),
                    VariableType::Integer => model.add_integer(),
                    VariableType::Binary => model.add_binary(),
                };
                model.set_col_lower(col, column.lower);
                model.set_col_upper(col, column.upper);
                col
            })
            .collect();

        for row in &problem.rows {
            let cbc_row = model.add_row();
            for &(col, coefficient) in &row.coefficients {
                model.set_weight(cbc_row, cols[col], coefficient);
            }
            if row.lower == row.upper {
                model.set_row_equal(cbc_row, row.lower);
            } else {
                if row.lower.is_finite() {
                    model.set_row_lower(cbc_row, row.lower);
                }
                if row.upper.is_finite() {
                    model.set_row_upper(cbc_row, row.upper);
                }
            }
        }

        for &(col, coefficient) in &problem.objective {
            model.set_obj_coeff(cols[col], coefficient);
        }
        model.set_obj_sense(match problem.sense {
            OptimizationSense::Minimize => Sense::Minimize,
            OptimizationSense::Maximize => Sense::Maximize,
        });

        let solution = model.solve();
        let raw = solution.raw();
        let status = if raw.is_seconds_limit_reached() {
            SolveStatus::TimedOut
        } else if raw.is_proven_optimal() {
            SolveStatus::Optimal
        } else if raw.is_proven_infeasible() {
            SolveStatus::Infeasible
        } else if raw.is_continuous_unbounded() {
            SolveStatus::Unbounded
        } else if raw.is_abandoned() {
            SolveStatus::Error("abandoned")
        } else {
            SolveStatus::Error("unknown status")
        };
        if !status.has_values() {
            return Ok(RawSolution::status_only(status));
        }

        let values: Vec<f64> = cols
            .iter()
            .map(|&col| round_to_sig_digits(solution.col(col), 8))
            .collect();
        let objective_value = round_to_sig_digits(problem.objective_value(&values), 8);

        Ok(RawSolution {
            status,
            objective_value: Some(objective_value),
            values,
        })
    }
}
