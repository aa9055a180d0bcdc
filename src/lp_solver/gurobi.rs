use ::gurobi::{ConstrSense, Env, LinExpr, Model, ModelSense, Status, Var, VarType, attr, param};
use anyhow::Result;

use super::{LpSolver, OptimizationSense, Problem, RawSolution, SolveOptions, SolveStatus, VariableType};

/// Gurobi backend
pub struct GurobiSolver;

fn linear_expression(vars: &[Var], terms: &[(usize, f64)]) -> LinExpr {
    terms
        .iter()
        .fold(LinExpr::new(), |expr, &(col, coefficient)| {
            expr.add_term(coefficient, vars[col].clone())
        })
}

impl LpSolver for GurobiSolver {
    fn name(&self) -> &'static str {
        "gurobi"
    }

    fn solve(&self, problem: &Problem, options: &SolveOptions) -> Result<RawSolution> {
        let mut env = Env::new("")?;
        env.set(param::OutputFlag, 0)?;
        if let Some(limit) = options.time_limit {
            env.set(param::TimeLimit, limit.as_secs_f64())?;
        }
        let mut model = Model::new("cropplan", &env)?;

        let mut vars = Vec::with_capacity(problem.columns.len());
        for column in &problem.columns {
            let vtype = match column.var_type {
                VariableType::Continuous => VarType::Continuous,
                VariableType::Integer => VarType::Integer,
                VariableType::Binary => VarType::Binary,
            };
            vars.push(model.add_var(
                &column.name,
                vtype,
                0.0,
                column.lower,
                column.upper,
                &[],
                &[],
            )?);
        }
        model.update()?;

        for row in &problem.rows {
            let expr = || linear_expression(&vars, &row.coefficients);
            match (row.lower.is_finite(), row.upper.is_finite()) {
                (true, true) if row.lower == row.upper => {
                    model.add_constr(&row.name, expr(), ConstrSense::Equal, row.lower)?;
                }
                (true, true) => {
                    model.add_constr(&format!("{}_lo", row.name), expr(), ConstrSense::Greater, row.lower)?;
                    model.add_constr(&format!("{}_hi", row.name), expr(), ConstrSense::Less, row.upper)?;
                }
                (true, false) => {
                    model.add_constr(&row.name, expr(), ConstrSense::Greater, row.lower)?;
                }
                (false, true) => {
                    model.add_constr(&row.name, expr(), ConstrSense::Less, row.upper)?;
                }
                (false, false) => {}
            }
        }
        model.update()?;

        let sense = match problem.sense {
            OptimizationSense::Minimize => ModelSense::Minimize,
            OptimizationSense::Maximize => ModelSense::Maximize,
        };
        let objective = linear_expression(&vars, &problem.objective).add_constant(problem.objective_constant);
        model.set_objective(objective, sense)?;

        model.optimize()?;

        let status = match model.status()? {
            Status::Optimal => SolveStatus::Optimal,
            Status::SubOptimal => SolveStatus::Feasible,
            Status::Infeasible => SolveStatus::Infeasible,
            Status::Unbounded => SolveStatus::Unbounded,
            Status::InfOrUnbd => SolveStatus::InfeasibleOrUnbounded,
            Status::TimeLimit => SolveStatus::TimedOut,
            Status::Numeric => SolveStatus::Error("numerical trouble"),
            _ => SolveStatus::Error("unknown status"),
        };
        if !status.has_values() {
            return Ok(RawSolution::status_only(status));
        }

        let values = vars
            .iter()
            .map(|var| var.get(&model, attr::X))
            .collect::<Result<Vec<f64>, _>>()?;

        Ok(RawSolution {
            status,
            objective_value: Some(model.get(attr::ObjVal)?),
            values,
        })
    }
}
