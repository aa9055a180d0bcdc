//! Backend running an external `cbc` executable
//!
//! The problem is written as an LP file into a temporary directory, CBC is asked
//! to solve it and write its solution file next to it, and that file is parsed
//! back. The executable is taken from `CROPPLAN_CBC_PATH`, or `cbc` on the `PATH`.

use std::collections::HashMap;
use std::env;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::debug;

use super::lp_format::write_lp;
use super::{LpSolver, Problem, RawSolution, SolveOptions, SolveStatus};

pub struct CbcCommand {
    program: PathBuf,
}

impl CbcCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_env() -> Self {
        match env::var_os("CROPPLAN_CBC_PATH") {
            Some(path) if !path.is_empty() => Self::new(path),
            _ => Self::new("cbc"),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl LpSolver for CbcCommand {
    fn name(&self) -> &'static str {
        "cbc-cli"
    }

    fn solve(&self, problem: &Problem, options: &SolveOptions) -> Result<RawSolution> {
        let dir = tempfile::tempdir().context("Failed to create a working directory for cbc")?;
        let model_path = dir.path().join("model.lp");
        let solution_path = dir.path().join("solution.txt");

        {
            let mut file = BufWriter::new(
                File::create(&model_path)
                    .with_context(|| format!("Failed to create {}", model_path.display()))?,
            );
            write_lp(problem, &mut file)?;
            file.flush()?;
        }

        let mut command = Command::new(&self.program);
        command.arg(&model_path);
        if let Some(limit) = options.time_limit {
            command.arg("sec").arg(limit.as_secs_f64().to_string());
        }
        command
            .args(["printingOptions", "all", "solve", "solution"])
            .arg(&solution_path);

        debug!(program = %self.program.display(), "running cbc");
        let output = command
            .output()
            .with_context(|| format!("Failed to run '{}'", self.program.display()))?;

        if !solution_path.exists() {
            bail!(
                "'{}' exited with {} without writing a solution: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stdout).trim()
            );
        }

        let text = fs::read_to_string(&solution_path)
            .with_context(|| format!("Failed to read {}", solution_path.display()))?;
        parse_solution(problem, &text)
    }
}

/// Map the first line of a CBC solution file to a status
fn parse_status(line: &str) -> SolveStatus {
    let line = line.trim();
    if line.starts_with("Optimal") {
        SolveStatus::Optimal
    } else if line.starts_with("Infeasible") || line.starts_with("Integer infeasible") {
        SolveStatus::Infeasible
    } else if line.starts_with("Unbounded") {
        SolveStatus::Unbounded
    } else if line.starts_with("Stopped on time") {
        SolveStatus::TimedOut
    } else if line.starts_with("Stopped") {
        SolveStatus::Error("stopped before optimality")
    } else {
        SolveStatus::Error("unrecognised cbc status")
    }
}

/// Parse a solution file written with `printingOptions all`
///
/// Value lines read `index name value reduced_cost`, sometimes prefixed with
/// `**` when the value violates a bound. Row lines share that layout and are
/// skipped because their names are not columns. Columns the file does not
/// mention are zero.
pub fn parse_solution(problem: &Problem, text: &str) -> Result<RawSolution> {
    let mut lines = text.lines();
    let Some(header) = lines.next() else {
        bail!("cbc solution file is empty");
    };

    let status = parse_status(header);
    if !status.has_values() {
        debug!(header = header.trim(), "cbc reported no solution");
        return Ok(RawSolution::status_only(status));
    }

    let objective_value = header
        .split("objective value")
        .nth(1)
        .and_then(|value| value.trim().parse::<f64>().ok());

    let position: HashMap<&str, usize> = problem
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| (column.name.as_str(), i))
        .collect();

    let mut values = vec![0.0; problem.columns.len()];
    for line in lines {
        let line = line.trim_start().trim_start_matches("**");
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [_index, name, value, ..] = fields.as_slice() else {
            continue;
        };
        if let Some(&col) = position.get(name) {
            values[col] = value
                .parse()
                .with_context(|| format!("Invalid value '{}' for column {}", value, name))?;
        }
    }

    Ok(RawSolution {
        status,
        objective_value,
        values,
    })
}
