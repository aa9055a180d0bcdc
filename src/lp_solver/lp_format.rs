//! CPLEX LP text format
//!
//! Output is deterministic: columns, rows and terms keep insertion order so two
//! exports of the same model are byte-identical. Ranged rows are split into a
//! `<name>_lo` and a `<name>_hi` row, every column gets an explicit bound line.

use std::io::{self, Write};

use super::{OptimizationSense, Problem, VariableType};

/// Terms per line before wrapping
const TERMS_PER_LINE: usize = 8;

pub fn write_lp(problem: &Problem, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "\\ Generated by cropplan")?;
    writeln!(
        w,
        "\\ {} columns, {} rows",
        problem.columns.len(),
        problem.rows.len()
    )?;
    if problem.objective_constant != 0.0 {
        writeln!(w, "\\ objective constant {}", problem.objective_constant)?;
    }

    match problem.sense {
        OptimizationSense::Maximize => writeln!(w, "Maximize")?,
        OptimizationSense::Minimize => writeln!(w, "Minimize")?,
    }
    write!(w, " obj:")?;
    if problem.objective.is_empty() {
        if let Some(first) = problem.columns.first() {
            write!(w, " 0 {}", first.name)?;
        }
    } else {
        write_terms(problem, &problem.objective, w)?;
    }
    writeln!(w)?;

    writeln!(w, "Subject To")?;
    for row in &problem.rows {
        let finite_lower = row.lower.is_finite();
        let finite_upper = row.upper.is_finite();
        match (finite_lower, finite_upper) {
            (true, true) if row.lower == row.upper => {
                write_row(problem, &row.name, &row.coefficients, "=", row.lower, w)?
            }
            (true, true) => {
                let lo = format!("{}_lo", row.name);
                let hi = format!("{}_hi", row.name);
                write_row(problem, &lo, &row.coefficients, ">=", row.lower, w)?;
                write_row(problem, &hi, &row.coefficients, "<=", row.upper, w)?;
            }
            (true, false) => write_row(problem, &row.name, &row.coefficients, ">=", row.lower, w)?,
            (false, true) => write_row(problem, &row.name, &row.coefficients, "<=", row.upper, w)?,
            // Free row, nothing to enforce
            (false, false) => {}
        }
    }

    writeln!(w, "Bounds")?;
    for column in &problem.columns {
        let (lower, upper) = (column.lower, column.upper);
        match (lower.is_finite(), upper.is_finite()) {
            (true, true) if lower == upper => writeln!(w, " {} = {}", column.name, lower)?,
            (true, true) => writeln!(w, " {} <= {} <= {}", lower, column.name, upper)?,
            (true, false) => writeln!(w, " {} >= {}", column.name, lower)?,
            (false, true) => writeln!(w, " -inf <= {} <= {}", column.name, upper)?,
            (false, false) => writeln!(w, " {} free", column.name)?,
        }
    }

    write_section(problem, "Generals", VariableType::Integer, w)?;
    write_section(problem, "Binaries", VariableType::Binary, w)?;

    writeln!(w, "End")
}

fn write_row(
    problem: &Problem,
    name: &str,
    coefficients: &[(usize, f64)],
    op: &str,
    rhs: f64,
    w: &mut dyn Write,
) -> io::Result<()> {
    write!(w, " {}:", name)?;
    write_terms(problem, coefficients, w)?;
    writeln!(w, " {} {}", op, rhs)
}

fn write_terms(problem: &Problem, terms: &[(usize, f64)], w: &mut dyn Write) -> io::Result<()> {
    for (i, &(col, coefficient)) in terms.iter().enumerate() {
        if i > 0 && i % TERMS_PER_LINE == 0 {
            write!(w, "\n   ")?;
        }
        let name = &problem.columns[col].name;
        let sign = if coefficient < 0.0 { "-" } else { "+" };
        let magnitude = coefficient.abs();
        match (i, magnitude == 1.0) {
            (0, true) if coefficient < 0.0 => write!(w, " - {}", name)?,
            (0, true) => write!(w, " {}", name)?,
            (0, false) if coefficient < 0.0 => write!(w, " -{} {}", magnitude, name)?,
            (0, false) => write!(w, " {} {}", magnitude, name)?,
            (_, true) => write!(w, " {} {}", sign, name)?,
            (_, false) => write!(w, " {} {} {}", sign, magnitude, name)?,
        }
    }
    Ok(())
}

fn write_section(
    problem: &Problem,
    title: &str,
    var_type: VariableType,
    w: &mut dyn Write,
) -> io::Result<()> {
    let names: Vec<&str> = problem
        .columns
        .iter()
        .filter(|column| column.var_type == var_type)
        .map(|column| column.name.as_str())
        .collect();
    if names.is_empty() {
        return Ok(());
    }

    writeln!(w, "{}", title)?;
    for chunk in names.chunks(TERMS_PER_LINE) {
        writeln!(w, " {}", chunk.join(" "))?;
    }
    Ok(())
}
