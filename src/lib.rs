//! Crop planting schedules as mixed-integer linear programs
//!
//! This library provides a small modelling layer for mixed-integer linear
//! programs and a crop planting scheduler built on top of it.
//!
//! # Overview
//!
//! A field is planted over a horizon of days. A planted crop occupies the land
//! while it grows, and nothing else may be planted there until it is harvested.
//! The scheduler maximises the number of plantings.
//!
//! # Main Workflows
//!
//! The library supports two main operations:
//!
//! 1. **Planning** ([`plan_main`]): build the schedule model, solve it and report the plantings
//! 2. **Export** ([`export_main`]): write the schedule model in LP format for an external solver
//!
//! # Usage Example
//!
//! ```
//! use cropplan::lp_solver::SolveStatus;
//! use cropplan::plan::{BoundaryPolicy, PlanConfig, ScheduleModel};
//!
//! let config = PlanConfig::uniform(10, &["Crop A"], 2).with_boundary(BoundaryPolicy::Truncate);
//! let schedule = ScheduleModel::build(&config)?;
//! assert_eq!(schedule.assignment.len(), 10);
//!
//! // Solving needs a backend, see `lp_solver::SolverBackend`
//! # let _ = SolveStatus::Optimal;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! # Modules
//!
//! - **[`lp_solver`]**: Branded models, variable collections, implications and solver backends
//! - **[`plan`]**: Planting rules, command-line entry points and reports

use clap::Parser;
use std::{error::Error, fmt};

pub mod lp_solver;
pub mod plan;

// Re-export the main functions for easy access
pub use plan::{ExportArgs, PlanArgs, export_main, plan_main};

/// Application-level errors that end a command without a schedule.
#[derive(Debug, PartialEq, Eq)]
pub enum AppError {
    /// No planting plan satisfies the rules.
    Infeasible,
    /// The objective can grow without limit.
    Unbounded,
    /// The solver hit its time limit before finding a schedule.
    TimedOut,
    /// The solver stopped abnormally.
    SolverFailed(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Infeasible => write!(f, "Problem Infeasible"),
            AppError::Unbounded => write!(f, "Problem Unbounded"),
            AppError::TimedOut => write!(f, "Time limit reached without a schedule"),
            AppError::SolverFailed(reason) => write!(f, "Solver failed: {}", reason),
        }
    }
}

impl Error for AppError {}

/// Command-line interface arguments for the planner.
///
/// - `Plan`: Solve a planting schedule and report it
/// - `Export`: Write the schedule model in LP format
#[derive(Debug, Parser)]
#[clap(
    name = "cropplan",
    about = "Crop planting schedules with mixed-integer linear programming"
)]
pub enum CLIArguments {
    /// Solve a planting schedule and print it as a table.
    Plan(PlanArgs),
    /// Write the schedule model in LP format without solving it.
    Export(ExportArgs),
}
