//! Crop planting schedules
//!
//! This module builds a scheduling model from command-line options, solves it
//! and reports the result. The rule generation itself lives in [`schedule`].
//!
//! # Outputs
//!
//! - **Table** (stdout): one row per day, with the planted crop or `-`
//! - **CSV**: `day,crop,value` for every slot, `unresolved` when the solver gave no value
//! - **Report**: scenario, model statistics and the schedule table
//! - **LP**: the model in CPLEX LP format
//!
//! # Usage Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use cropplan::plan::{PlanArgs, ScenarioArgs, plan_main};
//!
//! let args = PlanArgs {
//!     scenario: ScenarioArgs {
//!         horizon: 10,
//!         crop: vec!["Crop A".to_string()],
//!         ..ScenarioArgs::default()
//!     },
//!     time_limit: Some(30.0),
//!     csv: Some("schedule.csv".into()),
//!     rpt: None,
//!     lp: None,
//! };
//!
//! plan_main(args)?;
//! # Ok(())
//! # }
//! ```

use std::{
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::*;
use clap::Parser;
use prettytable::*;
use tracing::info;

use crate::AppError;
use crate::lp_solver::{ModelConfig, NamingStyle, SolveOptions, SolveStatus, SolverBackend};

pub mod schedule;
#[cfg(test)]
mod tests;

pub use schedule::{
    Assignment, BoundaryPolicy, Crop, PlanConfig, PlanningModel, RuleSet, ScheduleModel,
    ScheduleOutcome, growing_window, solve_schedule,
};

/// Crop planted when none is given on the command line
pub const DEFAULT_CROP: &str = "Crop A";

/// Options describing the scheduling problem, shared by all commands.
#[derive(Parser, Debug, Clone)]
pub struct ScenarioArgs {
    /// Number of days in the planning horizon
    #[clap(short('H'), long, value_parser = clap::value_parser!(u32).range(1..))]
    pub horizon: u32,

    /// Crop name, repeat for several crops (order is kept in reports)
    #[clap(short, long)]
    pub crop: Vec<String>,

    /// Days a crop occupies the land after planting
    #[clap(short, long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..))]
    pub duration: u32,

    /// Growth duration of a single crop, as NAME=DAYS
    #[clap(long, value_parser = parse_crop_duration)]
    pub crop_duration: Vec<(String, u32)>,

    /// Encoding of the growth exclusion rule
    #[clap(long, value_enum, default_value_t = RuleSet::SummedImplication)]
    pub rules: RuleSet,

    /// Treatment of plantings that cannot finish growing inside the horizon
    #[clap(long, value_enum, default_value_t = BoundaryPolicy::Forbid)]
    pub boundary: BoundaryPolicy,

    /// Names handed to the solver
    #[clap(long, value_enum, default_value_t = NamingStyle::UniqueLongNames)]
    pub naming: NamingStyle,

    /// Leave variables that no rule mentions unresolved
    #[clap(long)]
    pub no_removed_tracking: bool,

    /// Big-M for implications over unbounded variables
    #[clap(long)]
    pub big_m: Option<f64>,
}

impl Default for ScenarioArgs {
    fn default() -> Self {
        Self {
            horizon: 10,
            crop: Vec::new(),
            duration: 2,
            crop_duration: Vec::new(),
            rules: RuleSet::default(),
            boundary: BoundaryPolicy::default(),
            naming: NamingStyle::default(),
            no_removed_tracking: false,
            big_m: None,
        }
    }
}

fn parse_crop_duration(value: &str) -> std::result::Result<(String, u32), String> {
    let (name, days) = value
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=DAYS, got '{}'", value))?;
    let days: u32 = days
        .trim()
        .parse()
        .map_err(|e| format!("invalid duration '{}': {}", days, e))?;
    if name.is_empty() || days == 0 {
        return Err(format!("expected a crop name and a positive duration, got '{}'", value));
    }
    std::result::Result::Ok((name.to_string(), days))
}

impl ScenarioArgs {
    pub fn to_config(&self) -> Result<PlanConfig> {
        let names: Vec<&str> = if self.crop.is_empty() {
            vec![DEFAULT_CROP]
        } else {
            self.crop.iter().map(String::as_str).collect()
        };

        for (name, _) in &self.crop_duration {
            ensure!(
                names.contains(&name.as_str()),
                "--crop-duration given for unknown crop '{}'",
                name
            );
        }

        let crops = names
            .iter()
            .map(|&name| {
                let growth_days = self
                    .crop_duration
                    .iter()
                    .rev()
                    .find(|(crop, _)| crop == name)
                    .map_or(self.duration, |&(_, days)| days);
                Crop::new(name, growth_days)
            })
            .collect();

        let config = PlanConfig {
            horizon: self.horizon,
            crops,
            rules: self.rules,
            boundary: self.boundary,
            model: ModelConfig {
                naming_style: self.naming,
                track_removed_variables: !self.no_removed_tracking,
                big_m: self.big_m,
            },
        };
        config.validate()?;
        Ok(config)
    }
}

/// Command-line arguments for the `plan` command.
#[derive(Parser, Debug)]
pub struct PlanArgs {
    #[clap(flatten)]
    pub scenario: ScenarioArgs,

    /// Solver time limit in seconds
    #[clap(short('t'), long)]
    pub time_limit: Option<f64>,

    /// Output CSV file
    #[clap(long)]
    pub csv: Option<PathBuf>,

    /// Output report file
    #[clap(long)]
    pub rpt: Option<PathBuf>,

    /// Also write the model in LP format
    #[clap(long)]
    pub lp: Option<PathBuf>,
}

/// Command-line arguments for the `export` command.
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Output LP file
    pub output: PathBuf,

    #[clap(flatten)]
    pub scenario: ScenarioArgs,
}

fn write_lp_file(schedule: &ScheduleModel, path: &Path) -> Result<()> {
    let mut out_file = BufWriter::new(fs::File::create(path)?);
    schedule.model.write_lp(&mut out_file)?;
    out_file.flush()?;
    Ok(())
}

fn time_limit_from_seconds(seconds: Option<f64>) -> Result<Option<Duration>> {
    match seconds {
        Some(seconds) if !(seconds > 0.0 && seconds.is_finite()) => {
            bail!("The time limit must be a positive number of seconds")
        }
        Some(seconds) => Duration::try_from_secs_f64(seconds)
            .map(Some)
            .map_err(|_| anyhow!("The time limit of {} seconds is too large", seconds)),
        None => Ok(None),
    }
}

/// Build, solve and report a planting schedule.
///
/// The schedule table always goes to stdout. Outcomes without a schedule
/// (infeasible, unbounded, timed out, solver failure) are printed and then
/// returned as an [`AppError`], so the process exits with an error.
pub fn plan_main(args: PlanArgs) -> Result<()> {
    let PlanArgs {
        ref scenario,
        time_limit,
        ref csv,
        ref rpt,
        ref lp,
    } = args;

    let config = scenario.to_config()?;
    let time_limit = time_limit_from_seconds(time_limit)?;

    let mut schedule = ScheduleModel::build(&config)?;
    if let Some(path) = lp {
        write_lp_file(&schedule, path)?;
    }

    let backend = SolverBackend::from_env_or_default()?;
    let solver = backend.solver();
    let outcome = schedule.solve(solver.as_ref(), &SolveOptions { time_limit })?;

    info!(
        event = "schedule_done",
        status = %outcome.status,
        plantings = outcome.planted().count(),
    );

    {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        write_summary(&outcome, &mut out)?;
        if outcome.status.has_values() {
            schedule_table(&config, &outcome).print(&mut out)?;
        }
    }

    if let Some(output) = csv {
        let mut csv_file = BufWriter::new(fs::File::create(output)?);
        write_csv(&outcome, &mut csv_file)?;
        csv_file.flush()?;
    }

    if let Some(output) = rpt {
        let mut out_file = BufWriter::new(fs::File::create(output)?);
        write_report(&schedule, &outcome, &mut out_file)?;
        out_file.flush()?;
    }

    match outcome.status {
        SolveStatus::Optimal | SolveStatus::Feasible => Ok(()),
        SolveStatus::Infeasible | SolveStatus::InfeasibleOrUnbounded => Err(AppError::Infeasible.into()),
        SolveStatus::Unbounded => Err(AppError::Unbounded.into()),
        SolveStatus::TimedOut => Err(AppError::TimedOut.into()),
        SolveStatus::Error(reason) => Err(AppError::SolverFailed(reason.to_string()).into()),
    }
}

/// Build the model and write it in LP format without solving.
pub fn export_main(args: ExportArgs) -> Result<()> {
    let config = args.scenario.to_config()?;
    let schedule = ScheduleModel::build(&config)?;
    write_lp_file(&schedule, &args.output)?;

    info!(
        event = "model_exported",
        path = %args.output.display(),
        variables = schedule.model.variables().len(),
        constraints = schedule.model.constraints().len(),
    );
    Ok(())
}

fn write_summary(outcome: &ScheduleOutcome, w: &mut dyn Write) -> io::Result<()> {
    match outcome.objective_value {
        Some(objective) if outcome.status.has_values() => {
            writeln!(w, "Status: {} ({:.0} plantings)", outcome.status, objective)
        }
        _ => writeln!(w, "Status: {}, no schedule", outcome.status),
    }
}

/// One row per day listing the crops planted on it, `-` when none
pub fn schedule_table(config: &PlanConfig, outcome: &ScheduleOutcome) -> Table {
    let mut table = Table::new();
    table.set_titles(row!["Day", "Planted"]);
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);

    for day in config.days() {
        let planted = outcome.planted_on(day);
        table.add_row(row![
            r->day,
            if planted.is_empty() {
                "-".to_string()
            } else {
                planted.join(", ")
            },
        ]);
    }
    table
}

pub fn write_csv(outcome: &ScheduleOutcome, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "day,crop,value")?;
    for assignment in &outcome.assignments {
        match assignment.value {
            Some(value) => writeln!(w, "{},{},{}", assignment.day, assignment.crop, value)?,
            None => writeln!(w, "{},{},unresolved", assignment.day, assignment.crop)?,
        }
    }
    io::Result::Ok(())
}

pub fn write_report(schedule: &ScheduleModel, outcome: &ScheduleOutcome, w: &mut dyn Write) -> Result<()> {
    let config = schedule.config();
    let model = &schedule.model;

    writeln!(w, "Horizon: {} days", config.horizon)?;
    writeln!(w, "Rules: {:?}, boundary: {:?}", config.rules, config.boundary)?;

    let mut crops = Table::new();
    crops.set_titles(row!["Crop", "Growth days"]);
    crops.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    for crop in &config.crops {
        crops.add_row(row![crop.name, r->crop.growth_days]);
    }
    crops.print(w)?;

    writeln!(
        w,
        "\nModel: {} variables, {} constraints",
        model.variables().len(),
        model.constraints().len()
    )?;
    for collection in model.variable_collections() {
        writeln!(w, "  {}: {} variables", collection.name(), collection.len())?;
    }

    writeln!(w)?;
    write_summary(outcome, w)?;
    if outcome.status.has_values() {
        schedule_table(config, outcome).print(w)?;
    }
    Ok(())
}
