//! Boundary-aware crop planting rules
//!
//! One binary `CropAssignment_<day>_<crop>` per day of the horizon and crop is 1
//! when that crop is planted on that day. A planted crop occupies the land for
//! its growth window, the days `day + 1 ..= day + growth_days`, during which
//! nothing may be planted. Near the end of the horizon the window is cut short;
//! what happens then is set by the [`BoundaryPolicy`].

use std::ops::RangeInclusive;

use anyhow::{Result, bail};
use clap::ValueEnum;
use itertools::iproduct;
use tracing::debug;

use crate::lp_solver::*;

/// Brand of every scheduling model
pub struct PlanningModel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crop {
    pub name: String,
    /// Days the land stays occupied after planting
    pub growth_days: u32,
}

impl Crop {
    pub fn new(name: impl Into<String>, growth_days: u32) -> Self {
        Self {
            name: name.into(),
            growth_days,
        }
    }
}

/// How the "no planting while growing" rule is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RuleSet {
    /// One implication per planting: the whole window, all crops, sums to 0
    #[default]
    #[value(name = "summed")]
    SummedImplication,
    /// One implication per planting and occupied `(day, crop)` slot
    #[value(name = "exclusive")]
    ExclusiveSlots,
}

/// Treatment of plantings whose growth window runs past the horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BoundaryPolicy {
    /// Such plantings are not allowed
    #[default]
    #[value(name = "forbid")]
    Forbid,
    /// Allowed, only the days inside the horizon are blocked
    #[value(name = "truncate")]
    Truncate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanConfig {
    /// Number of days, numbered from 1
    pub horizon: u32,
    /// Crops in reporting order
    pub crops: Vec<Crop>,
    pub rules: RuleSet,
    pub boundary: BoundaryPolicy,
    pub model: ModelConfig,
}

impl PlanConfig {
    pub fn new(horizon: u32, crops: Vec<Crop>) -> Self {
        Self {
            horizon,
            crops,
            rules: RuleSet::default(),
            boundary: BoundaryPolicy::default(),
            model: ModelConfig::default(),
        }
    }

    /// Every crop grows for the same number of days
    pub fn uniform(horizon: u32, crop_names: &[&str], growth_days: u32) -> Self {
        Self::new(
            horizon,
            crop_names
                .iter()
                .map(|&name| Crop::new(name, growth_days))
                .collect(),
        )
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_boundary(mut self, boundary: BoundaryPolicy) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn days(&self) -> RangeInclusive<u32> {
        1..=self.horizon
    }

    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            bail!("The horizon must span at least one day");
        }
        if self.crops.is_empty() {
            bail!("At least one crop is required");
        }
        for (i, crop) in self.crops.iter().enumerate() {
            if crop.growth_days == 0 {
                bail!("Crop '{}' must grow for at least one day", crop.name);
            }
            if self.crops[..i].iter().any(|other| other.name == crop.name) {
                bail!("Crop '{}' is listed twice", crop.name);
            }
        }
        Ok(())
    }
}

/// Days of the horizon occupied by a crop planted on `day`
///
/// Shorter than `growth_days` when the window runs past the horizon, empty when
/// `day` is the last day.
pub fn growing_window(day: u32, growth_days: u32, horizon: u32) -> Vec<u32> {
    (day.saturating_add(1)..=day.saturating_add(growth_days).min(horizon)).collect()
}

/// A scheduling problem assembled into a model
pub struct ScheduleModel {
    pub model: Model<PlanningModel>,
    pub assignment: VariableCollection<PlanningModel, (u32, usize)>,
    config: PlanConfig,
}

impl ScheduleModel {
    pub fn build(config: &PlanConfig) -> Result<Self> {
        config.validate()?;

        let crops = &config.crops;
        let mut model = Model::<PlanningModel>::with_config(config.model);

        let assignment = model.add_collection(
            "CropAssignment",
            iproduct!(config.days(), 0..crops.len()),
            |&(day, crop)| format!("CropAssignment_{}_{}", day, crops[crop].name),
            |_| 0.0,
            |_| 1.0,
            |_| VariableType::Binary,
        )?;

        for (day, c) in iproduct!(config.days(), 0..crops.len()) {
            let crop = &crops[c];
            let planted = assignment.get(&(day, c))?;
            let window = growing_window(day, crop.growth_days, config.horizon);

            if window.len() < crop.growth_days as usize && config.boundary == BoundaryPolicy::Forbid {
                // The crop could not finish growing before the horizon ends
                model.add_constraint(
                    Constraint::eq(planted, 0.0).named(format!("Boundary_{}_{}", day, crop.name)),
                )?;
                continue;
            }
            if window.is_empty() {
                continue;
            }

            let occupied: Vec<(u32, usize)> =
                iproduct!(window.iter().copied(), 0..crops.len()).collect();
            let antecedent = Constraint::eq(planted, 1.0);

            match config.rules {
                RuleSet::SummedImplication => {
                    let consequent = Constraint::eq(assignment.sum_of(&occupied)?, 0.0)
                        .named(format!("NoRegrowth_{}_{}", day, crop.name));
                    model.add_implication(antecedent.implies(consequent))?;
                }
                RuleSet::ExclusiveSlots => {
                    for &(other_day, other) in &occupied {
                        let slot = assignment.get(&(other_day, other))?;
                        let consequent = Constraint::eq(slot, 0.0).named(format!(
                            "Exclusive_{}_{}_{}_{}",
                            day, crop.name, other_day, crops[other].name
                        ));
                        model.add_implication(antecedent.clone().implies(consequent))?;
                    }
                }
            }
        }

        if crops.len() > 1 {
            for day in config.days() {
                let today: Vec<(u32, usize)> = (0..crops.len()).map(|c| (day, c)).collect();
                model.add_constraint(
                    Constraint::le(assignment.sum_of(&today)?, 1.0)
                        .named(format!("Capacity_{}", day)),
                )?;
            }
        }

        model.add_objective(Objective::maximize(assignment.total()).named("total"))?;

        debug!(
            horizon = config.horizon,
            crops = crops.len(),
            variables = model.variables().len(),
            constraints = model.constraints().len(),
            "schedule model built"
        );

        Ok(Self {
            model,
            assignment,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    /// Solve and read the assignment back
    ///
    /// Statuses without values leave every assignment unresolved.
    pub fn solve(&mut self, solver: &dyn LpSolver, options: &SolveOptions) -> Result<ScheduleOutcome> {
        let solution = self.model.solve_with(solver, options)?;
        self.model.apply_solution(&solution);

        let assignments = self
            .assignment
            .iter()
            .map(|(&(day, c), var)| Assignment {
                day,
                crop: self.config.crops[c].name.clone(),
                value: self.model.value(var),
            })
            .collect();

        Ok(ScheduleOutcome {
            status: solution.status,
            objective_value: solution.objective_value,
            assignments,
        })
    }
}

/// Solved value of one `(day, crop)` slot
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub day: u32,
    pub crop: String,
    /// `None` when the solve gave no value
    pub value: Option<f64>,
}

impl Assignment {
    pub fn is_planted(&self) -> bool {
        self.value.is_some_and(|value| value > 0.5)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleOutcome {
    pub status: SolveStatus,
    pub objective_value: Option<f64>,
    /// Day-major, crops in configuration order
    pub assignments: Vec<Assignment>,
}

impl ScheduleOutcome {
    pub fn planted(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.iter().filter(|a| a.is_planted())
    }

    /// Crops planted on `day`
    pub fn planted_on(&self, day: u32) -> Vec<&str> {
        self.planted()
            .filter(|a| a.day == day)
            .map(|a| a.crop.as_str())
            .collect()
    }

    pub fn planting_days(&self) -> Vec<u32> {
        self.planted().map(|a| a.day).collect()
    }
}

/// Build and solve in one step
pub fn solve_schedule(
    config: &PlanConfig,
    solver: &dyn LpSolver,
    options: &SolveOptions,
) -> Result<ScheduleOutcome> {
    ScheduleModel::build(config)?.solve(solver, options)
}
