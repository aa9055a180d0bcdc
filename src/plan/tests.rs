#[cfg(test)]
mod schedule_tests {
    use std::collections::BTreeSet;

    use anyhow::{Result, bail};
    use clap::Parser;

    use crate::lp_solver::*;
    use crate::plan::*;

    /// Backend that enumerates every assignment of the binary columns
    struct ExhaustiveSolver;

    impl LpSolver for ExhaustiveSolver {
        fn name(&self) -> &'static str {
            "exhaustive"
        }

        fn solve(&self, problem: &Problem, _options: &SolveOptions) -> Result<RawSolution> {
            if problem.columns.len() > 20 {
                bail!("too many columns to enumerate: {}", problem.columns.len());
            }
            if let Some(column) = problem
                .columns
                .iter()
                .find(|c| c.var_type != VariableType::Binary)
            {
                bail!("column {} is not binary", column.name);
            }

            let mut best: Option<(f64, Vec<f64>)> = None;
            for values in assignments(problem) {
                if !problem.rows.iter().all(|row| row.is_satisfied(&values)) {
                    continue;
                }
                let objective = problem.objective_value(&values);
                let better = match (&best, problem.sense) {
                    (None, _) => true,
                    (Some((current, _)), OptimizationSense::Maximize) => objective > *current,
                    (Some((current, _)), OptimizationSense::Minimize) => objective < *current,
                };
                if better {
                    best = Some((objective, values));
                }
            }

            Ok(match best {
                Some((objective, values)) => RawSolution {
                    status: SolveStatus::Optimal,
                    objective_value: Some(objective),
                    values,
                },
                None => RawSolution::status_only(SolveStatus::Infeasible),
            })
        }
    }

    /// Backend that answers with a status and nothing else
    struct StatusSolver(SolveStatus);

    impl LpSolver for StatusSolver {
        fn name(&self) -> &'static str {
            "status"
        }

        fn solve(&self, _problem: &Problem, _options: &SolveOptions) -> Result<RawSolution> {
            Ok(RawSolution::status_only(self.0))
        }
    }

    /// Every 0/1 vector within the column bounds
    fn assignments(problem: &Problem) -> impl Iterator<Item = Vec<f64>> + '_ {
        let n = problem.columns.len();
        (0u32..1 << n)
            .map(move |mask| {
                (0..n)
                    .map(|i| if mask & (1 << i) != 0 { 1.0 } else { 0.0 })
                    .collect::<Vec<f64>>()
            })
            .filter(move |values| {
                problem
                    .columns
                    .iter()
                    .zip(values)
                    .all(|(column, &v)| v >= column.lower && v <= column.upper)
            })
    }

    /// Planted column names of every feasible point of the model
    fn model_plantings(config: &PlanConfig) -> BTreeSet<Vec<String>> {
        let problem = ScheduleModel::build(config).unwrap().model.to_problem();
        assignments(&problem)
            .filter(|values| problem.rows.iter().all(|row| row.is_satisfied(values)))
            .map(|values| {
                problem
                    .columns
                    .iter()
                    .zip(&values)
                    .filter(|&(_, &v)| v > 0.5)
                    .map(|(column, _)| column.name.clone())
                    .collect()
            })
            .collect()
    }

    /// Every valid planting plan, checked directly against the planting rules
    fn domain_plantings(config: &PlanConfig) -> BTreeSet<Vec<String>> {
        let slots: Vec<(u32, usize)> = config
            .days()
            .flat_map(|day| (0..config.crops.len()).map(move |c| (day, c)))
            .collect();

        let mut plans = BTreeSet::new();
        for mask in 0u32..1 << slots.len() {
            let planted: Vec<(u32, usize)> = slots
                .iter()
                .enumerate()
                .filter(|&(i, _)| mask & (1 << i) != 0)
                .map(|(_, &slot)| slot)
                .collect();

            let valid = planted.iter().all(|&(day, c)| {
                let growth_days = config.crops[c].growth_days;
                let fits = config.boundary == BoundaryPolicy::Truncate
                    || day + growth_days <= config.horizon;
                let undisturbed = planted
                    .iter()
                    .all(|&(other_day, _)| other_day <= day || other_day > day + growth_days);
                let alone = planted.iter().filter(|&&(d, _)| d == day).count() == 1;
                fits && undisturbed && alone
            });

            if valid {
                plans.insert(
                    planted
                        .iter()
                        .map(|&(day, c)| {
                            sanitize(&format!("CropAssignment_{}_{}", day, config.crops[c].name))
                        })
                        .collect(),
                );
            }
        }
        plans
    }

    fn solve(config: &PlanConfig) -> ScheduleOutcome {
        solve_schedule(config, &ExhaustiveSolver, &SolveOptions::default())
            .expect("exhaustive solve should run")
    }

    fn constraint_names(config: &PlanConfig) -> Vec<String> {
        let schedule = ScheduleModel::build(config).unwrap();
        schedule
            .model
            .constraints()
            .iter()
            .filter_map(|c| c.name().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_growing_window() {
        assert_eq!(growing_window(1, 3, 10), vec![2, 3, 4]);
        assert_eq!(growing_window(9, 2, 10), vec![10]);
        assert!(growing_window(10, 2, 10).is_empty());
        assert_eq!(growing_window(1, 1, 1), Vec::<u32>::new());
    }

    #[test]
    fn test_config_validation() {
        assert!(PlanConfig::uniform(0, &["Crop A"], 2).validate().is_err());
        assert!(PlanConfig::uniform(5, &[], 2).validate().is_err());
        assert!(PlanConfig::uniform(5, &["Crop A"], 0).validate().is_err());
        assert!(PlanConfig::uniform(5, &["Crop A", "Crop A"], 2).validate().is_err());
        assert!(PlanConfig::uniform(5, &["Crop A", "Crop B"], 2).validate().is_ok());
        assert!(ScheduleModel::build(&PlanConfig::uniform(0, &["Crop A"], 2)).is_err());
    }

    /// Ten days, one crop growing two days
    #[test]
    fn test_ten_day_horizon() {
        let forbid = solve(&PlanConfig::uniform(10, &[DEFAULT_CROP], 2));
        assert_eq!(forbid.status, SolveStatus::Optimal);
        assert_eq!(forbid.objective_value, Some(3.0));
        assert!(forbid.planting_days().iter().all(|&day| day <= 8));

        let truncate = solve(
            &PlanConfig::uniform(10, &[DEFAULT_CROP], 2).with_boundary(BoundaryPolicy::Truncate),
        );
        assert_eq!(truncate.status, SolveStatus::Optimal);
        assert_eq!(truncate.objective_value, Some(4.0));
        assert_eq!(truncate.planting_days(), vec![1, 4, 7, 10]);
    }

    #[test]
    fn test_nine_day_horizon() {
        for boundary in [BoundaryPolicy::Forbid, BoundaryPolicy::Truncate] {
            let outcome =
                solve(&PlanConfig::uniform(9, &[DEFAULT_CROP], 2).with_boundary(boundary));
            assert_eq!(outcome.objective_value, Some(3.0), "{:?}", boundary);
        }
    }

    #[test]
    fn test_two_crops_share_the_land() {
        for rules in [RuleSet::SummedImplication, RuleSet::ExclusiveSlots] {
            let config = PlanConfig::uniform(9, &["Crop A", "Crop B"], 2).with_rules(rules);
            let outcome = solve(&config);
            assert_eq!(outcome.status, SolveStatus::Optimal);
            assert_eq!(outcome.objective_value, Some(3.0), "{:?}", rules);

            for day in config.days() {
                assert!(outcome.planted_on(day).len() <= 1, "day {} planted twice", day);
            }
            let days = outcome.planting_days();
            for pair in days.windows(2) {
                assert!(pair[1] > pair[0] + 2, "plantings {:?} overlap", pair);
            }
        }
    }

    #[test]
    fn test_boundary_days_are_fixed_to_zero() {
        for horizon in 1..=7 {
            for growth_days in 1..=3 {
                let config = PlanConfig::uniform(horizon, &[DEFAULT_CROP], growth_days);
                let names = constraint_names(&config);
                for day in config.days() {
                    let boundary = format!("Boundary_{}_Crop A", day);
                    let no_regrowth = format!("NoRegrowth_{}_", day);
                    if day + growth_days > horizon {
                        assert!(names.contains(&boundary), "{} missing (H={})", boundary, horizon);
                        assert!(!names.iter().any(|name| name.starts_with(&no_regrowth)));
                    } else {
                        assert!(!names.contains(&boundary));
                        let rows = format!("NoRegrowth_{}_Crop A_hi", day);
                        let count = names.iter().filter(|name| name.starts_with(&rows)).count();
                        assert_eq!(count, growth_days as usize, "{} rows (H={})", rows, horizon);
                    }
                }
            }
        }
    }

    #[test]
    fn test_truncate_keeps_short_windows() {
        let config =
            PlanConfig::uniform(5, &[DEFAULT_CROP], 3).with_boundary(BoundaryPolicy::Truncate);
        let names = constraint_names(&config);
        assert!(!names.iter().any(|name| name.starts_with("Boundary_")));
        // Day 4 only blocks day 5
        assert!(names.contains(&"NoRegrowth_4_Crop A_hi".to_string()));
        assert!(names.contains(&"NoRegrowth_3_Crop A_hi_2".to_string()));
        assert!(!names.contains(&"NoRegrowth_3_Crop A_hi_3".to_string()));
        // Nothing grows after the last day
        assert!(!names.iter().any(|name| name.starts_with("NoRegrowth_5_")));
    }

    #[test]
    fn test_no_regrowth_rows() {
        let schedule = ScheduleModel::build(&PlanConfig::uniform(6, &[DEFAULT_CROP], 2)).unwrap();
        let assignment = &schedule.assignment;

        for day in 1..=4 {
            let planted = assignment.get(&(day, 0)).unwrap();
            let prefix = format!("NoRegrowth_{}_Crop A_hi", day);
            let rows: Vec<_> = schedule
                .model
                .constraints()
                .iter()
                .filter(|c| c.name().is_some_and(|name| name.starts_with(&prefix)))
                .collect();
            // One row per blocked day
            assert_eq!(rows.len(), 2);
            for row in &rows {
                assert_eq!(row.expression().coefficient(planted), 1.0);
                assert_eq!(row.upper(), 1.0);
            }
            let all_hold = |value_of: &dyn Fn(VariableId<PlanningModel>) -> f64| {
                rows.iter().all(|row| row.is_satisfied(value_of, 1e-6))
            };

            for &other in &growing_window(day, 2, 6) {
                let blocked = assignment.get(&(other, 0)).unwrap();
                let both = |v: VariableId<PlanningModel>| {
                    if v == planted || v == blocked { 1.0 } else { 0.0 }
                };
                assert!(!all_hold(&both), "day {} should block {}", day, other);
            }

            // Not planted: the whole window may be planted
            let window = growing_window(day, 2, 6);
            let window_only = |v: VariableId<PlanningModel>| {
                let in_window = window
                    .iter()
                    .any(|&d| assignment.get(&(d, 0)).unwrap() == v);
                if in_window { 1.0 } else { 0.0 }
            };
            assert!(all_hold(&window_only));
        }
    }

    #[test]
    fn test_rule_sets_have_the_same_feasible_plans() {
        for boundary in [BoundaryPolicy::Forbid, BoundaryPolicy::Truncate] {
            let summed = PlanConfig::uniform(5, &["Crop A", "Crop B"], 2).with_boundary(boundary);
            let exclusive = summed.clone().with_rules(RuleSet::ExclusiveSlots);
            assert_eq!(model_plantings(&summed), model_plantings(&exclusive));
        }
    }

    #[test]
    fn test_model_matches_planting_rules() {
        let configs = vec![
            PlanConfig::uniform(7, &[DEFAULT_CROP], 2),
            PlanConfig::uniform(7, &[DEFAULT_CROP], 3).with_boundary(BoundaryPolicy::Truncate),
            PlanConfig::new(6, vec![Crop::new("Beans", 1), Crop::new("Corn", 3)]),
            PlanConfig::new(6, vec![Crop::new("Beans", 1), Crop::new("Corn", 3)])
                .with_boundary(BoundaryPolicy::Truncate)
                .with_rules(RuleSet::ExclusiveSlots),
        ];
        for config in &configs {
            assert_eq!(model_plantings(config), domain_plantings(config), "{:?}", config);
        }
    }

    #[test]
    fn test_failed_solve_leaves_schedule_unresolved() {
        let config = PlanConfig::uniform(4, &[DEFAULT_CROP], 2);
        for status in [SolveStatus::Infeasible, SolveStatus::TimedOut, SolveStatus::Error("boom")] {
            let outcome =
                solve_schedule(&config, &StatusSolver(status), &SolveOptions::default()).unwrap();
            assert_eq!(outcome.status, status);
            assert_eq!(outcome.objective_value, None);
            assert_eq!(outcome.assignments.len(), 4);
            assert!(outcome.assignments.iter().all(|a| a.value.is_none()));
            assert_eq!(outcome.planted().count(), 0);
        }
    }

    #[test]
    fn test_planting_on_a_boundary_day_is_infeasible() {
        let mut schedule = ScheduleModel::build(&PlanConfig::uniform(5, &[DEFAULT_CROP], 2)).unwrap();
        let last = schedule.assignment.get(&(5, 0)).unwrap();
        schedule
            .model
            .add_constraint(Constraint::eq(last, 1.0).named("force_last"))
            .unwrap();

        let outcome = schedule
            .solve(&ExhaustiveSolver, &SolveOptions::default())
            .unwrap();
        assert_eq!(outcome.status, SolveStatus::Infeasible);
        assert!(outcome.assignments.iter().all(|a| a.value.is_none()));
    }

    #[test]
    fn test_export_names() {
        let mut config = PlanConfig::uniform(3, &[DEFAULT_CROP], 2);
        let schedule = ScheduleModel::build(&config).unwrap();
        let first = schedule.assignment.get(&(1, 0)).unwrap();
        let info = schedule.model.variable(first).unwrap();
        assert_eq!(info.name(), "CropAssignment_1_Crop A");
        assert_eq!(info.export_name(), "CropAssignment_1_Crop_A");

        config.model.naming_style = NamingStyle::ShortNames;
        let schedule = ScheduleModel::build(&config).unwrap();
        let first = schedule.assignment.get(&(1, 0)).unwrap();
        assert_eq!(schedule.model.variable(first).unwrap().export_name(), "x0");
        assert!(schedule.model.to_problem().rows.iter().all(|row| row.name.starts_with('c')));
    }

    #[test]
    fn test_lp_export() {
        let schedule = ScheduleModel::build(&PlanConfig::uniform(4, &[DEFAULT_CROP], 2)).unwrap();
        let mut buffer = Vec::new();
        schedule.model.write_lp(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("Maximize"));
        assert!(text.contains("Boundary_4_Crop_A"));
        assert!(text.contains("NoRegrowth_1_Crop_A_hi"));
        assert!(text.contains("Binaries"));
        assert!(text.contains("CropAssignment_2_Crop_A"));
    }

    #[test]
    fn test_model_shape() {
        let schedule = ScheduleModel::build(&PlanConfig::uniform(10, &["Crop A", "Crop B"], 2)).unwrap();
        assert_eq!(schedule.assignment.len(), 20);
        assert_eq!(schedule.model.variable_collections().len(), 1);
        assert_eq!(schedule.model.variable_collections()[0].name(), "CropAssignment");
        let objective = schedule.model.objective().unwrap();
        assert_eq!(objective.name(), Some("total"));
        assert_eq!(objective.sense(), OptimizationSense::Maximize);

        let names = constraint_names(schedule.config());
        assert_eq!(names.iter().filter(|n| n.starts_with("Capacity_")).count(), 10);

        let single = constraint_names(&PlanConfig::uniform(10, &[DEFAULT_CROP], 2));
        assert!(!single.iter().any(|n| n.starts_with("Capacity_")));
    }

    fn sample_outcome() -> ScheduleOutcome {
        let assignment = |day, crop: &str, value| Assignment {
            day,
            crop: crop.to_string(),
            value,
        };
        ScheduleOutcome {
            status: SolveStatus::Optimal,
            objective_value: Some(1.0),
            assignments: vec![
                assignment(1, "Crop A", Some(1.0)),
                assignment(2, "Crop A", Some(0.0)),
                assignment(3, "Crop A", None),
            ],
        }
    }

    #[test]
    fn test_schedule_table() {
        let config = PlanConfig::uniform(3, &[DEFAULT_CROP], 2);
        let rendered = schedule_table(&config, &sample_outcome()).to_string();
        let lines: Vec<&str> = rendered.lines().collect();

        assert!(rendered.contains("Planted"));
        assert!(lines.iter().any(|l| l.contains('1') && l.contains("Crop A")));
        assert!(lines.iter().any(|l| l.contains('2') && l.contains(" - ")));
        assert!(lines.iter().any(|l| l.contains('3') && l.contains(" - ")));
    }

    #[test]
    fn test_csv_output() {
        let mut buffer = Vec::new();
        let written: std::io::Result<()> = write_csv(&sample_outcome(), &mut buffer);
        written.unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "day,crop,value\n1,Crop A,1\n2,Crop A,0\n3,Crop A,unresolved\n"
        );
    }

    #[test]
    fn test_report() {
        let config = PlanConfig::uniform(3, &[DEFAULT_CROP], 2);
        let schedule = ScheduleModel::build(&config).unwrap();
        let mut buffer = Vec::new();
        write_report(&schedule, &sample_outcome(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("Horizon: 3 days"));
        assert!(text.contains("CropAssignment: 3 variables"));
        assert!(text.contains("Status: optimal (1 plantings)"));
        assert!(text.contains("Growth days"));
    }

    #[test]
    fn test_scenario_arguments() {
        let args = ScenarioArgs::try_parse_from([
            "plan",
            "-H",
            "6",
            "--crop",
            "Beans",
            "--crop",
            "Corn",
            "--crop-duration",
            "Corn=3",
            "--boundary",
            "truncate",
            "--naming",
            "short",
        ])
        .unwrap();
        let config = args.to_config().unwrap();

        assert_eq!(config.horizon, 6);
        assert_eq!(config.crops, vec![Crop::new("Beans", 2), Crop::new("Corn", 3)]);
        assert_eq!(config.boundary, BoundaryPolicy::Truncate);
        assert_eq!(config.rules, RuleSet::SummedImplication);
        assert_eq!(config.model.naming_style, NamingStyle::ShortNames);
        assert!(config.model.track_removed_variables);
    }

    #[test]
    fn test_scenario_defaults_to_single_crop() {
        let config = ScenarioArgs::try_parse_from(["plan", "-H", "10"])
            .unwrap()
            .to_config()
            .unwrap();
        assert_eq!(config, PlanConfig::uniform(10, &[DEFAULT_CROP], 2));
    }

    #[test]
    fn test_invalid_scenario_arguments() {
        assert!(ScenarioArgs::try_parse_from(["plan", "-H", "0"]).is_err());
        assert!(ScenarioArgs::try_parse_from(["plan", "-H", "5", "--crop-duration", "Corn"]).is_err());
        assert!(ScenarioArgs::try_parse_from(["plan", "-H", "5", "--crop-duration", "Corn=0"]).is_err());

        let unknown = ScenarioArgs::try_parse_from(["plan", "-H", "5", "--crop-duration", "Corn=3"])
            .unwrap()
            .to_config();
        assert!(unknown.is_err());

        let twice = ScenarioArgs::try_parse_from(["plan", "-H", "5", "-c", "A", "-c", "A"])
            .unwrap()
            .to_config();
        assert!(twice.is_err());
    }

    #[test]
    fn test_time_limit_arguments() {
        use crate::plan::time_limit_from_seconds;

        assert_eq!(time_limit_from_seconds(None).unwrap(), None);
        assert_eq!(
            time_limit_from_seconds(Some(30.0)).unwrap(),
            Some(std::time::Duration::from_secs(30))
        );
        assert!(time_limit_from_seconds(Some(0.0)).is_err());
        assert!(time_limit_from_seconds(Some(-1.0)).is_err());
        assert!(time_limit_from_seconds(Some(f64::NAN)).is_err());
        assert!(time_limit_from_seconds(Some(f64::INFINITY)).is_err());

        // Finite but beyond what a `Duration` can hold
        let err = time_limit_from_seconds(Some(1e20)).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[cfg(feature = "coin_cbc")]
    mod cbc {
        use super::*;
        use crate::lp_solver::coin_cbc::CoinCbcSolver;

        fn solve_cbc(config: &PlanConfig) -> ScheduleOutcome {
            solve_schedule(config, &CoinCbcSolver, &SolveOptions::default())
                .expect("CBC solve should run")
        }

        #[test]
        fn test_ten_day_horizon_with_cbc() {
            let truncate = solve_cbc(
                &PlanConfig::uniform(10, &[DEFAULT_CROP], 2).with_boundary(BoundaryPolicy::Truncate),
            );
            assert_eq!(truncate.status, SolveStatus::Optimal);
            assert_eq!(truncate.objective_value, Some(4.0));
            assert_eq!(truncate.planting_days(), vec![1, 4, 7, 10]);

            let forbid = solve_cbc(&PlanConfig::uniform(10, &[DEFAULT_CROP], 2));
            assert_eq!(forbid.objective_value, Some(3.0));
        }

        #[test]
        fn test_two_crops_with_cbc() {
            let config = PlanConfig::uniform(9, &["Crop A", "Crop B"], 2)
                .with_rules(RuleSet::ExclusiveSlots);
            let outcome = solve_cbc(&config);
            assert_eq!(outcome.status, SolveStatus::Optimal);
            assert_eq!(outcome.objective_value, Some(3.0));
            assert!(outcome.assignments.iter().all(|a| a.value.is_some()));
        }
    }
}
