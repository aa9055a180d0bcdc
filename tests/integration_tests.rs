use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

// Helper function to run the cropplan binary
fn run_cropplan(command: &str, args: &[&str], envs: &[(&str, &str)]) -> Result<Output, std::io::Error> {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cropplan"));
    cmd.arg(command).args(args);
    cmd.env_remove("CROPPLAN_LP_SOLVER");
    for (key, value) in envs {
        cmd.env(key, value);
    }
    cmd.output()
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temporary paths are valid UTF-8")
}

#[cfg(test)]
mod export_tests {
    use super::*;

    /// The LP file carries the scenario's rows and variables
    #[test]
    fn test_export_writes_lp_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let lp_path = temp_dir.path().join("model.lp");

        let output = run_cropplan("export", &[path_arg(&lp_path), "-H", "10"], &[])
            .expect("Failed to run cropplan export");

        assert!(
            output.status.success(),
            "Command should succeed. stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );

        let lp_content = fs::read_to_string(&lp_path).expect("Failed to read LP file");
        assert!(lp_content.starts_with("\\ Generated by cropplan"));
        assert!(lp_content.contains("Maximize"));
        assert!(lp_content.contains("Boundary_9_Crop_A"));
        assert!(lp_content.contains("Boundary_10_Crop_A"));
        assert!(lp_content.contains("NoRegrowth_8_Crop_A_hi"));
        assert!(lp_content.contains("Binaries"));
        assert!(lp_content.trim_end().ends_with("End"));
    }

    /// Truncated windows leave no boundary rows, short names hide the model names
    #[test]
    fn test_export_options() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let lp_path = temp_dir.path().join("model.lp");

        let output = run_cropplan(
            "export",
            &[
                path_arg(&lp_path),
                "-H",
                "6",
                "--crop",
                "Beans",
                "--crop",
                "Corn",
                "--boundary",
                "truncate",
                "--naming",
                "short",
            ],
            &[],
        )
        .expect("Failed to run cropplan export");
        assert!(output.status.success());

        let lp_content = fs::read_to_string(&lp_path).expect("Failed to read LP file");
        assert!(!lp_content.contains("Boundary_"));
        assert!(!lp_content.contains("CropAssignment"));
        assert!(lp_content.contains(" x0"));
        assert!(lp_content.contains(" c0:"));
    }

    #[test]
    fn test_invalid_arguments_fail() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let lp_path = temp_dir.path().join("model.lp");

        let output = run_cropplan(
            "export",
            &[path_arg(&lp_path), "-H", "5", "--crop-duration", "Corn=3"],
            &[],
        )
        .expect("Failed to run cropplan export");
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("unknown crop"));
        assert!(!lp_path.exists());

        let output = run_cropplan("export", &[path_arg(&lp_path), "-H", "0"], &[])
            .expect("Failed to run cropplan export");
        assert!(!output.status.success());
    }

    #[test]
    fn test_unknown_solver_is_rejected() {
        let output = run_cropplan("plan", &["-H", "4"], &[("CROPPLAN_LP_SOLVER", "simplex")])
            .expect("Failed to run cropplan plan");
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("CROPPLAN_LP_SOLVER"));
    }
}

#[cfg(all(test, feature = "coin_cbc"))]
mod plan_tests {
    use super::*;

    fn planted_days(csv: &str) -> Vec<u32> {
        csv.lines()
            .skip(1)
            .filter_map(|line| {
                let fields: Vec<&str> = line.split(',').collect();
                (fields[2] == "1").then(|| fields[0].parse().expect("day is a number"))
            })
            .collect()
    }

    /// Ten days, one crop, plantings allowed to run past the horizon
    #[test]
    fn test_plan_truncated_horizon() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let csv_path = temp_dir.path().join("schedule.csv");
        let rpt_path = temp_dir.path().join("schedule.rpt");

        let output = run_cropplan(
            "plan",
            &[
                "-H",
                "10",
                "--boundary",
                "truncate",
                "--csv",
                path_arg(&csv_path),
                "--rpt",
                path_arg(&rpt_path),
            ],
            &[("CROPPLAN_LP_SOLVER", "coin_cbc")],
        )
        .expect("Failed to run cropplan plan");

        assert!(
            output.status.success(),
            "Command should succeed. stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Status: optimal (4 plantings)"), "stdout: {}", stdout);
        assert!(stdout.contains("Crop A"));

        let csv_content = fs::read_to_string(&csv_path).expect("Failed to read CSV file");
        assert!(csv_content.starts_with("day,crop,value\n"));
        assert_eq!(planted_days(&csv_content), vec![1, 4, 7, 10]);

        let rpt_content = fs::read_to_string(&rpt_path).expect("Failed to read report file");
        assert!(rpt_content.contains("Horizon: 10 days"));
        assert!(rpt_content.contains("CropAssignment: 10 variables"));
    }

    #[test]
    fn test_plan_forbidden_boundary() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let csv_path = temp_dir.path().join("schedule.csv");

        let output = run_cropplan(
            "plan",
            &["-H", "10", "--csv", path_arg(&csv_path)],
            &[("CROPPLAN_LP_SOLVER", "coin_cbc")],
        )
        .expect("Failed to run cropplan plan");
        assert!(output.status.success());

        let csv_content = fs::read_to_string(&csv_path).expect("Failed to read CSV file");
        let days = planted_days(&csv_content);
        assert_eq!(days.len(), 3);
        assert!(days.iter().all(|&day| day <= 8));
    }

    /// Both rule encodings give the same number of plantings for two crops
    #[test]
    fn test_plan_rule_sets_agree() {
        for rules in ["summed", "exclusive"] {
            let output = run_cropplan(
                "plan",
                &["-H", "9", "-c", "Crop A", "-c", "Crop B", "--rules", rules],
                &[("CROPPLAN_LP_SOLVER", "coin_cbc")],
            )
            .expect("Failed to run cropplan plan");

            assert!(output.status.success(), "rules {} failed", rules);
            assert!(String::from_utf8_lossy(&output.stdout).contains("(3 plantings)"));
        }
    }
}
