//! End-to-end CLI tests for dimorph.
//!
//! Each test writes a small cohort table and config into a temp dir and runs
//! the binary against them, checking stdout payloads and exit codes.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const CONFIG: &str = r#"
data = "brain.csv"
subject_id = "SubjectId"
group_by = "Sex"

[groups]
a = "F"
b = "M"

[selection]
top_n = 2
tail_fraction = 0.2

[density]
parallel = false
"#;

/// Six subjects per group plus one mixed-zone subject, one subject with a
/// missing value and one row of an unknown group.
fn cohort_csv() -> String {
    let mut text = String::from("SubjectId,Sex,Cortex,Thalamus\n");
    for i in 1..=6 {
        text.push_str(&format!("f{i},F,{i},{i}\n"));
        text.push_str(&format!("m{i},M,{},{}\n", 10 + i, 10 + i));
    }
    text.push_str("f7,F,0.5,20\n");
    text.push_str("m7,M,12.5,\n");
    text.push_str("u1,U,5,5\n");
    text
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("brain.csv"), cohort_csv()).expect("write data");
        std::fs::write(dir.path().join("analysis.toml"), CONFIG).expect("write config");
        Fixture { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn config(&self) -> String {
        self.path().join("analysis.toml").display().to_string()
    }

    /// Binary isolated from the caller's config environment.
    fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("dimorph");
        cmd.current_dir(self.path())
            .env_remove("DIMORPH_CONFIG")
            .env_remove("DIMORPH_CONFIG_DIR")
            .env_remove("DIMORPH_LOG")
            .env_remove("RUST_LOG")
            .env("XDG_CONFIG_HOME", self.path().join("xdg"))
            .env("HOME", self.path());
        cmd
    }

    fn with_config(&self) -> Command {
        let mut cmd = self.cmd();
        cmd.args(["--config", &self.config()]);
        cmd
    }
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

// ============================================================================
// Commands
// ============================================================================

mod commands {
    use super::*;

    #[test]
    fn rank_json_lists_top_variables() {
        let fx = Fixture::new();
        let output = fx.with_config().arg("rank").output().unwrap();
        assert_eq!(output.status.code(), Some(0));
        let json = stdout_json(&output);
        let ranking = json["ranking"].as_array().unwrap();
        assert_eq!(ranking.len(), 2);
        assert_eq!(json["labels"]["b"], "M");
        assert_eq!(ranking[0]["rank"], 1);
        assert_eq!(ranking[0]["larger"], "M");
    }

    #[test]
    fn rank_all_as_csv() {
        let fx = Fixture::new();
        fx.with_config()
            .args(["rank", "--all", "--format", "csv"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with(
                "rank,variable,divergence,signed_divergence,larger\n",
            ))
            .stdout(predicate::str::contains(",M\n"));
    }

    #[test]
    fn rules_markdown() {
        let fx = Fixture::new();
        fx.with_config()
            .args(["rules", "--top", "1", "-f", "md"])
            .assert()
            .success()
            .stdout(predicate::str::contains("## Rules (tail fraction 0.2000"))
            .stdout(predicate::str::contains("| Variable | F zone | M zone |"));
    }

    #[test]
    fn classify_reports_inconsistent_subjects() {
        let fx = Fixture::new();
        let output = fx.with_config().arg("classify").output().unwrap();
        assert_eq!(output.status.code(), Some(1));
        let json = stdout_json(&output);
        let subjects = json["subjects"].as_array().unwrap();
        let f7 = subjects.iter().find(|s| s["id"] == "f7").unwrap();
        assert_eq!(f7["zones"]["Cortex"], "A");
        assert_eq!(f7["zones"]["Thalamus"], "B");
        assert_eq!(f7["consistent"], false);
        let m7 = subjects.iter().find(|s| s["id"] == "m7").unwrap();
        assert_eq!(m7["zones"]["Thalamus"], "NA");
        assert!(subjects.iter().all(|s| s["id"] != "u1"));
    }

    #[test]
    fn score_csv_marks_missing_as_na() {
        let fx = Fixture::new();
        let output = fx
            .with_config()
            .args(["score", "--format", "csv"])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(0));
        let stdout = String::from_utf8(output.stdout).unwrap();
        let mut lines = stdout.lines();
        assert_eq!(lines.next(), Some("SubjectId,Sex,Cortex,Thalamus"));
        // Sorted by group then numeric-aware id.
        assert!(lines.next().unwrap().starts_with("f1,F,"));
        let m7 = stdout.lines().find(|l| l.starts_with("m7,")).unwrap();
        assert!(m7.ends_with(",NA"));
    }

    #[test]
    fn posterior_scores_are_probabilities() {
        let fx = Fixture::new();
        let output = fx
            .with_config()
            .args(["score", "--posterior"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let json = stdout_json(&output);
        assert_eq!(json["score_kind"], "posterior");
        for subject in json["subjects"].as_array().unwrap() {
            for score in subject["scores"].as_object().unwrap().values() {
                if let Some(p) = score.as_f64() {
                    assert!((0.0..=1.0).contains(&p));
                }
            }
        }
    }

    #[test]
    fn full_report_summary() {
        let fx = Fixture::new();
        fx.with_config()
            .args(["report", "-f", "summary"])
            .assert()
            .success()
            .stdout(predicate::str::contains("2 variables ranked"))
            .stdout(predicate::str::contains("14 subjects"));
    }

    #[test]
    fn check_summarises_inputs() {
        let fx = Fixture::new();
        fx.with_config()
            .args(["check", "-f", "summary"])
            .assert()
            .success()
            .stdout(predicate::str::contains("ok: 14 subjects, 2 variables"));
    }

    #[test]
    fn version_json() {
        let fx = Fixture::new();
        fx.cmd()
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::contains("dimorph_version"));
    }
}

// ============================================================================
// Configuration discovery
// ============================================================================

mod config_discovery {
    use super::*;

    #[test]
    fn config_from_env_variable() {
        let fx = Fixture::new();
        fx.cmd()
            .env("DIMORPH_CONFIG", fx.config())
            .args(["check", "-f", "summary"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config: environment variable"));
    }

    #[test]
    fn config_from_working_dir() {
        let fx = Fixture::new();
        std::fs::write(fx.path().join("dimorph.toml"), CONFIG).unwrap();
        fx.cmd()
            .args(["check", "-f", "summary"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config: working directory"));
    }

    #[test]
    fn data_flag_overrides_config() {
        let fx = Fixture::new();
        std::fs::write(fx.path().join("other.csv"), "SubjectId,Sex,v\n1,F,1\n2,M,2\n").unwrap();
        // One sample per group cannot support a density estimate.
        fx.with_config()
            .args(["--data", "other.csv", "rank"])
            .assert()
            .code(12);
    }
}

// ============================================================================
// Errors and exit codes
// ============================================================================

mod errors {
    use super::*;

    #[test]
    fn invalid_tail_fraction_is_args_error() {
        let fx = Fixture::new();
        fx.with_config()
            .args(["rules", "--tail-fraction", "0.7"])
            .assert()
            .code(10)
            .stderr(predicate::str::contains("\"code\":30"));
    }

    #[test]
    fn zero_count_is_args_error() {
        let fx = Fixture::new();
        fx.with_config()
            .args(["rank", "--top", "0"])
            .assert()
            .code(10);
    }

    #[test]
    fn missing_config_file_is_config_error() {
        let fx = Fixture::new();
        fx.cmd()
            .args(["--config", "nope.toml", "rank", "-f", "md"])
            .assert()
            .code(11)
            .stderr(predicate::str::contains("Config file not found"));
    }

    #[test]
    fn invalid_config_value_is_config_error() {
        let fx = Fixture::new();
        std::fs::write(
            fx.path().join("bad.toml"),
            CONFIG.replace("tail_fraction = 0.2", "tail_fraction = 0.9"),
        )
        .unwrap();
        fx.cmd()
            .args(["--config", "bad.toml", "rank"])
            .assert()
            .code(11);
    }

    #[test]
    fn missing_column_is_data_error() {
        let fx = Fixture::new();
        std::fs::write(
            fx.path().join("sexless.toml"),
            CONFIG.replace("group_by = \"Sex\"", "group_by = \"Gender\""),
        )
        .unwrap();
        fx.cmd()
            .args(["--config", "sexless.toml", "rank"])
            .assert()
            .code(12)
            .stderr(predicate::str::contains("Gender"));
    }

    #[test]
    fn missing_data_file_is_io_error() {
        let fx = Fixture::new();
        fx.with_config()
            .args(["--data", "absent.csv", "rank"])
            .assert()
            .code(21);
    }

    #[test]
    fn no_data_configured_is_config_error() {
        let fx = Fixture::new();
        fx.cmd()
            .args(["rank", "-f", "summary"])
            .assert()
            .code(11)
            .stderr(predicate::str::contains("no data file"));
    }

    #[test]
    fn unknown_command_fails() {
        let fx = Fixture::new();
        fx.cmd()
            .arg("nonexistent-command")
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }
}
