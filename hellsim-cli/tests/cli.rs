use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "hellsim-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn write_config(label: &str, json: &str) -> std::path::PathBuf {
    let path = temp_path(label);
    std::fs::write(&path, json).expect("write config");
    path
}

#[test]
fn cli_info_prints_army_ratings() {
    let exe = env!("CARGO_BIN_EXE_hellsim");
    let output = Command::new(exe)
        .args(["--info", "--report", "json"])
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json info");
    assert!(value["fortress_rating"].as_f64().unwrap() > 0.0);
    assert_eq!(value["tick_length"].as_f64(), Some(250.0));
}

#[test]
fn cli_runs_a_seeded_batch_to_a_json_file() {
    let exe = env!("CARGO_BIN_EXE_hellsim");
    let config = write_config("config.json", r#"{ "hours": 0.25, "soul_forge": "off" }"#);
    let output_path = temp_path("report.json");
    let status = Command::new(exe)
        .args(["--trials", "3", "--threads", "2", "--seed", "21", "--report", "json"])
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());

    let content = std::fs::read_to_string(&output_path).expect("read output");
    let value: serde_json::Value = serde_json::from_str(&content).expect("json report");
    assert_eq!(value["report"]["trials_requested"], 3);
    assert_eq!(value["report"]["trials_completed"], 3);
    assert_eq!(value["report"]["cancelled"], false);
    assert!(value.get("stats").is_none());
}

#[test]
fn cli_same_seed_gives_same_results() {
    let exe = env!("CARGO_BIN_EXE_hellsim");
    let config = write_config("seeded.json", r#"{ "hours": 0.25 }"#);
    let run = || {
        let output = Command::new(exe)
            .args(["--trials", "2", "--seed", "5", "--report", "json", "-v"])
            .arg("--config")
            .arg(&config)
            .output()
            .expect("run cli");
        assert!(output.status.success());
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
        value["stats"]["ticks"].clone()
    };
    assert_eq!(run(), run());
}

#[test]
fn cli_console_report_has_results_block() {
    let exe = env!("CARGO_BIN_EXE_hellsim");
    let config = write_config("console.json", r#"{ "hours": 0.25 }"#);
    let output = Command::new(exe)
        .args(["--trials", "1", "--seed", "3", "--extended"])
        .arg("--config")
        .arg(&config)
        .env("NO_COLOR", "1")
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(" -- Results --"));
    assert!(stdout.contains("Soul gems per hour"));
    assert!(stdout.contains("Blood wars:"));
}

#[test]
fn cli_rejects_invalid_config() {
    let exe = env!("CARGO_BIN_EXE_hellsim");
    let config = write_config("invalid.json", r#"{ "turret_tech": 7 }"#);
    let output = Command::new(exe)
        .arg("--config")
        .arg(&config)
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid configuration"));
}

#[test]
fn cli_rejects_zero_trials() {
    let exe = env!("CARGO_BIN_EXE_hellsim");
    let output = Command::new(exe)
        .args(["--trials", "0"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
}
