use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

fn temp_path(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "choicetype-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn run(data_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_choicetype"))
        .arg("--data-dir")
        .arg(data_dir)
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("CHOICETYPE_DATA_DIR")
        .stdin(Stdio::null())
        .output()
        .expect("run cli")
}

fn seed_ledger(data_dir: &Path, json: &str) {
    std::fs::create_dir_all(data_dir).unwrap();
    std::fs::write(data_dir.join("ledger.json"), json).unwrap();
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn status_on_fresh_install() {
    let dir = temp_path("status");
    let output = run(&dir, &["status"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Find out how you react."));
    assert!(text.contains("Balls: 0"));
}

#[test]
fn status_reads_legacy_balance_key() {
    let dir = temp_path("legacy");
    seed_ledger(&dir, r#"{ "maxBalls": "7", "@choice_type": "quick" }"#);
    let output = run(&dir, &["status"]);
    let text = stdout(&output);
    assert!(text.contains("Quick Spark"));
    assert!(text.contains("Balls: 7"));
}

#[test]
fn buying_without_balls_fails() {
    let dir = temp_path("poor");
    let output = run(&dir, &["store", "buy", "calm"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Not enough balls"));
    assert!(!dir.join("ledger.json").exists());
}

#[test]
fn buy_then_save_wallpaper() {
    let dir = temp_path("buy");
    let gallery = dir.join("pictures");
    seed_ledger(&dir, r#"{ "@max_balls": "3" }"#);

    let output = run(&dir, &["store", "buy", "calm"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let ledger = std::fs::read_to_string(dir.join("ledger.json")).unwrap();
    assert!(ledger.contains(r#""@max_balls": "0""#));
    assert!(ledger.contains("calm"));

    let again = run(&dir, &["store", "buy", "calm"]);
    assert!(again.status.success());
    assert!(stdout(&again).contains("already unlocked"));

    let save = run(
        &dir,
        &["store", "save", "calm", "--dest", gallery.to_str().unwrap()],
    );
    assert!(save.status.success(), "{}", stderr(&save));
    let saved: Vec<_> = std::fs::read_dir(gallery.join("RooBall"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(saved.len(), 1);
    assert!(saved[0].starts_with("wall_calm_"));
}

#[test]
fn saving_locked_wallpaper_reports_generic_failure() {
    let dir = temp_path("locked");
    let output = run(&dir, &["store", "save", "quick"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to save file."));
}

#[test]
fn simulate_writes_json_report_without_touching_ledger() {
    let dir = temp_path("simulate");
    let report = temp_path("simulate-report.json");
    let output = run(
        &dir,
        &[
            "simulate",
            "--picks",
            "bbbbbbbbbbbb",
            "--picks",
            "cccccc------",
            "--report",
            "json",
            "--output",
            report.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "{}", stderr(&output));
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(report).unwrap()).unwrap();
    assert_eq!(value["attempts"][0]["classification"], "steady");
    assert_eq!(value["attempts"][0]["correct"], 12);
    assert_eq!(value["attempts"][1]["classification"], "quick");
    assert_eq!(value["final_balance"], 12);
    assert!(!dir.join("ledger.json").exists());
}

#[test]
fn simulate_rejects_bad_script() {
    let dir = temp_path("bad-script");
    let output = run(&dir, &["simulate", "--picks", "bbx"]);
    assert!(!output.status.success());
}

#[test]
fn onboarding_prints_slides_in_order() {
    let dir = temp_path("onboarding");
    let text = stdout(&run(&dir, &["onboarding"]));
    let first = text.find("Meet Max").unwrap();
    let last = text.find("One action.").unwrap();
    assert!(first < last);

    let skipped = stdout(&run(&dir, &["onboarding", "--skip"]));
    assert!(skipped.contains("Onboarding skipped."));
    assert!(!skipped.contains("Meet Max"));
}

#[test]
fn quiz_with_closed_stdin_is_abandoned() {
    let dir = temp_path("quiz");
    let output = run(&dir, &["quiz"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Attempt abandoned."));
    assert!(!dir.join("ledger.json").exists());
}
