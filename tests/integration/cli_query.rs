#![allow(missing_docs)]

mod common;

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use common::demo_dir;
use serde_json::Value;
use tempfile::TempDir;

fn table(name: &str) -> String {
    format!("{name}={}", demo_dir().join(format!("{name}.csv")).display())
}

fn plan(name: &str) -> PathBuf {
    demo_dir().join(name)
}

/// Config path inside `dir` that does not exist, so the built-in defaults apply.
fn no_config(dir: &TempDir) -> PathBuf {
    dir.path().join("absent.toml")
}

fn run_json(dir: &TempDir, args: &[&str], plan: &Path) -> Value {
    let output = cargo_bin_cmd!("reljoin")
        .arg("--config")
        .arg(no_config(dir))
        .args(["--format", "json", "query"])
        .args(args)
        .arg("--plan")
        .arg(plan)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("valid json")
}

#[test]
fn json_plan_reports_unmatched_student() {
    let dir = TempDir::new().expect("tempdir");
    let json = run_json(
        &dir,
        &["--table", &table("student"), "--table", &table("takes")],
        &plan("left_outer_unmatched.json"),
    );
    assert_eq!(json["columns"][0]["name"], "ID");
    assert_eq!(json["rows"], serde_json::json!([["70557"]]));
}

#[test]
fn right_outer_alias_plan_pads_with_nulls() {
    let dir = TempDir::new().expect("tempdir");
    let json = run_json(
        &dir,
        &["--table", &table("student"), "--table", &table("takes")],
        &plan("right_outer_snow.json"),
    );
    let rows = json["rows"].as_array().expect("rows array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "70557");
    assert_eq!(rows[0][1], Value::Null);
    assert_eq!(rows[0][6], "Snow");
    assert_eq!(rows[0][8], "0");
}

#[test]
fn toml_plan_sorts_and_renames() {
    let dir = TempDir::new().expect("tempdir");
    let json = run_json(
        &dir,
        &["--table", &table("student"), "--table", &table("takes")],
        &plan("cs_enrollment.toml"),
    );
    let columns: Vec<&str> = json["columns"]
        .as_array()
        .expect("columns array")
        .iter()
        .map(|c| c["name"].as_str().expect("column name"))
        .collect();
    assert_eq!(columns, ["name", "course_id", "mark"]);
    let rows = json["rows"].as_array().expect("rows array");
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0], serde_json::json!(["Zhang", "CS-101", "A"]));
    assert_eq!(rows[9], serde_json::json!(["Shankar", "CS-347", "A"]));
}

#[test]
fn text_output_counts_rows_for_every_strategy() {
    let dir = TempDir::new().expect("tempdir");
    let mut outputs = Vec::new();
    for strategy in ["auto", "nested-loop", "hash"] {
        let output = cargo_bin_cmd!("reljoin")
            .arg("--config")
            .arg(no_config(&dir))
            .arg("query")
            .args(["--table", &table("student")])
            .args(["--table", &table("takes")])
            .args(["--table", &table("course")])
            .arg("--plan")
            .arg(plan("using_titles.json"))
            .args(["--strategy", strategy])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        outputs.push(String::from_utf8(output).expect("utf8 output"));
    }
    let text = &outputs[0];
    assert!(text.starts_with("name"), "{text}");
    assert!(text.contains("Tanaka"), "{text}");
    assert!(text.ends_with("(22 rows)\n"), "{text}");
    assert!(outputs.iter().all(|o| o == text));
}

#[test]
fn describe_lists_each_relation() {
    let dir = TempDir::new().expect("tempdir");
    let output = cargo_bin_cmd!("reljoin")
        .arg("--config")
        .arg(no_config(&dir))
        .arg("describe")
        .args(["--table", &table("takes")])
        .args(["--table", &table("student")])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8 output");
    assert!(text.contains("student (13 rows)"), "{text}");
    assert!(text.contains("takes (22 rows)"), "{text}");
    assert!(text.find("student").unwrap() < text.find("takes").unwrap());
}

#[test]
fn unknown_relation_exits_with_code() {
    let dir = TempDir::new().expect("tempdir");
    let output = cargo_bin_cmd!("reljoin")
        .arg("--config")
        .arg(no_config(&dir))
        .arg("query")
        .args(["--table", &table("student")])
        .arg("--plan")
        .arg(plan("left_outer_unmatched.json"))
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).expect("utf8 stderr");
    assert!(stderr.contains("[UnknownRelation]"), "{stderr}");
    assert!(stderr.contains("takes"), "{stderr}");
}

#[test]
fn strict_config_rejects_disjoint_natural_join() {
    let dir = TempDir::new().expect("tempdir");
    let building = dir.path().join("building.csv");
    fs::write(&building, "building,rooms:integer\nWatson,12\nTaylor,30\n").expect("write csv");
    let plan_path = dir.path().join("plan.json");
    fs::write(
        &plan_path,
        r#"{"from":{"join":{"left":{"scan":{"relation":"student"}},"right":{"scan":{"relation":"building"}},"spec":{"condition":"natural"}}}}"#,
    )
    .expect("write plan");
    let config = dir.path().join("engine.toml");
    fs::write(&config, "preset = \"strict\"\n").expect("write config");
    let building_arg = format!("building={}", building.display());

    let output = cargo_bin_cmd!("reljoin")
        .arg("--config")
        .arg(&config)
        .arg("query")
        .args(["--table", &table("student"), "--table", &building_arg])
        .arg("--plan")
        .arg(&plan_path)
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).expect("utf8 stderr");
    assert!(stderr.contains("[AmbiguousJoin]"), "{stderr}");

    let json = run_json(
        &dir,
        &["--table", &table("student"), "--table", &building_arg],
        &plan_path,
    );
    assert_eq!(json["rows"].as_array().map(Vec::len), Some(26));
}

#[test]
fn config_row_ceiling_fails_the_query() {
    let dir = TempDir::new().expect("tempdir");
    let config = dir.path().join("engine.toml");
    fs::write(&config, "max_rows = 5\n").expect("write config");
    let output = cargo_bin_cmd!("reljoin")
        .arg("--config")
        .arg(&config)
        .arg("query")
        .args(["--table", &table("student"), "--table", &table("takes")])
        .arg("--plan")
        .arg(plan("right_outer_snow.json"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert!(String::from_utf8_lossy(&output).contains("(1 row)"));

    let output = cargo_bin_cmd!("reljoin")
        .arg("--config")
        .arg(&config)
        .arg("query")
        .args(["--table", &table("student"), "--table", &table("takes")])
        .args(["--table", &table("course")])
        .arg("--plan")
        .arg(plan("using_titles.json"))
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).expect("utf8 stderr");
    assert!(stderr.contains("[RowLimitExceeded]"), "{stderr}");
}

#[test]
fn malformed_table_argument_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    cargo_bin_cmd!("reljoin")
        .arg("--config")
        .arg(no_config(&dir))
        .arg("describe")
        .args(["--table", "student.csv"])
        .assert()
        .failure();
}
