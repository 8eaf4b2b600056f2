#![allow(missing_docs)]

mod common;

use common::{executor, text};
use reljoin::config::{EngineConfig, JoinStrategy};
use reljoin::query::{JoinKind, JoinSpec, Predicate, QueryBuilder, Result, Value};

const NAME_TITLE: [(&str, &str); 22] = [
    ("Zhang", "Intro. to Computer Science"),
    ("Zhang", "Database System Concepts"),
    ("Shankar", "Intro. to Computer Science"),
    ("Shankar", "Game Design"),
    ("Shankar", "Robotics"),
    ("Shankar", "Database System Concepts"),
    ("Brandt", "World History"),
    ("Chavez", "Investment Banking"),
    ("Peltier", "Physical Principles"),
    ("Levy", "Intro. to Computer Science"),
    ("Levy", "Intro. to Computer Science"),
    ("Levy", "Image Processing"),
    ("Williams", "Intro. to Computer Science"),
    ("Williams", "Game Design"),
    ("Sanchez", "Music Video Production"),
    ("Brown", "Intro. to Computer Science"),
    ("Brown", "Image Processing"),
    ("Aoi", "Intro. to Digital Systems"),
    ("Bourikas", "Intro. to Computer Science"),
    ("Bourikas", "Robotics"),
    ("Tanaka", "Intro. to Biology"),
    ("Tanaka", "Genetics"),
];

fn pairs(rows: &[Vec<Value>]) -> Vec<(String, String)> {
    rows.iter()
        .map(|row| (row[0].to_string(), row[1].to_string()))
        .collect()
}

fn expected_pairs() -> Vec<(String, String)> {
    NAME_TITLE
        .iter()
        .map(|(name, title)| (name.to_string(), title.to_string()))
        .collect()
}

#[test]
fn natural_join_pairs_every_enrollment() -> Result<()> {
    let exec = executor(EngineConfig::default());
    let result = QueryBuilder::scan("student")
        .natural_join("takes", JoinKind::Inner)
        .execute(&exec, None)?;

    assert_eq!(result.len(), 22);
    let names: Vec<&str> = result.schema.names().collect();
    assert_eq!(
        names,
        [
            "ID", "name", "dept_name", "tot_cred", "course_id", "sec_id", "semester", "year",
            "grade"
        ]
    );
    assert_eq!(result.rows[0][0], Value::from("00128"));
    assert_eq!(result.rows[0][4], Value::from("CS-101"));
    assert_eq!(result.rows[21][4], Value::from("BIO-301"));
    assert_eq!(result.rows[21][8], Value::Null);
    Ok(())
}

#[test]
fn using_on_and_comma_joins_agree_on_titles() -> Result<()> {
    let exec = executor(EngineConfig::default());
    let using = QueryBuilder::scan("student")
        .natural_join("takes", JoinKind::Inner)
        .join_using("course", JoinKind::Inner, ["course_id"])
        .select(["name", "title"])
        .execute(&exec, None)?;
    let comma = QueryBuilder::scan("student")
        .natural_join("takes", JoinKind::Inner)
        .cross_join("course")
        .filter(Predicate::columns_eq("takes.course_id", "course.course_id"))
        .select(["name", "title"])
        .execute(&exec, None)?;

    let on = QueryBuilder::scan("student")
        .natural_join("takes", JoinKind::Inner)
        .join_on(
            "course",
            JoinKind::Inner,
            Predicate::columns_eq("takes.course_id", "course.course_id"),
        )
        .select(["name", "title"])
        .execute(&exec, None)?;

    assert_eq!(pairs(&using.rows), expected_pairs());
    assert_eq!(pairs(&comma.rows), expected_pairs());
    assert_eq!(pairs(&on.rows), expected_pairs());
    Ok(())
}

#[test]
fn on_join_keeps_both_id_columns() -> Result<()> {
    let exec = executor(EngineConfig::default());
    let result = QueryBuilder::scan("student")
        .join_on(
            "takes",
            JoinKind::Inner,
            Predicate::columns_eq("student.ID", "takes.ID"),
        )
        .execute(&exec, None)?;

    assert_eq!(result.len(), 22);
    assert_eq!(result.schema.len(), 10);
    assert_eq!(result.column("student.ID")?, result.column("takes.ID")?);
    assert!(result.column("ID").is_err());
    Ok(())
}

#[test]
fn every_strategy_returns_identical_rows() -> Result<()> {
    let query = QueryBuilder::scan("student")
        .natural_join("takes", JoinKind::Inner)
        .join_using("course", JoinKind::Inner, ["course_id"])
        .build()?;
    let mut results = Vec::new();
    for strategy in [JoinStrategy::Auto, JoinStrategy::NestedLoop, JoinStrategy::Hash] {
        let config = EngineConfig {
            join_strategy: strategy,
            ..EngineConfig::default()
        };
        results.push(executor(config).execute(&query, None)?);
    }
    assert_eq!(results[0], results[1]);
    assert_eq!(results[1], results[2]);
    Ok(())
}

#[test]
fn where_and_order_by_after_join() -> Result<()> {
    let exec = executor(EngineConfig::default());
    let result = QueryBuilder::scan("student")
        .natural_join("takes", JoinKind::Inner)
        .filter(Predicate::column_eq("course_id", "CS-101"))
        .order_by("grade")
        .order_by_desc("name")
        .select_as("student.name", "student_name")
        .select(["grade"])
        .execute(&exec, None)?;

    assert_eq!(
        text(result.column("student_name")?),
        ["Zhang", "Brown", "Williams", "Levy", "Shankar", "Bourikas", "Levy"]
    );
    assert_eq!(
        text(result.column("grade")?),
        ["A", "A", "A-", "B+", "C", "C-", "F"]
    );
    Ok(())
}

#[test]
fn parenthesized_right_input() -> Result<()> {
    let exec = executor(EngineConfig::default());
    let takes_course = reljoin::query::PlanNode::scan("takes").join(
        reljoin::query::PlanNode::scan("course"),
        JoinSpec::using(JoinKind::Inner, ["course_id"]),
    );
    let result = QueryBuilder::scan("student")
        .join_node(takes_course, JoinSpec::using(JoinKind::Inner, ["ID"]))
        .filter(Predicate::column_eq("title", "Genetics"))
        .select(["student.name", "credits"])
        .execute(&exec, None)?;

    assert_eq!(result.len(), 1);
    assert_eq!(result.rows[0][0], Value::from("Tanaka"));
    assert_eq!(result.rows[0][1], Value::Decimal(4.into()));
    Ok(())
}

#[test]
fn ambiguous_dept_name_after_course_join() {
    let exec = executor(EngineConfig::default());
    let err = QueryBuilder::scan("student")
        .natural_join("takes", JoinKind::Inner)
        .join_using("course", JoinKind::Inner, ["course_id"])
        .select(["dept_name"])
        .execute(&exec, None)
        .unwrap_err();
    assert_eq!(err.code(), "AmbiguousColumn");
}
