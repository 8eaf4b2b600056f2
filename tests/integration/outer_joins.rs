#![allow(missing_docs)]

mod common;

use common::{executor, text};
use reljoin::config::{EngineConfig, JoinStrategy};
use reljoin::query::{JoinKind, JoinSpec, Predicate, QueryBuilder, Result, Value};
use rust_decimal::Decimal;

#[test]
fn left_outer_keeps_student_without_enrollment() -> Result<()> {
    let exec = executor(EngineConfig::default());
    let result = QueryBuilder::scan("student")
        .natural_join("takes", JoinKind::LeftOuter)
        .execute(&exec, None)?;

    assert_eq!(result.len(), 23);
    let snow = &result.rows[15];
    assert_eq!(snow[0], Value::from("70557"));
    assert_eq!(snow[1], Value::from("Snow"));
    assert_eq!(snow[3], Value::Decimal(Decimal::ZERO));
    assert!(snow[4..].iter().all(|v| *v == Value::Null));
    assert_eq!(result.rows[14][1], Value::from("Sanchez"));
    assert_eq!(result.rows[16][1], Value::from("Brown"));
    Ok(())
}

#[test]
fn is_null_finds_unmatched_students() -> Result<()> {
    let exec = executor(EngineConfig::default());
    let result = QueryBuilder::scan("student")
        .natural_join("takes", JoinKind::LeftOuter)
        .filter(Predicate::is_null("course_id"))
        .select(["student.ID"])
        .execute(&exec, None)?;
    assert_eq!(text(result.column("ID")?), ["70557"]);
    Ok(())
}

#[test]
fn right_outer_under_alias_pads_takes_columns() -> Result<()> {
    let exec = executor(EngineConfig::default());
    let result = QueryBuilder::scan("takes")
        .join_as("student", "right_join", JoinSpec::natural(JoinKind::RightOuter))
        .filter(Predicate::column_eq("right_join.name", "Snow"))
        .execute(&exec, None)?;

    let names: Vec<&str> = result.schema.names().collect();
    assert_eq!(
        names,
        [
            "ID", "course_id", "sec_id", "semester", "year", "grade", "name", "dept_name",
            "tot_cred"
        ]
    );
    assert_eq!(result.len(), 1);
    let row = &result.rows[0];
    assert_eq!(row[0], Value::from("70557"));
    assert!(row[1..6].iter().all(|v| *v == Value::Null));
    assert_eq!(row[6], Value::from("Snow"));
    assert_eq!(row[7], Value::from("Physics"));
    assert_eq!(row[8], Value::Decimal(Decimal::ZERO));
    Ok(())
}

#[test]
fn right_outer_mirrors_left_outer() -> Result<()> {
    let exec = executor(EngineConfig::default());
    let right = QueryBuilder::scan("takes")
        .natural_join("student", JoinKind::RightOuter)
        .select(["ID", "name", "course_id"])
        .execute(&exec, None)?;
    let left = QueryBuilder::scan("student")
        .natural_join("takes", JoinKind::LeftOuter)
        .select(["ID", "name", "course_id"])
        .execute(&exec, None)?;
    assert_eq!(right.rows, left.rows);
    Ok(())
}

#[test]
fn full_outer_emits_unmatched_right_rows_last() -> Result<()> {
    let exec = executor(EngineConfig::default());
    let result = QueryBuilder::scan("takes")
        .join_using("course", JoinKind::FullOuter, ["course_id"])
        .execute(&exec, None)?;

    assert_eq!(result.len(), 23);
    let course_ids = text(result.column("course_id")?);
    let ids = text(result.column("ID")?);
    assert_eq!(course_ids[22], "BIO-399");
    assert_eq!(ids[22], "NULL");
    assert!(ids[..22].iter().all(|id| id != "NULL"));
    Ok(())
}

#[test]
fn full_outer_emits_unmatched_left_rows_in_place() -> Result<()> {
    let exec = executor(EngineConfig::default());
    let result = QueryBuilder::scan("course")
        .join_using("takes", JoinKind::FullOuter, ["course_id"])
        .select(["course_id", "ID"])
        .execute(&exec, None)?;

    assert_eq!(result.len(), 23);
    assert_eq!(result.rows[2], vec![Value::from("BIO-399"), Value::Null]);
    Ok(())
}

#[test]
fn on_condition_differs_from_where_under_outer_join() -> Result<()> {
    let exec = executor(EngineConfig::default());
    let on = Predicate::columns_eq("student.ID", "takes.ID")
        .and(Predicate::column_eq("takes.year", 2018));
    let in_on = QueryBuilder::scan("student")
        .join_on("takes", JoinKind::LeftOuter, on)
        .execute(&exec, None)?;
    let in_where = QueryBuilder::scan("student")
        .join_on(
            "takes",
            JoinKind::LeftOuter,
            Predicate::columns_eq("student.ID", "takes.ID"),
        )
        .filter(Predicate::column_eq("takes.year", 2018))
        .execute(&exec, None)?;

    assert_eq!(in_on.len(), 14);
    assert_eq!(in_where.len(), 9);
    let padded = in_on
        .column("takes.ID")?
        .into_iter()
        .filter(|v| **v == Value::Null)
        .count();
    assert_eq!(padded, 5);
    Ok(())
}

#[test]
fn outer_joins_agree_across_strategies() -> Result<()> {
    for kind in [JoinKind::LeftOuter, JoinKind::RightOuter, JoinKind::FullOuter] {
        let query = QueryBuilder::scan("course")
            .join_using("takes", kind, ["course_id"])
            .build()?;
        let nested = executor(EngineConfig::reference()).execute(&query, None)?;
        let hashed = executor(EngineConfig {
            join_strategy: JoinStrategy::Hash,
            ..EngineConfig::default()
        })
        .execute(&query, None)?;
        assert_eq!(nested, hashed, "{kind}");
    }
    Ok(())
}
