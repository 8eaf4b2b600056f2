#![allow(missing_docs)]

mod common;

use common::executor;
use reljoin::query::profile::profile_snapshot;
use reljoin::query::{JoinKind, Predicate, QueryBuilder, Result};
use reljoin::EngineConfig;

// The switch is read once per process, so this binary holds a single test.
#[test]
fn join_operators_record_profile_counters() -> Result<()> {
    std::env::set_var("RELJOIN_PROFILE", "1");
    let exec = executor(EngineConfig::default());
    profile_snapshot(true).expect("profiling enabled");

    let result = QueryBuilder::scan("student")
        .natural_join("takes", JoinKind::Inner)
        .filter(Predicate::column_eq("dept_name", "Comp. Sci."))
        .order_by("name")
        .execute(&exec, None)?;
    assert_eq!(result.len(), 10);

    let snapshot = profile_snapshot(false).expect("profiling enabled");
    assert_eq!(snapshot.join_probe_count, 13);
    assert_eq!(snapshot.hash_build_count, 1);
    assert!(snapshot.scan_count > 0);
    assert!(snapshot.filter_count > 0);
    assert_eq!(snapshot.sort_count, 1);
    assert_eq!(snapshot.project_count, 10);
    assert_eq!(snapshot.stream_iter_count, 1);

    let drained = profile_snapshot(true).expect("profiling enabled");
    assert_eq!(drained.join_probe_count, 13);
    let after_reset = profile_snapshot(false).expect("profiling enabled");
    assert_eq!(after_reset, Default::default());
    Ok(())
}
