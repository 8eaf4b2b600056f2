#![allow(missing_docs)]

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use common::university;
use reljoin::cli::read_relation;
use reljoin::query::{Executor, JoinKind, QueryBuilder, QueryError, RelationProvider, Result};
use reljoin::EngineConfig;

const NUM_THREADS: usize = 8;
const QUERIES_PER_THREAD: usize = 25;

const SMALL_TAKES: &str = "\
ID,course_id,sec_id,semester,year:integer,grade
70557,PHY-101,1,Fall,2018,B
";

#[test]
fn concurrent_queries_share_one_catalog() -> Result<()> {
    let executor = Arc::new(Executor::new(university(), EngineConfig::default()));
    let barrier = Arc::new(Barrier::new(NUM_THREADS));
    let query = QueryBuilder::scan("student")
        .natural_join("takes", JoinKind::LeftOuter)
        .join_using("course", JoinKind::Inner, ["course_id"])
        .build()?;
    let expected = executor.execute(&query, None)?;
    assert_eq!(expected.len(), 22);

    let mut handles = Vec::new();
    for _ in 0..NUM_THREADS {
        let executor = Arc::clone(&executor);
        let barrier = Arc::clone(&barrier);
        let query = query.clone();
        handles.push(thread::spawn(move || -> Result<Vec<usize>> {
            barrier.wait();
            (0..QUERIES_PER_THREAD)
                .map(|_| executor.execute(&query, None).map(|r| r.len()))
                .collect()
        }));
    }
    for handle in handles {
        let counts = handle.join().expect("query thread panicked")?;
        assert!(counts.iter().all(|&n| n == expected.len()));
    }
    Ok(())
}

#[test]
fn replacement_never_tears_a_running_query() -> Result<()> {
    let catalog = university();
    let executor = Arc::new(Executor::new(catalog.clone(), EngineConfig::default()));
    let original = catalog.relation("takes")?;
    let small = Arc::new(read_relation("takes", SMALL_TAKES.as_bytes()).expect("small takes"));
    let query = QueryBuilder::scan("student")
        .natural_join("takes", JoinKind::Inner)
        .build()?;

    let stop = Arc::new(AtomicBool::new(false));
    let writer = {
        let catalog = catalog.clone();
        let stop = Arc::clone(&stop);
        let small = Arc::clone(&small);
        thread::spawn(move || {
            let mut flip = false;
            while !stop.load(Ordering::Relaxed) {
                let next = if flip { original.clone() } else { small.clone() };
                catalog.register_as("takes", next);
                flip = !flip;
                thread::yield_now();
            }
        })
    };

    let readers: Vec<_> = (0..NUM_THREADS)
        .map(|_| {
            let executor = Arc::clone(&executor);
            let query = query.clone();
            thread::spawn(move || -> Result<()> {
                for _ in 0..QUERIES_PER_THREAD {
                    let result = executor.execute(&query, None)?;
                    assert!(
                        result.len() == 22 || result.len() == 1,
                        "torn read: {} rows",
                        result.len()
                    );
                }
                Ok(())
            })
        })
        .collect();
    for reader in readers {
        reader.join().expect("reader thread panicked")?;
    }
    stop.store(true, Ordering::Relaxed);
    writer.join().expect("writer thread panicked");
    Ok(())
}

#[test]
fn stream_keeps_its_snapshot_after_replacement() -> Result<()> {
    let catalog = university();
    let executor = Executor::new(catalog.clone(), EngineConfig::default());
    let query = QueryBuilder::scan("student")
        .natural_join("takes", JoinKind::Inner)
        .build()?;
    let mut stream = executor.stream(&query, None)?;
    let first = stream.next().transpose()?;
    assert!(first.is_some());

    let small = read_relation("takes", SMALL_TAKES.as_bytes()).expect("small takes");
    assert!(catalog.register(small)?.is_some());
    let rest = stream.collect::<Result<Vec<_>>>()?;
    assert_eq!(rest.len(), 21);
    assert_eq!(executor.execute(&query, None)?.len(), 1);
    Ok(())
}

#[test]
fn raised_flag_cancels_before_and_during_a_query() -> Result<()> {
    let executor = Executor::new(university(), EngineConfig::default());
    let query = QueryBuilder::scan("student")
        .natural_join("takes", JoinKind::Inner)
        .cross_join("course")
        .build()?;

    let flag = Arc::new(AtomicBool::new(true));
    let err = executor.execute(&query, Some(Arc::clone(&flag))).unwrap_err();
    assert_eq!(err, QueryError::Cancelled);

    flag.store(false, Ordering::SeqCst);
    let mut stream = executor.stream(&query, Some(Arc::clone(&flag)))?;
    assert!(stream.next().transpose()?.is_some());
    flag.store(true, Ordering::SeqCst);
    assert_eq!(stream.next(), Some(Err(QueryError::Cancelled)));
    assert_eq!(stream.next(), None);
    Ok(())
}
