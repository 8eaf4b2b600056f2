#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use reljoin::cli::load_relation;
use reljoin::query::{Catalog, Executor, Value};
use reljoin::EngineConfig;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

pub fn demo_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/university")
}

/// Catalog holding `student`, `takes`, and `course` from the demo data.
pub fn university() -> Arc<Catalog> {
    init_tracing();
    let catalog = Catalog::new();
    for name in ["student", "takes", "course"] {
        let path = demo_dir().join(format!("{name}.csv"));
        let relation = load_relation(name, &path).expect("load demo relation");
        catalog.register(relation).expect("register demo relation");
    }
    Arc::new(catalog)
}

pub fn executor(config: EngineConfig) -> Executor {
    Executor::new(university(), config)
}

pub fn text(values: Vec<&Value>) -> Vec<String> {
    values.into_iter().map(ToString::to_string).collect()
}
