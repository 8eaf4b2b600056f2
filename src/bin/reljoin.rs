//! Binary entry point for the reljoin CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use reljoin::{
    cli::{load_plan, load_relation, parse_table_arg, render_json, render_schema, render_text, CliError},
    config::{EngineConfig, JoinStrategy},
    query::{Catalog, Executor, RelationProvider},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "reljoin",
    version,
    about = "Evaluate relational join plans over CSV relations",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for results"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "RELJOIN_CONFIG",
        help = "Engine config file (defaults to the user config directory)"
    )]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct TableArgs {
    #[arg(
        long = "table",
        value_name = "NAME=FILE",
        required = true,
        help = "Register a CSV file as a relation (repeatable)"
    )]
    tables: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Run a JSON or TOML query plan")]
    Query {
        #[command(flatten)]
        tables: TableArgs,

        #[arg(long, value_name = "FILE", help = "Plan file (.json or .toml)")]
        plan: PathBuf,

        #[arg(long, value_enum, help = "Override the configured join strategy")]
        strategy: Option<StrategyArg>,
    },

    #[command(about = "Print the schema of each relation")]
    Describe {
        #[command(flatten)]
        tables: TableArgs,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum StrategyArg {
    Auto,
    #[value(name = "nested-loop")]
    NestedLoop,
    Hash,
}

impl From<StrategyArg> for JoinStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Auto => JoinStrategy::Auto,
            StrategyArg::NestedLoop => JoinStrategy::NestedLoop,
            StrategyArg::Hash => JoinStrategy::Hash,
        }
    }
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Query {
            tables,
            plan,
            strategy,
        } => {
            let mut config = EngineConfig::load(cli.config)?;
            if let Some(strategy) = strategy {
                config.join_strategy = strategy.into();
            }
            let catalog = load_catalog(&tables)?;
            let query = load_plan(&plan)?;
            let executor = Executor::new(catalog, config);
            let result = executor.execute(&query, None).map_err(CliError::from)?;
            match cli.format {
                OutputFormat::Text => print!("{}", render_text(&result.schema, &result.rows)),
                OutputFormat::Json => {
                    let json = render_json(&result.schema, &result.rows);
                    println!("{}", serde_json::to_string_pretty(&json)?);
                }
            }
        }
        Command::Describe { tables } => {
            let catalog = load_catalog(&tables)?;
            for name in catalog.names() {
                let relation = catalog.relation(&name).map_err(CliError::from)?;
                match cli.format {
                    OutputFormat::Text => {
                        print!("{}", render_schema(&name, relation.schema(), relation.len()))
                    }
                    OutputFormat::Json => {
                        let json = serde_json::json!({
                            "relation": name,
                            "rows": relation.len(),
                            "columns": relation.schema().columns(),
                        });
                        println!("{}", serde_json::to_string_pretty(&json)?);
                    }
                }
            }
        }
    }

    Ok(())
}

fn load_catalog(args: &TableArgs) -> Result<Arc<Catalog>, CliError> {
    let catalog = Catalog::new();
    for arg in &args.tables {
        let (name, path) = parse_table_arg(arg)?;
        catalog.register(load_relation(&name, &path)?)?;
    }
    Ok(Arc::new(catalog))
}
