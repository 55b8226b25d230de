//! pgview CLI: property-graph query and view engine.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use pgview::engine::{Engine, EngineConfig, ExecOutcome};

#[derive(Parser)]
#[command(name = "pgview", version, about = "Property-graph query and view engine")]
struct Cli {
    /// Data directory for persistent storage.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Maximum rows a single query may produce.
    #[arg(long, global = true)]
    max_rows: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a single console command.
    Exec {
        /// Command text, e.g. `insert N(1, "Person")`.
        command: String,
    },

    /// Run a `;`-separated script from a file.
    Run {
        /// Path to the script file.
        file: PathBuf,
    },

    /// Run a match query and print its rows and summary.
    Query {
        /// Query text, e.g. `match (a:Person) from g return (a)`.
        query: String,

        /// Print the result as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Show engine info and statistics.
    Info,

    /// Export a graph instance's state as JSON.
    Export {
        /// Graph name (defaults to the current instance).
        #[arg(long)]
        graph: Option<String>,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if cli.data_dir.is_some() {
        config.data_dir = cli.data_dir.clone();
    }
    if cli.max_rows.is_some() {
        config.max_rows = cli.max_rows;
    }

    match cli.command {
        Commands::Exec { command } => {
            let engine = Engine::new(config)?;
            let outcome = engine.execute(&command)?;
            println!("{}", outcome.render());
        }

        Commands::Run { file } => {
            let engine = Engine::new(config)?;
            let script = std::fs::read_to_string(&file).into_diagnostic()?;
            for outcome in engine.execute_script(&script)? {
                println!("{}", outcome.render());
            }
        }

        Commands::Query { query, json } => {
            let engine = Engine::new(config)?;
            let result = engine.query(&query)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&result).into_diagnostic()?
                );
            } else {
                println!("{}", ExecOutcome::Rows(result).render());
            }
        }

        Commands::Info => {
            let engine = Engine::new(config)?;
            println!("{}", engine.info());
        }

        Commands::Export { graph } => {
            let engine = Engine::new(config)?;
            let export = engine.export_graph(graph.as_deref())?;
            println!(
                "{}",
                serde_json::to_string_pretty(&export).into_diagnostic()?
            );
        }
    }

    Ok(())
}
