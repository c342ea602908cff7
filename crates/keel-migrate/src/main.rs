//! keel-migrate CLI
//!
//! Prints blueprints of a live database.

use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use keel_dao::SqliteDriver;
use keel_migrate::prelude::*;

/// Inspect database structure as keel blueprints.
#[derive(Parser)]
#[command(name = "keel-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current blueprint of one or more tables as JSON.
    Inspect {
        /// Table names.
        #[arg(required = true)]
        tables: Vec<String>,
    },

    /// Print the current blueprint of a stored procedure as JSON.
    Procedure {
        /// Procedure name.
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let driver = SqliteDriver::connect(&cli.database).await?;
    info!(database = %cli.database, "connected");
    let state = CurrentState::new(&driver);

    match cli.command {
        Commands::Inspect { tables } => {
            if let [table] = tables.as_slice() {
                let blueprint = state.table(table).await?;
                println!("{}", serde_json::to_string_pretty(&blueprint)?);
            } else {
                let schema = state.schema(&tables).await?;
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
        }

        Commands::Procedure { name } => {
            let blueprint = state.procedure(&name).await?;
            println!("{}", serde_json::to_string_pretty(&blueprint)?);
        }
    }

    Ok(())
}
