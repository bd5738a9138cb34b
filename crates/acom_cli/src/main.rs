//! acom CLI
//!
//! Command-line tools for inspecting acom entity stores.
//!
//! # Commands
//!
//! - `types` - Count stored entities per type
//! - `dump` - Print every entity of one type
//! - `check` - Report entities no lookup can reach
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// acom entity store tools.
#[derive(Parser)]
#[command(name = "acom")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Open the isolated test store next to the main file instead
    #[arg(global = true, long)]
    test: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count stored entities per type
    Types {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print every entity of one type, including protected fields
    Dump {
        /// Entity type, e.g. host
        entity_type: String,

        /// Primary field of the type
        #[arg(long, default_value = "name")]
        primary: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Report entities missing their primary field or sharing a primary value
    Check {
        /// Entity type, e.g. host
        entity_type: String,

        /// Primary field of the type
        #[arg(long, default_value = "name")]
        primary: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Types { format } => {
            let path = cli.path.ok_or("Store path required for types")?;
            let connections = commands::open(&path, cli.test)?;
            commands::types::run(&connections, &format)?;
        }
        Commands::Dump {
            entity_type,
            primary,
            format,
        } => {
            let path = cli.path.ok_or("Store path required for dump")?;
            let connections = commands::open(&path, cli.test)?;
            commands::dump::run(connections, &entity_type, &primary, &format)?;
        }
        Commands::Check {
            entity_type,
            primary,
        } => {
            let path = cli.path.ok_or("Store path required for check")?;
            let connections = commands::open(&path, cli.test)?;
            let report = commands::check::run(connections, &entity_type, &primary)?;
            if !report.is_clean() {
                return Err(format!("{} problem(s) found", report.problem_count()).into());
            }
        }
        Commands::Version => {
            println!("acom CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("acom store v{}", acom_store::VERSION);
        }
    }

    Ok(())
}
