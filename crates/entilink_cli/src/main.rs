//! EntiLink CLI
//!
//! Command-line tools for EntiLink local stores.
//!
//! # Commands
//!
//! - `inspect` - Display row counts and journal size
//! - `verify` - Check journal frames, rows and references
//! - `compact` - Rewrite the journal with live rows only
//! - `export` - Write all rows as JSON transfer objects
//! - `import` - Load JSON transfer objects into a store

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// EntiLink command-line store tools.
#[derive(Parser)]
#[command(name = "entilink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Path to the JSON model description
    #[arg(global = true, short, long)]
    model: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display row counts and journal size
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check journal frames, rows and references
    Verify,

    /// Rewrite the journal with live rows only
    Compact {
        /// Dry run - show what would be done
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Write all rows as JSON transfer objects
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load JSON transfer objects into a store
    Import {
        /// Input file with a JSON array of transfer objects
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("EntiLink CLI v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let path = cli.path.ok_or("store path required (--path)")?;
    let model = cli.model.ok_or("model description required (--model)")?;
    let registry = commands::load_registry(&model)?;

    match cli.command {
        Commands::Inspect { format } => commands::inspect::run(&path, registry, &format)?,
        Commands::Verify => commands::verify::run(&path, registry)?,
        Commands::Compact { dry_run } => commands::compact::run(&path, registry, dry_run)?,
        Commands::Export { output } => commands::export::run(&path, registry, output.as_deref())?,
        Commands::Import { input } => commands::import::run(&path, registry, &input)?,
        Commands::Version => {}
    }

    Ok(())
}
