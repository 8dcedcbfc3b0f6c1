//! formsync CLI
//!
//! Command-line tools for inspecting formsync action streams and sessions.
//!
//! # Commands
//!
//! - `reduce` - Apply a JSON action list to an empty snapshot
//! - `simulate` - Run a session against the in-memory reference authority

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// formsync command-line tools.
#[derive(Parser)]
#[command(name = "formsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a JSON array of actions to an empty snapshot
    Reduce {
        /// File holding the action list
        file: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Open a session on a form definition and sync some answers
    Simulate {
        /// Form definition (items, value sets, locale)
        form: PathBuf,

        /// Answer to give, as ID=VALUE; VALUE is JSON or a bare string
        #[arg(short, long = "answer", value_name = "ID=VALUE")]
        answers: Vec<String>,

        /// Mark the session complete after answering
        #[arg(short, long)]
        complete: bool,

        /// Debounce window in milliseconds
        #[arg(short, long, default_value = "100")]
        debounce_ms: u64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
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
        Commands::Reduce { file, format } => {
            commands::reduce::run(&file, &format)?;
        }
        Commands::Simulate {
            form,
            answers,
            complete,
            debounce_ms,
            format,
        } => {
            commands::simulate::run(&form, &answers, complete, debounce_ms, &format)?;
        }
        Commands::Version => {
            println!("formsync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
