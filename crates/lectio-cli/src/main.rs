//! Lectio CLI: entry point.
//!
//! # Commands
//!
//! - `lectio init`: write a default config with an entry per built-in provider
//! - `lectio status`: show configuration and provider availability
//! - `lectio fetch <REF> [-t TRANSLATION]`: verse text
//! - `lectio takeaway <REF>`: key takeaway of a passage
//! - `lectio score <REF> --comment <TEXT>`: score a reflection
//! - `lectio validate <REF> --takeaway <TEXT>`: check a takeaway
//! - `lectio search <DESCRIPTION>`: find passages by description

mod helpers;
mod init;
mod query;
mod status;

use anyhow::Result;
use clap::{Parser, Subcommand};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// 📖 Lectio: scripture text and study helpers from interchangeable providers
#[derive(Parser, Debug)]
#[command(name = "lectio", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.lectio/config.json)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, default_value_t = false)]
    logs: bool,

    /// Print results as JSON
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Show configuration and provider status
    Status,

    /// Fetch verse text, e.g. `lectio fetch "John 3:16-18"`
    Fetch {
        reference: String,

        /// Translation code (defaults to the configured one)
        #[arg(short, long)]
        translation: Option<String>,
    },

    /// Key takeaway of a passage
    Takeaway { reference: String },

    /// Score a reflection on a passage
    Score {
        reference: String,

        /// Your reflection on the passage
        #[arg(long)]
        comment: String,
    },

    /// Check whether a takeaway fits a passage
    Validate {
        reference: String,

        #[arg(short, long)]
        takeaway: String,
    },

    /// Find passages matching a description
    Search { description: String },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.logs);

    let config_path = cli.config.as_deref().map(helpers::expand_tilde);
    let config_path = config_path.as_deref();

    match cli.command {
        Commands::Init { force } => init::run(config_path, force),
        Commands::Status => status::run(config_path),
        Commands::Fetch {
            reference,
            translation,
        } => query::fetch(config_path, &reference, translation.as_deref(), cli.json).await,
        Commands::Takeaway { reference } => query::takeaway(config_path, &reference, cli.json).await,
        Commands::Score { reference, comment } => {
            query::score(config_path, &reference, &comment, cli.json).await
        }
        Commands::Validate {
            reference,
            takeaway,
        } => query::validate(config_path, &reference, &takeaway, cli.json).await,
        Commands::Search { description } => query::search(config_path, &description, cli.json).await,
    }
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("lectio=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
