//! # Phone Advisor CLI (`advisor`)
//!
//! ## Usage
//!
//! ```bash
//! advisor --config ./config/advisor.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `advisor init` | Create the SQLite database and run schema migrations |
//! | `advisor import <file>` | Upsert phones from a JSON array |
//! | `advisor phones` | List the catalog, paginated |
//! | `advisor show <name>` | Print one phone (exact or fuzzy name) |
//! | `advisor ask "<question>"` | Answer a question |
//! | `advisor serve` | Start the HTTP server |
//!
//! Logs go to stderr; set `ADVISOR_LOG` (e.g. `ADVISOR_LOG=debug`) to
//! change the filter.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use phone_advisor::{ask, config, import, migrate, phones, server};

/// Phone Advisor: answers natural-language questions about a phone catalog.
#[derive(Parser)]
#[command(
    name = "advisor",
    about = "Answers natural-language questions about a phone catalog",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/advisor.toml`.
    #[arg(long, global = true, default_value = "./config/advisor.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Import phones from a JSON file (an array of phone records).
    ///
    /// Records are upserted by `model_name`.
    Import {
        /// Path to the JSON file.
        file: PathBuf,
    },

    /// List phones in the catalog.
    Phones {
        /// Page size (1-100).
        #[arg(long, default_value_t = 20)]
        limit: u32,

        /// Number of phones to skip.
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Show one phone by name. Misspellings are resolved fuzzily.
    Show {
        /// Model name.
        name: String,
    },

    /// Answer a question about the catalog.
    Ask {
        /// The question, e.g. "best battery phone under $800".
        question: String,

        /// Print the full response envelope as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP server.
    Serve,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ADVISOR_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import { file } => {
            import::run_import(&cfg, &file).await?;
        }
        Commands::Phones { limit, offset } => {
            phones::run_phones(&cfg, limit, offset).await?;
        }
        Commands::Show { name } => {
            phones::run_show(&cfg, &name).await?;
        }
        Commands::Ask { question, json } => {
            ask::run_ask(&cfg, &question, json).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
