#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

mod command;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use command::{
    CommandStrategy, InfoStrategy, InitStrategy, SearchInput, SearchStrategy, SessionInput,
    SessionStrategy, VersionStrategy,
};

#[derive(Parser)]
#[command(name = "calclub")]
#[command(about = "Find local events across ticketing and discovery sources", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one search and print the results
    Search {
        /// When: today, tonight, this weekend, friday, 2026-01-15, ...
        #[arg(short, long)]
        when: Option<String>,

        /// Event category (repeatable)
        #[arg(short, long = "category")]
        categories: Vec<String>,

        /// Keyword to look for (repeatable)
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,

        /// Location, defaults to search.default_location
        #[arg(short, long)]
        location: Option<String>,

        /// Only free events
        #[arg(short, long)]
        free: bool,

        /// Maximum distance in miles
        #[arg(short = 'd', long)]
        max_distance: Option<f64>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Refine a search over several turns
    Session {
        /// Session id to use (a new one is generated if omitted)
        #[arg(short, long)]
        id: Option<String>,
    },
    /// Initialize configuration
    Init,
    /// Show configuration
    Info,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            when,
            categories,
            keywords,
            location,
            free,
            max_distance,
            json,
        } => {
            SearchStrategy
                .execute(SearchInput {
                    when,
                    categories,
                    keywords,
                    location,
                    free_only: free,
                    max_distance,
                    json,
                })
                .await
        }
        Commands::Session { id } => SessionStrategy.execute(SessionInput { session_id: id }).await,
        Commands::Init => InitStrategy.execute(()).await,
        Commands::Info => InfoStrategy.execute(()).await,
        Commands::Version => VersionStrategy.execute(()).await,
    }
}
