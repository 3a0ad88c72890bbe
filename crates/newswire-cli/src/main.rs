use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newswire_core::article::Category;
use newswire_core::feed::Continent;
use newswire_core::storage::{Database, SourceRepository};
use newswire_core::AppConfig;

mod commands;

#[derive(Parser)]
#[command(name = "newswire")]
#[command(author, version, about = "Continent-aware news ingestion with credibility scoring")]
struct Cli {
    /// Config file (defaults to ~/.config/newswire/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one ingestion pass over all active sources
    Refresh {
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ingest on the configured interval until Ctrl+C
    Daemon,
    /// Manage feed sources
    Sources {
        #[command(subcommand)]
        action: SourceAction,
    },
    /// List stored articles, newest first
    Articles {
        /// Continent code (AF, AS, EU, NA, SA, OC, GL)
        #[arg(long)]
        continent: Option<Continent>,
        #[arg(long)]
        category: Option<Category>,
        /// Only articles scoring at least this much
        #[arg(long)]
        min_credibility: Option<f64>,
        #[arg(long)]
        tag: Option<String>,
        /// Only featured articles
        #[arg(long)]
        featured: bool,
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: u32,
        #[arg(long)]
        json: bool,
    },
    /// Search titles and descriptions
    Search {
        query: String,
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: u32,
    },
    /// Show one article by URL and count the view
    Show { url: String },
    /// Mark an article as featured (or clear the flag)
    Feature {
        url: String,
        #[arg(long)]
        unset: bool,
    },
}

#[derive(Subcommand)]
enum SourceAction {
    /// List all sources with fetch statistics
    List,
    /// Register a new source
    Add {
        url: String,
        #[arg(short = 'n', long)]
        name: String,
        #[arg(long, default_value = "GL")]
        continent: Continent,
        /// File every article from this feed under one category
        #[arg(long)]
        category: Option<Category>,
    },
    /// Resume fetching a source
    Enable { url: String },
    /// Stop fetching a source
    Disable { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = Arc::new(config);
    let db = Arc::new(Database::new(&config).await?);

    let seeded = SourceRepository::new(&db)
        .sync_from_config(&config.sources)
        .await?;
    if seeded > 0 {
        tracing::info!("Registered {} sources from configuration", seeded);
    }

    match cli.command {
        Commands::Refresh { json } => commands::refresh::run(db, &config, json).await,
        Commands::Daemon => commands::daemon::run(db, config).await,
        Commands::Sources { action } => match action {
            SourceAction::List => commands::sources::list(&db).await,
            SourceAction::Add {
                url,
                name,
                continent,
                category,
            } => commands::sources::add(&db, &url, &name, continent, category).await,
            SourceAction::Enable { url } => commands::sources::set_active(&db, &url, true).await,
            SourceAction::Disable { url } => commands::sources::set_active(&db, &url, false).await,
        },
        Commands::Articles {
            continent,
            category,
            min_credibility,
            tag,
            featured,
            limit,
            json,
        } => {
            let filter = newswire_core::storage::ArticleFilter {
                continent,
                category,
                min_credibility,
                tag,
                featured_only: featured,
                limit: Some(limit),
            };
            commands::articles::list(&db, &filter, json).await
        }
        Commands::Search { query, limit } => commands::articles::search(&db, &query, limit).await,
        Commands::Show { url } => commands::articles::show(&db, &url).await,
        Commands::Feature { url, unset } => commands::articles::feature(&db, &url, !unset).await,
    }
}
