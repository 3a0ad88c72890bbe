use std::sync::Arc;

use anyhow::Result;

use newswire_core::feed::FeedClient;
use newswire_core::scheduler::{Ingestor, RunSummary};
use newswire_core::storage::Database;
use newswire_core::AppConfig;

pub async fn run(db: Arc<Database>, config: &AppConfig, json: bool) -> Result<()> {
    let client = FeedClient::new(config)?;
    let ingestor = Ingestor::new(db, Arc::new(client), config)?;

    if !json {
        println!("Refreshing all active sources...\n");
    }

    let summary = ingestor.run_once().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

pub fn print_summary(summary: &RunSummary) {
    if summary.sources_attempted == 0 {
        println!("No active sources. Add one with:");
        println!("  newswire sources add <url> -n <name> --continent <code>");
        return;
    }

    for report in &summary.sources {
        match &report.failure {
            Some(err) => {
                let note = if report.deactivated { " (deactivated)" } else { "" };
                println!("  {} [FAILED{}]: {}", report.source_name, note, err);
            }
            None => println!(
                "  {}: {} new, {} duplicate, {} skipped",
                report.source_name,
                report.created,
                report.duplicates,
                report.malformed + report.stale
            ),
        }
    }

    let elapsed = summary.finished_at - summary.started_at;
    println!(
        "\nRefresh complete in {:.1}s. {} new articles from {} sources ({} failed).",
        elapsed.num_milliseconds() as f64 / 1000.0,
        summary.created,
        summary.sources_attempted,
        summary.sources_failed
    );
}
