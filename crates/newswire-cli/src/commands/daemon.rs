use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use tokio::sync::{mpsc, watch};
use tracing::info;

use newswire_core::feed::FeedClient;
use newswire_core::scheduler::{Ingestor, SchedulerEvent, SchedulerService};
use newswire_core::storage::Database;
use newswire_core::AppConfig;

/// Run the scheduler in the foreground until Ctrl+C
pub async fn run(db: Arc<Database>, config: Arc<AppConfig>) -> Result<()> {
    let client = FeedClient::new(&config)?;
    let ingestor = Arc::new(Ingestor::new(db, Arc::new(client), &config)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                SchedulerEvent::RunCompleted(summary) => println!(
                    "[{}] {} new, {} duplicate, {}/{} sources failed",
                    summary.finished_at.with_timezone(&Local).format("%H:%M:%S"),
                    summary.created,
                    summary.duplicates,
                    summary.sources_failed,
                    summary.sources_attempted
                ),
                SchedulerEvent::RunSkipped => {
                    println!("[{}] previous run still busy, tick skipped", Local::now().format("%H:%M:%S"))
                }
                SchedulerEvent::Error { message } => eprintln!("Run failed: {}", message),
            }
        }
    });

    let interval = Duration::from_secs(config.sync.poll_interval_secs);
    println!(
        "newswire daemon started (PID: {}). Press Ctrl+C to stop.",
        std::process::id()
    );
    println!("  Poll interval: {} seconds", config.sync.poll_interval_secs);
    println!("  Concurrent sources: {}", config.sync.max_concurrent_sources);

    SchedulerService::new(ingestor, interval)
        .with_event_sender(event_tx)
        .run(shutdown_rx)
        .await;

    println!("Daemon stopped.");
    Ok(())
}
