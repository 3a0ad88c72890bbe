use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::ingestor::{Ingestor, RunSummary};

/// Events emitted by the scheduler after each tick
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A run finished
    RunCompleted(RunSummary),
    /// The tick fired while a previous run still held the lock
    RunSkipped,
    /// A run could not start (the store was unreachable)
    Error { message: String },
}

/// Drives [`Ingestor`] on a fixed interval until shutdown
pub struct SchedulerService {
    ingestor: Arc<Ingestor>,
    interval: Duration,
    event_tx: Option<mpsc::UnboundedSender<SchedulerEvent>>,
}

impl SchedulerService {
    pub fn new(ingestor: Arc<Ingestor>, interval: Duration) -> Self {
        Self {
            ingestor,
            interval,
            event_tx: None,
        }
    }

    /// Set a channel that receives one event per tick
    pub fn with_event_sender(mut self, tx: mpsc::UnboundedSender<SchedulerEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn send_event(&self, event: SchedulerEvent) {
        if let Some(ref tx) = self.event_tx {
            if tx.send(event).is_err() {
                warn!("Failed to send scheduler event: receiver dropped");
            }
        }
    }

    /// Run until `shutdown` flips to true. The first run starts immediately.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        if self.interval.is_zero() {
            info!("Scheduler disabled (poll_interval_secs = 0)");
            let _ = shutdown.changed().await;
            return;
        }

        info!("Scheduler started: interval={}s", self.interval.as_secs());

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        info!("Scheduler received shutdown signal");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    debug!("Scheduled ingestion tick");
                    self.tick().await;
                }
            }
        }

        info!("Scheduler stopped");
    }

    async fn tick(&self) {
        match self.ingestor.try_run().await {
            None => {
                warn!("Previous ingestion run still in progress, skipping tick");
                self.send_event(SchedulerEvent::RunSkipped);
            }
            Some(Ok(summary)) => {
                if summary.created > 0 {
                    info!("Scheduled run: {} new articles", summary.created);
                }
                self.send_event(SchedulerEvent::RunCompleted(summary));
            }
            Some(Err(e)) => {
                error!("Scheduled run failed: {}", e);
                self.send_event(SchedulerEvent::Error {
                    message: e.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::feed::{FeedSource, FetchOutcome, RawEntries};
    use crate::storage::Database;
    use async_trait::async_trait;
    use tokio::time::timeout;

    struct EmptyFeeds;

    #[async_trait]
    impl FeedSource for EmptyFeeds {
        async fn fetch(&self, _url: &str) -> FetchOutcome {
            FetchOutcome::success(RawEntries::empty())
        }
    }

    async fn ingestor() -> Arc<Ingestor> {
        let db = Arc::new(Database::connect_in_memory().await.unwrap());
        Arc::new(Ingestor::new(db, Arc::new(EmptyFeeds), &AppConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn test_first_tick_runs_and_shutdown_stops() {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let service = SchedulerService::new(ingestor().await, Duration::from_secs(3600))
            .with_event_sender(event_tx);
        let handle = tokio::spawn(service.run(shutdown_rx));

        let event = timeout(Duration::from_secs(5), event_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, SchedulerEvent::RunCompleted(ref s) if s.sources_attempted == 0));

        shutdown_tx.send(true).unwrap();
        assert!(timeout(Duration::from_secs(5), handle).await.is_ok());
    }

    #[tokio::test]
    async fn test_disabled_scheduler_waits_for_shutdown() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let service = SchedulerService::new(ingestor().await, Duration::ZERO);
        let handle = tokio::spawn(service.run(shutdown_rx));

        shutdown_tx.send(true).unwrap();
        assert!(timeout(Duration::from_secs(5), handle).await.is_ok());
    }
}
