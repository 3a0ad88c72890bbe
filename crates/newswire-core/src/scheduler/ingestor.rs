use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::enrich::Enricher;
use crate::feed::{FeedSource, Source};
use crate::pipeline::{NormalizeError, Normalizer};
use crate::storage::{ArticleRepository, Database, SourceRepository};
use crate::Result;

/// What happened to one source during a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceReport {
    pub source_id: Uuid,
    pub source_name: String,
    pub url: String,
    pub entries_seen: u32,
    pub created: u32,
    pub duplicates: u32,
    pub malformed: u32,
    pub stale: u32,
    /// Fetch or persistence failure that ended this source's run early
    pub failure: Option<String>,
    /// The failure pushed the source over the consecutive-failure limit
    pub deactivated: bool,
}

impl SourceReport {
    fn for_source(source: &Source) -> Self {
        Self {
            source_id: source.id,
            source_name: source.name.clone(),
            url: source.url.clone(),
            ..Default::default()
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// Totals for one pass over the active sources
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources_attempted: u32,
    pub sources_failed: u32,
    pub entries_seen: u32,
    pub created: u32,
    pub duplicates: u32,
    pub malformed: u32,
    pub stale: u32,
    /// Per-source detail, in the order sources were listed
    pub sources: Vec<SourceReport>,
}

impl RunSummary {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            sources_attempted: 0,
            sources_failed: 0,
            entries_seen: 0,
            created: 0,
            duplicates: 0,
            malformed: 0,
            stale: 0,
            sources: Vec::new(),
        }
    }

    fn add(&mut self, report: SourceReport) {
        self.entries_seen += report.entries_seen;
        self.created += report.created;
        self.duplicates += report.duplicates;
        self.malformed += report.malformed;
        self.stale += report.stale;
        if report.is_failure() {
            self.sources_failed += 1;
        }
        self.sources.push(report);
    }

    pub fn failures(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|r| r.is_failure())
    }
}

/// Everything a per-source task needs, shared across the pool
struct Pipeline {
    db: Arc<Database>,
    feeds: Arc<dyn FeedSource>,
    normalizer: Normalizer,
    enricher: Enricher,
    max_consecutive_failures: u32,
}

impl Pipeline {
    /// Fetch, normalize, enrich and store one source's entries in feed order
    async fn ingest_source(&self, source: Source) -> SourceReport {
        let mut report = SourceReport::for_source(&source);
        let sources = SourceRepository::new(&self.db);
        let articles = ArticleRepository::new(&self.db);

        let outcome = self.feeds.fetch(&source.url).await;
        if let Some(failure) = outcome.failure {
            self.fail(&source, &mut report, failure.to_string()).await;
            return report;
        }

        let now = Utc::now();
        for entry in outcome.entries {
            report.entries_seen += 1;

            let draft = match self.normalizer.normalize(entry, &source, now) {
                Ok(draft) => draft,
                Err(NormalizeError::MalformedEntry(reason)) => {
                    debug!(source = %source.name, reason, "Skipping malformed entry");
                    report.malformed += 1;
                    continue;
                }
                Err(NormalizeError::StaleEntry { published_at }) => {
                    debug!(source = %source.name, %published_at, "Skipping stale entry");
                    report.stale += 1;
                    continue;
                }
            };

            let enriched = self.enricher.enrich(draft);
            match articles.insert_if_new(&enriched).await {
                Ok(true) => {
                    debug!(
                        url = %enriched.draft.url,
                        score = enriched.enrichment.credibility_score,
                        "Stored article"
                    );
                    report.created += 1;
                }
                Ok(false) => report.duplicates += 1,
                Err(e) => {
                    error!(source = %source.name, url = %enriched.draft.url, "Failed to store article: {}", e);
                    self.fail(&source, &mut report, format!("persistence error: {}", e))
                        .await;
                    return report;
                }
            }
        }

        if let Err(e) = sources.record_success(source.id, now).await {
            warn!(source = %source.name, "Failed to update fetch statistics: {}", e);
        }

        info!(
            source = %source.name,
            created = report.created,
            duplicates = report.duplicates,
            skipped = report.malformed + report.stale,
            "Source ingested"
        );
        report
    }

    /// Report for a source whose task panicked before it could report
    async fn abandoned(&self, source: &Source, reason: String) -> SourceReport {
        error!(source = %source.name, "Source task aborted: {}", reason);
        let mut report = SourceReport::for_source(source);
        self.fail(source, &mut report, format!("task aborted: {}", reason))
            .await;
        report
    }

    async fn fail(&self, source: &Source, report: &mut SourceReport, message: String) {
        let sources = SourceRepository::new(&self.db);
        match sources
            .record_failure(source.id, &message, self.max_consecutive_failures)
            .await
        {
            Ok(true) => {
                warn!(
                    source = %source.name,
                    limit = self.max_consecutive_failures,
                    "Source deactivated after repeated failures"
                );
                report.deactivated = true;
            }
            Ok(false) => {}
            Err(e) => warn!(source = %source.name, "Failed to record source failure: {}", e),
        }
        report.failure = Some(message);
    }
}

/// Runs ingestion passes over every active source.
///
/// At most one pass runs at a time. [`run_once`](Self::run_once) waits for
/// a pass in progress to finish; [`try_run`](Self::try_run) gives up
/// immediately instead.
pub struct Ingestor {
    pipeline: Arc<Pipeline>,
    max_concurrent: usize,
    run_lock: Mutex<()>,
    running: AtomicBool,
}

/// Clears the running flag when a pass ends, even if it is cancelled
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Ingestor {
    pub fn new(db: Arc<Database>, feeds: Arc<dyn FeedSource>, config: &AppConfig) -> Result<Self> {
        let normalizer = Normalizer::from_config(config)?;
        let enricher = Enricher::from_config(config)?;

        Ok(Self {
            pipeline: Arc::new(Pipeline {
                db,
                feeds,
                normalizer,
                enricher,
                max_consecutive_failures: config.sync.max_consecutive_failures,
            }),
            max_concurrent: config.sync.max_concurrent_sources.max(1),
            run_lock: Mutex::new(()),
            running: AtomicBool::new(false),
        })
    }

    /// Execute exactly one pass, waiting for any pass in progress first
    pub async fn run_once(&self) -> Result<RunSummary> {
        let _guard = self.run_lock.lock().await;
        let _running = RunningGuard::set(&self.running);
        self.execute().await
    }

    /// Execute one pass unless another is already running
    pub async fn try_run(&self) -> Option<Result<RunSummary>> {
        let _guard = self.run_lock.try_lock().ok()?;
        let _running = RunningGuard::set(&self.running);
        Some(self.execute().await)
    }

    /// Whether a pass is in progress. Never touches the run lock.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn execute(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::new(Utc::now());

        let active = SourceRepository::new(&self.pipeline.db).list_active().await?;
        if active.is_empty() {
            warn!("No active sources configured, nothing to ingest");
            summary.finished_at = Utc::now();
            return Ok(summary);
        }

        summary.sources_attempted = active.len() as u32;
        info!(
            sources = active.len(),
            concurrency = self.max_concurrent,
            "Starting ingestion run"
        );

        let mut join_set: JoinSet<(usize, SourceReport)> = JoinSet::new();
        let mut pending = active.into_iter().enumerate();
        let mut reports: Vec<(usize, SourceReport)> = Vec::new();

        for (index, source) in pending.by_ref().take(self.max_concurrent) {
            self.spawn_source(&mut join_set, index, source);
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!("Source task aborted: {}", e);
                    summary.sources_failed += 1;
                }
            }

            if let Some((index, source)) = pending.next() {
                self.spawn_source(&mut join_set, index, source);
            }
        }

        reports.sort_by_key(|(index, _)| *index);
        for (_, report) in reports {
            summary.add(report);
        }
        summary.finished_at = Utc::now();

        info!(
            created = summary.created,
            duplicates = summary.duplicates,
            failed_sources = summary.sources_failed,
            elapsed_ms = (summary.finished_at - summary.started_at).num_milliseconds(),
            "Ingestion run finished"
        );

        Ok(summary)
    }

    fn spawn_source(
        &self,
        join_set: &mut JoinSet<(usize, SourceReport)>,
        index: usize,
        source: Source,
    ) {
        let pipeline = Arc::clone(&self.pipeline);
        join_set.spawn(async move {
            // The inner task isolates a panic so the source still gets a report
            let worker = Arc::clone(&pipeline);
            let job = source.clone();
            let report = match tokio::spawn(async move { worker.ingest_source(job).await }).await {
                Ok(report) => report,
                Err(e) => pipeline.abandoned(&source, e.to_string()).await,
            };
            (index, report)
        });
    }
}
