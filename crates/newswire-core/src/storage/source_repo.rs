use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::Database;
use crate::config::SourceConfig;
use crate::feed::{NewSource, Source};
use crate::{Error, Result};

/// Repository for feed sources and their fetch statistics
pub struct SourceRepository<'a> {
    db: &'a Database,
}

#[derive(FromRow)]
struct SourceRow {
    id: String,
    name: String,
    url: String,
    continent: String,
    category: Option<String>,
    is_active: i32,
    last_fetched_at: Option<DateTime<Utc>>,
    fetch_count: i64,
    error_count: i64,
    consecutive_failures: i64,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SourceRow> for Source {
    fn from(row: SourceRow) -> Self {
        Source {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            name: row.name,
            url: row.url,
            continent: row.continent.parse().unwrap_or_default(),
            category: row.category.and_then(|c| c.parse().ok()),
            is_active: row.is_active != 0,
            last_fetched_at: row.last_fetched_at,
            fetch_count: row.fetch_count as u32,
            error_count: row.error_count as u32,
            consecutive_failures: row.consecutive_failures as u32,
            last_error: row.last_error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_SOURCES: &str = r#"
    SELECT id, name, url, continent, category, is_active, last_fetched_at, fetch_count,
           error_count, consecutive_failures, last_error, created_at, updated_at
    FROM sources
"#;

impl<'a> SourceRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Register a source unless one with the same URL exists.
    ///
    /// Returns the stored source and whether it was newly created. An
    /// existing row is left untouched. A name already used by another URL
    /// is rejected with [`Error::DuplicateSourceName`].
    pub async fn create(&self, new_source: &NewSource) -> Result<(Source, bool)> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO sources (id, name, url, continent, category, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO NOTHING
            "#,
        )
        .bind(id.to_string())
        .bind(&new_source.name)
        .bind(&new_source.url)
        .bind(new_source.continent.code())
        .bind(new_source.category.map(|c| c.as_str()))
        .bind(new_source.is_active as i32)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                Error::DuplicateSourceName(new_source.name.clone())
            }
            other => Error::Database(other),
        })?;

        let source = self
            .find_by_url(&new_source.url)
            .await?
            .ok_or_else(|| Error::SourceNotFound(new_source.url.clone()))?;

        Ok((source, result.rows_affected() > 0))
    }

    /// Seed sources listed in the configuration, returning how many were new
    pub async fn sync_from_config(&self, sources: &[SourceConfig]) -> Result<u32> {
        let mut created = 0;
        for config in sources {
            let new_source = NewSource {
                name: config.name.clone(),
                url: config.url.clone(),
                continent: config.continent,
                category: config.category,
                is_active: config.active,
            };
            match self.create(&new_source).await {
                Ok((_, true)) => {
                    tracing::info!(source = %config.name, url = %config.url, "Registered source");
                    created += 1;
                }
                Ok((_, false)) => {}
                Err(Error::DuplicateSourceName(name)) => {
                    tracing::warn!(
                        source = %name,
                        url = %config.url,
                        "Skipping source: name already taken"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(created)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Source>> {
        let row: Option<SourceRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_SOURCES))
            .bind(id.to_string())
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(Source::from))
    }

    pub async fn find_by_url(&self, url: &str) -> Result<Option<Source>> {
        let row: Option<SourceRow> = sqlx::query_as(&format!("{} WHERE url = ?", SELECT_SOURCES))
            .bind(url)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(Source::from))
    }

    /// Sources the scheduler should fetch, oldest first
    pub async fn list_active(&self) -> Result<Vec<Source>> {
        let rows: Vec<SourceRow> = sqlx::query_as(&format!(
            "{} WHERE is_active = 1 ORDER BY created_at ASC, name ASC",
            SELECT_SOURCES
        ))
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(Source::from).collect())
    }

    pub async fn list_all(&self) -> Result<Vec<Source>> {
        let rows: Vec<SourceRow> =
            sqlx::query_as(&format!("{} ORDER BY name ASC", SELECT_SOURCES))
                .fetch_all(self.db.pool())
                .await?;

        Ok(rows.into_iter().map(Source::from).collect())
    }

    /// Enable or disable a source by URL. Re-enabling clears the failure streak.
    pub async fn set_active(&self, url: &str, active: bool) -> Result<Source> {
        let result = sqlx::query(
            r#"
            UPDATE sources
            SET is_active = ?,
                consecutive_failures = CASE WHEN ? THEN 0 ELSE consecutive_failures END,
                updated_at = ?
            WHERE url = ?
            "#,
        )
        .bind(active as i32)
        .bind(active)
        .bind(Utc::now())
        .bind(url)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::SourceNotFound(url.to_string()));
        }

        self.find_by_url(url)
            .await?
            .ok_or_else(|| Error::SourceNotFound(url.to_string()))
    }

    /// Record a completed fetch
    pub async fn record_success(&self, id: Uuid, fetched_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sources
            SET last_fetched_at = ?,
                fetch_count = fetch_count + 1,
                consecutive_failures = 0,
                last_error = NULL,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(fetched_at)
        .bind(fetched_at)
        .bind(id.to_string())
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    /// Record a failed run for a source.
    ///
    /// With `max_consecutive_failures > 0` the source is deactivated once its
    /// failure streak reaches that many. Returns true if this call
    /// deactivated it.
    pub async fn record_failure(
        &self,
        id: Uuid,
        error: &str,
        max_consecutive_failures: u32,
    ) -> Result<bool> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE sources
            SET last_fetched_at = ?,
                fetch_count = fetch_count + 1,
                error_count = error_count + 1,
                consecutive_failures = consecutive_failures + 1,
                last_error = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(error)
        .bind(now)
        .bind(id.to_string())
        .execute(self.db.pool())
        .await?;

        if max_consecutive_failures == 0 {
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            UPDATE sources
            SET is_active = 0, updated_at = ?
            WHERE id = ? AND is_active = 1 AND consecutive_failures >= ?
            "#,
        )
        .bind(now)
        .bind(id.to_string())
        .bind(max_consecutive_failures as i64)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> Result<u32> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sources")
            .fetch_one(self.db.pool())
            .await?;

        Ok(count.0 as u32)
    }
}
