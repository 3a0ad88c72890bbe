use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use uuid::Uuid;

use super::retry::with_retry;
use super::Database;
use crate::article::{Article, Category, EnrichedArticle, TagSet};
use crate::feed::Continent;
use crate::{Error, Result};

/// Default page size for list queries
pub const DEFAULT_LIMIT: u32 = 50;

/// Repository for stored articles.
///
/// [`insert_if_new`](Self::insert_if_new) is the only write path for new
/// articles; everything else reads or touches the reader-facing counters.
pub struct ArticleRepository<'a> {
    db: &'a Database,
}

/// Conjunctive filter for [`ArticleRepository::list`]
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub continent: Option<Continent>,
    pub category: Option<Category>,
    pub min_credibility: Option<f64>,
    pub tag: Option<String>,
    pub featured_only: bool,
    pub limit: Option<u32>,
}

#[derive(FromRow)]
struct ArticleRow {
    id: String,
    url: String,
    title: String,
    description: String,
    summary: String,
    image_url: Option<String>,
    source_id: Option<String>,
    source_name: String,
    continent: String,
    category: String,
    published_at: DateTime<Utc>,
    ingested_at: DateTime<Utc>,
    credibility_score: f64,
    sentiment: String,
    view_count: i64,
    is_featured: i32,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            url: row.url,
            title: row.title,
            description: row.description,
            summary: row.summary,
            image_url: row.image_url,
            source_id: row.source_id.and_then(|id| Uuid::parse_str(&id).ok()),
            source_name: row.source_name,
            continent: row.continent.parse().unwrap_or_default(),
            category: row.category.parse().unwrap_or_default(),
            published_at: row.published_at,
            ingested_at: row.ingested_at,
            credibility_score: row.credibility_score,
            sentiment: row.sentiment.parse().unwrap_or_default(),
            tags: TagSet::empty(),
            view_count: row.view_count as u32,
            is_featured: row.is_featured != 0,
        }
    }
}

const ARTICLE_COLUMNS: &str = r#"
    SELECT id, url, title, description, summary, image_url, source_id, source_name,
           continent, category, published_at, ingested_at, credibility_score,
           sentiment, view_count, is_featured
    FROM articles
"#;

impl<'a> ArticleRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Store an enriched article unless its URL is already known.
    ///
    /// The article row and its tags are written in one transaction. A
    /// duplicate URL writes nothing and returns `false`; the existing record
    /// is never overwritten. Any other constraint failure is an error.
    pub async fn insert_if_new(&self, article: &EnrichedArticle) -> Result<bool> {
        let score = article.enrichment.credibility_score;
        if !score.is_finite() {
            return Err(Error::Other(format!(
                "credibility score for {} is not a finite number: {}",
                article.draft.url, score
            )));
        }

        let created = with_retry("insert article", move || self.try_insert(article)).await?;
        Ok(created)
    }

    async fn try_insert(&self, article: &EnrichedArticle) -> std::result::Result<bool, sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let draft = &article.draft;
        let enrichment = &article.enrichment;

        let mut tx = self.db.pool().begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO articles
            (id, url, title, description, summary, image_url, source_id, source_name,
             continent, category, published_at, ingested_at, credibility_score, sentiment)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(&draft.url)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&enrichment.summary)
        .bind(&draft.image_url)
        .bind(draft.source_id.map(|id| id.to_string()))
        .bind(&draft.source_name)
        .bind(draft.continent.code())
        .bind(draft.category.as_str())
        .bind(draft.published_at)
        .bind(draft.ingested_at)
        .bind(enrichment.credibility_score)
        .bind(enrichment.sentiment.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for tag in enrichment.tags.iter() {
            sqlx::query("INSERT INTO article_tags (article_id, tag) VALUES (?, ?)")
                .bind(&id)
                .bind(tag)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Article>> {
        let row: Option<ArticleRow> =
            sqlx::query_as(&format!("{} WHERE id = ?", ARTICLE_COLUMNS))
                .bind(id.to_string())
                .fetch_optional(self.db.pool())
                .await?;

        self.with_tags_opt(row).await
    }

    pub async fn find_by_url(&self, url: &str) -> Result<Option<Article>> {
        let row: Option<ArticleRow> =
            sqlx::query_as(&format!("{} WHERE url = ?", ARTICLE_COLUMNS))
                .bind(url)
                .fetch_optional(self.db.pool())
                .await?;

        self.with_tags_opt(row).await
    }

    /// Articles matching every set field of `filter`, newest first
    pub async fn list(&self, filter: &ArticleFilter) -> Result<Vec<Article>> {
        let pool = self.db.pool();
        let rows: Vec<ArticleRow> = with_retry("list articles", move || async move {
            let mut builder = QueryBuilder::<Sqlite>::new(ARTICLE_COLUMNS);
            builder.push(" WHERE 1 = 1");
            if let Some(continent) = filter.continent {
                builder.push(" AND continent = ").push_bind(continent.code());
            }
            if let Some(category) = filter.category {
                builder.push(" AND category = ").push_bind(category.as_str());
            }
            if let Some(min) = filter.min_credibility {
                builder.push(" AND credibility_score >= ").push_bind(min);
            }
            if let Some(tag) = &filter.tag {
                builder
                    .push(" AND id IN (SELECT article_id FROM article_tags WHERE tag = ")
                    .push_bind(tag.trim().to_lowercase())
                    .push(")");
            }
            if filter.featured_only {
                builder.push(" AND is_featured = 1");
            }
            builder
                .push(" ORDER BY published_at DESC, ingested_at DESC LIMIT ")
                .push_bind(filter.limit.unwrap_or(DEFAULT_LIMIT) as i64);

            builder.build_query_as().fetch_all(pool).await
        })
        .await?;

        self.with_tags(rows).await
    }

    pub async fn list_recent(&self, limit: u32) -> Result<Vec<Article>> {
        self.list(&ArticleFilter {
            limit: Some(limit),
            ..Default::default()
        })
        .await
    }

    pub async fn list_by_continent(&self, continent: Continent, limit: u32) -> Result<Vec<Article>> {
        self.list(&ArticleFilter {
            continent: Some(continent),
            limit: Some(limit),
            ..Default::default()
        })
        .await
    }

    pub async fn list_by_category(&self, category: Category, limit: u32) -> Result<Vec<Article>> {
        self.list(&ArticleFilter {
            category: Some(category),
            limit: Some(limit),
            ..Default::default()
        })
        .await
    }

    pub async fn list_by_min_credibility(&self, min_score: f64, limit: u32) -> Result<Vec<Article>> {
        self.list(&ArticleFilter {
            min_credibility: Some(min_score),
            limit: Some(limit),
            ..Default::default()
        })
        .await
    }

    /// Case-insensitive substring search over title and description.
    ///
    /// `%` and `_` in the query match themselves.
    pub async fn search(&self, query: &str, limit: u32) -> Result<Vec<Article>> {
        let escaped = query
            .trim()
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{}%", escaped);

        let rows: Vec<ArticleRow> = sqlx::query_as(&format!(
            "{} WHERE title LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\' \
             ORDER BY published_at DESC LIMIT ?",
            ARTICLE_COLUMNS
        ))
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit as i64)
        .fetch_all(self.db.pool())
        .await?;

        self.with_tags(rows).await
    }

    /// Bump the view counter, returning the new count
    pub async fn mark_viewed(&self, id: Uuid) -> Result<u32> {
        let count: Option<(i64,)> = sqlx::query_as(
            "UPDATE articles SET view_count = view_count + 1 WHERE id = ? RETURNING view_count",
        )
        .bind(id.to_string())
        .fetch_optional(self.db.pool())
        .await?;

        count
            .map(|(c,)| c as u32)
            .ok_or_else(|| Error::ArticleNotFound(id.to_string()))
    }

    pub async fn set_featured(&self, id: Uuid, featured: bool) -> Result<()> {
        let result = sqlx::query("UPDATE articles SET is_featured = ? WHERE id = ?")
            .bind(featured as i32)
            .bind(id.to_string())
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::ArticleNotFound(id.to_string()));
        }
        Ok(())
    }

    pub async fn count(&self) -> Result<u32> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(self.db.pool())
            .await?;

        Ok(count.0 as u32)
    }

    pub async fn get_tags(&self, article_id: Uuid) -> Result<TagSet> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT tag FROM article_tags WHERE article_id = ? ORDER BY tag")
                .bind(article_id.to_string())
                .fetch_all(self.db.pool())
                .await?;

        TagSet::new(rows.into_iter().map(|(tag,)| tag))
    }

    async fn with_tags_opt(&self, row: Option<ArticleRow>) -> Result<Option<Article>> {
        match row {
            Some(row) => {
                let mut article = Article::from(row);
                article.tags = self.get_tags(article.id).await?;
                Ok(Some(article))
            }
            None => Ok(None),
        }
    }

    /// Attach tags to a page of articles with a single query
    async fn with_tags(&self, rows: Vec<ArticleRow>) -> Result<Vec<Article>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT article_id, tag FROM article_tags WHERE article_id IN (");
        let mut ids = builder.separated(", ");
        for row in &rows {
            ids.push_bind(row.id.clone());
        }
        builder.push(")");

        let pairs: Vec<(String, String)> = builder.build_query_as().fetch_all(self.db.pool()).await?;
        let mut tags_by_id: HashMap<String, Vec<String>> = HashMap::new();
        for (article_id, tag) in pairs {
            tags_by_id.entry(article_id).or_default().push(tag);
        }

        rows.into_iter()
            .map(|row| {
                let tags = tags_by_id.remove(&row.id).unwrap_or_default();
                let mut article = Article::from(row);
                article.tags = TagSet::new(tags)?;
                Ok(article)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{ArticleDraft, Enrichment, Sentiment};
    use chrono::Duration;

    fn article(url: &str, score: f64, tags: &[&str]) -> EnrichedArticle {
        let now = Utc::now();
        EnrichedArticle {
            draft: ArticleDraft {
                url: url.to_string(),
                title: "Union Budget 2025 announced".to_string(),
                description: "Finance Minister presents the annual budget.".to_string(),
                image_url: None,
                source_id: None,
                source_name: "Times of India".to_string(),
                continent: Continent::Asia,
                category: Category::Budget,
                published_at: now - Duration::minutes(5),
                ingested_at: now,
            },
            enrichment: Enrichment {
                credibility_score: score,
                sentiment: Sentiment::Neutral,
                tags: TagSet::new(tags).unwrap(),
                summary: "Finance Minister presents the annual budget.".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_insert_if_new_is_idempotent() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = ArticleRepository::new(&db);

        let first = article("https://timesofindia.com/b2", 90.0, &["budget", "tax"]);
        assert!(repo.insert_if_new(&first).await.unwrap());

        let mut second = article("https://timesofindia.com/b2", 10.0, &["crime"]);
        second.draft.title = "Changed".to_string();
        assert!(!repo.insert_if_new(&second).await.unwrap());

        assert_eq!(repo.count().await.unwrap(), 1);
        let stored = repo.find_by_url("https://timesofindia.com/b2").await.unwrap().unwrap();
        assert_eq!(stored.title, "Union Budget 2025 announced");
        assert_eq!(stored.credibility_score, 90.0);
        assert_eq!(stored.tags, TagSet::new(["budget", "tax"]).unwrap());
        assert_eq!(stored.category, Category::Budget);
        assert_eq!(stored.continent, Continent::Asia);
    }

    #[tokio::test]
    async fn test_filters_and_search() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = ArticleRepository::new(&db);

        repo.insert_if_new(&article("https://a.example/1", 90.0, &["budget"])).await.unwrap();
        let mut europe = article("https://b.example/2", 40.0, &["crime"]);
        europe.draft.continent = Continent::Europe;
        europe.draft.category = Category::World;
        europe.draft.title = "Police arrest suspect".to_string();
        repo.insert_if_new(&europe).await.unwrap();

        assert_eq!(repo.list_recent(10).await.unwrap().len(), 2);
        assert_eq!(repo.list_recent(1).await.unwrap().len(), 1);

        let asia = repo.list_by_continent(Continent::Asia, 10).await.unwrap();
        assert_eq!(asia.len(), 1);
        assert_eq!(asia[0].url, "https://a.example/1");
        assert!(asia[0].tags.contains("budget"));

        let world = repo.list_by_category(Category::World, 10).await.unwrap();
        assert_eq!(world[0].url, "https://b.example/2");

        let credible = repo.list_by_min_credibility(80.0, 10).await.unwrap();
        assert_eq!(credible.len(), 1);
        assert_eq!(credible[0].credibility_score, 90.0);

        let tagged = repo
            .list(&ArticleFilter {
                tag: Some("Crime".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(tagged.len(), 1);

        let found = repo.search("arrest", 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].continent, Continent::Europe);
        assert!(repo.search("nothing like this", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_views_and_featured() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = ArticleRepository::new(&db);
        repo.insert_if_new(&article("https://a.example/1", 70.0, &[])).await.unwrap();
        let stored = repo.find_by_url("https://a.example/1").await.unwrap().unwrap();
        assert!(stored.tags.is_empty());

        assert_eq!(repo.mark_viewed(stored.id).await.unwrap(), 1);
        assert_eq!(repo.mark_viewed(stored.id).await.unwrap(), 2);

        repo.set_featured(stored.id, true).await.unwrap();
        let featured = repo
            .list(&ArticleFilter {
                featured_only: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].view_count, 2);

        let missing = Uuid::new_v4();
        assert!(matches!(repo.mark_viewed(missing).await, Err(Error::ArticleNotFound(_))));
        assert!(matches!(
            repo.set_featured(missing, true).await,
            Err(Error::ArticleNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_constraint_failures_are_not_duplicates() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = ArticleRepository::new(&db);

        let nan = article("https://a.example/nan", f64::NAN, &[]);
        assert!(repo.insert_if_new(&nan).await.is_err());

        let out_of_range = article("https://a.example/high", 150.0, &[]);
        assert!(matches!(
            repo.insert_if_new(&out_of_range).await,
            Err(Error::Database(_))
        ));

        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = ArticleRepository::new(&db);

        let mut percent = article("https://a.example/1", 70.0, &[]);
        percent.draft.title = "Turnout hits 100% in hill village".to_string();
        percent.draft.description = String::new();
        repo.insert_if_new(&percent).await.unwrap();

        let mut plain = article("https://a.example/2", 70.0, &[]);
        plain.draft.title = "Over 1000 voters queue early".to_string();
        plain.draft.description = "Polling ran from 7am to 6pm".to_string();
        repo.insert_if_new(&plain).await.unwrap();

        let found = repo.search("100%", 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "https://a.example/1");

        assert!(repo.search("7_m", 10).await.unwrap().is_empty());
        assert_eq!(repo.search("7am", 10).await.unwrap().len(), 1);
    }
}
