use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use url::Url;

use super::category::CategoryTable;
use crate::article::{ArticleDraft, Category};
use crate::config::AppConfig;
use crate::feed::{RawEntry, Source};
use crate::text::{clean_html, truncate_chars};
use crate::Result;

const MAX_TITLE_CHARS: usize = 500;
const MAX_DESCRIPTION_CHARS: usize = 2000;
const MAX_OUTLET_CHARS: usize = 200;

/// Why an entry was dropped before reaching the gate
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("malformed entry: {0}")]
    MalformedEntry(&'static str),

    #[error("entry published at {published_at} is older than the retention window")]
    StaleEntry { published_at: DateTime<Utc> },
}

/// Maps raw feed entries onto [`ArticleDraft`]s
#[derive(Debug, Clone)]
pub struct Normalizer {
    categories: Arc<CategoryTable>,
    max_entry_age: Option<Duration>,
}

impl Normalizer {
    pub fn new(categories: Arc<CategoryTable>, max_entry_age_days: u32) -> Self {
        let max_entry_age =
            (max_entry_age_days > 0).then(|| Duration::days(i64::from(max_entry_age_days)));
        Self {
            categories,
            max_entry_age,
        }
    }

    /// Use the `[categories]` rules when any are configured, the built-in
    /// table otherwise
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let categories = &config.categories;
        let table = if categories.rules.is_empty() {
            CategoryTable::builtin()
        } else {
            let version = categories.version.clone().unwrap_or_else(|| "custom".to_string());
            CategoryTable::new(version, categories.rules.clone())?
        };
        Ok(Self::new(Arc::new(table), config.sync.max_entry_age_days))
    }

    /// Build a draft from one entry of `source`'s feed, as seen at `now`
    pub fn normalize(
        &self,
        entry: RawEntry,
        source: &Source,
        now: DateTime<Utc>,
    ) -> std::result::Result<ArticleDraft, NormalizeError> {
        let title = entry
            .title
            .as_deref()
            .map(clean_html)
            .filter(|t| !t.is_empty())
            .ok_or(NormalizeError::MalformedEntry("missing title"))?;

        let url = entry
            .link
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or(NormalizeError::MalformedEntry("missing link"))?;
        if !is_web_url(url) {
            return Err(NormalizeError::MalformedEntry("link is not an http(s) URL"));
        }

        // Future or missing timestamps fall back to the ingestion time
        let published_at = entry
            .published_at
            .filter(|published| *published <= now)
            .unwrap_or(now);
        if let Some(max_age) = self.max_entry_age {
            if now - published_at > max_age {
                return Err(NormalizeError::StaleEntry { published_at });
            }
        }

        let title = truncate_chars(&title, MAX_TITLE_CHARS);
        let description = entry
            .description
            .as_deref()
            .map(clean_html)
            .map(|d| truncate_chars(&d, MAX_DESCRIPTION_CHARS))
            .unwrap_or_default();

        let category = source
            .category
            .or_else(|| {
                let text = format!("{} {}", title, description).to_lowercase();
                self.categories.classify(&text)
            })
            .unwrap_or(Category::World);

        // Aggregator items credit the outlet that published them
        let source_name = entry
            .origin
            .as_deref()
            .and_then(outlet_name)
            .unwrap_or_else(|| source.name.clone());

        let image_url = entry
            .image_url
            .map(|u| u.trim().to_string())
            .filter(|u| is_web_url(u));

        Ok(ArticleDraft {
            url: url.to_string(),
            title,
            description,
            image_url,
            source_id: Some(source.id),
            source_name,
            continent: source.continent,
            category,
            published_at,
            ingested_at: now,
        })
    }
}

/// Display name for an entry's origin: the bare host of a URL, or the
/// cleaned text otherwise
fn outlet_name(origin: &str) -> Option<String> {
    let origin = origin.trim();
    let name = match Url::parse(origin) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url
            .host_str()
            .map(|host| host.trim_start_matches("www.").to_lowercase()),
        _ => Some(truncate_chars(&clean_html(origin), MAX_OUTLET_CHARS)),
    };
    name.filter(|name| !name.is_empty())
}

fn is_web_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Continent;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn source() -> Source {
        let now = Utc::now();
        Source {
            id: Uuid::new_v4(),
            name: "The Hindu".to_string(),
            url: "https://www.thehindu.com/feeder/default.rss".to_string(),
            continent: Continent::Asia,
            category: None,
            is_active: true,
            last_fetched_at: None,
            fetch_count: 0,
            error_count: 0,
            consecutive_failures: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn normalizer() -> Normalizer {
        Normalizer::new(Arc::new(CategoryTable::builtin()), 3)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap()
    }

    fn entry() -> RawEntry {
        RawEntry {
            title: Some("  Union Budget   2025 &amp; you ".to_string()),
            link: Some(" https://www.thehindu.com/news/budget ".to_string()),
            description: Some("<p>The <b>finance</b> minister spoke.</p>".to_string()),
            published_at: Some(Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap()),
            image_url: Some("https://img.example.com/a.jpg".to_string()),
            origin: None,
        }
    }

    #[test]
    fn test_normalize_cleans_and_classifies() {
        let src = source();
        let draft = normalizer().normalize(entry(), &src, now()).unwrap();

        assert_eq!(draft.title, "Union Budget 2025 & you");
        assert_eq!(draft.description, "The finance minister spoke.");
        assert_eq!(draft.url, "https://www.thehindu.com/news/budget");
        assert_eq!(draft.category, Category::Budget);
        assert_eq!(draft.continent, Continent::Asia);
        assert_eq!(draft.source_name, "The Hindu");
        assert_eq!(draft.source_id, Some(src.id));
        assert_eq!(draft.image_url.as_deref(), Some("https://img.example.com/a.jpg"));
        assert_eq!(draft.ingested_at, now());
        assert!(draft.published_at <= draft.ingested_at);
    }

    #[test]
    fn test_is_deterministic() {
        let src = source();
        let a = normalizer().normalize(entry(), &src, now()).unwrap();
        let b = normalizer().normalize(entry(), &src, now()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_title_or_link_is_malformed() {
        let src = source();
        let mut no_title = entry();
        no_title.title = Some("   ".to_string());
        assert_eq!(
            normalizer().normalize(no_title, &src, now()),
            Err(NormalizeError::MalformedEntry("missing title"))
        );

        let mut no_link = entry();
        no_link.link = None;
        assert_eq!(
            normalizer().normalize(no_link, &src, now()),
            Err(NormalizeError::MalformedEntry("missing link"))
        );

        let mut bad_link = entry();
        bad_link.link = Some("javascript:alert(1)".to_string());
        assert!(normalizer().normalize(bad_link, &src, now()).is_err());
    }

    #[test]
    fn test_missing_or_future_publish_time_uses_ingestion_time() {
        let src = source();
        let mut undated = entry();
        undated.published_at = None;
        assert_eq!(
            normalizer().normalize(undated, &src, now()).unwrap().published_at,
            now()
        );

        let mut future = entry();
        future.published_at = Some(now() + Duration::hours(5));
        assert_eq!(
            normalizer().normalize(future, &src, now()).unwrap().published_at,
            now()
        );
    }

    #[test]
    fn test_stale_entries_are_skipped() {
        let src = source();
        let mut old = entry();
        old.published_at = Some(now() - Duration::days(4));
        assert!(matches!(
            normalizer().normalize(old.clone(), &src, now()),
            Err(NormalizeError::StaleEntry { .. })
        ));

        let keep_all = Normalizer::new(Arc::new(CategoryTable::builtin()), 0);
        assert!(keep_all.normalize(old, &src, now()).is_ok());
    }

    #[test]
    fn test_defaults_to_world_and_drops_bad_image() {
        let src = source();
        let mut plain = entry();
        plain.title = Some("A quiet afternoon".to_string());
        plain.description = None;
        plain.image_url = Some("data:image/png;base64,AAAA".to_string());

        let draft = normalizer().normalize(plain, &src, now()).unwrap();
        assert_eq!(draft.category, Category::World);
        assert_eq!(draft.description, "");
        assert!(draft.image_url.is_none());
    }

    #[test]
    fn test_long_title_is_truncated() {
        let src = source();
        let mut long = entry();
        long.title = Some("word ".repeat(200));
        let draft = normalizer().normalize(long, &src, now()).unwrap();
        assert!(draft.title.chars().count() <= MAX_TITLE_CHARS);
    }

    #[test]
    fn test_aggregated_entry_credits_its_outlet() {
        let mut aggregator = source();
        aggregator.name = "Google News".to_string();

        let mut by_name = entry();
        by_name.origin = Some(" The Indian Express ".to_string());
        let draft = normalizer().normalize(by_name, &aggregator, now()).unwrap();
        assert_eq!(draft.source_name, "The Indian Express");
        assert_eq!(draft.source_id, Some(aggregator.id));

        let mut by_url = entry();
        by_url.origin = Some("https://www.thehindu.com".to_string());
        let draft = normalizer().normalize(by_url, &aggregator, now()).unwrap();
        assert_eq!(draft.source_name, "thehindu.com");

        let mut blank = entry();
        blank.origin = Some("  ".to_string());
        let draft = normalizer().normalize(blank, &aggregator, now()).unwrap();
        assert_eq!(draft.source_name, "Google News");
    }

    #[test]
    fn test_section_feed_category_overrides_keywords() {
        let mut sports_desk = source();
        sports_desk.category = Some(Category::Sports);

        let draft = normalizer().normalize(entry(), &sports_desk, now()).unwrap();
        assert_eq!(draft.category, Category::Sports);
    }

    #[test]
    fn test_configured_category_rules_replace_builtin() {
        let mut config = AppConfig::default();
        config.categories.rules = vec![crate::pipeline::CategoryRule {
            category: Category::Health,
            keywords: vec!["Finance Minister".to_string()],
        }];
        let normalizer = Normalizer::from_config(&config).unwrap();

        let mut e = entry();
        e.description = Some("The finance minister spoke.".to_string());
        let draft = normalizer.normalize(e, &source(), now()).unwrap();
        assert_eq!(draft.category, Category::Health);

        config.categories.rules[0].keywords.clear();
        assert!(Normalizer::from_config(&config).is_err());
    }
}
