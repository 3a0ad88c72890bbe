//! End-to-end ingestion tests.
//!
//! Feeds are served by a local `wiremock` server and articles land in an
//! in-memory SQLite database, so no real network or disk is touched.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use newswire_core::article::{Category, CredibilityBand};
use newswire_core::feed::{Continent, FeedClient, NewSource};
use newswire_core::scheduler::Ingestor;
use newswire_core::storage::{ArticleRepository, Database, SourceRepository};
use newswire_core::AppConfig;

struct Item<'a> {
    title: &'a str,
    link: &'a str,
    description: Option<&'a str>,
    image: Option<&'a str>,
}

fn rss(items: &[Item<'_>]) -> String {
    let pub_date = Utc::now().to_rfc2822();
    let body: String = items
        .iter()
        .map(|item| {
            let description = item
                .description
                .map(|d| format!("<description>{}</description>", d))
                .unwrap_or_default();
            let image = item
                .image
                .map(|url| format!(r#"<enclosure url="{}" type="image/jpeg" length="1024"/>"#, url))
                .unwrap_or_default();
            format!(
                "<item><title>{}</title><link>{}</link>{}{}<pubDate>{}</pubDate></item>",
                item.title, item.link, description, image, pub_date
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Test</title><link>https://example.com</link><description>Test feed</description>{}</channel></rss>"#,
        body
    )
}

async fn serve(server: &MockServer, route: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

async fn add_source(db: &Database, name: &str, url: String, continent: Continent) {
    SourceRepository::new(db)
        .create(&NewSource {
            name: name.to_string(),
            url,
            continent,
            category: None,
            is_active: true,
        })
        .await
        .expect("failed to register source");
}

fn ingestor(db: &Arc<Database>, config: &AppConfig) -> Ingestor {
    let client = FeedClient::new(config)
        .expect("failed to build feed client")
        .with_retry(1, Duration::from_millis(1));
    Ingestor::new(db.clone(), Arc::new(client), config).expect("failed to build ingestor")
}

#[tokio::test]
async fn clickbait_blog_is_stored_once_and_disputed() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/blog.xml",
        200,
        rss(&[Item {
            title: "BREAKING!!! Stock Market CRASHES Today",
            link: "http://example.com/a1",
            description: None,
            image: None,
        }]),
    )
    .await;

    let db = Arc::new(Database::connect_in_memory().await.unwrap());
    add_source(&db, "Random Blog", format!("{}/blog.xml", server.uri()), Continent::Asia).await;
    let config = AppConfig::default();
    let ingestor = ingestor(&db, &config);

    let first = ingestor.run_once().await.unwrap();
    assert_eq!(first.created, 1);
    let second = ingestor.run_once().await.unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.duplicates, 1);

    let repo = ArticleRepository::new(&db);
    assert_eq!(repo.count().await.unwrap(), 1);

    let article = repo.find_by_url("http://example.com/a1").await.unwrap().unwrap();
    assert!(article.credibility_score < 50.0);
    assert_eq!(article.credibility_band(), CredibilityBand::Disputed);
    assert!(article.tags.contains("stock-market"));
    assert_eq!(article.category, Category::Business);
    assert_eq!(article.continent, Continent::Asia);
    assert_eq!(article.source_name, "Random Blog");
}

#[tokio::test]
async fn trusted_budget_story_is_verified() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/toi.xml",
        200,
        rss(&[Item {
            title: "Union Budget 2025 announced",
            link: "https://timesofindia.com/b2",
            description: Some("Finance Minister presents the annual budget with tax reforms."),
            image: Some("https://static.toiimg.com/b2.jpg"),
        }]),
    )
    .await;

    let db = Arc::new(Database::connect_in_memory().await.unwrap());
    add_source(&db, "Times of India", format!("{}/toi.xml", server.uri()), Continent::Asia).await;
    let config = AppConfig::default();

    let summary = ingestor(&db, &config).run_once().await.unwrap();
    assert_eq!(summary.created, 1);

    let article = ArticleRepository::new(&db)
        .find_by_url("https://timesofindia.com/b2")
        .await
        .unwrap()
        .unwrap();
    assert!(article.credibility_score >= 80.0);
    assert_eq!(article.credibility_band(), CredibilityBand::Verified);
    assert!(article.tags.contains("budget"));
    assert!(article.tags.contains("tax"));
    assert_eq!(article.category, Category::Budget);
    assert_eq!(article.image_url.as_deref(), Some("https://static.toiimg.com/b2.jpg"));
    assert!(article.published_at <= article.ingested_at);
}

#[tokio::test]
async fn failing_source_does_not_block_others() {
    let server = MockServer::start().await;
    serve(&server, "/broken.xml", 500, "oops".to_string()).await;
    serve(
        &server,
        "/good.xml",
        200,
        rss(&[
            Item {
                title: "Kohli hits century in ODI",
                link: "https://good.example/1",
                description: Some("India win the series after a record chase in Mumbai on Sunday."),
                image: None,
            },
            Item {
                title: "Monsoon arrives early in Kerala",
                link: "https://good.example/2",
                description: None,
                image: None,
            },
        ]),
    )
    .await;

    let db = Arc::new(Database::connect_in_memory().await.unwrap());
    add_source(&db, "Broken", format!("{}/broken.xml", server.uri()), Continent::Europe).await;
    add_source(&db, "Good", format!("{}/good.xml", server.uri()), Continent::Asia).await;
    let config = AppConfig::default();

    let summary = ingestor(&db, &config).run_once().await.unwrap();
    assert_eq!(summary.sources_attempted, 2);
    assert_eq!(summary.sources_failed, 1);
    assert_eq!(summary.created, 2);

    let failed: Vec<_> = summary.failures().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].source_name, "Broken");
    assert!(failed[0].failure.as_deref().unwrap().contains("500"));

    let sources = SourceRepository::new(&db);
    let broken = sources
        .find_by_url(&format!("{}/broken.xml", server.uri()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(broken.error_count, 1);
    assert!(broken.last_error.is_some());

    let repo = ArticleRepository::new(&db);
    let sports = repo.list_by_category(Category::Sports, 10).await.unwrap();
    assert_eq!(sports.len(), 1);
    assert!(sports[0].tags.contains("cricket"));
    assert_eq!(repo.list_by_continent(Continent::Europe, 10).await.unwrap().len(), 0);
}

#[tokio::test]
async fn repeated_failures_deactivate_source() {
    let server = MockServer::start().await;
    serve(&server, "/gone.xml", 404, String::new()).await;

    let db = Arc::new(Database::connect_in_memory().await.unwrap());
    let url = format!("{}/gone.xml", server.uri());
    add_source(&db, "Gone", url.clone(), Continent::Global).await;

    let mut config = AppConfig::default();
    config.sync.max_consecutive_failures = 2;
    let ingestor = ingestor(&db, &config);

    let first = ingestor.run_once().await.unwrap();
    assert!(!first.sources[0].deactivated);
    let second = ingestor.run_once().await.unwrap();
    assert!(second.sources[0].deactivated);

    let third = ingestor.run_once().await.unwrap();
    assert_eq!(third.sources_attempted, 0);

    let source = SourceRepository::new(&db).find_by_url(&url).await.unwrap().unwrap();
    assert!(!source.is_active);
    assert_eq!(source.consecutive_failures, 2);
}

#[tokio::test]
async fn malformed_and_stale_entries_are_skipped() {
    let server = MockServer::start().await;
    let old_date = (Utc::now() - chrono::Duration::days(10)).to_rfc2822();
    let body = format!(
        r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>T</title><link>https://example.com</link><description>d</description>
<item><title>Fresh story about the economy</title><link>https://mixed.example/1</link></item>
<item><title>No link here</title></item>
<item><title>Old story</title><link>https://mixed.example/old</link><pubDate>{}</pubDate></item>
</channel></rss>"#,
        old_date
    );
    serve(&server, "/mixed.xml", 200, body).await;

    let db = Arc::new(Database::connect_in_memory().await.unwrap());
    add_source(&db, "Mixed", format!("{}/mixed.xml", server.uri()), Continent::Oceania).await;
    let config = AppConfig::default();

    let summary = ingestor(&db, &config).run_once().await.unwrap();
    assert_eq!(summary.entries_seen, 3);
    assert_eq!(summary.created, 1);
    assert_eq!(summary.malformed, 1);
    assert_eq!(summary.stale, 1);
    assert_eq!(summary.sources_failed, 0);

    let stored = ArticleRepository::new(&db)
        .find_by_url("https://mixed.example/1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.continent, Continent::Oceania);
    assert!(stored.tags.contains("economy"));
}

#[tokio::test]
async fn concurrent_runs_never_duplicate_articles() {
    let server = MockServer::start().await;
    let items: Vec<String> = (0..20).map(|i| format!("https://bulk.example/{}", i)).collect();
    let feed = rss(&items
        .iter()
        .map(|link| Item {
            title: "Markets steady ahead of policy meeting",
            link: link.as_str(),
            description: None,
            image: None,
        })
        .collect::<Vec<_>>());
    serve(&server, "/bulk-a.xml", 200, feed.clone()).await;
    serve(&server, "/bulk-b.xml", 200, feed).await;

    let db = Arc::new(Database::connect_in_memory().await.unwrap());
    add_source(&db, "Bulk A", format!("{}/bulk-a.xml", server.uri()), Continent::Europe).await;
    add_source(&db, "Bulk B", format!("{}/bulk-b.xml", server.uri()), Continent::Europe).await;
    let config = AppConfig::default();

    let summary = ingestor(&db, &config).run_once().await.unwrap();
    assert_eq!(summary.created, 20);
    assert_eq!(summary.duplicates, 20);
    assert_eq!(ArticleRepository::new(&db).count().await.unwrap(), 20);
}

#[tokio::test]
async fn aggregated_items_credit_their_outlet() {
    let server = MockServer::start().await;
    let body = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Top stories</title><link>https://news.example</link><description>d</description>
<item><title>Union Budget 2025 announced</title><link>https://news.example/articles/b2</link>
<description>Finance Minister presents the annual budget with tax reforms.</description>
<pubDate>{}</pubDate><source url="https://www.thehindu.com">thehindu.com</source></item>
</channel></rss>"#,
        Utc::now().to_rfc2822()
    );
    serve(&server, "/top.xml", 200, body).await;

    let db = Arc::new(Database::connect_in_memory().await.unwrap());
    add_source(&db, "Aggregator", format!("{}/top.xml", server.uri()), Continent::Asia).await;
    let config = AppConfig::default();

    let summary = ingestor(&db, &config).run_once().await.unwrap();
    assert_eq!(summary.created, 1);

    let article = ArticleRepository::new(&db)
        .find_by_url("https://news.example/articles/b2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(article.source_name, "thehindu.com");
    // thehindu.com is on the default trusted list
    assert!(article.credibility_score >= 80.0);
}

#[tokio::test]
async fn section_feed_files_everything_under_its_category() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/sport.xml",
        200,
        rss(&[Item {
            title: "Union Budget 2025 announced",
            link: "https://sport.example/1",
            description: None,
            image: None,
        }]),
    )
    .await;

    let db = Arc::new(Database::connect_in_memory().await.unwrap());
    SourceRepository::new(&db)
        .create(&NewSource {
            name: "Sports Desk".to_string(),
            url: format!("{}/sport.xml", server.uri()),
            continent: Continent::Global,
            category: Some(Category::Sports),
            is_active: true,
        })
        .await
        .unwrap();
    let config = AppConfig::default();

    ingestor(&db, &config).run_once().await.unwrap();
    let article = ArticleRepository::new(&db)
        .find_by_url("https://sport.example/1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(article.category, Category::Sports);
}
