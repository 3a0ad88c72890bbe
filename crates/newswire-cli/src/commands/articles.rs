use anyhow::{anyhow, Result};

use newswire_core::article::Article;
use newswire_core::storage::{ArticleFilter, ArticleRepository, Database};

pub async fn list(db: &Database, filter: &ArticleFilter, json: bool) -> Result<()> {
    let articles = ArticleRepository::new(db).list(filter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&articles)?);
        return Ok(());
    }

    if articles.is_empty() {
        println!("No articles match.");
        return Ok(());
    }

    for article in &articles {
        print_line(article);
    }
    Ok(())
}

pub async fn search(db: &Database, query: &str, limit: u32) -> Result<()> {
    let articles = ArticleRepository::new(db).search(query, limit).await?;

    if articles.is_empty() {
        println!("No articles found for '{}'.", query);
        return Ok(());
    }

    println!("{} results for '{}':\n", articles.len(), query);
    for article in &articles {
        print_line(article);
    }
    Ok(())
}

pub async fn show(db: &Database, url: &str) -> Result<()> {
    let repo = ArticleRepository::new(db);
    let article = repo
        .find_by_url(url)
        .await?
        .ok_or_else(|| anyhow!("No article stored for {}", url))?;
    let views = repo.mark_viewed(article.id).await?;

    println!("{}", article.title);
    println!("{}", "=".repeat(article.title.chars().count().min(80)));
    println!(
        "{} | {} | {} | {}",
        article.source_name,
        article.continent.display_name(),
        article.category,
        article.published_at.format("%Y-%m-%d %H:%M")
    );
    println!(
        "Credibility: {:.1} ({})  Sentiment: {}  Views: {}{}",
        article.credibility_score,
        article.credibility_band().as_str(),
        article.sentiment,
        views,
        if article.is_featured { "  [featured]" } else { "" }
    );
    if !article.tags.is_empty() {
        println!("Tags: {}", article.tags.iter().collect::<Vec<_>>().join(", "));
    }
    println!("\n{}", article.summary);
    if let Some(image) = &article.image_url {
        println!("\nImage: {}", image);
    }
    println!("\n{}", article.url);

    Ok(())
}

pub async fn feature(db: &Database, url: &str, featured: bool) -> Result<()> {
    let repo = ArticleRepository::new(db);
    let article = repo
        .find_by_url(url)
        .await?
        .ok_or_else(|| anyhow!("No article stored for {}", url))?;
    repo.set_featured(article.id, featured).await?;

    let state = if featured { "featured" } else { "no longer featured" };
    println!("'{}' is {}", article.title, state);
    Ok(())
}

fn print_line(article: &Article) {
    println!(
        "  [{:>5.1} {:<10}] {} {:<13} {}",
        article.credibility_score,
        article.credibility_band().as_str(),
        article.continent,
        article.category.as_str(),
        article.title
    );
    println!(
        "    {} | {}",
        article.source_name,
        article.published_at.format("%Y-%m-%d %H:%M")
    );
    println!("    {}", article.url);
}
