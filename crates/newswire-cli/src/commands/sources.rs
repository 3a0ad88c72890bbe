use anyhow::{bail, Result};

use newswire_core::article::Category;
use newswire_core::feed::{Continent, NewSource};
use newswire_core::storage::{Database, SourceRepository};

pub async fn list(db: &Database) -> Result<()> {
    let sources = SourceRepository::new(db).list_all().await?;

    if sources.is_empty() {
        println!("No sources yet.");
        println!("\nTo add one, run:");
        println!("  newswire sources add <url> -n <name> --continent <code>");
        return Ok(());
    }

    println!("Sources ({}):\n", sources.len());

    for source in &sources {
        let state = if source.is_active { "" } else { " [disabled]" };
        println!(
            "  {} ({}){}",
            source.name,
            source.continent.display_name(),
            state
        );
        println!("    URL: {}", source.url);
        if let Some(category) = source.category {
            println!("    Section: {}", category.as_str());
        }
        println!(
            "    Fetches: {}  Errors: {}  Failing streak: {}",
            source.fetch_count, source.error_count, source.consecutive_failures
        );
        if let Some(last) = source.last_fetched_at {
            println!("    Last fetched: {}", last.format("%Y-%m-%d %H:%M"));
        }
        if let Some(err) = &source.last_error {
            println!("    Last error: {}", err);
        }
        println!();
    }

    Ok(())
}

pub async fn add(
    db: &Database,
    url: &str,
    name: &str,
    continent: Continent,
    category: Option<Category>,
) -> Result<()> {
    if url::Url::parse(url).is_err() {
        bail!("'{}' is not a valid URL", url);
    }

    let new_source = NewSource {
        name: name.to_string(),
        url: url.to_string(),
        continent,
        category,
        is_active: true,
    };
    let (source, created) = SourceRepository::new(db).create(&new_source).await?;

    if created {
        println!("Added source '{}' ({})", source.name, source.continent.display_name());
    } else {
        println!("A source with this URL already exists: '{}'", source.name);
    }

    Ok(())
}

pub async fn set_active(db: &Database, url: &str, active: bool) -> Result<()> {
    let source = SourceRepository::new(db).set_active(url, active).await?;
    let state = if source.is_active { "enabled" } else { "disabled" };
    println!("Source '{}' {}", source.name, state);
    Ok(())
}
