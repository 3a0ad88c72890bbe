use std::sync::LazyLock;

use feed_rs::model::Entry;
use feed_rs::parser;
use regex::Regex;

use super::models::RawEntry;
use crate::{Error, Result};

static IMG_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<img\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).expect("valid img src regex")
});

/// Lazy sequence of raw entries, yielded in the order the feed lists them
pub struct RawEntries {
    inner: Box<dyn Iterator<Item = RawEntry> + Send>,
}

impl RawEntries {
    pub fn empty() -> Self {
        Self::from_entries(Vec::new())
    }

    /// Wrap already-extracted entries (used by non-HTTP feed sources)
    pub fn from_entries(entries: Vec<RawEntry>) -> Self {
        Self {
            inner: Box::new(entries.into_iter()),
        }
    }

    fn from_feed_entries(entries: Vec<Entry>) -> Self {
        Self {
            inner: Box::new(entries.into_iter().map(raw_entry_from)),
        }
    }
}

impl Iterator for RawEntries {
    type Item = RawEntry;

    fn next(&mut self) -> Option<RawEntry> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl std::fmt::Debug for RawEntries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawEntries")
            .field("remaining", &self.inner.size_hint())
            .finish()
    }
}

/// Parse RSS/Atom feed content into a lazy sequence of raw entries
pub fn parse_feed(content: &[u8]) -> Result<RawEntries> {
    let feed = parser::parse(content).map_err(|e| Error::FeedParse(e.to_string()))?;
    Ok(RawEntries::from_feed_entries(feed.entries))
}

fn raw_entry_from(entry: Entry) -> RawEntry {
    let link = entry
        .links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| entry.links.first())
        .map(|l| l.href.clone());

    let title = entry.title.map(|t| t.content);

    let description = entry
        .summary
        .map(|s| s.content)
        .or_else(|| entry.content.and_then(|c| c.body));

    let published_at = entry.published.or(entry.updated);

    // Media thumbnail, then image enclosure/media content, then an <img> in the body
    let image_url = entry
        .media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .map(|t| t.image.uri.clone())
        .next()
        .or_else(|| {
            entry
                .media
                .iter()
                .flat_map(|m| m.content.iter())
                .filter(|c| {
                    c.content_type
                        .as_ref()
                        .map_or(true, |mime| mime.to_string().starts_with("image/"))
                })
                .find_map(|c| c.url.as_ref().map(|u| u.to_string()))
        })
        .or_else(|| description.as_deref().and_then(extract_first_image_url));

    RawEntry {
        title,
        link,
        description,
        published_at,
        image_url,
        origin: entry.source,
    }
}

/// Pull the first usable `<img src>` out of an HTML fragment
fn extract_first_image_url(html: &str) -> Option<String> {
    let url = IMG_SRC_RE.captures(html)?.get(1)?.as_str().trim();

    // Tracking pixels and spacer images
    if url.is_empty() || url.contains("1x1") || url.contains("pixel") || url.contains("tracking") {
        return None;
    }

    Some(url.to_string())
}
