//! Rule-based enrichment: credibility, sentiment, tags and a short summary.
//!
//! Everything here is synchronous and free of I/O. The keyword tables are
//! built once and shared between concurrent source pipelines via `Arc`.

mod credibility;
pub mod sentiment;
mod tags;

use std::sync::Arc;

use crate::article::{ArticleDraft, EnrichedArticle, Enrichment};
use crate::config::AppConfig;
use crate::text::truncate_chars;
use crate::Result;

pub use credibility::{CredibilityScorer, ScoringWeights};
pub use tags::{TagCategory, TagTable};

const SUMMARY_WORDS: usize = 30;
const TITLE_SUMMARY_CHARS: usize = 150;

#[derive(Debug, Clone)]
pub struct Enricher {
    scorer: Arc<CredibilityScorer>,
    tags: Arc<TagTable>,
}

impl Enricher {
    pub fn new(scorer: Arc<CredibilityScorer>, tags: Arc<TagTable>) -> Self {
        Self { scorer, tags }
    }

    /// Build scorer and tag table from the `[scoring]` and `[tagging]` sections
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let scoring = &config.scoring;
        scoring.weights.validate()?;
        let scorer = CredibilityScorer::new(
            scoring.weights.clone(),
            &scoring.trusted_sources,
            &scoring.low_quality_sources,
        );

        let tagging = &config.tagging;
        let tags = if tagging.categories.is_empty() {
            TagTable::builtin()
        } else {
            let version = tagging.version.clone().unwrap_or_else(|| "custom".to_string());
            TagTable::new(version, tagging.categories.clone())?
        };

        Ok(Self::new(Arc::new(scorer), Arc::new(tags)))
    }

    pub fn tag_table(&self) -> &TagTable {
        &self.tags
    }

    pub fn enrich(&self, draft: ArticleDraft) -> EnrichedArticle {
        let text = draft.text();
        let enrichment = Enrichment {
            credibility_score: self.scorer.score(&draft),
            sentiment: sentiment::classify(&text),
            tags: self.tags.generate(&text),
            summary: basic_summary(&draft),
        };
        EnrichedArticle { draft, enrichment }
    }
}

/// First words of the description, or the start of the title when there is none
pub fn basic_summary(draft: &ArticleDraft) -> String {
    if draft.description.is_empty() {
        let title = truncate_chars(&draft.title, TITLE_SUMMARY_CHARS);
        return if title.len() < draft.title.len() {
            format!("{}...", title)
        } else {
            title
        };
    }

    let words: Vec<&str> = draft.description.split_whitespace().collect();
    if words.len() > SUMMARY_WORDS {
        format!("{}...", words[..SUMMARY_WORDS].join(" "))
    } else {
        draft.description.clone()
    }
}
