mod tag_set;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::feed::Continent;
use crate::{Error, Result};

pub use tag_set::{TagSet, MAX_TAGS};

/// Editorial section an article is filed under
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    #[default]
    World,
    Business,
    Technology,
    Entertainment,
    Sports,
    Science,
    Health,
    Budget,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Self::World,
        Self::Business,
        Self::Technology,
        Self::Entertainment,
        Self::Sports,
        Self::Science,
        Self::Health,
        Self::Budget,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::World => "WORLD",
            Self::Business => "BUSINESS",
            Self::Technology => "TECHNOLOGY",
            Self::Entertainment => "ENTERTAINMENT",
            Self::Sports => "SPORTS",
            Self::Science => "SCIENCE",
            Self::Health => "HEALTH",
            Self::Budget => "BUDGET",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Other(format!("Unknown category: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            other => Err(Error::Other(format!("Unknown sentiment: {}", other))),
        }
    }
}

/// Read-time classification of a credibility score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredibilityBand {
    /// 80 and above
    Verified,
    /// 50 up to 80
    Unverified,
    /// Below 50
    Disputed,
}

impl CredibilityBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Verified
        } else if score >= 50.0 {
            Self::Unverified
        } else {
            Self::Disputed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Unverified => "unverified",
            Self::Disputed => "disputed",
        }
    }
}

/// An article under construction, after normalization and before enrichment
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleDraft {
    pub url: String,
    pub title: String,
    /// Cleaned description; empty when the feed gave none
    pub description: String,
    pub image_url: Option<String>,
    pub source_id: Option<Uuid>,
    pub source_name: String,
    pub continent: Continent,
    pub category: Category,
    pub published_at: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
}

impl ArticleDraft {
    /// Title and description joined, the text every enrichment step reads
    pub fn text(&self) -> String {
        if self.description.is_empty() {
            self.title.clone()
        } else {
            format!("{} {}", self.title, self.description)
        }
    }
}

/// Values derived from a draft by the enrichment step
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub credibility_score: f64,
    pub sentiment: Sentiment,
    pub tags: TagSet,
    pub summary: String,
}

/// A draft plus its enrichment, ready for the persistence gate
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedArticle {
    pub draft: ArticleDraft,
    pub enrichment: Enrichment,
}

/// A stored article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    pub description: String,
    pub summary: String,
    pub image_url: Option<String>,
    pub source_id: Option<Uuid>,
    pub source_name: String,
    pub continent: Continent,
    pub category: Category,
    pub published_at: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
    pub credibility_score: f64,
    pub sentiment: Sentiment,
    #[serde(default)]
    pub tags: TagSet,
    pub view_count: u32,
    pub is_featured: bool,
}

impl Article {
    pub fn credibility_band(&self) -> CredibilityBand {
        CredibilityBand::from_score(self.credibility_score)
    }
}
