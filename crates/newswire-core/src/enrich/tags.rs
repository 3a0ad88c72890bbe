use serde::{Deserialize, Serialize};

use crate::article::{TagSet, MAX_TAGS};
use crate::text::keyword_hits;
use crate::{Error, Result};

/// One tag and the keywords that trigger it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCategory {
    pub tag: String,
    pub keywords: Vec<String>,
}

/// Versioned keyword table consulted by the tag generator
#[derive(Debug, Clone)]
pub struct TagTable {
    version: String,
    categories: Vec<TagCategory>,
}

impl TagTable {
    /// Build a table, lowercasing tags and keywords.
    ///
    /// Returns [`Error::Config`] for a blank tag or a tag without keywords.
    pub fn new(version: impl Into<String>, categories: Vec<TagCategory>) -> Result<Self> {
        let categories = categories
            .into_iter()
            .map(|c| {
                let tag = c.tag.trim().to_lowercase();
                let keywords: Vec<String> = c
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                if tag.is_empty() {
                    return Err(Error::Config("tag category with blank tag".to_string()));
                }
                if keywords.is_empty() {
                    return Err(Error::Config(format!("tag '{}' has no keywords", tag)));
                }
                Ok(TagCategory { tag, keywords })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            version: version.into(),
            categories,
        })
    }

    pub fn builtin() -> Self {
        let categories = BUILTIN_CATEGORIES
            .iter()
            .map(|(tag, keywords)| TagCategory {
                tag: tag.to_string(),
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
            })
            .collect();
        Self {
            version: BUILTIN_VERSION.to_string(),
            categories,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Tags whose keywords occur in `text`.
    ///
    /// When more than [`MAX_TAGS`] categories match, the ones with the most
    /// keyword hits are kept; ties go to the category listed first.
    pub fn generate(&self, text: &str) -> TagSet {
        let lower = text.to_lowercase();

        let mut matched: Vec<(usize, &str)> = self
            .categories
            .iter()
            .filter_map(|c| {
                let hits: usize = c.keywords.iter().map(|k| keyword_hits(&lower, k)).sum();
                (hits > 0).then_some((hits, c.tag.as_str()))
            })
            .collect();
        // Stable sort keeps table order among equal hit counts
        matched.sort_by(|a, b| b.0.cmp(&a.0));

        let mut tags: Vec<&str> = Vec::with_capacity(MAX_TAGS);
        for (_, tag) in matched {
            if tags.len() == MAX_TAGS {
                break;
            }
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        TagSet::new(tags).unwrap_or_default()
    }
}

impl Default for TagTable {
    fn default() -> Self {
        Self::builtin()
    }
}

const BUILTIN_VERSION: &str = "builtin-2025.1";

const BUILTIN_CATEGORIES: &[(&str, &[&str])] = &[
    ("budget", &["budget", "fiscal", "taxation", "finance minister", "revenue"]),
    ("modi", &["modi", "prime minister"]),
    ("government", &["government", "ministry", "policy", "scheme", "cabinet"]),
    ("election", &["election", "voting", "polls", "campaign", "bjp", "congress", "aap"]),
    ("economy", &["economy", "gdp", "growth", "inflation", "rbi", "recession"]),
    ("tax", &["tax", "gst", "income tax", "customs duty", "excise duty"]),
    ("rupee", &["rupee", "currency", "forex", "exchange rate"]),
    ("stock-market", &["stock market", "stock", "share market", "nifty", "sensex", "bse", "nse"]),
    ("banking", &["bank", "loan", "credit", "deposit", "interest rate"]),
    ("startup", &["startup", "unicorn", "venture capital", "entrepreneur"]),
    ("real-estate", &["property", "real estate", "housing", "realty"]),
    ("automobile", &["car", "vehicle", "automobile", "ev", "electric vehicle"]),
    ("tech", &["technology", "ai", "software", "digital", "internet"]),
    ("infrastructure", &["infrastructure", "road", "highway", "metro", "railway"]),
    ("airport", &["airport", "aviation", "airline", "flight"]),
    ("education", &["education", "school", "university", "student", "exam"]),
    ("healthcare", &["health", "hospital", "medical", "doctor", "treatment"]),
    ("employment", &["job", "employment", "unemployment", "salary", "wage"]),
    ("court", &["supreme court", "high court", "judge", "verdict", "bail"]),
    ("crime", &["crime", "police", "arrest", "murder", "theft"]),
    ("climate", &["climate", "environment", "pollution", "emission"]),
    ("disaster", &["flood", "earthquake", "cyclone", "disaster", "emergency"]),
    ("cricket", &["cricket", "bcci", "ipl", "test match", "odi"]),
    ("olympics", &["olympic", "olympics", "medal", "athlete"]),
    ("bollywood", &["bollywood", "film", "movie", "actor", "actress"]),
    ("defence", &["defence", "defense", "army", "navy", "air force", "military"]),
    ("diplomacy", &["diplomat", "diplomatic", "embassy", "bilateral", "summit", "foreign minister"]),
    ("agriculture", &["farmer", "agriculture", "crop", "harvest", "msp", "monsoon"]),
    ("energy", &["energy", "power plant", "solar", "coal", "crude oil", "electricity"]),
    ("space", &["isro", "nasa", "satellite", "rocket", "space mission"]),
    ("telecom", &["telecom", "5g", "spectrum", "broadband", "mobile network"]),
    ("cybersecurity", &["cyber attack", "cybersecurity", "data breach", "hacker", "ransomware"]),
    ("trade", &["export", "import", "tariff", "trade deal", "trade deficit"]),
    ("football", &["football", "fifa", "premier league", "isl"]),
];
