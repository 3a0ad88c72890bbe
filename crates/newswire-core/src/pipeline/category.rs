use serde::{Deserialize, Serialize};

use crate::article::Category;
use crate::text::keyword_hits;
use crate::{Error, Result};

/// One category and the keywords that file an article under it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: Category,
    pub keywords: Vec<String>,
}

/// Ordered keyword rules for filing an article under a [`Category`].
///
/// Rules are checked top to bottom and the first one with any keyword in
/// the text wins, so narrower sections (budget) sit above broader ones
/// (business, world).
#[derive(Debug, Clone)]
pub struct CategoryTable {
    version: String,
    rules: Vec<CategoryRule>,
}

impl CategoryTable {
    /// Build a table, lowercasing keywords.
    ///
    /// Returns [`Error::Config`] for a rule without keywords.
    pub fn new(version: impl Into<String>, rules: Vec<CategoryRule>) -> Result<Self> {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let keywords: Vec<String> = rule
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                if keywords.is_empty() {
                    return Err(Error::Config(format!(
                        "category rule {} has no keywords",
                        rule.category.as_str()
                    )));
                }
                Ok(CategoryRule {
                    category: rule.category,
                    keywords,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            version: version.into(),
            rules,
        })
    }

    pub fn builtin() -> Self {
        let rules = BUILTIN_RULES
            .iter()
            .map(|(category, keywords)| CategoryRule {
                category: *category,
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
            })
            .collect();
        Self {
            version: BUILTIN_VERSION.to_string(),
            rules,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// First matching category for already-lowercased text, if any
    pub fn classify(&self, text_lower: &str) -> Option<Category> {
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| keyword_hits(text_lower, k) > 0))
            .map(|rule| rule.category)
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::builtin()
    }
}

const BUILTIN_VERSION: &str = "builtin-2025.1";

const BUILTIN_RULES: &[(Category, &[&str])] = &[
    (
        Category::Budget,
        &[
            "union budget", "budget session", "budget speech", "interim budget",
            "tax slab", "income tax slab", "customs duty", "railway budget",
            "fiscal deficit target", "budget allocation", "budget estimate",
        ],
    ),
    (
        Category::Sports,
        &[
            "cricket", "ipl", "bcci", "test match", "odi", "t20", "football",
            "fifa", "premier league", "la liga", "bundesliga", "champions league",
            "tennis", "wimbledon", "badminton", "golf", "formula 1", "olympics",
            "paralympics", "commonwealth games", "asian games", "nba", "nfl",
            "hockey", "kabaddi", "wrestling", "boxing", "ufc", "athletics",
            "marathon", "chess", "wicket", "innings", "hat trick",
            "transfer window", "league table",
        ],
    ),
    (
        Category::Health,
        &[
            "covid", "coronavirus", "vaccine", "vaccination", "pandemic",
            "epidemic", "outbreak", "dengue", "malaria", "tuberculosis", "hiv",
            "cancer treatment", "chemotherapy", "hospital", "icu", "aiims",
            "health ministry", "clinical trial", "drug approval", "antibiotic",
            "mental health", "diabetes", "hypertension", "heart disease",
            "cardiac arrest", "obesity", "nutrition",
        ],
    ),
    (
        Category::Technology,
        &[
            "artificial intelligence", "machine learning", "chatgpt", "openai",
            "generative ai", "large language model", "llm", "smartphone",
            "iphone", "android", "semiconductor", "microchip", "gpu",
            "quantum computing", "cybersecurity", "data breach", "ransomware",
            "malware", "cloud computing", "software update", "app store",
            "social media", "electric vehicle", "autonomous vehicle", "robotics",
            "5g network", "blockchain", "cryptocurrency", "bitcoin", "ethereum",
            "startup funding", "silicon valley", "tech layoff",
        ],
    ),
    (
        Category::Science,
        &[
            "isro", "chandrayaan", "gaganyaan", "nasa", "spacex", "rocket launch",
            "satellite", "black hole", "telescope", "exoplanet", "solar flare",
            "eclipse", "climate change", "global warming", "carbon emission",
            "renewable energy", "research paper", "scientific study",
            "archaeology", "fossil", "dinosaur", "genome", "crispr", "stem cell",
            "particle physics", "cern", "biodiversity", "endangered species",
            "volcano",
        ],
    ),
    (
        Category::Entertainment,
        &[
            "bollywood", "hollywood", "tollywood", "box office", "film release",
            "movie review", "ott release", "netflix", "web series", "tv show",
            "reality show", "bigg boss", "oscar", "grammy", "bafta", "cannes",
            "filmfare", "golden globe", "actor", "actress", "celebrity",
            "music album", "song release", "music video", "concert tour",
            "fashion week", "met gala", "red carpet", "booker prize",
        ],
    ),
    (
        Category::Business,
        &[
            "sensex", "nifty", "bse", "nse", "stock market", "share price",
            "ipo", "market cap", "bear market", "repo rate", "monetary policy",
            "gdp growth", "inflation rate", "trade deficit", "forex reserve",
            "merger", "acquisition", "takeover", "quarterly result",
            "earnings report", "net profit", "venture capital", "private equity",
            "gst collection", "sebi", "insolvency", "bankruptcy", "real estate",
            "housing market", "crude oil", "oil price", "fuel price", "gold price",
            "commodity market", "tariff", "trade war",
        ],
    ),
    (
        Category::World,
        &[
            "war", "ceasefire", "peace deal", "sanctions", "geopolitics",
            "united nations", "security council", "nato", "eu summit",
            "g20 summit", "g7 summit", "brics summit", "general election",
            "coup", "civil unrest", "refugee", "border dispute",
            "nuclear weapon", "missile strike", "airstrike", "hamas",
            "hezbollah", "taliban", "climate summit", "paris agreement",
            "world bank", "imf",
        ],
    ),
];
