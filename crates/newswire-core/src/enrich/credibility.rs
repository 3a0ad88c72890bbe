use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::article::ArticleDraft;
use crate::text::keyword_hits;
use crate::{Error, Result};

/// Point adjustments applied by [`CredibilityScorer`].
///
/// Bonuses are added and penalties subtracted, so every value here is a
/// non-negative magnitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Starting score before any signal
    pub baseline: f64,
    pub trusted_source: f64,
    pub low_quality_source: f64,
    /// Charged once per distinct clickbait pattern
    pub suspicious_pattern: f64,
    pub max_suspicious_patterns: u32,
    /// Charged when the description is empty or shorter than `min_description_len`
    pub short_description: f64,
    /// Awarded when the description reaches `rich_description_len`
    pub rich_description: f64,
    pub min_description_len: usize,
    pub rich_description_len: usize,
    pub image_present: f64,
    pub image_missing: f64,
    /// Charged when more than half of the title's letters are uppercase
    pub caps_penalty: f64,
    /// Titles with fewer letters than this are never caps-penalized
    pub caps_min_letters: usize,
    /// Charged for a run of two or more `!`/`?` in the title
    pub punctuation_penalty: f64,
    pub https_bonus: f64,
    pub insecure_penalty: f64,
    pub suspicious_tld: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            baseline: 50.0,
            trusted_source: 30.0,
            low_quality_source: 20.0,
            suspicious_pattern: 20.0,
            max_suspicious_patterns: 2,
            short_description: 10.0,
            rich_description: 10.0,
            min_description_len: 40,
            rich_description_len: 100,
            image_present: 5.0,
            image_missing: 5.0,
            caps_penalty: 15.0,
            caps_min_letters: 8,
            punctuation_penalty: 10.0,
            https_bonus: 5.0,
            insecure_penalty: 5.0,
            suspicious_tld: 10.0,
        }
    }
}

impl ScoringWeights {
    /// Reject NaN or infinite point values, which would poison every score
    pub fn validate(&self) -> Result<()> {
        let points = [
            ("baseline", self.baseline),
            ("trusted_source", self.trusted_source),
            ("low_quality_source", self.low_quality_source),
            ("suspicious_pattern", self.suspicious_pattern),
            ("short_description", self.short_description),
            ("rich_description", self.rich_description),
            ("image_present", self.image_present),
            ("image_missing", self.image_missing),
            ("caps_penalty", self.caps_penalty),
            ("punctuation_penalty", self.punctuation_penalty),
            ("https_bonus", self.https_bonus),
            ("insecure_penalty", self.insecure_penalty),
            ("suspicious_tld", self.suspicious_tld),
        ];
        match points.iter().find(|(_, value)| !value.is_finite()) {
            Some((name, value)) => Err(Error::Config(format!(
                "scoring weight {} must be a finite number, got {}",
                name, value
            ))),
            None => Ok(()),
        }
    }
}

const SUSPICIOUS_PATTERNS: &[&str] = &[
    r"\bshocking\b",
    r"\byou won'?t believe\b",
    r"\bmind[- ]?blowing\b",
    r"\b100%",
    r"\bguaranteed\b",
    r"\bmiracle\b",
    r"\bsecrets?\b",
    r"\bexclusive leak\b",
    r"\bunconfirmed\b",
    r"\brumou?rs?\b",
];

const SUSPICIOUS_TLDS: &[&str] = &["xyz", "top", "click", "link", "buzz", "info"];

/// Rule-based 0-100 trust estimate for a draft
#[derive(Debug, Clone)]
pub struct CredibilityScorer {
    weights: ScoringWeights,
    trusted: Vec<String>,
    low_quality: Vec<String>,
    patterns: Vec<Regex>,
    punctuation: Regex,
}

impl CredibilityScorer {
    pub fn new(weights: ScoringWeights, trusted: &[String], low_quality: &[String]) -> Self {
        let normalize = |list: &[String]| -> Vec<String> {
            list.iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };

        let patterns = SUSPICIOUS_PATTERNS
            .iter()
            .map(|p| Regex::new(&format!("(?i){}", p)).expect("valid suspicious pattern"))
            .collect();
        let punctuation = Regex::new(r"[!?]{2,}").expect("valid punctuation regex");

        Self {
            weights,
            trusted: normalize(trusted),
            low_quality: normalize(low_quality),
            patterns,
            punctuation,
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn score(&self, draft: &ArticleDraft) -> f64 {
        let w = &self.weights;
        let host = Url::parse(&draft.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()));
        let source_name = draft.source_name.to_lowercase();

        let mut score = w.baseline;

        if matches_any(&self.trusted, host.as_deref(), &source_name) {
            score += w.trusted_source;
        } else if matches_any(&self.low_quality, host.as_deref(), &source_name) {
            score -= w.low_quality_source;
        }

        let suspicious = self
            .patterns
            .iter()
            .filter(|p| p.is_match(&draft.title) || p.is_match(&draft.description))
            .count()
            .min(w.max_suspicious_patterns as usize);
        score -= w.suspicious_pattern * suspicious as f64;

        let description_len = draft.description.chars().count();
        if description_len < w.min_description_len {
            score -= w.short_description;
        } else if description_len >= w.rich_description_len {
            score += w.rich_description;
        }

        if draft.image_url.is_some() {
            score += w.image_present;
        } else {
            score -= w.image_missing;
        }

        if shouts(&draft.title, w.caps_min_letters) {
            score -= w.caps_penalty;
        }

        if self.punctuation.is_match(&draft.title) {
            score -= w.punctuation_penalty;
        }

        if draft.url.to_lowercase().starts_with("https://") {
            score += w.https_bonus;
        } else {
            score -= w.insecure_penalty;
        }

        let bad_tld = host
            .as_deref()
            .and_then(|h| h.rsplit('.').next())
            .is_some_and(|tld| SUSPICIOUS_TLDS.contains(&tld));
        if bad_tld {
            score -= w.suspicious_tld;
        }

        (score.clamp(0.0, 100.0) * 10.0).round() / 10.0
    }
}

/// True if any list entry names the article's host (or a parent domain of
/// it) or appears as a whole word in the source name
fn matches_any(list: &[String], host: Option<&str>, source_name: &str) -> bool {
    list.iter().any(|entry| {
        let domain_match = host.is_some_and(|h| {
            h == entry || h.strip_suffix(entry.as_str()).is_some_and(|p| p.ends_with('.'))
        });
        domain_match || keyword_hits(source_name, entry) > 0
    })
}

fn shouts(title: &str, min_letters: usize) -> bool {
    let (letters, upper) = title
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0usize, 0usize), |(n, u), c| (n + 1, u + usize::from(c.is_uppercase())));
    letters >= min_letters && upper * 2 > letters
}
