use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::article::Category;
use crate::{Error, Result};

/// Continent a source reports on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Continent {
    #[serde(rename = "AF")]
    Africa,
    #[serde(rename = "AS")]
    Asia,
    #[serde(rename = "EU")]
    Europe,
    #[serde(rename = "NA")]
    NorthAmerica,
    #[serde(rename = "SA")]
    SouthAmerica,
    #[serde(rename = "OC")]
    Oceania,
    #[default]
    #[serde(rename = "GL")]
    Global,
}

impl Continent {
    pub const ALL: [Continent; 7] = [
        Self::Africa,
        Self::Asia,
        Self::Europe,
        Self::NorthAmerica,
        Self::SouthAmerica,
        Self::Oceania,
        Self::Global,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Africa => "AF",
            Self::Asia => "AS",
            Self::Europe => "EU",
            Self::NorthAmerica => "NA",
            Self::SouthAmerica => "SA",
            Self::Oceania => "OC",
            Self::Global => "GL",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Africa => "Africa",
            Self::Asia => "Asia",
            Self::Europe => "Europe",
            Self::NorthAmerica => "North America",
            Self::SouthAmerica => "South America",
            Self::Oceania => "Oceania",
            Self::Global => "Global",
        }
    }
}

impl fmt::Display for Continent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Continent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Other(format!("Unknown continent code: {}", s)))
    }
}

/// A configured feed endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub continent: Continent,
    /// Fixed category for section feeds; `None` means infer from keywords
    pub category: Option<Category>,
    pub is_active: bool,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub fetch_count: u32,
    pub error_count: u32,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Source {
    /// Check if the last fetch failed
    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }
}

/// Data required to register a new source
#[derive(Debug, Clone)]
pub struct NewSource {
    pub name: String,
    pub url: String,
    pub continent: Continent,
    pub category: Option<Category>,
    pub is_active: bool,
}

/// One entry exactly as the feed described it, before normalization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    /// Outlet an aggregated item was taken from (`<source>` in RSS), as a
    /// URL or a name
    pub origin: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continent_codes_round_trip_through_from_str() {
        for continent in Continent::ALL {
            assert_eq!(continent.code().parse::<Continent>().unwrap(), continent);
        }
        assert_eq!("na".parse::<Continent>().unwrap(), Continent::NorthAmerica);
        assert!("XX".parse::<Continent>().is_err());
    }
}
