mod client;
mod models;
mod parser;

pub use client::{FeedClient, FeedSource, FetchFailure, FetchOutcome};
pub use models::{Continent, NewSource, RawEntry, Source};
pub use parser::{parse_feed, RawEntries};
