pub mod article;
pub mod config;
pub mod enrich;
pub mod error;
pub mod feed;
pub mod pipeline;
pub mod scheduler;
pub mod storage;
mod text;

pub use config::AppConfig;
pub use error::{Error, Result};
