mod article_repo;
mod database;
pub mod retry;
mod source_repo;

pub use article_repo::{ArticleFilter, ArticleRepository, DEFAULT_LIMIT};
pub use database::Database;
pub use source_repo::SourceRepository;
