pub mod articles;
pub mod daemon;
pub mod refresh;
pub mod sources;
