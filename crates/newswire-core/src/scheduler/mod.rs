mod ingestor;
mod service;

pub use ingestor::{Ingestor, RunSummary, SourceReport};
pub use service::{SchedulerEvent, SchedulerService};
