//! Per-query search: catalog lookup, release matching and price enrichment.

pub mod matcher;
pub mod pipeline;

pub use matcher::ReleaseMatcher;
pub use pipeline::SearchPipeline;
