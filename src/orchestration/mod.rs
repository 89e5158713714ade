//! # Orchestration
//!
//! Batch-level coordination: query expansion, bounded worker pools, and the
//! [`QueryOrchestrator`] that fans physical queries out to the search
//! pipeline and fans their results back in.

pub mod expansion;
pub mod orchestrator;
pub mod pools;

pub use expansion::expand;
pub use orchestrator::{BatchOptions, QueryOrchestrator};
pub use pools::{WorkerPool, WorkerPoolConfig, WorkerPoolStats, WorkerPools};
