//! Result sets produced by the orchestrator and their grouped presentation form.

use serde::Serialize;
use std::collections::HashMap;

use crate::error::AggregatorError;
use crate::models::{CatalogEntry, Query};

/// Ordered entries produced for one physical query or merged for one query
pub type ResultSet = Vec<CatalogEntry>;

/// One output slot of a batch, tied to the original (non-expanded) query
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub query: Query,
    pub entries: ResultSet,
    /// Set when the query's top-level task failed unexpectedly or was rejected
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_failure")]
    pub failure: Option<AggregatorError>,
}

fn serialize_failure<S>(failure: &Option<AggregatorError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match failure {
        Some(error) => serializer.serialize_some(&error.to_string()),
        None => serializer.serialize_none(),
    }
}

impl QueryResult {
    pub fn new(query: Query, entries: ResultSet) -> Self {
        Self {
            query,
            entries,
            failure: None,
        }
    }

    pub fn failed(query: Query, failure: AggregatorError) -> Self {
        Self {
            query,
            entries: Vec::new(),
            failure: Some(failure),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Entries of one query grouped by title, plus the cheapest entry overall
#[derive(Debug, Clone, Serialize)]
pub struct GroupedResult {
    pub query: Query,
    pub groups: HashMap<String, Vec<CatalogEntry>>,
    pub cheapest: Option<CatalogEntry>,
}

impl GroupedResult {
    pub fn entry_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}
