//! Input validation for user queries
//!
//! Boundary checks applied before a query reaches the orchestrator. The core
//! assumes these invariants hold and never re-checks them.

use crate::error::{AggregatorError, AggregatorResult};
use crate::models::Query;

/// Maximum accepted length of any free-text query field
const MAX_FIELD_LENGTH: usize = 512;

/// Validates one query against the data-model invariants
pub fn validate_query(query: &Query) -> AggregatorResult<()> {
    if query.format_kind().is_compilation() && query.track().is_none() && query.album().is_none()
    {
        return Err(AggregatorError::Validation(
            "compilation searches need a track or an album".to_string(),
        ));
    }

    if let Some(barcode) = &query.barcode {
        if barcode.trim().is_empty() {
            return Err(AggregatorError::Validation(
                "barcode must not be blank when supplied".to_string(),
            ));
        }
    }

    for (name, value) in [
        ("artist", &query.artist),
        ("album", &query.album),
        ("track", &query.track),
        ("title", &query.title),
    ] {
        if let Some(value) = value {
            if value.chars().count() > MAX_FIELD_LENGTH {
                return Err(AggregatorError::Validation(format!(
                    "{name} too long: {} chars (max: {MAX_FIELD_LENGTH})",
                    value.chars().count()
                )));
            }
        }
    }

    if [
        query.artist(),
        query.album(),
        query.track(),
        query.title(),
        query.barcode(),
    ]
    .iter()
    .all(Option::is_none)
    {
        return Err(AggregatorError::Validation(
            "query has no searchable field".to_string(),
        ));
    }

    Ok(())
}
