//! Query expansion: one user query into the physical queries actually searched.

use crate::models::{Format, PhysicalQuery, Query};
use crate::normalizer::normalize_query;

/// Expand a query into normalized physical queries
///
/// The umbrella vinyl format produces one physical query per variant; every
/// other format produces exactly one.
pub fn expand(query: &Query, vinyl_variants: &[String]) -> Vec<PhysicalQuery> {
    let variants: Vec<Query> = match query.format_kind() {
        Format::AllVinyl if !vinyl_variants.is_empty() => vinyl_variants
            .iter()
            .map(|variant| query.with_format(variant.as_str()))
            .collect(),
        _ => vec![query.clone()],
    };

    variants
        .iter()
        .map(|variant| PhysicalQuery::new(normalize_query(variant)))
        .collect()
}
