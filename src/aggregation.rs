//! # Result Aggregation
//!
//! Presentation shaping for finished result sets: grouping entries by title
//! with the cheapest entry found in the same pass, and identity-based
//! deduplication within each grouped result.

use std::collections::{HashMap, HashSet};

use crate::models::{CatalogEntry, GroupedResult, QueryResult};

/// Group a query's entries by title and find the cheapest priced entry
///
/// Within a group, input order is preserved. Entries without a price never
/// become the cheapest entry.
pub fn group(result: &QueryResult) -> GroupedResult {
    let (groups, cheapest) = result.entries.iter().fold(
        (HashMap::<String, Vec<CatalogEntry>>::new(), None::<&CatalogEntry>),
        |(mut groups, cheapest), entry| {
            groups
                .entry(entry.title.clone())
                .or_default()
                .push(entry.clone());

            let cheapest = match (cheapest, entry.lowest_price) {
                (Some(current), Some(price))
                    if current.lowest_price.is_some_and(|best| best <= price) =>
                {
                    Some(current)
                }
                (current, None) => current,
                (_, Some(_)) => Some(entry),
            };
            (groups, cheapest)
        },
    );

    GroupedResult {
        query: result.query.clone(),
        groups,
        cheapest: cheapest.cloned(),
    }
}

/// Remove duplicate entries by id within each grouped result
///
/// The first occurrence wins. Each grouped result keeps its own seen-set, so
/// the same release may still appear under two different queries.
pub fn dedupe(results: &mut [GroupedResult]) {
    for result in results.iter_mut() {
        let mut seen = HashSet::new();

        // Sorted keys give "first occurrence" a stable meaning across groups
        let mut titles: Vec<String> = result.groups.keys().cloned().collect();
        titles.sort();

        for title in titles {
            if let Some(entries) = result.groups.get_mut(&title) {
                entries.retain(|entry| seen.insert(entry.id));
            }
        }
        result.groups.retain(|_, entries| !entries.is_empty());
    }
}

/// Group every slot of a batch, then deduplicate
pub fn group_all(results: &[QueryResult]) -> Vec<GroupedResult> {
    let mut grouped: Vec<GroupedResult> = results.iter().map(group).collect();
    dedupe(&mut grouped);
    grouped
}
