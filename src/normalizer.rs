//! # Text Normalization
//!
//! Canonicalizes free-text query and catalog fields so they can be compared:
//! diacritics are stripped through canonical decomposition, a fixed set of
//! punctuation is removed or replaced, and whitespace is collapsed.
//!
//! Normalization is deterministic and idempotent.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::Query;

/// Characters dropped outright
const REMOVED_CHARS: &[char] = &[
    '\'', '\u{2019}', '\u{2018}', '`', '.', ',', '!', '?', '"', '(', ')', '[', ']', ':', ';',
];

/// Characters that separate words and become a space
const SEPARATOR_CHARS: &[char] = &['-', '\u{2010}', '\u{2013}', '\u{2014}', '/', '_'];

/// Normalize one free-text value
///
/// `None` stays `None`, so absent fields pass through untouched.
pub fn normalize(text: Option<&str>) -> Option<String> {
    text.map(normalize_str)
}

/// Normalize a present value
pub fn normalize_str(text: &str) -> String {
    let stripped: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| !REMOVED_CHARS.contains(c))
        .map(|c| if SEPARATOR_CHARS.contains(&c) { ' ' } else { c })
        .nfc()
        .collect();

    // A standalone "&" between two words reads as "and". Working on tokens
    // rewrites adjacent ampersands in one pass.
    let words: Vec<&str> = stripped.split_whitespace().collect();
    let last = words.len().saturating_sub(1);
    words
        .iter()
        .enumerate()
        .map(|(i, word)| match *word {
            "&" if i > 0 && i < last => "and",
            other => other,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize every free-text field of a query
///
/// The artist loses any catalog disambiguation suffix first, since punctuation
/// removal would otherwise fold `"Nirvana (2)"` into `"Nirvana 2"`. Format,
/// country, catalog type and barcode are copied unchanged.
pub fn normalize_query(query: &Query) -> Query {
    Query {
        artist: normalize(query.artist.as_deref().map(strip_disambiguation)),
        album: normalize(query.album.as_deref()),
        track: normalize(query.track.as_deref()),
        title: normalize(query.title.as_deref()),
        ..query.clone()
    }
}

/// Drop a catalog disambiguation suffix such as `" (2)"`
pub fn strip_disambiguation(name: &str) -> &str {
    let trimmed = name.trim_end();
    trimmed
        .strip_suffix(')')
        .and_then(|rest| rest.rsplit_once(" ("))
        .filter(|(_, digits)| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
        .map_or(trimmed, |(base, _)| base)
}

/// Lowercased comparison key
pub fn match_key(text: &str) -> String {
    normalize_str(text).to_lowercase()
}
