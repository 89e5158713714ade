//! User search queries and the physical queries derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::formats;

/// One loosely specified music search, as received from a caller
///
/// Queries are immutable values: normalization and format expansion always
/// derive new copies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Query {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track: Option<String>,
    /// Free-text title search
    pub title: Option<String>,
    pub format: Option<String>,
    pub country: Option<String>,
    /// Catalog entity type, `release` when absent
    #[serde(rename = "type")]
    pub catalog_type: Option<String>,
    pub barcode: Option<String>,
}

/// Returns the trimmed value when the field is present and not blank
pub(crate) fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

impl Query {
    pub fn artist(&self) -> Option<&str> {
        present(&self.artist)
    }

    pub fn album(&self) -> Option<&str> {
        present(&self.album)
    }

    pub fn track(&self) -> Option<&str> {
        present(&self.track)
    }

    pub fn title(&self) -> Option<&str> {
        present(&self.title)
    }

    pub fn barcode(&self) -> Option<&str> {
        present(&self.barcode)
    }

    pub fn format_kind(&self) -> Format {
        Format::parse(self.format.as_deref())
    }

    /// True when the query restricts results to a specific artist
    ///
    /// Blank artists and "various"/"various artists" impose no constraint.
    pub fn has_artist_constraint(&self) -> bool {
        match self.artist() {
            None => false,
            Some(artist) => {
                let lowered = artist.to_lowercase();
                lowered != "various" && lowered != "various artists"
            }
        }
    }

    /// Copy of this query bound to a different format
    pub fn with_format(&self, format: impl Into<String>) -> Self {
        Self {
            format: Some(format.into()),
            ..self.clone()
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            ("artist", self.artist()),
            ("album", self.album()),
            ("track", self.track()),
            ("title", self.title()),
            ("format", present(&self.format)),
            ("barcode", self.barcode()),
        ]
        .iter()
        .filter_map(|(name, value)| value.map(|v| format!("{name}={v}")))
        .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Interpretation of a query's free-text format field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Format {
    /// No format restriction
    Any,
    /// Umbrella format that expands to every configured vinyl variant
    AllVinyl,
    /// Various-artists compilation
    Compilation,
    /// A concrete catalog format, passed through as-is
    Specific(String),
}

impl Format {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
            return Format::Any;
        };

        let lowered = value.to_lowercase();
        if formats::ALL_VINYL_ALIASES.contains(&lowered.as_str()) {
            Format::AllVinyl
        } else if formats::COMPILATION_ALIASES.contains(&lowered.as_str()) {
            Format::Compilation
        } else {
            Format::Specific(value.to_string())
        }
    }

    pub fn is_compilation(&self) -> bool {
        matches!(self, Format::Compilation)
    }

    /// Format value sent to the catalog search endpoint
    pub fn search_value(&self) -> Option<&str> {
        match self {
            Format::Any | Format::AllVinyl => None,
            Format::Compilation => Some(formats::COMPILATION),
            Format::Specific(value) => Some(value.as_str()),
        }
    }
}

/// A query bound to exactly one concrete format
///
/// Derived 1..N from a [`Query`] and discarded once its pipeline run completes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhysicalQuery {
    query: Query,
}

impl PhysicalQuery {
    pub fn new(query: Query) -> Self {
        Self { query }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn into_query(self) -> Query {
        self.query
    }

    pub fn format(&self) -> Format {
        self.query.format_kind()
    }
}

impl fmt::Display for PhysicalQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.query.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!(Format::parse(None), Format::Any);
        assert_eq!(Format::parse(Some("  ")), Format::Any);
        assert_eq!(Format::parse(Some("All Vinyl")), Format::AllVinyl);
        assert_eq!(Format::parse(Some("compilation")), Format::Compilation);
        assert_eq!(
            Format::parse(Some("CD")),
            Format::Specific("CD".to_string())
        );
    }

    #[test]
    fn test_artist_constraint() {
        let mut query = Query::default();
        assert!(!query.has_artist_constraint());

        query.artist = Some("Various".to_string());
        assert!(!query.has_artist_constraint());

        query.artist = Some("various artists".to_string());
        assert!(!query.has_artist_constraint());

        query.artist = Some("Burial".to_string());
        assert!(query.has_artist_constraint());
    }

    #[test]
    fn test_blank_fields_are_absent() {
        let query = Query {
            track: Some("   ".to_string()),
            album: Some(" Untrue ".to_string()),
            ..Default::default()
        };
        assert_eq!(query.track(), None);
        assert_eq!(query.album(), Some("Untrue"));
    }
}
