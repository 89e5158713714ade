//! Artist and track matching between a query and a fetched release.
//!
//! All comparisons run on [`match_key`] values, so they are case-insensitive
//! and insensitive to diacritics and punctuation.

use crate::models::{ArtistCredit, Query, ReleaseDetail, Track};
use crate::normalizer::{match_key, strip_disambiguation};

/// Decides whether a release satisfies a query's artist and track constraints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseMatcher {
    /// Every spelling of the query artist; empty when the query has no artist constraint
    artist_keys: Vec<String>,
    track_key: Option<String>,
    compilation: bool,
}

impl ReleaseMatcher {
    pub fn for_query(query: &Query) -> Self {
        let artist_keys = if query.has_artist_constraint() {
            query.artist().map(artist_spellings).unwrap_or_default()
        } else {
            Vec::new()
        };

        Self {
            artist_keys,
            track_key: query.track().map(match_key).filter(|key| !key.is_empty()),
            compilation: query.format_kind().is_compilation(),
        }
    }

    pub fn has_artist_constraint(&self) -> bool {
        !self.artist_keys.is_empty()
    }

    /// True when the release is a match for the query
    pub fn matches(&self, release: &ReleaseDetail) -> bool {
        let release_artist_match = !self.has_artist_constraint()
            || self.any_credit_matches(release.artists.iter().chain(&release.extra_artists));

        let Some(track_key) = self.track_key.as_deref() else {
            return release_artist_match;
        };

        let enforce_track_artists = self.has_artist_constraint()
            && release.tracklist.iter().any(|track| !track.artists.is_empty());

        release.tracklist.iter().any(|track| {
            if !track_title_matches(track, track_key) {
                return false;
            }
            let track_artist_match = self.any_credit_matches(&track.artists);
            if enforce_track_artists && !track_artist_match {
                return false;
            }
            // Compilations credit the searched artist on the track, not the release
            release_artist_match || (self.compilation && track_artist_match)
        })
    }

    fn any_credit_matches<'a>(&self, credits: impl IntoIterator<Item = &'a ArtistCredit>) -> bool {
        credits
            .into_iter()
            .flat_map(|credit| credit.spellings())
            .map(|name| match_key(strip_disambiguation(name)))
            .any(|name| self.artist_keys.contains(&name))
    }
}

fn track_title_matches(track: &Track, track_key: &str) -> bool {
    let title = match_key(&track.title);
    !title.is_empty() && title.contains(track_key)
}

/// Query-side spellings: the artist as given, plus with or without a leading "The"
fn artist_spellings(artist: &str) -> Vec<String> {
    let key = match_key(strip_disambiguation(artist));
    if key.is_empty() {
        return Vec::new();
    }

    let alternate = match key.strip_prefix("the ") {
        Some(rest) => rest.to_string(),
        None => format!("the {key}"),
    };
    vec![key, alternate]
}
