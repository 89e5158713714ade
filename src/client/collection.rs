//! Collection ownership checks against the catalog's user collection endpoint.

use async_trait::async_trait;
use std::sync::Arc;

use crate::client::{CollectionLookup, Transport, UrlBuilder};
use crate::error::TransportError;

/// [`CollectionLookup`] over the catalog API
///
/// The per-release collection endpoint answers 404 when the user does not own
/// the release, which is reported as `Ok(false)` rather than a failure.
#[derive(Debug, Clone)]
pub struct TransportCollectionLookup {
    transport: Arc<dyn Transport>,
    urls: Arc<dyn UrlBuilder>,
}

impl TransportCollectionLookup {
    pub fn new(transport: Arc<dyn Transport>, urls: Arc<dyn UrlBuilder>) -> Self {
        Self { transport, urls }
    }
}

#[async_trait]
impl CollectionLookup for TransportCollectionLookup {
    async fn release_owned_by_user(
        &self,
        username: &str,
        release_id: u64,
    ) -> Result<bool, TransportError> {
        let url = self.urls.collection_url(username, release_id);
        match self.transport.get_json(&url).await {
            Ok(body) => Ok(body
                .get("releases")
                .and_then(|releases| releases.as_array())
                .is_some_and(|releases| !releases.is_empty())),
            Err(error) if error.is_not_found() => Ok(false),
            Err(error) => Err(error),
        }
    }
}
