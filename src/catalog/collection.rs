// Collection handle -> provider id resolution, awaited before any
// collection-scoped listing is composed.

use std::collections::HashMap;

use catalog_client::{GraphqlRequest, GraphqlTransport};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::catalog::fetcher::FetchFailure;

const COLLECTION_BY_HANDLE: &str =
    "query CollectionByHandle($handle: String!) { collection(handle: $handle) { id } }";

/// Provider-internal collection identifier (e.g. a global id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(String);

impl CollectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Resolves human-facing handles and remembers hits. Misses are not cached,
/// so a collection published later becomes visible without a restart.
pub struct CollectionResolver<T> {
    transport: T,
    cache: Mutex<HashMap<String, CollectionId>>,
}

impl<T: GraphqlTransport> CollectionResolver<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, handle: &str) -> Result<CollectionId, FetchFailure> {
        let handle = handle.trim();
        if handle.is_empty() {
            return Err(FetchFailure::CollectionNotFound(String::new()));
        }
        if let Some(id) = self.cache.lock().await.get(handle) {
            return Ok(id.clone());
        }

        let request = GraphqlRequest::new(COLLECTION_BY_HANDLE, json!({ "handle": handle }))
            .with_operation_name("CollectionByHandle");
        let resp = self.transport.execute(&request).await?;
        if resp.has_errors() {
            return Err(FetchFailure::Provider(resp.errors));
        }

        let id = resp
            .data
            .as_ref()
            .and_then(|d| d.pointer("/collection/id"))
            .and_then(|v| v.as_str())
            .map(CollectionId::new);
        match id {
            Some(id) => {
                debug!(handle, id = %id.as_str(), "resolved collection handle");
                self.cache
                    .lock()
                    .await
                    .insert(handle.to_string(), id.clone());
                Ok(id)
            }
            None => {
                warn!(handle, "collection handle did not resolve");
                Err(FetchFailure::CollectionNotFound(handle.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::StubTransport;
    use std::sync::Arc;

    #[tokio::test]
    async fn resolves_and_caches_handle() {
        let stub = Arc::new(StubTransport::always(json!({
            "data": { "collection": { "id": "gid://shop/Collection/42" } }
        })));
        let resolver = CollectionResolver::new(stub.clone());

        let first = resolver.resolve("summer-sale").await.unwrap();
        let second = resolver.resolve(" summer-sale ").await.unwrap();
        assert_eq!(first, CollectionId::new("gid://shop/Collection/42"));
        assert_eq!(first, second);
        assert_eq!(stub.request_count(), 1);
        assert_eq!(stub.requests()[0].variables["handle"], "summer-sale");
    }

    #[tokio::test]
    async fn unknown_handle_is_not_cached() {
        let stub = Arc::new(StubTransport::always(json!({ "data": { "collection": null } })));
        let resolver = CollectionResolver::new(stub.clone());

        for _ in 0..2 {
            let err = resolver.resolve("missing").await.unwrap_err();
            assert!(matches!(err, FetchFailure::CollectionNotFound(ref h) if h == "missing"));
        }
        assert_eq!(stub.request_count(), 2);
    }

    #[tokio::test]
    async fn blank_handle_skips_the_network() {
        let stub = Arc::new(StubTransport::always(json!({ "data": {} })));
        let resolver = CollectionResolver::new(stub.clone());
        assert!(resolver.resolve("  ").await.is_err());
        assert_eq!(stub.request_count(), 0);
    }
}
