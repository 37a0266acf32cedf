// Page fetcher: send a composed listing query and normalize the answer into
// one Connection<Product>, whatever scope produced it.

use catalog_client::{format_graphql_errors, ClientError, GraphqlError, GraphqlTransport};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::connection::{Connection, Product};
use crate::catalog::filter::Scope;
use crate::catalog::query::{ComposeError, ComposedQuery};

#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("transport: {0}")]
    Transport(#[from] ClientError),
    #[error("provider errors: {}", format_graphql_errors(.0))]
    Provider(Vec<GraphqlError>),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("collection not found: {0:?}")]
    CollectionNotFound(String),
    #[error("compose: {0}")]
    Compose(#[from] ComposeError),
}

impl FetchFailure {
    /// Provider error codes (`extensions.code`), empty for non-provider failures.
    pub fn provider_codes(&self) -> Vec<&str> {
        match self {
            FetchFailure::Provider(errors) => errors.iter().filter_map(GraphqlError::code).collect(),
            _ => Vec::new(),
        }
    }
}

/// Fail-open policy shared by every rendering path: a failure is logged and
/// becomes an empty, final page.
pub fn or_empty(
    scope: Scope,
    result: Result<Connection<Product>, FetchFailure>,
) -> Connection<Product> {
    match result {
        Ok(conn) => conn,
        Err(err) => {
            warn!(
                scope = %scope,
                error = %err,
                codes = ?err.provider_codes(),
                "listing failed; serving empty page"
            );
            Connection::empty()
        }
    }
}

/// Where each scope's connection lives inside `data`.
fn connection_pointer(scope: Scope) -> &'static str {
    match scope {
        Scope::Root => "/products",
        Scope::Collection => "/collection/products",
    }
}

/// Pull the connection for `scope` out of a response's `data` object.
pub fn extract_connection(scope: Scope, data: &Value) -> Result<Connection<Product>, FetchFailure> {
    let pointer = connection_pointer(scope);
    let raw = data
        .pointer(pointer)
        .filter(|v| !v.is_null())
        .ok_or_else(|| FetchFailure::Malformed(format!("missing {pointer} in response data")))?;
    let conn: Connection<Product> = serde_json::from_value(raw.clone())
        .map_err(|e| FetchFailure::Malformed(format!("{pointer}: {e}")))?;
    Ok(conn.normalized())
}

pub struct PageFetcher<T> {
    transport: T,
}

impl<T: GraphqlTransport> PageFetcher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch one page, reporting failures. Safe to retry: nothing but the
    /// returned value depends on the call.
    pub async fn try_fetch_page(
        &self,
        query: &ComposedQuery,
    ) -> Result<Connection<Product>, FetchFailure> {
        let resp = self.transport.execute(&query.to_request()).await?;
        if resp.has_errors() {
            return Err(FetchFailure::Provider(resp.errors));
        }
        let data = resp
            .data
            .ok_or_else(|| FetchFailure::Malformed("response has neither data nor errors".into()))?;
        let conn = extract_connection(query.scope, &data)?;
        debug!(
            op = query.operation_name,
            scope = %query.scope,
            edges = conn.len(),
            has_next = conn.page_info.has_next_page,
            "fetched listing page"
        );
        Ok(conn)
    }

    /// Fail-open variant of [`Self::try_fetch_page`].
    pub async fn fetch_page(&self, query: &ComposedQuery) -> Connection<Product> {
        or_empty(query.scope, self.try_fetch_page(query).await)
    }
}
