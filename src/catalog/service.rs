// End-to-end listing: params -> facets + sort -> (collection lookup) ->
// composed query -> page.

use catalog_client::GraphqlTransport;
use serde::Serialize;
use tracing::info;

use crate::catalog::collection::CollectionResolver;
use crate::catalog::connection::{Connection, Cursor, Product};
use crate::catalog::facets::encode_facets;
use crate::catalog::fetcher::{or_empty, FetchFailure, PageFetcher};
use crate::catalog::filter::{ListingKey, ListingParams, Scope};
use crate::catalog::query::{compose_query, ComposedQuery, ListingTarget, PageArgs, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::catalog::sort::map_sort;
use crate::util::env;

/// Listing tunables shared by the CLI and the HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingSettings {
    pub page_size: u32,
    /// Items loaded by visibility triggers before "load more" must be pressed.
    pub auto_load_limit: usize,
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            auto_load_limit: 96,
        }
    }
}

impl ListingSettings {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            page_size: env::env_parse("CATALOG_PAGE_SIZE", d.page_size).clamp(1, MAX_PAGE_SIZE),
            auto_load_limit: env::env_parse("CATALOG_AUTO_LOAD_LIMIT", d.auto_load_limit),
        }
    }
}

/// Listing as named by the caller; collections by their public handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogTarget {
    Products,
    Collection { handle: String },
}

impl CatalogTarget {
    pub fn collection(handle: impl Into<String>) -> Self {
        CatalogTarget::Collection {
            handle: handle.into(),
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            CatalogTarget::Products => Scope::Root,
            CatalogTarget::Collection { .. } => Scope::Collection,
        }
    }
}

/// One rendered page with its "more available" signal.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    pub scope: Scope,
    pub listing_key: ListingKey,
    pub connection: Connection<Product>,
    pub has_more: bool,
}

pub struct CatalogService<T> {
    fetcher: PageFetcher<T>,
    collections: CollectionResolver<T>,
    settings: ListingSettings,
}

impl<T: GraphqlTransport + Clone> CatalogService<T> {
    pub fn new(transport: T, settings: ListingSettings) -> Self {
        Self {
            fetcher: PageFetcher::new(transport.clone()),
            collections: CollectionResolver::new(transport),
            settings,
        }
    }

    pub fn settings(&self) -> ListingSettings {
        self.settings
    }

    pub fn transport(&self) -> &T {
        self.fetcher.transport()
    }

    /// Build the query for `params`, resolving the collection handle first
    /// when the listing is collection-scoped.
    pub async fn compose(
        &self,
        target: &CatalogTarget,
        params: &ListingParams,
    ) -> Result<ComposedQuery, FetchFailure> {
        let scope = target.scope();
        let facets = encode_facets(&params.filter, scope);
        let sort = params.sort.as_deref().map(|raw| map_sort(raw, scope));
        let listing = match target {
            CatalogTarget::Products => ListingTarget::Root,
            CatalogTarget::Collection { handle } => {
                ListingTarget::Collection(self.collections.resolve(handle).await?)
            }
        };
        let mut page = params.page.clone();
        if page.page_size.is_none() {
            page.page_size = Some(self.settings.page_size);
        }
        Ok(compose_query(&listing, &facets, sort, &page)?)
    }

    pub async fn try_list(
        &self,
        target: &CatalogTarget,
        params: &ListingParams,
    ) -> Result<Connection<Product>, FetchFailure> {
        let query = self.compose(target, params).await?;
        self.fetcher.try_fetch_page(&query).await
    }

    /// Next page of the listing described by `params`, forward from `cursor`.
    pub async fn try_list_after(
        &self,
        target: &CatalogTarget,
        params: &ListingParams,
        cursor: Cursor,
    ) -> Result<Connection<Product>, FetchFailure> {
        let mut next = params.clone();
        next.page = PageArgs {
            page_size: params.page.page_size,
            ..PageArgs::after(cursor)
        };
        self.try_list(target, &next).await
    }

    /// Like [`Self::list`] but failures are returned instead of absorbed.
    pub async fn try_page(
        &self,
        target: &CatalogTarget,
        params: &ListingParams,
    ) -> Result<ListingPage, FetchFailure> {
        let connection = self.try_list(target, params).await?;
        Ok(Self::page(target, params, connection))
    }

    /// Fail-open listing used for rendering: errors become an empty page.
    pub async fn list(&self, target: &CatalogTarget, params: &ListingParams) -> ListingPage {
        let connection = match self.compose(target, params).await {
            Ok(query) => self.fetcher.fetch_page(&query).await,
            Err(err) => or_empty(target.scope(), Err(err)),
        };
        Self::page(target, params, connection)
    }

    fn page(target: &CatalogTarget, params: &ListingParams, connection: Connection<Product>) -> ListingPage {
        let has_more = connection.next_cursor().is_some();
        info!(
            scope = %target.scope(),
            edges = connection.len(),
            has_more,
            "listing served"
        );
        ListingPage {
            scope: target.scope(),
            listing_key: params.listing_key(),
            connection,
            has_more,
        }
    }
}
