// Catalog listing engine: facet/sort encoding, query composition, page
// fetching and the incremental list controller.

pub mod collection;
pub mod connection;
pub mod facets;
pub mod fetcher;
pub mod filter;
pub mod loader;
pub mod query;
pub mod service;
pub mod sort;

#[cfg(test)]
pub(crate) mod testing;

pub use collection::{CollectionId, CollectionResolver};
pub use connection::{Connection, Cursor, Edge, Identified, PageInfo, Product};
pub use facets::{encode_facets, FacetExpression, ProductFilter, SearchPredicate};
pub use fetcher::{FetchFailure, PageFetcher};
pub use filter::{FilterState, ListingKey, ListingParams, PriceRangeToken, Scope};
pub use loader::{ListController, LoadState, Merge, PageRequest, Skip, Trigger};
pub use query::{compose_query, ComposeError, ComposedQuery, ListingTarget, PageArgs, Pagination};
pub use service::{CatalogService, CatalogTarget, ListingPage, ListingSettings};
pub use sort::{map_sort, SortKey, SortPair, SortToken};
