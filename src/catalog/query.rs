//! Query composer.
//!
//! A listing request is accumulated as a list of typed [`Argument`]s and only
//! then rendered into a document plus variables. Arguments that are absent are
//! neither declared nor passed, so "don't filter" can never turn into
//! "filter by null".

use catalog_client::GraphqlRequest;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::catalog::collection::CollectionId;
use crate::catalog::connection::{Cursor, PRODUCT_CARD_FIELDS};
use crate::catalog::facets::{FacetExpression, ProductFilter, SearchPredicate};
use crate::catalog::filter::Scope;
use crate::catalog::sort::{SortKey, SortPair};

pub const DEFAULT_PAGE_SIZE: u32 = 24;
/// Provider cap for `first` / `last`.
pub const MAX_PAGE_SIZE: u32 = 250;

const PAGE_INFO_FIELDS: &str = "pageInfo { hasNextPage hasPreviousPage startCursor endCursor }";

/// Requested page as supplied by the caller; may carry both cursors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageArgs {
    pub page_size: Option<u32>,
    pub after: Option<Cursor>,
    pub before: Option<Cursor>,
}

impl PageArgs {
    pub fn first_page() -> Self {
        Self::default()
    }

    pub fn after(cursor: Cursor) -> Self {
        Self {
            after: Some(cursor),
            ..Self::default()
        }
    }

    pub fn before(cursor: Cursor) -> Self {
        Self {
            before: Some(cursor),
            ..Self::default()
        }
    }

    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Pick exactly one direction. A `before` cursor always wins and drops
    /// any `after`.
    pub fn pagination(&self) -> Pagination {
        let size = self
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        match &self.before {
            Some(before) => {
                if self.after.is_some() {
                    warn!(before = %before, "both after and before supplied; paginating backward");
                }
                Pagination::Backward {
                    last: size,
                    before: before.clone(),
                }
            }
            None => Pagination::Forward {
                first: size,
                after: self.after.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pagination {
    Forward { first: u32, after: Option<Cursor> },
    Backward { last: u32, before: Cursor },
}

/// What the listing is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingTarget {
    Root,
    Collection(CollectionId),
}

impl ListingTarget {
    pub fn scope(&self) -> Scope {
        match self {
            ListingTarget::Root => Scope::Root,
            ListingTarget::Collection(_) => Scope::Collection,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComposeError {
    #[error("facets encoded for {facets} scope cannot be used in a {target} listing")]
    FacetScope { facets: Scope, target: Scope },
    #[error("sort key from {sort} scope cannot be used in a {target} listing")]
    SortScope { sort: Scope, target: Scope },
}

#[derive(Debug, Clone, PartialEq)]
enum Argument {
    First(u32),
    After(Cursor),
    Last(u32),
    Before(Cursor),
    Query(SearchPredicate),
    Filters(Vec<ProductFilter>),
    SortKey(SortKey),
    Reverse(bool),
}

impl Argument {
    fn name(&self) -> &'static str {
        match self {
            Argument::First(_) => "first",
            Argument::After(_) => "after",
            Argument::Last(_) => "last",
            Argument::Before(_) => "before",
            Argument::Query(_) => "query",
            Argument::Filters(_) => "filters",
            Argument::SortKey(_) => "sortKey",
            Argument::Reverse(_) => "reverse",
        }
    }

    fn graphql_type(&self) -> &'static str {
        match self {
            Argument::First(_) | Argument::Last(_) => "Int",
            Argument::After(_) | Argument::Before(_) | Argument::Query(_) => "String",
            Argument::Filters(_) => "[ProductFilter!]",
            Argument::SortKey(key) => key.graphql_type(),
            Argument::Reverse(_) => "Boolean",
        }
    }

    fn value(&self) -> Value {
        match self {
            Argument::First(n) | Argument::Last(n) => Value::from(*n),
            Argument::After(c) | Argument::Before(c) => Value::from(c.as_str()),
            Argument::Query(p) => Value::from(p.as_str()),
            Argument::Filters(filters) => serde_json::to_value(filters).unwrap_or(Value::Null),
            Argument::SortKey(key) => serde_json::to_value(key).unwrap_or(Value::Null),
            Argument::Reverse(r) => Value::Bool(*r),
        }
    }
}

/// Ready-to-send listing query.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedQuery {
    pub scope: Scope,
    pub operation_name: &'static str,
    pub document: String,
    pub variables: Value,
}

impl ComposedQuery {
    pub fn to_request(&self) -> GraphqlRequest {
        GraphqlRequest::new(self.document.clone(), self.variables.clone())
            .with_operation_name(self.operation_name)
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }
}

struct QueryBuilder {
    target: ListingTarget,
    arguments: Vec<Argument>,
}

impl QueryBuilder {
    fn new(target: ListingTarget) -> Self {
        Self {
            target,
            arguments: Vec::new(),
        }
    }

    fn push(&mut self, arg: Argument) -> &mut Self {
        self.arguments.push(arg);
        self
    }

    fn build(self) -> ComposedQuery {
        let mut declarations = Vec::new();
        let mut variables = Map::new();

        if let ListingTarget::Collection(id) = &self.target {
            declarations.push("$id: ID!".to_string());
            variables.insert("id".into(), Value::from(id.as_str()));
        }

        let mut call_args = Vec::with_capacity(self.arguments.len());
        for arg in &self.arguments {
            let name = arg.name();
            declarations.push(format!("${name}: {}", arg.graphql_type()));
            call_args.push(format!("{name}: ${name}"));
            variables.insert(name.into(), arg.value());
        }

        let products = format!(
            "products({}) {{ edges {{ cursor node {{ {PRODUCT_CARD_FIELDS} }} }} {PAGE_INFO_FIELDS} }}",
            call_args.join(", ")
        );
        let (operation_name, body) = match &self.target {
            ListingTarget::Root => ("CatalogProducts", products),
            ListingTarget::Collection(_) => {
                ("CollectionProducts", format!("collection(id: $id) {{ {products} }}"))
            }
        };

        ComposedQuery {
            scope: self.target.scope(),
            operation_name,
            document: format!(
                "query {operation_name}({}) {{ {body} }}",
                declarations.join(", ")
            ),
            variables: Value::Object(variables),
        }
    }
}

/// Assemble one listing query. Only arguments that carry a value are added to
/// the document.
pub fn compose_query(
    target: &ListingTarget,
    facets: &FacetExpression,
    sort: Option<SortPair>,
    page: &PageArgs,
) -> Result<ComposedQuery, ComposeError> {
    let scope = target.scope();
    if facets.scope() != scope {
        return Err(ComposeError::FacetScope {
            facets: facets.scope(),
            target: scope,
        });
    }
    if let Some(pair) = sort {
        if pair.scope() != scope {
            return Err(ComposeError::SortScope {
                sort: pair.scope(),
                target: scope,
            });
        }
    }

    let mut builder = QueryBuilder::new(target.clone());
    match page.pagination() {
        Pagination::Forward { first, after } => {
            builder.push(Argument::First(first));
            if let Some(after) = after {
                builder.push(Argument::After(after));
            }
        }
        Pagination::Backward { last, before } => {
            builder
                .push(Argument::Last(last))
                .push(Argument::Before(before));
        }
    }
    if let Some(predicate) = facets.predicate() {
        builder.push(Argument::Query(predicate.clone()));
    }
    if !facets.filters().is_empty() {
        builder.push(Argument::Filters(facets.filters().to_vec()));
    }
    if let Some(pair) = sort {
        builder
            .push(Argument::SortKey(pair.key))
            .push(Argument::Reverse(pair.reverse));
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::facets::encode_facets;
    use crate::catalog::filter::{FilterState, PriceRangeToken};
    use crate::catalog::sort::map_sort;

    fn root_unfiltered() -> FacetExpression {
        encode_facets(&FilterState::new(), Scope::Root)
    }

    #[test]
    fn backward_page_drops_forward_arguments() {
        let q = compose_query(
            &ListingTarget::Root,
            &root_unfiltered(),
            None,
            &PageArgs::before(Cursor::new("X")),
        )
        .unwrap();
        assert_eq!(q.variable("before"), Some(&Value::from("X")));
        assert_eq!(q.variable("last"), Some(&Value::from(DEFAULT_PAGE_SIZE)));
        assert!(q.variable("first").is_none());
        assert!(q.variable("after").is_none());
        assert!(!q.document.contains("$first"));
        assert!(!q.document.contains("$after"));
        assert!(q.document.contains("last: $last, before: $before"));
    }

    #[test]
    fn before_wins_when_both_cursors_are_given() {
        let page = PageArgs {
            page_size: Some(10),
            after: Some(Cursor::new("A")),
            before: Some(Cursor::new("B")),
        };
        assert_eq!(
            page.pagination(),
            Pagination::Backward { last: 10, before: Cursor::new("B") }
        );
        let q = compose_query(&ListingTarget::Root, &root_unfiltered(), None, &page).unwrap();
        assert!(q.variable("after").is_none());
        assert!(q.variable("first").is_none());
    }

    #[test]
    fn first_page_omits_cursor_sort_and_filter() {
        let q = compose_query(&ListingTarget::Root, &root_unfiltered(), None, &PageArgs::first_page())
            .unwrap();
        let vars = q.variables.as_object().unwrap();
        assert_eq!(vars.keys().collect::<Vec<_>>(), vec!["first"]);
        assert!(q.document.starts_with("query CatalogProducts($first: Int) { products(first: $first) {"));
        for absent in ["$query", "$sortKey", "$reverse", "$filters", "$after"] {
            assert!(!q.document.contains(absent), "{absent} leaked into {}", q.document);
        }
    }

    #[test]
    fn no_variable_is_ever_null() {
        let facets = encode_facets(
            &FilterState::new().with_tag("summer").with_price_range(PriceRangeToken::UpTo500),
            Scope::Collection,
        );
        let q = compose_query(
            &ListingTarget::Collection(CollectionId::new("gid://shop/Collection/9")),
            &facets,
            Some(map_sort("name-desc", Scope::Collection)),
            &PageArgs::after(Cursor::new("c1")),
        )
        .unwrap();
        for (k, v) in q.variables.as_object().unwrap() {
            assert!(!v.is_null(), "{k} is null");
        }
    }

    #[test]
    fn collection_query_nests_products_under_collection() {
        let facets = encode_facets(
            &FilterState::new()
                .with_price_range(PriceRangeToken::From500To1000)
                .with_tag("summer"),
            Scope::Collection,
        );
        let q = compose_query(
            &ListingTarget::Collection(CollectionId::new("gid://shop/Collection/9")),
            &facets,
            Some(map_sort("price-asc", Scope::Collection)),
            &PageArgs::first_page().with_page_size(12),
        )
        .unwrap();

        assert_eq!(q.operation_name, "CollectionProducts");
        assert_eq!(q.scope, Scope::Collection);
        assert!(q.document.contains(
            "query CollectionProducts($id: ID!, $first: Int, $filters: [ProductFilter!], $sortKey: ProductCollectionSortKeys, $reverse: Boolean)"
        ));
        assert!(q.document.contains("collection(id: $id) { products(first: $first, filters: $filters, sortKey: $sortKey, reverse: $reverse)"));
        assert_eq!(q.variable("id"), Some(&Value::from("gid://shop/Collection/9")));
        assert_eq!(q.variable("sortKey"), Some(&Value::from("PRICE")));
        assert_eq!(q.variable("reverse"), Some(&Value::Bool(false)));
        assert_eq!(
            q.variable("filters"),
            Some(&serde_json::json!([{ "price": { "min": 500, "max": 1000 } }, { "tag": "summer" }]))
        );
        assert!(q.variable("query").is_none());
    }

    #[test]
    fn root_query_carries_predicate_and_root_sort_vocabulary() {
        let facets = encode_facets(
            &FilterState::new().with_price_range(PriceRangeToken::From2000),
            Scope::Root,
        );
        let q = compose_query(
            &ListingTarget::Root,
            &facets,
            Some(map_sort("featured", Scope::Root)),
            &PageArgs::first_page(),
        )
        .unwrap();
        assert_eq!(q.variable("query"), Some(&Value::from("price:>=2000")));
        assert_eq!(q.variable("sortKey"), Some(&Value::from("RELEVANCE")));
        assert!(q.document.contains("$sortKey: ProductSortKeys"));
        assert!(!q.document.contains("$filters"));
    }

    #[test]
    fn mismatched_scopes_are_rejected() {
        let collection_facets = encode_facets(&FilterState::new(), Scope::Collection);
        let err = compose_query(&ListingTarget::Root, &collection_facets, None, &PageArgs::first_page())
            .unwrap_err();
        assert_eq!(
            err,
            ComposeError::FacetScope { facets: Scope::Collection, target: Scope::Root }
        );

        let err = compose_query(
            &ListingTarget::Root,
            &root_unfiltered(),
            Some(map_sort("price-asc", Scope::Collection)),
            &PageArgs::first_page(),
        )
        .unwrap_err();
        assert_eq!(err, ComposeError::SortScope { sort: Scope::Collection, target: Scope::Root });
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(
            PageArgs::first_page().with_page_size(0).pagination(),
            Pagination::Forward { first: 1, after: None }
        );
        assert_eq!(
            PageArgs::first_page().with_page_size(10_000).pagination(),
            Pagination::Forward { first: MAX_PAGE_SIZE, after: None }
        );
    }

    #[test]
    fn request_carries_operation_name() {
        let q = compose_query(&ListingTarget::Root, &root_unfiltered(), None, &PageArgs::first_page())
            .unwrap();
        let req = q.to_request();
        assert_eq!(req.operation_name.as_deref(), Some("CatalogProducts"));
        assert_eq!(req.variables, q.variables);
    }
}
