//! Relay-style pagination envelope and the product node it carries.
//!
//! Cursors are opaque: they are only ever copied out of a provider response
//! and echoed back in a later request.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Opaque pagination token returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub has_previous_page: bool,
    #[serde(default)]
    pub start_cursor: Option<Cursor>,
    #[serde(default)]
    pub end_cursor: Option<Cursor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge<T> {
    #[serde(default)]
    pub cursor: Option<Cursor>,
    pub node: T,
}

/// Ordered page of nodes plus page info.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<T>>,
    #[serde(default)]
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    /// No edges, no further pages.
    pub fn empty() -> Self {
        Self {
            edges: Vec::new(),
            page_info: PageInfo::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|e| &e.node)
    }

    pub fn into_nodes(self) -> impl Iterator<Item = T> {
        self.edges.into_iter().map(|e| e.node)
    }

    /// Cursor to request the following page with, if there is one.
    pub fn next_cursor(&self) -> Option<&Cursor> {
        if self.page_info.has_next_page {
            self.page_info.end_cursor.as_ref()
        } else {
            None
        }
    }

    /// Enforce "a non-empty page that has a successor carries an end cursor".
    /// A missing `endCursor` is recovered from the last edge; when that is
    /// impossible the page is treated as the final one.
    pub fn normalized(mut self) -> Self {
        if self.page_info.start_cursor.is_none() {
            self.page_info.start_cursor = self.edges.first().and_then(|e| e.cursor.clone());
        }
        if self.page_info.has_next_page && self.page_info.end_cursor.is_none() {
            match self.edges.last().and_then(|e| e.cursor.clone()) {
                Some(c) => self.page_info.end_cursor = Some(c),
                None => {
                    warn!(
                        edges = self.edges.len(),
                        "page reports a next page but carries no end cursor; treating as last page"
                    );
                    self.page_info.has_next_page = false;
                }
            }
        }
        self
    }
}

/// Items the list controller can deduplicate.
pub trait Identified {
    fn identity(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub amount: String,
    pub currency_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min_variant_price: Money,
    pub max_variant_price: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub alt_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub available_for_sale: bool,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantList {
    #[serde(default)]
    pub nodes: Vec<ProductVariant>,
}

/// Product card as listed. Only `id` is interpreted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub handle: String,
    pub title: String,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub available_for_sale: bool,
    #[serde(default)]
    pub price_range: Option<PriceRange>,
    #[serde(default)]
    pub featured_image: Option<Image>,
    #[serde(default)]
    pub variants: VariantList,
}

impl Identified for Product {
    fn identity(&self) -> &str {
        &self.id
    }
}

/// Selection set requested for every listed product; mirrors [`Product`].
pub const PRODUCT_CARD_FIELDS: &str = "id handle title vendor productType tags availableForSale \
priceRange { minVariantPrice { amount currencyCode } maxVariantPrice { amount currencyCode } } \
featuredImage { url altText } \
variants(first: 10) { nodes { id title availableForSale price { amount currencyCode } selectedOptions { name value } } }";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_provider_connection() {
        let v = json!({
            "edges": [{
                "cursor": "c1",
                "node": {
                    "id": "gid://shop/Product/1",
                    "handle": "linen-shirt",
                    "title": "Linen Shirt",
                    "tags": ["summer"],
                    "availableForSale": true,
                    "priceRange": {
                        "minVariantPrice": { "amount": "49.0", "currencyCode": "EUR" },
                        "maxVariantPrice": { "amount": "59.0", "currencyCode": "EUR" }
                    },
                    "variants": { "nodes": [{
                        "id": "gid://shop/ProductVariant/11",
                        "title": "M",
                        "availableForSale": true,
                        "selectedOptions": [{ "name": "Size", "value": "M" }]
                    }]}
                }
            }],
            "pageInfo": { "hasNextPage": true, "hasPreviousPage": false, "startCursor": "c1", "endCursor": "c1" }
        });
        let conn: Connection<Product> = serde_json::from_value(v).unwrap();
        assert_eq!(conn.len(), 1);
        assert_eq!(conn.next_cursor().map(Cursor::as_str), Some("c1"));
        let p = conn.nodes().next().unwrap();
        assert_eq!(p.identity(), "gid://shop/Product/1");
        assert_eq!(p.variants.nodes[0].selected_options[0].value, "M");
    }

    #[test]
    fn normalized_recovers_end_cursor_from_last_edge() {
        let conn = Connection {
            edges: vec![
                Edge { cursor: Some(Cursor::new("a")), node: 1 },
                Edge { cursor: Some(Cursor::new("b")), node: 2 },
            ],
            page_info: PageInfo { has_next_page: true, ..PageInfo::default() },
        }
        .normalized();
        assert_eq!(conn.page_info.end_cursor, Some(Cursor::new("b")));
        assert_eq!(conn.page_info.start_cursor, Some(Cursor::new("a")));
        assert!(conn.page_info.has_next_page);
    }

    #[test]
    fn normalized_stops_paging_without_any_cursor() {
        let conn = Connection {
            edges: vec![Edge { cursor: None, node: 1 }],
            page_info: PageInfo { has_next_page: true, ..PageInfo::default() },
        }
        .normalized();
        assert!(!conn.page_info.has_next_page);
        assert_eq!(conn.next_cursor(), None);
    }

    #[test]
    fn empty_connection_has_no_next_page() {
        let conn: Connection<Product> = Connection::empty();
        assert!(conn.is_empty());
        assert!(!conn.page_info.has_next_page);
        assert!(!conn.page_info.has_previous_page);
    }
}
