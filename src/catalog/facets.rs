// Facet encoder: FilterState -> provider filter syntax for one scope.
//
// Root scope only accepts a boolean search string. Collection scope takes
// price and tags as structured filters; a price encoded the wrong way for a
// scope is silently ignored by the provider, so the two encodings must never
// be mixed.

use itertools::Itertools;
use serde::Serialize;

use crate::catalog::filter::{FilterState, PriceBounds, Scope};

/// Fields a free-text term is matched against.
const FREE_TEXT_FIELDS: [&str; 4] = ["title", "tag", "product_type", "vendor"];

/// Non-empty boolean search expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SearchPredicate(String);

impl SearchPredicate {
    fn from_clauses(clauses: Vec<String>) -> Option<Self> {
        if clauses.is_empty() {
            None
        } else {
            Some(Self(clauses.join(" AND ")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PriceFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}

/// Structured `ProductFilter` input. Serializes as `{"price":{..}}` or
/// `{"tag":"summer"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductFilter {
    Price(PriceFilter),
    Tag(String),
}

/// Encoded facets, shaped by scope so a structured filter can never end up in
/// a root query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacetExpression {
    Root {
        predicate: Option<SearchPredicate>,
    },
    Collection {
        predicate: Option<SearchPredicate>,
        filters: Vec<ProductFilter>,
    },
}

impl FacetExpression {
    pub fn scope(&self) -> Scope {
        match self {
            FacetExpression::Root { .. } => Scope::Root,
            FacetExpression::Collection { .. } => Scope::Collection,
        }
    }

    pub fn predicate(&self) -> Option<&SearchPredicate> {
        match self {
            FacetExpression::Root { predicate } | FacetExpression::Collection { predicate, .. } => {
                predicate.as_ref()
            }
        }
    }

    pub fn filters(&self) -> &[ProductFilter] {
        match self {
            FacetExpression::Root { .. } => &[],
            FacetExpression::Collection { filters, .. } => filters,
        }
    }

    /// True when the query must carry no filter argument at all.
    pub fn is_empty(&self) -> bool {
        self.predicate().is_none() && self.filters().is_empty()
    }
}

pub fn encode_facets(filter: &FilterState, scope: Scope) -> FacetExpression {
    let text_clause = filter.free_text.as_deref().map(free_text_clause);
    let bounds = filter.price_range.bounds();

    match scope {
        Scope::Root => {
            let mut clauses = Vec::new();
            clauses.extend(text_clause);
            clauses.extend(bounds.map(price_clause));
            if !filter.tags.is_empty() {
                clauses.push(tags_clause(filter.tags.iter().map(String::as_str)));
            }
            FacetExpression::Root {
                predicate: SearchPredicate::from_clauses(clauses),
            }
        }
        Scope::Collection => {
            let mut filters = Vec::new();
            if let Some(b) = bounds {
                filters.push(ProductFilter::Price(PriceFilter {
                    min: b.min(),
                    max: b.max(),
                }));
            }
            filters.extend(filter.tags.iter().cloned().map(ProductFilter::Tag));
            FacetExpression::Collection {
                predicate: SearchPredicate::from_clauses(text_clause.into_iter().collect()),
                filters,
            }
        }
    }
}

fn free_text_clause(text: &str) -> String {
    let term = quote_term(text);
    format!(
        "({})",
        FREE_TEXT_FIELDS
            .iter()
            .map(|field| format!("{field}:{term}"))
            .join(" OR ")
    )
}

fn price_clause(bounds: PriceBounds) -> String {
    match bounds {
        PriceBounds::Between { min, max } => format!("(price:>={min} AND price:<={max})"),
        PriceBounds::AtLeast(min) => format!("price:>={min}"),
        PriceBounds::AtMost(max) => format!("price:<={max}"),
    }
}

fn tags_clause<'a>(tags: impl Iterator<Item = &'a str>) -> String {
    let parts: Vec<String> = tags.map(|t| format!("tag:'{}'", escape(t, '\''))).collect();
    if parts.len() == 1 {
        parts.into_iter().collect()
    } else {
        format!("({})", parts.join(" OR "))
    }
}

/// Bare word when safe, otherwise a double-quoted phrase.
fn quote_term(term: &str) -> String {
    let plain = term
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if plain {
        term.to_string()
    } else {
        format!("\"{}\"", escape(term, '"'))
    }
}

fn escape(raw: &str, quote: char) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '\\' || c == quote {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
