// Listing filter state and the client-facing parameters it is derived from.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::catalog::connection::Cursor;
use crate::catalog::query::PageArgs;
use crate::catalog::sort::SortToken;

/// Which of the two listing query shapes is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Global product listing / search (`products(query: ...)`).
    Root,
    /// Products of a single collection (`collection(id:) { products(filters: ...) }`).
    Collection,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Root => f.write_str("root"),
            Scope::Collection => f.write_str("collection"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} token: {value:?}")]
pub struct UnknownToken {
    pub kind: &'static str,
    pub value: String,
}

/// Price facet as offered by the UI. `Any` means "no price filter".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PriceRangeToken {
    #[default]
    Any,
    UpTo500,
    From500To1000,
    From1000To2000,
    From2000,
}

/// Inclusive price bounds. There is no unbounded variant: "no price filter"
/// is the absence of bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceBounds {
    AtMost(u32),
    AtLeast(u32),
    Between { min: u32, max: u32 },
}

impl PriceBounds {
    pub fn min(self) -> Option<u32> {
        match self {
            PriceBounds::AtMost(_) => None,
            PriceBounds::AtLeast(min) | PriceBounds::Between { min, .. } => Some(min),
        }
    }

    pub fn max(self) -> Option<u32> {
        match self {
            PriceBounds::AtLeast(_) => None,
            PriceBounds::AtMost(max) | PriceBounds::Between { max, .. } => Some(max),
        }
    }
}

impl PriceRangeToken {
    pub const ALL: [PriceRangeToken; 5] = [
        PriceRangeToken::Any,
        PriceRangeToken::UpTo500,
        PriceRangeToken::From500To1000,
        PriceRangeToken::From1000To2000,
        PriceRangeToken::From2000,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PriceRangeToken::Any => "any",
            PriceRangeToken::UpTo500 => "0-500",
            PriceRangeToken::From500To1000 => "500-1000",
            PriceRangeToken::From1000To2000 => "1000-2000",
            PriceRangeToken::From2000 => "2000+",
        }
    }

    /// `None` for `Any`.
    pub fn bounds(self) -> Option<PriceBounds> {
        match self {
            PriceRangeToken::Any => None,
            PriceRangeToken::UpTo500 => Some(PriceBounds::AtMost(500)),
            PriceRangeToken::From500To1000 => Some(PriceBounds::Between { min: 500, max: 1000 }),
            PriceRangeToken::From1000To2000 => Some(PriceBounds::Between { min: 1000, max: 2000 }),
            PriceRangeToken::From2000 => Some(PriceBounds::AtLeast(2000)),
        }
    }
}

impl FromStr for PriceRangeToken {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        PriceRangeToken::ALL
            .into_iter()
            .find(|tok| tok.as_str().eq_ignore_ascii_case(t))
            .ok_or_else(|| UnknownToken {
                kind: "price range",
                value: s.to_string(),
            })
    }
}

impl Serialize for PriceRangeToken {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for PriceRangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facet selection for one listing. Tags are kept ordered so the encoded
/// predicate is identical for identical selections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub free_text: Option<String>,
    pub price_range: PriceRangeToken,
    pub tags: BTreeSet<String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_free_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        let trimmed = text.trim();
        self.free_text = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn with_price_range(mut self, price_range: PriceRangeToken) -> Self {
        self.price_range = price_range;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        let trimmed = tag.trim();
        if !trimmed.is_empty() {
            self.tags.insert(trimmed.to_string());
        }
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.free_text.is_none() && self.price_range.bounds().is_none() && self.tags.is_empty()
    }
}

/// Fingerprint of facets + sort. Two listings with equal keys show the same
/// result set; any difference forces a full reload.
///
/// Compared field by field, so no pair of distinct selections can share a key.
/// Sort is normalized through [`SortToken`]: unknown tokens fall back to
/// `featured` exactly as the sort mapper does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingKey {
    pub free_text: Option<String>,
    pub price_range: PriceRangeToken,
    pub tags: BTreeSet<String>,
    pub sort: Option<SortToken>,
}

impl fmt::Display for ListingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "q={:?} price={} tags=[{}] sort={}",
            self.free_text.as_deref().unwrap_or(""),
            self.price_range,
            self.tags.iter().map(|t| format!("{t:?}")).join(", "),
            self.sort.map(SortToken::as_str).unwrap_or("none"),
        )
    }
}

/// Already-parsed client-facing listing parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingParams {
    pub filter: FilterState,
    /// Raw sort token; unknown values are resolved by the sort mapper.
    pub sort: Option<String>,
    pub page: PageArgs,
}

impl ListingParams {
    /// Parse `q`, `tag` (repeatable or comma separated), `priceRange`, `sort`,
    /// `after`, `before` and `first`. Blank values count as absent; unknown
    /// keys are ignored.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = ListingParams::default();
        for (k, v) in pairs {
            let value = v.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            match k.as_ref() {
                "q" | "query" => {
                    params.filter = std::mem::take(&mut params.filter).with_free_text(value);
                }
                "tag" | "tags" => {
                    for tag in value.split(',') {
                        params.filter = std::mem::take(&mut params.filter).with_tag(tag);
                    }
                }
                "priceRange" | "price_range" | "price" => match value.parse() {
                    Ok(tok) => params.filter.price_range = tok,
                    Err(err) => {
                        warn!(error = %err, "ignoring price range, treating as any");
                        params.filter.price_range = PriceRangeToken::Any;
                    }
                },
                "sort" => params.sort = Some(value.to_string()),
                "after" => params.page.after = Some(Cursor::new(value)),
                "before" => params.page.before = Some(Cursor::new(value)),
                "first" | "limit" => match value.parse::<u32>() {
                    Ok(n) => params.page.page_size = Some(n),
                    Err(_) => warn!(value, "ignoring non-numeric page size"),
                },
                _ => {}
            }
        }
        params
    }

    pub fn from_query_string(qs: &str) -> Self {
        Self::from_query_pairs(url::form_urlencoded::parse(qs.trim_start_matches('?').as_bytes()))
    }

    /// Cursors and page size are not part of the key: paging through one
    /// listing never changes its identity.
    pub fn listing_key(&self) -> ListingKey {
        let f = &self.filter;
        ListingKey {
            free_text: f.free_text.clone(),
            price_range: f.price_range,
            tags: f.tags.clone(),
            sort: self
                .sort
                .as_deref()
                .map(|raw| raw.parse().unwrap_or(SortToken::Featured)),
        }
    }
}
