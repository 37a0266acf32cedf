// UI sort token -> (sortKey, reverse), one lookup table per scope.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::warn;

use crate::catalog::filter::{Scope, UnknownToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortToken {
    Featured,
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
    CreatedAsc,
    CreatedDesc,
}

impl SortToken {
    pub const ALL: [SortToken; 7] = [
        SortToken::Featured,
        SortToken::PriceAsc,
        SortToken::PriceDesc,
        SortToken::NameAsc,
        SortToken::NameDesc,
        SortToken::CreatedAsc,
        SortToken::CreatedDesc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortToken::Featured => "featured",
            SortToken::PriceAsc => "price-asc",
            SortToken::PriceDesc => "price-desc",
            SortToken::NameAsc => "name-asc",
            SortToken::NameDesc => "name-desc",
            SortToken::CreatedAsc => "created-asc",
            SortToken::CreatedDesc => "created-desc",
        }
    }

    pub fn sort_pair(self, scope: Scope) -> SortPair {
        match scope {
            Scope::Root => root_table(self),
            Scope::Collection => collection_table(self),
        }
    }
}

impl FromStr for SortToken {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        SortToken::ALL
            .into_iter()
            .find(|tok| tok.as_str().eq_ignore_ascii_case(t))
            .ok_or_else(|| UnknownToken {
                kind: "sort",
                value: s.to_string(),
            })
    }
}

impl Serialize for SortToken {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for SortToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `ProductSortKeys` of the root products field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RootSortKey {
    Relevance,
    Price,
    Title,
    CreatedAt,
}

/// `ProductCollectionSortKeys` of a collection's products field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionSortKey {
    BestSelling,
    Price,
    Title,
    Created,
}

/// A sort key tagged with the vocabulary it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum SortKey {
    Root(RootSortKey),
    Collection(CollectionSortKey),
}

impl SortKey {
    pub fn scope(self) -> Scope {
        match self {
            SortKey::Root(_) => Scope::Root,
            SortKey::Collection(_) => Scope::Collection,
        }
    }

    /// GraphQL enum type name for variable declarations.
    pub fn graphql_type(self) -> &'static str {
        match self {
            SortKey::Root(_) => "ProductSortKeys",
            SortKey::Collection(_) => "ProductCollectionSortKeys",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SortPair {
    pub key: SortKey,
    pub reverse: bool,
}

impl SortPair {
    pub fn scope(self) -> Scope {
        self.key.scope()
    }
}

fn root_table(token: SortToken) -> SortPair {
    use RootSortKey::*;
    let (key, reverse) = match token {
        SortToken::Featured => (Relevance, false),
        SortToken::PriceAsc => (Price, false),
        SortToken::PriceDesc => (Price, true),
        SortToken::NameAsc => (Title, false),
        SortToken::NameDesc => (Title, true),
        SortToken::CreatedAsc => (CreatedAt, false),
        SortToken::CreatedDesc => (CreatedAt, true),
    };
    SortPair { key: SortKey::Root(key), reverse }
}

fn collection_table(token: SortToken) -> SortPair {
    use CollectionSortKey::*;
    let (key, reverse) = match token {
        SortToken::Featured => (BestSelling, false),
        SortToken::PriceAsc => (Price, false),
        SortToken::PriceDesc => (Price, true),
        SortToken::NameAsc => (Title, false),
        SortToken::NameDesc => (Title, true),
        SortToken::CreatedAsc => (Created, false),
        SortToken::CreatedDesc => (Created, true),
    };
    SortPair { key: SortKey::Collection(key), reverse }
}

/// The scope's natural ranking.
pub fn default_sort(scope: Scope) -> SortPair {
    SortToken::Featured.sort_pair(scope)
}

/// Map a raw UI token. Unknown tokens fall back to the scope default; sorting
/// never blocks a listing.
pub fn map_sort(token: &str, scope: Scope) -> SortPair {
    match token.parse::<SortToken>() {
        Ok(tok) => tok.sort_pair(scope),
        Err(err) => {
            warn!(error = %err, scope = %scope, "falling back to default sort");
            default_sort(scope)
        }
    }
}
