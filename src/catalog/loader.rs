//! Incremental list controller.
//!
//! Owns the growing list behind an infinite-scroll / "load more" listing.
//! The controller itself does no I/O: [`ListController::request_next`] hands
//! out a [`PageRequest`] and the caller reports back through
//! [`ListController::complete`]. This keeps the in-flight guard explicit:
//!
//! ```text
//! Idle(list, c) --request_next--> Fetching(list, c) --complete--> Idle(list', c')
//!                                                    \-- error --> Failed(list, c)
//! ```
//!
//! Every reset bumps a generation counter; completions carrying an older
//! generation are dropped instead of merged.

use std::collections::HashSet;
use std::future::Future;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::catalog::connection::{Connection, Cursor, Identified};
use crate::catalog::fetcher::FetchFailure;
use crate::catalog::filter::ListingKey;

/// What asked for the next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// End of list scrolled into view. Subject to the auto-load limit.
    Visibility,
    /// Explicit "load more" press.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Fetching,
    /// No further pages; not an error.
    FullyLoaded,
    /// Last fetch failed; loaded items are kept and the same cursor may be retried.
    Failed { message: String },
}

/// Ticket for one in-flight page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub generation: u64,
    pub cursor: Cursor,
}

/// Why no request was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    FullyLoaded,
    /// A page, possibly the first one, is still being fetched.
    InFlight,
    /// The first page failed; the listing has to be reloaded, not extended.
    FirstPageFailed,
    AlreadyRequested,
    AutoLoadLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    Appended { added: usize, duplicates: usize },
    /// Response belonged to a superseded listing or request.
    Stale,
    Failed,
}

pub struct ListController<T> {
    key: Option<ListingKey>,
    generation: u64,
    items: IndexMap<String, T>,
    cursor: Option<Cursor>,
    has_next: bool,
    in_flight: Option<PageRequest>,
    requested: HashSet<Cursor>,
    state: LoadState,
    auto_load_limit: usize,
}

impl<T: Identified> ListController<T> {
    pub fn new(auto_load_limit: usize) -> Self {
        Self {
            key: None,
            generation: 0,
            items: IndexMap::new(),
            cursor: None,
            has_next: false,
            in_flight: None,
            requested: HashSet::new(),
            state: LoadState::FullyLoaded,
            auto_load_limit,
        }
    }

    /// Controller hydrated from an already fetched (e.g. server-rendered) first page.
    pub fn from_first_page(key: ListingKey, first: Connection<T>, auto_load_limit: usize) -> Self {
        let mut ctl = Self::new(auto_load_limit);
        let generation = ctl.reset(key);
        ctl.hydrate(generation, Ok(first));
        ctl
    }

    /// Discard everything and start a new listing. Returns the generation the
    /// first page must be delivered with via [`Self::hydrate`].
    pub fn reset(&mut self, key: ListingKey) -> u64 {
        self.generation += 1;
        debug!(generation = self.generation, key = %key, "listing reset");
        self.key = Some(key);
        self.items.clear();
        self.cursor = None;
        self.has_next = false;
        self.in_flight = None;
        self.requested.clear();
        self.state = LoadState::Fetching;
        self.generation
    }

    /// Reset only when facets or sort actually changed.
    pub fn reset_if_changed(&mut self, key: &ListingKey) -> Option<u64> {
        if self.key.as_ref() == Some(key) {
            None
        } else {
            Some(self.reset(key.clone()))
        }
    }

    /// Deliver the first page of generation `generation`.
    pub fn hydrate(&mut self, generation: u64, first: Result<Connection<T>, FetchFailure>) -> Merge {
        if generation != self.generation {
            debug!(generation, current = self.generation, "dropping stale first page");
            return Merge::Stale;
        }
        match first {
            Ok(conn) => self.merge(conn),
            Err(err) => {
                warn!(error = %err, "first page failed");
                self.has_next = false;
                self.state = LoadState::Failed {
                    message: err.to_string(),
                };
                Merge::Failed
            }
        }
    }

    /// Claim the next page. At most one request is ever in flight, and a
    /// cursor that was fetched successfully is never handed out again.
    pub fn request_next(&mut self, trigger: Trigger) -> Result<PageRequest, Skip> {
        if self.in_flight.is_some() {
            return Err(Skip::InFlight);
        }
        let cursor = match (&self.cursor, self.has_next) {
            (Some(c), true) => c.clone(),
            _ => {
                return Err(match self.state {
                    LoadState::Fetching => Skip::InFlight,
                    LoadState::Failed { .. } => Skip::FirstPageFailed,
                    _ => Skip::FullyLoaded,
                })
            }
        };
        if self.requested.contains(&cursor) {
            return Err(Skip::AlreadyRequested);
        }
        if trigger == Trigger::Visibility && self.items.len() >= self.auto_load_limit {
            return Err(Skip::AutoLoadLimit);
        }

        self.requested.insert(cursor.clone());
        let request = PageRequest {
            generation: self.generation,
            cursor,
        };
        self.in_flight = Some(request.clone());
        self.state = LoadState::Fetching;
        Ok(request)
    }

    /// Report the outcome of `request`.
    pub fn complete(&mut self, request: PageRequest, result: Result<Connection<T>, FetchFailure>) -> Merge {
        if request.generation != self.generation || self.in_flight.as_ref() != Some(&request) {
            debug!(
                generation = request.generation,
                current = self.generation,
                cursor = %request.cursor,
                "dropping stale page"
            );
            return Merge::Stale;
        }
        self.in_flight = None;

        match result {
            Ok(conn) => self.merge(conn),
            Err(err) => {
                warn!(cursor = %request.cursor, error = %err, "load more failed");
                self.requested.remove(&request.cursor);
                self.state = LoadState::Failed {
                    message: err.to_string(),
                };
                Merge::Failed
            }
        }
    }

    /// Run one request/complete cycle with `fetch`.
    pub async fn load_next<F, Fut>(&mut self, trigger: Trigger, fetch: F) -> Result<Merge, Skip>
    where
        F: FnOnce(Cursor) -> Fut,
        Fut: Future<Output = Result<Connection<T>, FetchFailure>>,
    {
        let request = self.request_next(trigger)?;
        let result = fetch(request.cursor.clone()).await;
        Ok(self.complete(request, result))
    }

    fn merge(&mut self, conn: Connection<T>) -> Merge {
        let next = conn.next_cursor().cloned();
        let mut added = 0;
        let mut duplicates = 0;
        for node in conn.into_nodes() {
            let id = node.identity().to_string();
            if self.items.contains_key(&id) {
                duplicates += 1;
            } else {
                self.items.insert(id, node);
                added += 1;
            }
        }

        match next {
            Some(c) if self.requested.contains(&c) => {
                warn!(cursor = %c, "provider returned an already fetched cursor; stopping");
                self.has_next = false;
            }
            Some(c) => {
                self.cursor = Some(c);
                self.has_next = true;
            }
            None => self.has_next = false,
        }
        self.state = if self.has_next {
            LoadState::Idle
        } else {
            LoadState::FullyLoaded
        };
        Merge::Appended { added, duplicates }
    }

    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// "More available" signal for the UI.
    pub fn has_more(&self) -> bool {
        self.has_next
    }

    /// Visibility triggers are ignored from here on; only manual loads continue.
    pub fn needs_manual_load(&self) -> bool {
        self.has_next && self.items.len() >= self.auto_load_limit
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn key(&self) -> Option<&ListingKey> {
        self.key.as_ref()
    }
}
