//! Incremental loading of an unbounded, filterable collection.
//!
//! A [`FeedController`] turns "these rows are visible" events into page
//! requests against a [`PageSource`], merges the pages it gets back into one
//! de-duplicated list and tracks per-row load state so the same window is not
//! fetched twice.

mod controller;
mod merge;
mod status;
mod window;

use std::hash::Hash;

use futures::future::BoxFuture;

use crate::api::{ApiError, FilterSet};

pub use controller::FeedController;

/// An item with a stable identity. Everything else about it is payload.
pub trait Record {
    type Id: Eq + Hash + Clone;

    fn id(&self) -> &Self::Id;
}

/// One fetched batch of records plus how many pages exist in total.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub records: Vec<R>,
    /// Always at least 1.
    pub total_pages: usize,
}

impl<R> Page<R> {
    pub fn new(records: Vec<R>, total_pages: usize) -> Self {
        Self {
            records,
            total_pages: total_pages.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page_index: usize,
    pub page_size: usize,
    pub filters: FilterSet,
}

/// Fetches a single page. Implementations keep no pagination state.
pub trait PageSource<R>: Send + Sync {
    fn fetch_page(&self, request: PageRequest) -> BoxFuture<'static, Result<Page<R>, ApiError>>;
}
