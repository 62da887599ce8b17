use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::merge::merge_unique;
use super::status::{LoadStatus, LoadStatusMap};
use super::window::LoaderWindow;
use super::{Page, PageRequest, PageSource, Record};
use crate::api::{ApiError, FilterSet};

/// Completion of one page fetch, tagged with the state it was issued under.
pub struct PageResult<R> {
    generation: u64,
    task_id: u64,
    start: usize,
    stop: usize,
    page_index: usize,
    result: Result<Page<R>, ApiError>,
}

#[derive(Debug)]
struct TaskInfo {
    id: u64,
    description: String,
    started_at: Instant,
}

/// Outstanding fetches of the current generation.
#[derive(Debug, Default)]
struct FetchTasks {
    running: Vec<TaskInfo>,
    next_id: u64,
}

impl FetchTasks {
    fn start(&mut self, description: String) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        debug!(task = id, "started: {}", description);
        self.running.push(TaskInfo {
            id,
            description,
            started_at: Instant::now(),
        });
        id
    }

    fn end(&mut self, id: u64, outcome: &str) {
        if let Some(pos) = self.running.iter().position(|t| t.id == id) {
            let task = self.running.remove(pos);
            debug!(
                task = id,
                elapsed = ?task.started_at.elapsed(),
                "{} {}",
                task.description,
                outcome
            );
        }
    }

    fn clear(&mut self) {
        self.running.clear();
    }

    fn is_empty(&self) -> bool {
        self.running.is_empty()
    }
}

/// Owns the accumulated state of one feed and drives page fetches for it.
///
/// Fetches run as spawned tasks and report back through an internal channel;
/// the owner applies them with [`poll_results`](Self::poll_results),
/// [`next_result`](Self::next_result) or [`settle`](Self::settle). A filter
/// change bumps the generation, so results issued before it are dropped.
pub struct FeedController<R> {
    source: Arc<dyn PageSource<R>>,
    page_size: usize,
    window: LoaderWindow,
    filters: FilterSet,
    records: Vec<R>,
    status: LoadStatusMap,
    has_more: bool,
    last_error: Option<String>,
    generation: u64,
    in_flight_pages: HashSet<usize>,
    tasks: FetchTasks,
    cancel: CancellationToken,
    result_tx: mpsc::Sender<PageResult<R>>,
    result_rx: mpsc::Receiver<PageResult<R>>,
}

impl<R> FeedController<R>
where
    R: Record + Send + 'static,
{
    pub fn new(source: Arc<dyn PageSource<R>>, page_size: usize, filters: FilterSet) -> Self {
        let (result_tx, result_rx) = mpsc::channel(10);
        Self {
            source,
            page_size: page_size.max(1),
            window: LoaderWindow::default(),
            filters,
            records: Vec::new(),
            status: LoadStatusMap::new(),
            has_more: true,
            last_error: None,
            generation: 0,
            in_flight_pages: HashSet::new(),
            tasks: FetchTasks::default(),
            cancel: CancellationToken::new(),
            result_tx,
            result_rx,
        }
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn record(&self, index: usize) -> Option<&R> {
        self.records.get(index)
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn status(&self) -> &LoadStatusMap {
        &self.status
    }

    /// Message of the most recent failed page in this generation.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn is_item_loaded(&self, index: usize) -> bool {
        self.status.is_loaded(index)
    }

    /// Rows to lay out: every record plus one placeholder while more pages exist.
    pub fn item_count(&self) -> usize {
        if self.has_more {
            self.records.len() + 1
        } else {
            self.records.len()
        }
    }

    /// True while any fetch of the current generation is outstanding.
    pub fn is_fetching(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// True once the feed is known to have nothing to show.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && !self.has_more && !self.is_fetching()
    }

    /// Requests data for the inclusive row range `[start, stop]`.
    ///
    /// Returns false without doing anything when the start row is already
    /// loading or the page it falls on is already in flight. A range longer
    /// than one page is cut to the rows a single fetch can fill.
    pub fn request_range(&mut self, start: usize, stop: usize) -> bool {
        if stop < start {
            debug!(start, stop, "ignoring empty range");
            return false;
        }
        let stop = stop.min(start.saturating_add(self.page_size - 1));
        if self.status.is_loading(start) {
            debug!(start, stop, "range already loading");
            return false;
        }
        let page_index = start / self.page_size;
        if self.in_flight_pages.contains(&page_index) {
            debug!(start, stop, page = page_index, "page already in flight");
            return false;
        }

        self.status.mark_range(start, stop, LoadStatus::Loading);
        self.in_flight_pages.insert(page_index);
        self.spawn_page_fetch(start, stop, page_index);
        true
    }

    /// Viewport callback: requests whatever the visible rows still need.
    /// Returns how many fetches were issued.
    pub fn on_items_rendered(&mut self, visible_start: usize, visible_stop: usize) -> usize {
        let status = &self.status;
        let ranges = self.window.unloaded_ranges(
            visible_start,
            visible_stop,
            self.item_count(),
            |index| status.get(index).is_some(),
        );
        let mut issued = 0;
        for (start, stop) in ranges {
            if self.request_range(start, stop) {
                issued += 1;
            }
        }
        issued
    }

    /// Replaces the filter set and discards everything built for the old one.
    pub fn set_filters(&mut self, filters: FilterSet) {
        info!(filters = %filters, "feed reset");
        self.filters = filters;
        self.reset();
    }

    /// Starts over with the current filters, resuming after a failed page.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn refresh(&mut self) {
        self.set_filters(self.filters.clone());
    }

    fn reset(&mut self) {
        self.generation += 1;
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.records.clear();
        self.status.clear();
        self.has_more = true;
        self.last_error = None;
        self.in_flight_pages.clear();
        self.tasks.clear();
    }

    pub fn handle_result(&mut self, result: PageResult<R>) {
        let PageResult {
            generation,
            task_id,
            start,
            stop,
            page_index,
            result,
        } = result;

        if generation != self.generation {
            debug!(
                page = page_index,
                generation,
                current = self.generation,
                "discarded stale page"
            );
            return;
        }
        self.in_flight_pages.remove(&page_index);

        match result {
            Ok(page) => {
                self.tasks.end(task_id, "completed");
                let received = page.records.len();
                let existing = std::mem::take(&mut self.records);
                self.records = merge_unique(existing, page.records);
                if received > 0 {
                    self.status
                        .mark_range(start, start + received - 1, LoadStatus::Loaded);
                }
                self.has_more = page_index + 1 < page.total_pages;
                debug!(
                    page = page_index,
                    received,
                    total = self.records.len(),
                    total_pages = page.total_pages,
                    has_more = self.has_more,
                    "page merged"
                );
            }
            Err(e) => {
                self.tasks.end(task_id, "failed");
                warn!(page = page_index, error = %e, "page fetch failed, pagination stopped");
                self.status.mark_range(start, stop, LoadStatus::Loaded);
                self.has_more = false;
                self.last_error = Some(e.user_message());
            }
        }
    }

    /// Applies every result that has already arrived. Never blocks.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn poll_results(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(result) = self.result_rx.try_recv() {
            self.handle_result(result);
            applied += 1;
        }
        applied
    }

    /// Waits for the next result without applying it.
    #[cfg_attr(not(test), allow(dead_code))]
    pub async fn next_result(&mut self) -> Option<PageResult<R>> {
        self.result_rx.recv().await
    }

    /// Applies results until no fetch of the current generation is outstanding.
    pub async fn settle(&mut self) {
        while self.is_fetching() {
            match self.result_rx.recv().await {
                Some(result) => self.handle_result(result),
                None => break,
            }
        }
    }

    fn spawn_page_fetch(&mut self, start: usize, stop: usize, page_index: usize) {
        let request = PageRequest {
            page_index,
            page_size: self.page_size,
            filters: self.filters.clone(),
        };
        let task_id = self
            .tasks
            .start(format!("Load page {} [{}..={}]", page_index, start, stop));
        let fetch = self.source.fetch_page(request);
        let tx = self.result_tx.clone();
        let token = self.cancel.clone();
        let generation = self.generation;

        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                result = fetch => result,
            };
            let _ = tx
                .send(PageResult {
                    generation,
                    task_id,
                    start,
                    stop,
                    page_index,
                    result,
                })
                .await;
        });
    }
}
