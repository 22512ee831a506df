use std::{collections::BTreeMap, sync::Arc};

use gateway::PackageGateway;
use shared::{
    domain::{Package, PackageId},
    protocol::{PageRequest, RefreshSet, SortOrder},
};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use crate::{notify_failure, Notice};

#[derive(Debug, Clone, PartialEq)]
pub struct PackageRow {
    /// Display-only sequence number assigned client-side:
    /// `page_no * page_size + index + 1`. Not a backend field.
    pub seq: u64,
    pub package: Package,
}

#[derive(Debug, Clone, Default)]
pub struct ListState {
    pub filters: BTreeMap<String, String>,
    pub page: PageRequest,
    pub rows: Vec<PackageRow>,
    pub total_record: u64,
    pub total_page: u32,
    pub busy: bool,
    pub selected: Vec<PackageId>,
}

/// Owns search filters, the pagination request and the current result page
/// for the lifetime of one list view.
pub struct PackageListController {
    gateway: Arc<dyn PackageGateway>,
    notices: broadcast::Sender<Notice>,
    inner: Mutex<ListState>,
}

impl PackageListController {
    pub fn new(gateway: Arc<dyn PackageGateway>) -> Self {
        let (notices, _) = broadcast::channel(64);
        Self {
            gateway,
            notices,
            inner: Mutex::new(ListState::default()),
        }
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub async fn state(&self) -> ListState {
        self.inner.lock().await.clone()
    }

    /// Runs the search with the current filters and pagination request,
    /// replacing the result rows on success. On failure the previous rows
    /// stay untouched and each backend message becomes one notice.
    pub async fn run_search(&self) {
        let (filters, page) = {
            let mut guard = self.inner.lock().await;
            guard.busy = true;
            (guard.filters.clone(), guard.page.clone())
        };

        match self.gateway.search(&filters, &page).await {
            Ok(response) => {
                let offset = u64::from(page.page_no) * u64::from(page.page_size);
                let mut guard = self.inner.lock().await;
                guard.rows = response
                    .items
                    .into_iter()
                    .enumerate()
                    .map(|(index, package)| PackageRow {
                        seq: offset + index as u64 + 1,
                        package,
                    })
                    .collect();
                guard.total_record = response.total_record;
                guard.total_page = response.total_page;
                guard.busy = false;
                debug!(
                    rows = guard.rows.len(),
                    total_record = guard.total_record,
                    page_no = page.page_no,
                    "search replaced result rows"
                );
            }
            Err(err) => {
                self.inner.lock().await.busy = false;
                notify_failure(&self.notices, &err);
            }
        }
    }

    pub async fn set_page(&self, page_no: u32) {
        self.inner.lock().await.page.page_no = page_no;
        self.run_search().await;
    }

    pub async fn set_page_size(&self, page_size: u32) {
        self.inner.lock().await.page.page_size = page_size.max(1);
        self.run_search().await;
    }

    pub async fn set_sort(&self, column: impl Into<String>, order: SortOrder) {
        {
            let mut guard = self.inner.lock().await;
            guard.page.sort_column = column.into();
            guard.page.sort_order = order;
        }
        self.run_search().await;
    }

    /// Stages a filter; filters apply on the next explicit `run_search`,
    /// unlike pagination changes which re-search immediately.
    pub async fn set_filter(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.lock().await.filters.insert(key.into(), value.into());
    }

    pub async fn clear_filters(&self) {
        self.inner.lock().await.filters.clear();
    }

    pub async fn set_selection(&self, ids: Vec<PackageId>) {
        self.inner.lock().await.selected = ids;
    }

    /// Exactly one selected row drives the detail view; zero or more than
    /// one selection yields nothing and the detail view is cleared.
    pub async fn single_selection(&self) -> Option<PackageId> {
        let guard = self.inner.lock().await;
        match guard.selected.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        }
    }

    /// Any non-empty signal re-runs the search. Intersection with the
    /// displayed rows is deliberately not checked; the signal is a hint
    /// that authoritative state moved, and the search is cheap.
    pub async fn on_refresh_signal(&self, signal: &RefreshSet) {
        if signal.is_empty() {
            return;
        }
        debug!(changed = signal.len(), "refresh signal re-runs list search");
        self.run_search().await;
    }
}

#[cfg(test)]
#[path = "tests/list_tests.rs"]
mod tests;
