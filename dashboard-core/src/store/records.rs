use parking_lot::Mutex;
use std::sync::Arc;

use crate::{api::DashboardApi, error::ApiError, model::WeatherRecord, notify::Notifier};

use super::RequestTicket;

/// Independent flags: list, detail and delete can run at the same time from
/// different views and must not reset each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordLoading {
    pub fetch_all: bool,
    pub fetch_one: bool,
    pub delete: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordsState {
    pub records: Vec<WeatherRecord>,
    pub current: Option<WeatherRecord>,
    pub loading: RecordLoading,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    state: RecordsState,
    pending_deletes: usize,
}

/// Saved weather records plus the record shown on the detail view.
#[derive(Debug)]
pub struct RecordStore {
    api: Arc<dyn DashboardApi>,
    notifier: Arc<dyn Notifier>,
    inner: Mutex<Inner>,
    list_ticket: RequestTicket,
    detail_ticket: RequestTicket,
}

impl RecordStore {
    pub fn new(api: Arc<dyn DashboardApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            inner: Mutex::new(Inner::default()),
            list_ticket: RequestTicket::default(),
            detail_ticket: RequestTicket::default(),
        }
    }

    pub fn state(&self) -> RecordsState {
        self.inner.lock().state.clone()
    }

    pub fn records(&self) -> Vec<WeatherRecord> {
        self.inner.lock().state.records.clone()
    }

    pub fn current(&self) -> Option<WeatherRecord> {
        self.inner.lock().state.current.clone()
    }

    pub fn loading(&self) -> RecordLoading {
        self.inner.lock().state.loading
    }

    pub async fn fetch_all(&self) {
        let ticket = self.begin_list();
        let result = self.api.fetch_records().await;
        self.finish_list(ticket, result);
    }

    /// Records whose location matches `location`. No match is an empty list, not an error.
    pub async fn filter_by_location(&self, location: &str) {
        let ticket = self.begin_list();
        let result = self.api.filter_records(location).await;
        self.finish_list(ticket, result);
    }

    /// Loads one record into `current`. The error is returned as well as stored.
    pub async fn get(&self, id: i64) -> Result<WeatherRecord, ApiError> {
        let ticket = self.detail_ticket.issue();
        {
            let mut inner = self.inner.lock();
            inner.state.loading.fetch_one = true;
            inner.state.error = None;
        }

        let result = self.api.fetch_record(id).await;

        // A superseded response still goes back to its caller, but leaves the
        // shared state and notifications to the newer request.
        if !self.detail_ticket.is_latest(ticket) {
            tracing::debug!(id, ticket, "discarding superseded record response");
            return result;
        }

        match &result {
            Ok(record) => {
                let mut inner = self.inner.lock();
                inner.state.current = Some(record.clone());
                inner.state.loading.fetch_one = false;
            }
            Err(e) => {
                let message = e.user_message();
                self.notifier.error(&message);
                let mut inner = self.inner.lock();
                inner.state.error = Some(message);
                inner.state.loading.fetch_one = false;
            }
        }

        result
    }

    /// Puts a freshly saved record at the top of the list.
    pub fn add(&self, record: WeatherRecord) {
        self.inner.lock().state.records.insert(0, record);
        self.notifier.success("Record added successfully");
    }

    /// Deletes on the server first; the local list only changes once that succeeded.
    pub async fn remove(&self, id: i64) -> Result<(), ApiError> {
        self.notifier.loading("Deleting record...");
        {
            let mut inner = self.inner.lock();
            inner.pending_deletes += 1;
            inner.state.loading.delete = true;
            inner.state.error = None;
        }

        let result = self.api.delete_record(id).await;

        {
            let mut inner = self.inner.lock();
            inner.pending_deletes = inner.pending_deletes.saturating_sub(1);
            inner.state.loading.delete = inner.pending_deletes > 0;

            match &result {
                Ok(()) => {
                    inner.state.records.retain(|r| r.id != id);
                    if inner.state.current.as_ref().is_some_and(|r| r.id == id) {
                        inner.state.current = None;
                    }
                }
                Err(e) => inner.state.error = Some(e.user_message()),
            }
        }

        match &result {
            Ok(()) => {
                tracing::info!(id, "record deleted");
                self.notifier.success("Record deleted successfully");
            }
            Err(e) => self.notifier.error(&e.user_message()),
        }

        result
    }

    pub fn clear_current(&self) {
        self.inner.lock().state.current = None;
    }

    fn begin_list(&self) -> u64 {
        let ticket = self.list_ticket.issue();
        let mut inner = self.inner.lock();
        inner.state.loading.fetch_all = true;
        inner.state.error = None;
        ticket
    }

    fn finish_list(&self, ticket: u64, result: Result<Vec<WeatherRecord>, ApiError>) {
        if !self.list_ticket.is_latest(ticket) {
            tracing::debug!(ticket, "discarding superseded records response");
            return;
        }

        match result {
            Ok(records) => {
                let mut inner = self.inner.lock();
                inner.state.records = records;
                inner.state.loading.fetch_all = false;
            }
            Err(e) => {
                let message = e.user_message();
                self.notifier.error(&message);
                let mut inner = self.inner.lock();
                inner.state.error = Some(message);
                inner.state.loading.fetch_all = false;
            }
        }
    }
}
