//! State containers. Each one owns a slice of remote data plus its loading
//! and error flags, and is the only writer of that slice.
//!
//! Fetches are not cancelled. Every request takes a ticket, and a response is
//! applied only if its ticket is still the newest one issued for the slice, so
//! a slow older response can never overwrite a newer one.

use std::sync::atomic::{AtomicU64, Ordering};

pub mod dialog;
pub mod forecast;
pub mod records;
pub mod weather;

pub use dialog::{DialogKind, DialogRequest, DialogStore, DialogView};
pub use forecast::ForecastStore;
pub use records::{RecordLoading, RecordStore, RecordsState};
pub use weather::WeatherStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Data plus request status for a single-fetch container.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Slice<T> {
    pub data: T,
    pub status: LoadState,
    pub error: Option<String>,
}

impl<T> Slice<T> {
    pub fn is_loading(&self) -> bool {
        self.status == LoadState::Loading
    }

    pub(crate) fn begin(&mut self) {
        self.status = LoadState::Loading;
        self.error = None;
    }

    pub(crate) fn succeed(&mut self, data: T) {
        self.data = data;
        self.status = LoadState::Success;
        self.error = None;
    }

    /// Previous data stays in place.
    pub(crate) fn fail(&mut self, message: String) {
        self.status = LoadState::Error;
        self.error = Some(message);
    }
}

#[derive(Debug, Default)]
pub(crate) struct RequestTicket(AtomicU64);

impl RequestTicket {
    pub(crate) fn issue(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn is_latest(&self, ticket: u64) -> bool {
        self.0.load(Ordering::SeqCst) == ticket
    }
}
