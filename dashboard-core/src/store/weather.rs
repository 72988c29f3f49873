use parking_lot::Mutex;
use std::sync::Arc;

use crate::{api::DashboardApi, model::WeatherSnapshot, notify::Notifier};

use super::{RequestTicket, Slice};

/// Current conditions for the location being viewed.
#[derive(Debug)]
pub struct WeatherStore {
    api: Arc<dyn DashboardApi>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<Slice<Option<WeatherSnapshot>>>,
    ticket: RequestTicket,
}

impl WeatherStore {
    pub fn new(api: Arc<dyn DashboardApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier, state: Mutex::new(Slice::default()), ticket: RequestTicket::default() }
    }

    pub fn state(&self) -> Slice<Option<WeatherSnapshot>> {
        self.state.lock().clone()
    }

    pub fn snapshot(&self) -> Option<WeatherSnapshot> {
        self.state.lock().data.clone()
    }

    pub async fn fetch(&self, location: &str) {
        let ticket = self.ticket.issue();
        self.state.lock().begin();

        let result = self.api.fetch_weather(location).await;

        if !self.ticket.is_latest(ticket) {
            tracing::debug!(location, ticket, "discarding superseded weather response");
            return;
        }

        match result {
            Ok(snapshot) => {
                tracing::debug!(location, "weather updated");
                self.state.lock().succeed(Some(snapshot));
            }
            Err(e) => {
                let message = e.user_message();
                self.notifier.error(&message);
                self.state.lock().fail(message);
            }
        }
    }
}
