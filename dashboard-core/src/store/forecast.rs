use parking_lot::Mutex;
use std::sync::Arc;

use crate::{api::DashboardApi, model::Forecast, notify::Notifier};

use super::{RequestTicket, Slice};

/// Multi-day forecast; the day list is replaced wholesale per fetch.
#[derive(Debug)]
pub struct ForecastStore {
    api: Arc<dyn DashboardApi>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<Slice<Forecast>>,
    ticket: RequestTicket,
}

impl ForecastStore {
    pub fn new(api: Arc<dyn DashboardApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier, state: Mutex::new(Slice::default()), ticket: RequestTicket::default() }
    }

    pub fn state(&self) -> Slice<Forecast> {
        self.state.lock().clone()
    }

    pub fn forecast(&self) -> Forecast {
        self.state.lock().data.clone()
    }

    pub async fn fetch(&self, location: &str) {
        let ticket = self.ticket.issue();
        self.state.lock().begin();

        let result = self.api.fetch_forecast(location).await;

        if !self.ticket.is_latest(ticket) {
            tracing::debug!(location, ticket, "discarding superseded forecast response");
            return;
        }

        match result {
            Ok(forecast) => {
                tracing::debug!(location, days = forecast.forecast.len(), "forecast updated");
                self.state.lock().succeed(forecast);
            }
            Err(e) => {
                let message = e.user_message();
                self.notifier.error(&message);
                self.state.lock().fail(message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        notify::{MemoryNotifier, NotificationLevel},
        store::{
            LoadState,
            testing::{ScriptedApi, forecast, status},
        },
    };
    use std::time::Duration;

    #[tokio::test]
    async fn fetch_keeps_api_order() {
        let api = ScriptedApi::default();
        ScriptedApi::push(&api.forecast, Ok(forecast("Accra", 7)));
        let store = ForecastStore::new(Arc::new(api), Arc::new(MemoryNotifier::new()));

        store.fetch("Accra").await;

        let days: Vec<String> = store.forecast().forecast.into_iter().map(|d| d.day).collect();
        assert_eq!(days, vec!["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"]);
        assert_eq!(store.state().status, LoadState::Success);
    }

    #[tokio::test]
    async fn failure_sets_error_and_notifies() {
        let api = ScriptedApi::default();
        ScriptedApi::push(&api.forecast, Ok(forecast("Accra", 3)));
        ScriptedApi::push(&api.forecast, Err(status(500, "Failed to fetch forecast data")));
        let notifier = Arc::new(MemoryNotifier::new());
        let store = ForecastStore::new(Arc::new(api), notifier.clone());

        store.fetch("Accra").await;
        store.fetch("Nowhere").await;

        let state = store.state();
        assert_eq!(state.status, LoadState::Error);
        assert_eq!(state.data.forecast.len(), 3);
        assert_eq!(
            notifier.messages(NotificationLevel::Error),
            vec!["Failed to fetch forecast data"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn newest_request_wins_over_slower_older_one() {
        let api = ScriptedApi::default();
        ScriptedApi::push_delayed(&api.forecast, Duration::from_secs(5), Ok(forecast("Accra", 7)));
        ScriptedApi::push_delayed(&api.forecast, Duration::from_secs(1), Ok(forecast("Kumasi", 3)));
        let store = Arc::new(ForecastStore::new(Arc::new(api), Arc::new(MemoryNotifier::new())));

        let slow = tokio::spawn({
            let store = store.clone();
            async move { store.fetch("Accra").await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.fetch("Kumasi").await;
        slow.await.unwrap();

        let state = store.state();
        assert_eq!(state.data.location, "Kumasi");
        assert_eq!(state.data.forecast.len(), 3);
        assert_eq!(state.status, LoadState::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_failure_is_not_reported() {
        let api = ScriptedApi::default();
        ScriptedApi::push_delayed(
            &api.forecast,
            Duration::from_secs(5),
            Err(status(500, "Failed to fetch forecast data")),
        );
        ScriptedApi::push(&api.forecast, Ok(forecast("Kumasi", 5)));
        let notifier = Arc::new(MemoryNotifier::new());
        let store = Arc::new(ForecastStore::new(Arc::new(api), notifier.clone()));

        let slow = tokio::spawn({
            let store = store.clone();
            async move { store.fetch("Atlantis").await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.fetch("Kumasi").await;
        slow.await.unwrap();

        let state = store.state();
        assert_eq!(state.status, LoadState::Success);
        assert!(state.error.is_none());
        assert!(notifier.notifications().is_empty());
    }
}
