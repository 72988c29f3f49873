//! Saving the current conditions as a weather record, guarded by the
//! per-location cooldown.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::{
    api::DashboardApi,
    cooldown::{Clock, SaveCooldown, SystemClock},
    error::SaveError,
    model::{NewWeatherRecord, WeatherRecord},
    notify::Notifier,
};

#[derive(Debug)]
pub struct RecordSaver<C: Clock = SystemClock> {
    api: Arc<dyn DashboardApi>,
    notifier: Arc<dyn Notifier>,
    cooldown: SaveCooldown<C>,
    saving: AtomicBool,
}

impl RecordSaver<SystemClock> {
    pub fn new(api: Arc<dyn DashboardApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_cooldown(api, notifier, SaveCooldown::new())
    }
}

impl<C: Clock> RecordSaver<C> {
    pub fn with_cooldown(
        api: Arc<dyn DashboardApi>,
        notifier: Arc<dyn Notifier>,
        cooldown: SaveCooldown<C>,
    ) -> Self {
        Self { api, notifier, cooldown, saving: AtomicBool::new(false) }
    }

    pub fn cooldown(&self) -> &SaveCooldown<C> {
        &self.cooldown
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst)
    }

    /// Validates, checks the cooldown, then posts the record. The cooldown is
    /// only stamped when the server accepted the save.
    pub async fn save(&self, record: &NewWeatherRecord) -> Result<WeatherRecord, SaveError> {
        if let Err(e) = self.check(record) {
            self.notifier.error(&e.user_message());
            return Err(e);
        }

        self.notifier.loading("Saving weather record...");
        let result = {
            let _saving = SavingFlag::raise(&self.saving);
            self.api.save_record(record).await
        };

        match result {
            Ok(saved) => {
                self.cooldown.record_save(&record.location);
                tracing::info!(id = saved.id, location = %record.location, "weather record saved");
                self.notifier.success("Weather record saved successfully!");
                Ok(saved)
            }
            Err(e) => {
                tracing::warn!("Failed to save record: {e}");
                self.notifier.error(&e.user_message());
                Err(SaveError::Api(e))
            }
        }
    }

    fn check(&self, record: &NewWeatherRecord) -> Result<(), SaveError> {
        let location = record.location.trim();
        if location.is_empty() {
            return Err(SaveError::MissingLocation);
        }

        // One clock read, so a rejection never reports zero minutes left.
        let remaining = self.cooldown.remaining(&record.location);
        if !remaining.is_zero() {
            return Err(SaveError::CoolingDown { location: record.location.clone(), remaining });
        }

        if record.country.is_empty() || record.main.is_empty() || record.description.is_empty() {
            return Err(SaveError::MissingWeatherData);
        }

        Ok(())
    }
}

/// Holds `saving` up while a request is in flight, including when the save
/// future is dropped before it completes.
struct SavingFlag<'a>(&'a AtomicBool);

impl<'a> SavingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for SavingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
