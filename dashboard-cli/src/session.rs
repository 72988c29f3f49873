//! Interactive dashboard. The containers, the save cooldown and the map cache
//! live for the whole session.

use std::{
    fmt,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::Result;
use dashboard_core::{
    DialogStore, ForecastStore, NewWeatherRecord, RecordSaver, RecordStore, WeatherRecord,
    WeatherStore,
    geo::GeocodeCache,
    store::{DialogKind, DialogRequest},
};
use inquire::{Confirm, InquireError, Select, Text};

use crate::{
    cli::{self, App},
    render,
};

pub const DELETE_TITLE: &str = "Delete Record";
pub const DELETE_MESSAGE: &str =
    "Are you sure you want to delete this record? This action cannot be undone.";
const DELETE_FAILED: &str = "Failed to delete the record. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Search,
    Detect,
    Save,
    Records,
    Filter,
    View,
    Delete,
    Export,
    Quit,
}

impl Action {
    const ALL: [Action; 9] = [
        Action::Search,
        Action::Detect,
        Action::Save,
        Action::Records,
        Action::Filter,
        Action::View,
        Action::Delete,
        Action::Export,
        Action::Quit,
    ];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Search => "Search for a place",
            Action::Detect => "Use my location",
            Action::Save => "Save record",
            Action::Records => "Saved records",
            Action::Filter => "Filter records by location",
            Action::View => "View a record",
            Action::Delete => "Delete a record",
            Action::Export => "Export records to CSV",
            Action::Quit => "Quit",
        };
        f.write_str(label)
    }
}

/// Trimmed search text, or the message shown for an invalid query.
pub fn validate_query(query: &str) -> Result<&str, &'static str> {
    let query = query.trim();
    if query.is_empty() {
        return Err("Please enter a location");
    }
    if query.chars().count() < 2 {
        return Err("Location must be at least 2 characters");
    }
    Ok(query)
}

struct Session {
    app: App,
    weather: WeatherStore,
    forecast: ForecastStore,
    records: RecordStore,
    dialogs: DialogStore,
    saver: RecordSaver,
    maps: GeocodeCache,
}

pub async fn run(app: App) -> Result<()> {
    let session = Session::new(app);

    let initial = session.app.resolver.resolve(session.app.config.default_location()).await;
    session.load(&initial).await;

    loop {
        let action = match Select::new("What next?", Action::ALL.to_vec()).prompt() {
            Ok(action) => action,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e.into()),
        };

        let outcome = match action {
            Action::Search => session.search().await,
            Action::Detect => session.detect().await,
            Action::Save => session.save().await,
            Action::Records => session.list_records(None).await,
            Action::Filter => session.filter().await,
            Action::View => session.view().await,
            Action::Delete => session.delete().await,
            Action::Export => session.export().await,
            Action::Quit => break,
        };

        // Esc on a nested prompt returns to the menu.
        match outcome {
            Err(e) if !is_cancelled(&e) => return Err(e),
            _ => {}
        }
    }

    Ok(())
}

fn is_cancelled(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<InquireError>(), Some(InquireError::OperationCanceled))
}

impl Session {
    fn new(app: App) -> Self {
        Self {
            weather: WeatherStore::new(app.api.clone(), app.notifier.clone()),
            forecast: ForecastStore::new(app.api.clone(), app.notifier.clone()),
            records: RecordStore::new(app.api.clone(), app.notifier.clone()),
            dialogs: DialogStore::new(),
            saver: RecordSaver::new(app.api.clone(), app.notifier.clone()),
            maps: GeocodeCache::new(),
            app,
        }
    }

    async fn load(&self, location: &str) {
        tokio::join!(self.weather.fetch(location), self.forecast.fetch(location));

        if let Some(snapshot) = self.weather.snapshot() {
            println!("{}", render::weather_card(&snapshot));
            println!("{}", render::highlights(&snapshot.todays_insight));
        }
        if self.forecast.state().error.is_none() {
            println!("{}", render::forecast_table(&self.forecast.forecast()));
        }
    }

    async fn search(&self) -> Result<()> {
        let query = Text::new("Search for places ...").prompt()?;

        match validate_query(&query) {
            Ok(location) => self.load(location).await,
            Err(message) => self.app.notifier.error(message),
        }
        Ok(())
    }

    async fn detect(&self) -> Result<()> {
        let location = self.app.resolver.resolve(self.app.config.default_location()).await;
        self.load(&location).await;
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        let payload = self
            .weather
            .snapshot()
            .map(|s| NewWeatherRecord::from_snapshot(&s))
            .unwrap_or_default();

        // Failures were already reported through the notifier.
        if let Ok(saved) = self.saver.save(&payload).await {
            println!("Saved record #{}", saved.id);
        }
        Ok(())
    }

    async fn filter(&self) -> Result<()> {
        let query = Text::new("Location:").prompt()?;
        self.list_records(Some(query.trim())).await
    }

    async fn list_records(&self, filter: Option<&str>) -> Result<()> {
        match filter.filter(|q| !q.is_empty()) {
            Some(q) => self.records.filter_by_location(q).await,
            None => self.records.fetch_all().await,
        }
        print!("{}", render::records_table(&self.records.records()));
        Ok(())
    }

    /// Lets the user pick from the loaded records, fetching them first if needed.
    async fn pick_record(&self, prompt: &str) -> Result<Option<WeatherRecord>> {
        if self.records.records().is_empty() {
            self.records.fetch_all().await;
        }

        let records = self.records.records();
        if records.is_empty() {
            println!("No records found");
            return Ok(None);
        }

        let labels: Vec<String> = records
            .iter()
            .map(|r| format!("#{} {}, {} ({})", r.id, r.location, r.country, render::saved_on(r)))
            .collect();

        let choice = Select::new(prompt, labels).raw_prompt()?;
        Ok(records.into_iter().nth(choice.index))
    }

    async fn view(&self) -> Result<()> {
        let Some(picked) = self.pick_record("Record:").await? else {
            return Ok(());
        };

        if let Ok(record) = self.records.get(picked.id).await {
            let map = self.app.map_for(&self.maps, &record.location, &record.country).await;
            print!("{}", render::record_detail(&record, map));
        }
        self.records.clear_current();
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        let Some(record) = self.pick_record("Delete which record?").await? else {
            return Ok(());
        };

        let confirmed = Arc::new(AtomicBool::new(false));
        let flag = confirmed.clone();
        self.dialogs.open(
            DialogRequest::new(DialogKind::Delete, DELETE_TITLE, DELETE_MESSAGE)
                .with_data(serde_json::json!({ "id": record.id }))
                .on_confirm(move || flag.store(true, Ordering::SeqCst)),
        );
        self.present_dialog()?;

        if !confirmed.load(Ordering::SeqCst) {
            return Ok(());
        }

        if self.records.remove(record.id).await.is_err() {
            self.dialogs.open(DialogRequest::alert("Error", DELETE_FAILED));
            self.present_dialog()?;
        }
        Ok(())
    }

    async fn export(&self) -> Result<()> {
        let scope = Select::new("Export", vec!["All records", "A single record"]).prompt()?;
        let id = if scope == "All records" {
            None
        } else {
            match self.pick_record("Record:").await? {
                Some(record) => Some(record.id),
                None => return Ok(()),
            }
        };

        let dir = Text::new("Directory:").with_default(".").prompt()?;
        match cli::export(&self.app, id, &PathBuf::from(dir)).await {
            Ok(path) => self.app.notifier.success(&format!("Exported to {}", path.display())),
            Err(e) => self.app.notifier.error(&e.to_string()),
        }
        Ok(())
    }

    /// Shows the open dialog, if any, and resolves it from the user's answer.
    fn present_dialog(&self) -> Result<()> {
        let Some(view) = self.dialogs.current() else {
            return Ok(());
        };

        if view.kind == DialogKind::Alert {
            eprintln!("{}: {}", view.title, view.message);
            self.dialogs.close();
            return Ok(());
        }

        let prompt = format!("{}: {}", view.title, view.message);
        match Confirm::new(&prompt).with_default(false).prompt() {
            Ok(true) => self.dialogs.confirm(),
            Ok(false) | Err(InquireError::OperationCanceled) => self.dialogs.close(),
            Err(e) => {
                self.dialogs.close();
                return Err(e.into());
            }
        }
        Ok(())
    }
}
