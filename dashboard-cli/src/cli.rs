use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use dashboard_core::{
    Config, DashboardApi, ForecastStore, LocationResolver, NewWeatherRecord, Notifier,
    RecordSaver, RecordStore, StaticPosition, WeatherSnapshot, WeatherStore, api,
    geo::{GeocodeCache, Geocoder, IpApiLocator, NominatimGeocoder},
    model::Coordinates,
};
use inquire::{Confirm, Text};

use crate::{
    render::{self, ConsoleNotifier},
    session,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherdash", version, about = "Terminal weather dashboard")]
pub struct Cli {
    /// Device position as "lat,lon"; overrides `position` from the config file.
    #[arg(long, global = true, value_name = "LAT,LON", allow_hyphen_values = true)]
    pub coords: Option<Coordinates>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Edit the configuration file interactively.
    Configure,

    /// Show current weather and forecast. Detects the location if none is given.
    Show {
        location: Option<String>,

        /// Also save the current conditions as a record.
        #[arg(long)]
        save: bool,
    },

    /// Save current conditions as a weather record.
    Save { location: Option<String> },

    /// Detect the current location (device position, then IP, then default).
    Detect,

    /// Browse, delete and export saved records.
    Records {
        #[command(subcommand)]
        command: RecordsCommand,
    },

    /// Interactive dashboard session.
    Dashboard,
}

#[derive(Debug, Subcommand)]
pub enum RecordsCommand {
    /// List saved records, newest first.
    List {
        /// Only records whose location matches.
        #[arg(long)]
        filter: Option<String>,
    },

    /// Show one record with its map link.
    Show { id: i64 },

    /// Delete a record.
    Delete {
        id: i64,

        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Download records as CSV.
    Export {
        /// Export a single record instead of all of them.
        #[arg(long)]
        id: Option<i64>,

        /// Directory to write the file into.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

/// Everything a command needs, built once from the config.
#[derive(Debug, Clone)]
pub struct App {
    pub config: Config,
    pub api: Arc<dyn DashboardApi>,
    pub notifier: Arc<dyn Notifier>,
    pub geocoder: Arc<dyn Geocoder>,
    pub resolver: LocationResolver,
}

impl App {
    pub fn load(coords: Option<Coordinates>) -> Result<Self> {
        Self::from_config(Config::load()?, coords)
    }

    pub fn from_config(config: Config, coords: Option<Coordinates>) -> Result<Self> {
        let api: Arc<dyn DashboardApi> = Arc::new(api::api_from_config(&config)?);
        let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
        let geocoder: Arc<dyn Geocoder> = Arc::new(NominatimGeocoder::from_config(&config)?);
        let ip = Arc::new(IpApiLocator::from_config(&config)?);

        let position = match coords {
            Some(c) => Some(c),
            None => config.position()?,
        };

        let resolver = LocationResolver::new(
            Arc::new(StaticPosition::from_option(position)),
            geocoder.clone(),
            ip,
            notifier.clone(),
        );

        Ok(Self { config, api, notifier, geocoder, resolver })
    }

    /// The given location, or a detected one when absent or blank.
    pub async fn location_or_detect(&self, location: Option<String>) -> String {
        match location.filter(|l| !l.trim().is_empty()) {
            Some(l) => l.trim().to_string(),
            None => self.resolver.resolve(self.config.default_location()).await,
        }
    }

    /// Coordinates for a record's map link, `None` when geocoding fails.
    pub async fn map_for(
        &self,
        cache: &GeocodeCache,
        location: &str,
        country: &str,
    ) -> Option<Coordinates> {
        let query = GeocodeCache::cache_key(location, country);
        match cache.lookup(self.geocoder.as_ref(), &query).await {
            Ok(coords) => Some(coords),
            Err(e) => {
                tracing::warn!(query, "map lookup failed: {e}");
                None
            }
        }
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let coords = self.coords;

        match self.command {
            Command::Configure => configure()?,
            Command::Show { location, save } => {
                let app = App::load(coords)?;
                let location = app.location_or_detect(location).await;
                let snapshot = show(&app, &location).await?;
                if save {
                    save_snapshot(&app, &snapshot).await?;
                }
            }
            Command::Save { location } => {
                let app = App::load(coords)?;
                let location = app.location_or_detect(location).await;
                let snapshot = fetch_snapshot(&app, &location).await?;
                save_snapshot(&app, &snapshot).await?;
            }
            Command::Detect => {
                let app = App::load(coords)?;
                let resolved = app.resolver.resolve_detailed(app.config.default_location()).await;
                print!("{}", render::resolved_location(&resolved));
            }
            Command::Records { command } => records(&App::load(coords)?, command).await?,
            Command::Dashboard => session::run(App::load(coords)?).await?,
        }

        Ok(())
    }
}

async fn fetch_snapshot(app: &App, location: &str) -> Result<WeatherSnapshot> {
    let weather = WeatherStore::new(app.api.clone(), app.notifier.clone());
    weather.fetch(location).await;
    loaded_snapshot(&weather, location)
}

/// The fetched snapshot, or the container's error message.
fn loaded_snapshot(weather: &WeatherStore, location: &str) -> Result<WeatherSnapshot> {
    let state = weather.state();
    state.data.ok_or_else(|| {
        anyhow!(state.error.unwrap_or_else(|| format!("No weather data for {location}")))
    })
}

async fn show(app: &App, location: &str) -> Result<WeatherSnapshot> {
    let weather = WeatherStore::new(app.api.clone(), app.notifier.clone());
    let forecast = ForecastStore::new(app.api.clone(), app.notifier.clone());

    tokio::join!(weather.fetch(location), forecast.fetch(location));

    let snapshot = loaded_snapshot(&weather, location)?;

    println!("{}", render::weather_card(&snapshot));
    println!("{}", render::highlights(&snapshot.todays_insight));
    if forecast.state().error.is_none() {
        print!("{}", render::forecast_table(&forecast.forecast()));
    }

    Ok(snapshot)
}

async fn save_snapshot(app: &App, snapshot: &WeatherSnapshot) -> Result<()> {
    let saver = RecordSaver::new(app.api.clone(), app.notifier.clone());
    let saved = saver.save(&NewWeatherRecord::from_snapshot(snapshot)).await?;

    println!("Saved record #{}", saved.id);
    Ok(())
}

async fn records(app: &App, command: RecordsCommand) -> Result<()> {
    let store = RecordStore::new(app.api.clone(), app.notifier.clone());

    match command {
        RecordsCommand::List { filter } => {
            match filter.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
                Some(q) => store.filter_by_location(q).await,
                None => store.fetch_all().await,
            }

            if let Some(err) = store.state().error {
                bail!(err);
            }
            print!("{}", render::records_table(&store.records()));
        }
        RecordsCommand::Show { id } => {
            let record = store.get(id).await?;
            let map = app.map_for(&GeocodeCache::new(), &record.location, &record.country).await;
            print!("{}", render::record_detail(&record, map));
        }
        RecordsCommand::Delete { id, yes } => {
            let confirmed = yes
                || Confirm::new(session::DELETE_MESSAGE)
                    .with_default(false)
                    .prompt()
                    .context("Failed to read confirmation")?;

            if confirmed {
                store.remove(id).await?;
            }
        }
        RecordsCommand::Export { id, out } => {
            let path = export(app, id, &out).await?;
            println!("Exported to {}", path.display());
        }
    }

    Ok(())
}

/// Downloads the CSV and writes it under `dir` with the server-suggested name.
pub async fn export(app: &App, id: Option<i64>, dir: &std::path::Path) -> Result<PathBuf> {
    let csv = app.api.export_records(id).await?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    let path = dir.join(&csv.file_name);
    std::fs::write(&path, &csv.content)
        .with_context(|| format!("Failed to write export file: {}", path.display()))?;

    Ok(path)
}

fn configure() -> Result<()> {
    // The file itself, without the environment override applied.
    let path = Config::config_file_path()?;
    let mut config = Config::load_from(&path)?;

    let api_url = Text::new("API base URL:").with_default(config.api_url()).prompt()?;
    let default_location =
        Text::new("Default location:").with_default(config.default_location()).prompt()?;
    let geocoder_url =
        Text::new("Geocoder base URL:").with_default(config.geocoder_url()).prompt()?;
    let ip_locator_url =
        Text::new("IP lookup URL:").with_default(config.ip_locator_url()).prompt()?;
    let position = Text::new("Device position (lat,lon), empty for none:")
        .with_initial_value(config.position.as_deref().unwrap_or_default())
        .prompt()?;

    if !position.trim().is_empty() {
        position
            .parse::<Coordinates>()
            .with_context(|| format!("Invalid position: {position}"))?;
    }

    config.api_url = Some(api_url);
    config.default_location = Some(default_location);
    config.geocoder_url = Some(geocoder_url);
    config.ip_locator_url = Some(ip_locator_url);
    config.position = Some(position).filter(|p| !p.trim().is_empty());

    config.save_to(&path)?;
    println!("Configuration saved to {}", path.display());

    Ok(())
}
