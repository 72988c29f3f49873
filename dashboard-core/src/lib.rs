//! Core library for the weather dashboard.
//!
//! This crate defines:
//! - Configuration handling
//! - A client for the dashboard REST API (weather, forecast, saved records)
//! - Location detection with GPS -> IP -> default fallback
//! - The per-location save cooldown
//! - State containers that hold fetched data with loading/error flags
//!
//! It is used by `dashboard-cli`, but can also back other front ends.

pub mod api;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod geo;
pub mod location;
pub mod model;
pub mod notify;
pub mod save;
pub mod store;

pub use api::{DashboardApi, HttpDashboardApi};
pub use config::Config;
pub use cooldown::SaveCooldown;
pub use error::{ApiError, GeoError, PositionError, SaveError};
pub use location::{LocationResolver, PositionSource, StaticPosition};
pub use model::{Forecast, ForecastDay, NewWeatherRecord, WeatherRecord, WeatherSnapshot};
pub use notify::{Notification, NotificationLevel, Notifier};
pub use save::RecordSaver;
pub use store::{DialogStore, ForecastStore, RecordStore, WeatherStore};
