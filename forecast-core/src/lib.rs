//! Core library for the `forecast` job.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The Open-Meteo hourly forecast client, with retry and an on-disk response cache
//! - Table rendering and the Telegram notifier
//!
//! It is used by `forecast-cli`, but can also be reused by other binaries or services.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod notifier;
pub mod pipeline;
pub mod provider;
pub mod render;

pub use config::{Config, TelegramConfig};
pub use error::ForecastError;
pub use http::{HttpClient, HttpPolicy};
pub use model::{ForecastRequest, HourlyForecast, RenderedReport, TelegramMessage};
pub use notifier::{Notifier, TelegramNotifier};
pub use pipeline::{deliver_report, fetch_report};
pub use provider::{ForecastSource, OpenMeteoProvider};
pub use render::render_table;
