use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{env, fmt, fs, path::{Path, PathBuf}, time::Duration};

use crate::{http::HttpPolicy, model::ForecastRequest};

/// Environment variable holding the bot token.
pub const TOKEN_VAR: &str = "TOKEN";
/// Environment variable holding the destination chat or channel id.
pub const CHANNEL_VAR: &str = "TELEGRAM_CHANNEL_ID";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for Location {
    fn default() -> Self {
        Self { latitude: 49.453551, longitude: 27.014202 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub max_retries: u32,
    /// Seconds.
    pub backoff_factor: f64,
    pub cache_ttl_secs: u64,
    pub timeout_secs: u64,
    /// Defaults to `http-cache.json` in the platform cache directory.
    pub cache_path: Option<PathBuf>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        let policy = HttpPolicy::default();
        Self {
            max_retries: policy.max_retries,
            backoff_factor: policy.backoff_factor,
            cache_ttl_secs: policy.cache_ttl.as_secs(),
            timeout_secs: policy.timeout.as_secs(),
            cache_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    pub token: Option<String>,
    pub channel_id: Option<String>,
    /// Empty string sends plain text.
    pub parse_mode: String,
    pub greeting: String,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            token: None,
            channel_id: None,
            parse_mode: "Markdown".to_string(),
            greeting: "Доброе утро!\nПогода на сегодня".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub open_meteo: String,
    pub telegram: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            open_meteo: "https://api.open-meteo.com/v1".to_string(),
            telegram: "https://api.telegram.org".to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// [location]
/// latitude = 49.45
/// longitude = 27.01
///
/// [telegram]
/// channel_id = "@my_channel"
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hourly variables, in column order.
    pub hourly: Vec<String>,
    pub forecast_days: u8,
    pub location: Location,
    pub http: HttpSettings,
    pub telegram: TelegramSettings,
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hourly: vec![
                "temperature_2m".to_string(),
                "apparent_temperature".to_string(),
                "precipitation_probability".to_string(),
            ],
            forecast_days: 1,
            location: Location::default(),
            http: HttpSettings::default(),
            telegram: TelegramSettings::default(),
            endpoints: Endpoints::default(),
        }
    }
}

/// Everything the notifier needs, fully resolved.
#[derive(Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub token: String,
    pub channel_id: String,
    pub parse_mode: Option<String>,
    pub greeting: String,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"<redacted>")
            .field("channel_id", &self.channel_id)
            .field("parse_mode", &self.parse_mode)
            .field("greeting", &self.greeting)
            .finish()
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weather-task", "forecast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    pub fn forecast_request(&self) -> ForecastRequest {
        ForecastRequest {
            latitude: self.location.latitude,
            longitude: self.location.longitude,
            hourly: self.hourly.clone(),
            forecast_days: self.forecast_days,
        }
    }

    /// HTTP policy for the forecast fetch, with the cache path resolved.
    pub fn http_policy(&self) -> Result<HttpPolicy> {
        let cache_path = match &self.http.cache_path {
            Some(path) => path.clone(),
            None => Self::project_dirs()?.cache_dir().join("http-cache.json"),
        };

        Ok(HttpPolicy {
            max_retries: self.http.max_retries,
            backoff_factor: self.http.backoff_factor,
            cache_ttl: Duration::from_secs(self.http.cache_ttl_secs),
            timeout: self.http.timeout(),
            cache_path: Some(cache_path),
        })
    }

    /// Resolve Telegram settings from the process environment and this config.
    pub fn telegram_config(&self) -> Result<TelegramConfig> {
        self.telegram_config_with(|name| env::var(name).ok())
    }

    /// Non-empty values from `lookup` override the file. A token or channel id
    /// that is missing from both is an error, so the run stops before any request.
    pub fn telegram_config_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<TelegramConfig> {
        let resolve = |var: &str, file_value: &Option<String>| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| file_value.clone().filter(|v| !v.trim().is_empty()))
        };

        let token = resolve(TOKEN_VAR, &self.telegram.token).ok_or_else(|| {
            anyhow!(
                "Telegram bot token is not set.\n\
                 Hint: export {TOKEN_VAR}=<token> or set it under [telegram] in the config file (`forecast --config-path`)."
            )
        })?;

        let channel_id = resolve(CHANNEL_VAR, &self.telegram.channel_id).ok_or_else(|| {
            anyhow!(
                "Telegram channel id is not set.\n\
                 Hint: export {CHANNEL_VAR}=<id> or set it under [telegram] in the config file (`forecast --config-path`)."
            )
        })?;

        let parse_mode =
            Some(self.telegram.parse_mode.trim()).filter(|m| !m.is_empty()).map(str::to_string);

        Ok(TelegramConfig {
            token,
            channel_id,
            parse_mode,
            greeting: self.telegram.greeting.clone(),
        })
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
