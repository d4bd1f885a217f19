use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::{
    error::ForecastError,
    http::HttpClient,
    model::{ForecastRequest, HourlyForecast, Series, hour_labels},
};

use super::ForecastSource;

const SERVICE: &str = "Open-Meteo";

/// Interval assumed when the response holds a single hour.
const DEFAULT_INTERVAL_SECS: i64 = 3600;

#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
    http: HttpClient,
}

impl OpenMeteoProvider {
    /// `base_url` is the API root, e.g. `https://api.open-meteo.com/v1`.
    pub fn new(base_url: impl Into<String>, http: HttpClient) -> Self {
        Self { base_url: base_url.into(), http }
    }

    pub fn forecast_url(&self, request: &ForecastRequest) -> Result<Url, ForecastError> {
        let endpoint = format!("{}/forecast", self.base_url.trim_end_matches('/'));

        Url::parse_with_params(
            &endpoint,
            &[
                ("latitude", request.latitude.to_string()),
                ("longitude", request.longitude.to_string()),
                ("hourly", request.hourly_param()),
                ("forecast_days", request.forecast_days.to_string()),
                ("timezone", "GMT".to_string()),
                ("timeformat", "unixtime".to_string()),
            ],
        )
        .map_err(|e| ForecastError::InvalidUrl(format!("{endpoint}: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    hourly: OmHourly,
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<i64>,
    #[serde(flatten)]
    variables: HashMap<String, Vec<Option<f64>>>,
}

/// Start, end and interval of an evenly spaced `time` array, `None` when empty.
///
/// The label range is only trusted once it is known to hold exactly one step
/// per entry, so an irregular array cannot inflate it.
fn time_window(time: &[i64]) -> Result<Option<(i64, i64, i64)>, ForecastError> {
    let (Some(&start), Some(&last)) = (time.first(), time.last()) else {
        return Ok(None);
    };

    let interval = match time.get(1) {
        Some(&next) => next.checked_sub(start),
        None => Some(DEFAULT_INTERVAL_SECS),
    }
    .filter(|interval| *interval > 0)
    .ok_or_else(|| ForecastError::MalformedPayload("hourly times are not increasing".into()))?;

    let span = last
        .checked_sub(start)
        .ok_or_else(|| ForecastError::MalformedPayload("hourly times overflow".into()))?;
    let steps = i64::try_from(time.len() - 1)
        .map_err(|_| ForecastError::MalformedPayload("too many hourly times".into()))?;

    if span % interval != 0 || span / interval != steps {
        return Err(ForecastError::MalformedPayload(format!(
            "{} hourly times are not spaced {interval}s apart",
            time.len()
        )));
    }

    let end = last
        .checked_add(interval)
        .ok_or_else(|| ForecastError::MalformedPayload("hourly times overflow".into()))?;

    Ok(Some((start, end, interval)))
}

/// Turn an Open-Meteo JSON body into an [`HourlyForecast`] with columns in
/// the order `request.hourly` lists them.
pub fn parse_forecast(body: &str, request: &ForecastRequest) -> Result<HourlyForecast, ForecastError> {
    let parsed: OmResponse = serde_json::from_str(body)
        .map_err(|source| ForecastError::Decode { service: SERVICE, source })?;
    let mut hourly = parsed.hourly;

    let timestamps = match time_window(&hourly.time)? {
        Some((start, end, interval)) => hour_labels(start, end, interval)?,
        None => Vec::new(),
    };

    let series = request
        .hourly
        .iter()
        .map(|variable| {
            let values = hourly.variables.remove(variable).ok_or_else(|| {
                ForecastError::MalformedPayload(format!("response has no '{variable}' series"))
            })?;
            Ok(Series { variable: variable.clone(), values })
        })
        .collect::<Result<Vec<_>, ForecastError>>()?;

    HourlyForecast::new(timestamps, series)
}

#[async_trait]
impl ForecastSource for OpenMeteoProvider {
    async fn hourly_forecast(&self, request: &ForecastRequest) -> Result<HourlyForecast, ForecastError> {
        let url = self.forecast_url(request)?;
        debug!(%url, "Requesting hourly forecast");

        let body = self.http.get_text(SERVICE, &url).await?;
        let forecast = parse_forecast(&body, request)?;

        info!(hours = forecast.len(), variables = request.hourly.len(), "Fetched hourly forecast");
        Ok(forecast)
    }
}
