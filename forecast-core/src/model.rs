use chrono::DateTime;
use std::fmt;

use crate::error::ForecastError;

/// Telegram rejects `sendMessage` text longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// What to ask the forecast API for. Built once per run from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// Variable names in the order they become table columns.
    pub hourly: Vec<String>,
    pub forecast_days: u8,
}

impl ForecastRequest {
    /// The `hourly` query parameter: variable names joined by commas.
    pub fn hourly_param(&self) -> String {
        self.hourly.join(",")
    }
}

/// One requested variable and its hourly values, already rounded.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub variable: String,
    pub values: Vec<Option<f64>>,
}

/// Hour labels plus one series per variable, aligned by index.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyForecast {
    timestamps: Vec<String>,
    series: Vec<Series>,
}

impl HourlyForecast {
    /// Rounds every value to one decimal and checks that each series has
    /// exactly one value per timestamp.
    pub fn new(timestamps: Vec<String>, series: Vec<Series>) -> Result<Self, ForecastError> {
        let series = series
            .into_iter()
            .map(|s| {
                if s.values.len() != timestamps.len() {
                    return Err(ForecastError::MalformedPayload(format!(
                        "series '{}' has {} values for {} timestamps",
                        s.variable,
                        s.values.len(),
                        timestamps.len()
                    )));
                }

                Ok(Series {
                    variable: s.variable,
                    values: s.values.into_iter().map(|v| v.map(round1)).collect(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { timestamps, series })
    }

    pub fn timestamps(&self) -> &[String] {
        &self.timestamps
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Round the exact binary value to one decimal place, ties to even.
/// Never yields `-0.0`.
pub fn round1(value: f64) -> f64 {
    // The float formatter rounds the exact value, so 2.25 becomes 2.2 and
    // 0.15 (stored as 0.1499...) becomes 0.1.
    let rounded: f64 = format!("{value:.1}").parse().unwrap_or(value);
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// `HH:00` labels (UTC) for every instant in `[start, end)` stepping by `interval` seconds.
///
/// Only the hour of day is kept, so a window crossing midnight repeats labels.
pub fn hour_labels(start: i64, end: i64, interval: i64) -> Result<Vec<String>, ForecastError> {
    let step = usize::try_from(interval)
        .ok()
        .filter(|step| *step > 0)
        .ok_or_else(|| {
            ForecastError::MalformedPayload(format!("non-positive interval {interval}s"))
        })?;

    (start..end)
        .step_by(step)
        .map(|ts| {
            DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.format("%H:00").to_string())
                .ok_or_else(|| {
                    ForecastError::MalformedPayload(format!("timestamp {ts} is out of range"))
                })
        })
        .collect()
}

/// The plain-text table sent to the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport(String);

impl RenderedReport {
    pub fn new(table: String) -> Self {
        Self(table)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RenderedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramMessage {
    pub chat_id: String,
    pub text: String,
    pub parse_mode: Option<String>,
}

impl TelegramMessage {
    /// Greeting, blank line, then the table inside a code block so the
    /// columns stay aligned in the Telegram client.
    pub fn report(
        chat_id: impl Into<String>,
        greeting: &str,
        report: &RenderedReport,
        parse_mode: Option<String>,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: format!("{greeting}\n\n```{report}```"),
            parse_mode,
        }
    }

    /// Rejects text over [`MAX_MESSAGE_CHARS`] Unicode characters. Telegram
    /// itself counts UTF-16 code units after markup is parsed, so this is an
    /// early guard rather than an exact replica of the server-side check.
    pub fn validate(&self) -> Result<(), ForecastError> {
        let len = self.text.chars().count();
        if len > MAX_MESSAGE_CHARS {
            return Err(ForecastError::MessageTooLong { len, max: MAX_MESSAGE_CHARS });
        }
        Ok(())
    }
}
