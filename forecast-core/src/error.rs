use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while fetching, rendering or delivering a forecast.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The underlying HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// An endpoint URL could not be assembled.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    /// The request never produced a response (after retries, where they apply).
    #[error("Request to {service} failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The remote service answered with a non-success status.
    #[error("{service} request failed with status {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("Failed to parse {service} JSON: {source}")]
    Decode {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The forecast payload was valid JSON but its series do not line up.
    #[error("Malformed forecast payload: {0}")]
    MalformedPayload(String),

    #[error("Failed to access response cache {}: {source}", path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Message is {len} characters long, Telegram accepts at most {max}")]
    MessageTooLong { len: usize, max: usize },
}

impl ForecastError {
    /// HTTP status of a rejected request, if the failure was one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ForecastError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Keep error bodies short enough to read in a terminal.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        let head: String = body.chars().take(MAX).collect();
        format!("{head}...")
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_body_keeps_short_bodies() {
        assert_eq!(truncate_body("bad request"), "bad request");
    }

    #[test]
    fn truncate_body_cuts_on_char_boundary() {
        let body = "й".repeat(250);
        let truncated = truncate_body(&body);

        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);
    }
}
