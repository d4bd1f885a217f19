use reqwest::{Client, StatusCode, Url};
use std::{path::PathBuf, time::Duration};
use tracing::{debug, warn};

use crate::{
    cache::ResponseCache,
    error::{ForecastError, truncate_body},
};

/// Retry, timeout and caching rules for outgoing GET requests.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpPolicy {
    /// Retries after the first attempt; 5 means at most 6 requests.
    pub max_retries: u32,
    /// Seconds; retry `n` waits `backoff_factor * 2^(n-1)`.
    pub backoff_factor: f64,
    pub cache_ttl: Duration,
    pub timeout: Duration,
    /// `None` disables the response cache.
    pub cache_path: Option<PathBuf>,
}

impl Default for HttpPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_factor: 0.2,
            cache_ttl: Duration::from_secs(3600),
            timeout: Duration::from_secs(30),
            cache_path: None,
        }
    }
}

impl HttpPolicy {
    /// Delay before the `retry`-th retry (1-based).
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(30) as i32;
        let secs = self.backoff_factor * 2f64.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }
}

/// Statuses worth another attempt: gateway hiccups and rate limiting.
fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::GATEWAY_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
    )
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    if error.is_builder() {
        return false;
    }
    error.is_timeout() || error.is_connect() || error.is_request()
}

/// GET client that consults the response cache first and retries transient failures.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: Client,
    policy: HttpPolicy,
    cache: Option<ResponseCache>,
}

impl HttpClient {
    pub fn new(policy: HttpPolicy) -> Result<Self, ForecastError> {
        let http = Client::builder()
            .timeout(policy.timeout)
            .user_agent(concat!("forecast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ForecastError::Client)?;

        let cache = policy
            .cache_path
            .clone()
            .map(|path| ResponseCache::new(path, policy.cache_ttl));

        Ok(Self { http, policy, cache })
    }

    pub fn policy(&self) -> &HttpPolicy {
        &self.policy
    }

    /// Body of a successful GET to `url`, served from cache when fresh.
    pub async fn get_text(&self, service: &'static str, url: &Url) -> Result<String, ForecastError> {
        if let Some(cache) = &self.cache {
            if let Some(body) = cache.get(url.as_str()) {
                debug!(service, %url, "Response cache hit");
                return Ok(body);
            }
            debug!(service, %url, "Response cache miss");
        }

        let body = self.get_with_retry(service, url).await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(url.as_str(), &body) {
                warn!(error = %e, "Failed to store response in cache");
            }
        }

        Ok(body)
    }

    async fn get_with_retry(&self, service: &'static str, url: &Url) -> Result<String, ForecastError> {
        let mut retries = 0;

        loop {
            match self.http.get(url.clone()).send().await {
                Ok(res) => {
                    let status = res.status();

                    if is_retryable_status(status) && retries < self.policy.max_retries {
                        retries += 1;
                        let delay = self.policy.backoff_delay(retries);
                        warn!(service, %status, retries, ?delay, "Retrying after error status");
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    let body = res
                        .text()
                        .await
                        .map_err(|source| ForecastError::Transport { service, source })?;

                    if !status.is_success() {
                        return Err(ForecastError::Status {
                            service,
                            status,
                            body: truncate_body(&body),
                        });
                    }

                    return Ok(body);
                }
                Err(e) if is_retryable_error(&e) && retries < self.policy.max_retries => {
                    retries += 1;
                    let delay = self.policy.backoff_delay(retries);
                    warn!(service, error = %e, retries, ?delay, "Retrying after transport error");
                    tokio::time::sleep(delay).await;
                }
                Err(source) => return Err(ForecastError::Transport { service, source }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_forecast_job() {
        let policy = HttpPolicy::default();

        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.backoff_factor, 0.2);
        assert_eq!(policy.cache_ttl, Duration::from_secs(3600));
        assert!(policy.cache_path.is_none());
    }

    #[test]
    fn backoff_doubles_each_retry() {
        let policy = HttpPolicy::default();

        assert_eq!(policy.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(400));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(800));
        assert_eq!(policy.backoff_delay(5), Duration::from_millis(3200));
    }

    #[test]
    fn zero_or_invalid_factor_means_no_wait() {
        let mut policy = HttpPolicy { backoff_factor: 0.0, ..Default::default() };
        assert_eq!(policy.backoff_delay(4), Duration::ZERO);

        policy.backoff_factor = -1.0;
        assert_eq!(policy.backoff_delay(1), Duration::ZERO);

        policy.backoff_factor = f64::NAN;
        assert_eq!(policy.backoff_delay(1), Duration::ZERO);
    }

    #[test]
    fn only_transient_statuses_are_retried() {
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::GATEWAY_TIMEOUT));
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
    }

    /// A local port with nothing listening on it.
    fn closed_port_url() -> Url {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);
        Url::parse(&format!("http://127.0.0.1:{port}/forecast")).expect("url")
    }

    #[tokio::test]
    async fn connection_errors_are_retryable() {
        let err = Client::new().get(closed_port_url()).send().await.unwrap_err();

        assert!(err.is_connect());
        assert!(is_retryable_error(&err));
    }

    #[tokio::test]
    async fn builder_errors_are_not_retryable() {
        let err = Client::new().get("not a url").send().await.unwrap_err();

        assert!(err.is_builder());
        assert!(!is_retryable_error(&err));
    }

    #[tokio::test]
    async fn unreachable_host_fails_with_transport_error_after_retries() {
        let policy = HttpPolicy {
            max_retries: 2,
            backoff_factor: 0.0,
            timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let client = HttpClient::new(policy).expect("client");

        let err = client.get_text("Open-Meteo", &closed_port_url()).await.unwrap_err();

        match err {
            ForecastError::Transport { service, source } => {
                assert_eq!(service, "Open-Meteo");
                assert!(source.is_connect());
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn client_builds_with_cache_disabled() {
        let client = HttpClient::new(HttpPolicy::default()).expect("client");
        assert!(client.cache.is_none());
    }
}
