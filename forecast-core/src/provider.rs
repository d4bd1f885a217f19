use crate::{
    error::ForecastError,
    model::{ForecastRequest, HourlyForecast},
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openmeteo;

pub use openmeteo::OpenMeteoProvider;

/// Anything that can produce an hourly forecast for a request.
#[async_trait]
pub trait ForecastSource: Send + Sync + Debug {
    async fn hourly_forecast(&self, request: &ForecastRequest) -> Result<HourlyForecast, ForecastError>;
}
