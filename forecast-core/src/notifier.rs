use crate::{error::ForecastError, model::TelegramMessage};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod telegram;

pub use telegram::TelegramNotifier;

/// Delivers a message and hands back the provider's raw acknowledgment.
///
/// Delivery is not idempotent: sending the same message twice posts it twice.
#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    async fn send(&self, message: &TelegramMessage) -> Result<serde_json::Value, ForecastError>;
}
