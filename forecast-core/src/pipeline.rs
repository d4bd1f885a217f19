//! The two steps of a run: fetch and render, then deliver.

use serde_json::Value;

use crate::{
    config::TelegramConfig,
    error::ForecastError,
    model::{ForecastRequest, RenderedReport, TelegramMessage},
    notifier::Notifier,
    provider::ForecastSource,
    render::render_table,
};

/// Fetch the hourly forecast and render it as a table.
pub async fn fetch_report(
    source: &dyn ForecastSource,
    request: &ForecastRequest,
) -> Result<RenderedReport, ForecastError> {
    let forecast = source.hourly_forecast(request).await?;
    Ok(render_table(&forecast))
}

/// Wrap `report` with the greeting and send it to the configured channel.
pub async fn deliver_report(
    notifier: &dyn Notifier,
    telegram: &TelegramConfig,
    report: &RenderedReport,
) -> Result<Value, ForecastError> {
    let message = TelegramMessage::report(
        telegram.channel_id.as_str(),
        &telegram.greeting,
        report,
        telegram.parse_mode.clone(),
    );
    notifier.send(&message).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HourlyForecast, Series};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct FixedSource;

    #[async_trait]
    impl ForecastSource for FixedSource {
        async fn hourly_forecast(
            &self,
            _request: &ForecastRequest,
        ) -> Result<HourlyForecast, ForecastError> {
            HourlyForecast::new(
                vec!["00:00".into(), "01:00".into()],
                vec![Series { variable: "temperature_2m".into(), values: vec![Some(10.04), Some(10.61)] }],
            )
        }
    }

    #[derive(Debug, Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<TelegramMessage>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: &TelegramMessage) -> Result<Value, ForecastError> {
            let mut sent = self.sent.lock().expect("lock");
            sent.push(message.clone());
            Ok(json!({ "ok": true, "result": { "message_id": sent.len() } }))
        }
    }

    fn request() -> ForecastRequest {
        ForecastRequest {
            latitude: 0.0,
            longitude: 0.0,
            hourly: vec!["temperature_2m".into()],
            forecast_days: 1,
        }
    }

    fn telegram() -> TelegramConfig {
        TelegramConfig {
            token: "t".into(),
            channel_id: "@chan".into(),
            parse_mode: Some("Markdown".into()),
            greeting: "Morning".into(),
        }
    }

    #[tokio::test]
    async fn report_flows_from_source_to_notifier() {
        let notifier = RecordingNotifier::default();

        let report = fetch_report(&FixedSource, &request()).await.expect("report");
        let ack = deliver_report(&notifier, &telegram(), &report).await.expect("delivered");

        assert_eq!(ack["result"]["message_id"], 1);
        let sent = notifier.sent.lock().expect("lock");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, "@chan");
        assert!(sent[0].text.starts_with("Morning\n\n```Time"));
        assert!(sent[0].text.contains("00:00  10.0"));
        assert!(sent[0].text.ends_with("01:00  10.6```"));
    }

    #[tokio::test]
    async fn delivering_twice_sends_two_messages() {
        let notifier = RecordingNotifier::default();
        let report = fetch_report(&FixedSource, &request()).await.expect("report");

        let first = deliver_report(&notifier, &telegram(), &report).await.expect("first");
        let second = deliver_report(&notifier, &telegram(), &report).await.expect("second");

        assert_ne!(first, second);
        assert_eq!(notifier.sent.lock().expect("lock").len(), 2);
    }
}
