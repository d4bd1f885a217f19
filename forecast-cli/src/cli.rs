use anyhow::{Context, Result};
use clap::Parser;
use forecast_core::{
    Config, HttpClient, OpenMeteoProvider, RenderedReport, TelegramNotifier, deliver_report,
    fetch_report,
};
use tracing::info;

/// Top-level CLI struct. Without flags, fetch today's forecast, print it and post it.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "Post today's hourly forecast to a Telegram channel")]
pub struct Cli {
    /// Fetch and print the forecast table without sending it.
    #[arg(long)]
    pub dry_run: bool,

    /// Print where the config file lives and exit.
    #[arg(long, conflicts_with = "dry_run")]
    pub config_path: bool,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        if self.config_path {
            println!("{}", Config::config_file_path()?.display());
            return Ok(());
        }

        let config = Config::load()?;

        if self.dry_run {
            let report = fetch(&config).await?;
            println!("{report}");
            return Ok(());
        }

        post(&config).await
    }
}

async fn fetch(config: &Config) -> Result<RenderedReport> {
    let http = HttpClient::new(config.http_policy()?)?;
    let provider = OpenMeteoProvider::new(config.endpoints.open_meteo.as_str(), http);

    let report = fetch_report(&provider, &config.forecast_request())
        .await
        .context("Failed to fetch the hourly forecast")?;
    Ok(report)
}

async fn post(config: &Config) -> Result<()> {
    // Resolve credentials before touching the network.
    let telegram = config.telegram_config()?;

    let report = fetch(config).await?;
    println!("{report}");

    let notifier = TelegramNotifier::new(
        config.endpoints.telegram.as_str(),
        telegram.token.as_str(),
        config.http.timeout(),
    )?;

    deliver_report(&notifier, &telegram, &report)
        .await
        .context("Failed to send the forecast to Telegram")?;

    info!(channel = %telegram.channel_id, "Forecast posted");
    Ok(())
}
