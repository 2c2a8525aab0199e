//! Deliver an existing workbook to Telegram

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use dividend_screener::{
    models::Config,
    notification::{deliver_report, TelegramNotifier},
    report::workbook_file_name,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Workbook to send; defaults to today's workbook in OUTPUT_DIR
    #[arg(short, long)]
    workbook: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dividend_screener=info,send_report=info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::from_env()?;
    let today = Local::now().date_naive();
    let workbook = args
        .workbook
        .unwrap_or_else(|| config.output_dir.join(workbook_file_name(today)));

    let telegram = config
        .telegram
        .context("TELEGRAM_BOT_TOKEN and TELEGRAM_CHANNEL_ID must be set")?;
    let notifier = TelegramNotifier::new(telegram);

    info!("📨 Sending {}", workbook.display());
    deliver_report(&notifier, &workbook, today, None)
        .await
        .with_context(|| format!("failed to send {}", workbook.display()))?;

    Ok(())
}
