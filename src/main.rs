use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use dividend_screener::{
    api::YahooClient,
    models::Config,
    notification::{deliver_report, TelegramNotifier},
    Pipeline,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Screen dividend growth companies", long_about = None)]
struct Args {
    /// Source table (CSV); overrides INPUT_PATH
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory for the workbook and tickers.txt; overrides OUTPUT_DIR
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Send the workbook to Telegram when the run finishes
    #[arg(short, long)]
    notify: bool,

    /// Use the local input file even if SOURCE_URL is set
    #[arg(long)]
    skip_download: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dividend_screener=info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("🚀 Dividend Screener");

    let mut config = Config::from_env()?;
    if let Some(input) = args.input {
        config.input_path = input;
    }
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    if args.skip_download {
        config.source_url = None;
    }
    let telegram = config.telegram.clone();

    let provider = Arc::new(YahooClient::new(config.rate_limit_per_minute)?);
    let pipeline = Pipeline::new(config, provider);

    let summary = match pipeline.run().await {
        Ok(summary) => summary,
        Err(e) => {
            error!("❌ Screening failed: {}", e);
            return Err(e.into());
        }
    };

    if args.notify {
        match (telegram, summary.workbook_path.as_deref()) {
            (Some(telegram), Some(workbook)) => {
                let notifier = TelegramNotifier::new(telegram);
                let today = Local::now().date_naive();
                if let Err(e) = deliver_report(&notifier, workbook, today, Some(&summary)).await {
                    // the report is already on disk
                    error!("❌ Failed to deliver report: {}", e);
                }
            }
            (None, _) => warn!("⚠️ Notification requested but Telegram is not configured"),
            (_, None) => warn!("⚠️ No workbook was written, nothing to send"),
        }
    }

    Ok(())
}
