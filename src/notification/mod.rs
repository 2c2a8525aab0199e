//! Delivery of the finished report to a push channel.

use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::info;

use crate::errors::NotifyError;
use crate::pipeline::RunSummary;

pub mod telegram;

pub use telegram::{TelegramConfig, TelegramNotifier};

/// Largest attachment a channel accepts.
pub const MAX_ATTACHMENT_BYTES: u64 = 50 * 1024 * 1024;

/// A channel that accepts a short text message and a file attachment.
#[async_trait]
pub trait ReportNotifier: Send + Sync {
    fn name(&self) -> &str;

    async fn send_message(&self, text: &str) -> Result<(), NotifyError>;

    async fn send_document(&self, path: &Path, caption: &str) -> Result<(), NotifyError>;
}

/// Size of the attachment in bytes, or an error if it cannot be sent.
pub fn ensure_attachment_size(path: &Path) -> Result<u64, NotifyError> {
    let metadata = std::fs::metadata(path)
        .map_err(|_| NotifyError::AttachmentNotFound(path.to_path_buf()))?;
    let size = metadata.len();
    if size > MAX_ATTACHMENT_BYTES {
        return Err(NotifyError::AttachmentTooLarge {
            size,
            limit: MAX_ATTACHMENT_BYTES,
        });
    }
    Ok(size)
}

pub fn run_message(date: NaiveDate, summary: Option<&RunSummary>) -> String {
    let mut message = format!(
        "🤖 Dividend screening finished\n📅 Date: {}",
        date.format("%d.%m.%Y")
    );
    if let Some(summary) = summary {
        message.push_str(&format!(
            "\n📊 {} companies, {} soft, {} hard",
            summary.all_count, summary.soft_count, summary.hard_count
        ));
        if summary.missing > 0 {
            message.push_str(&format!("\n⚠️ {} symbols without data", summary.missing));
        }
    }
    message
}

pub fn document_caption(date: NaiveDate, size_bytes: u64) -> String {
    format!(
        "📊 Dividend screen for {}\nFile size: {:.2} MB",
        date.format("%d.%m.%Y"),
        size_bytes as f64 / 1024.0 / 1024.0
    )
}

/// Send the run message followed by the workbook. The attachment is checked
/// before anything is sent.
pub async fn deliver_report(
    notifier: &dyn ReportNotifier,
    workbook: &Path,
    date: NaiveDate,
    summary: Option<&RunSummary>,
) -> Result<(), NotifyError> {
    let size = ensure_attachment_size(workbook)?;

    notifier.send_message(&run_message(date, summary)).await?;
    notifier
        .send_document(workbook, &document_caption(date, size))
        .await?;

    info!("📨 Report delivered via {}", notifier.name());
    Ok(())
}
