//! Telegram Bot API delivery.

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use super::{ensure_attachment_size, ReportNotifier};
use crate::errors::NotifyError;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Bot credentials and target channel.
#[derive(Debug, Clone, PartialEq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub parse_mode: String,
    pub api_base: String,
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            parse_mode: "HTML".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Both `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHANNEL_ID` must be set.
    pub fn from_lookup<F>(lookup: &F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = lookup("TELEGRAM_BOT_TOKEN").filter(|v| !v.trim().is_empty())?;
        let chat_id = lookup("TELEGRAM_CHANNEL_ID").filter(|v| !v.trim().is_empty())?;
        Some(Self::new(bot_token.trim(), chat_id.trim()))
    }
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    config: TelegramConfig,
    client: Client,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base, self.config.bot_token, method
        )
    }

    async fn check_response(response: Response) -> Result<(), NotifyError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!("Telegram rate limited");
            }
            error!("Telegram request failed: {} - {}", status, body);
            return Err(NotifyError::Rejected(format!("HTTP {}: {}", status, body)));
        }

        match serde_json::from_str::<TelegramResponse>(&body) {
            Ok(parsed) if parsed.ok => Ok(()),
            Ok(parsed) => Err(NotifyError::Rejected(
                parsed
                    .description
                    .unwrap_or_else(|| "request not accepted".to_string()),
            )),
            Err(_) => Err(NotifyError::Rejected(format!("unexpected response: {}", body))),
        }
    }
}

#[async_trait]
impl ReportNotifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        let params = serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": text,
            "parse_mode": self.config.parse_mode,
        });

        debug!("Sending Telegram message to {}", self.config.chat_id);
        let response = self
            .client
            .post(self.endpoint("sendMessage"))
            .json(&params)
            .send()
            .await?;
        Self::check_response(response).await?;
        info!("Telegram message sent");
        Ok(())
    }

    async fn send_document(&self, path: &Path, caption: &str) -> Result<(), NotifyError> {
        ensure_attachment_size(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report.xlsx".to_string());
        let bytes = tokio::fs::read(path).await?;

        let document = Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(XLSX_MIME)?;
        let form = Form::new()
            .text("chat_id", self.config.chat_id.clone())
            .text("caption", caption.to_string())
            .part("document", document);

        debug!("Uploading {} to Telegram", file_name);
        let response = self
            .client
            .post(self.endpoint("sendDocument"))
            .multipart(form)
            .send()
            .await?;
        Self::check_response(response).await?;
        info!("File {} sent to Telegram", file_name);
        Ok(())
    }
}
