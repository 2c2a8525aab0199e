//! Telegram delivery against a local mock Bot API

use assert_matches::assert_matches;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dividend_screener::{
    errors::NotifyError,
    notification::{deliver_report, ReportNotifier, TelegramConfig, TelegramNotifier},
};

use crate::common::logging::{init_test_logging, log_test_step};

const TOKEN: &str = "TESTTOKEN";

fn notifier(server: &MockServer) -> TelegramNotifier {
    TelegramNotifier::new(TelegramConfig::new(TOKEN, "@dividends").with_api_base(server.uri()))
}

fn workbook(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("dividend-screen-2024-03-09.xlsx");
    std::fs::write(&path, b"PK\x03\x04 workbook bytes").unwrap();
    path
}

#[tokio::test]
async fn test_deliver_report_posts_message_and_document() {
    init_test_logging();
    log_test_step("Delivering a workbook through the Bot API");

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", TOKEN)))
        .and(body_partial_json(json!({"chat_id": "@dividends", "parse_mode": "HTML"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendDocument", TOKEN)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = workbook(&dir);
    let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

    deliver_report(&notifier(&server), &path, date, None)
        .await
        .expect("delivery should succeed");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].url.path().ends_with("/sendMessage"));

    let upload = String::from_utf8_lossy(&requests[1].body);
    assert!(upload.contains("dividend-screen-2024-03-09.xlsx"));
    assert!(upload.contains("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"));
    assert!(upload.contains("09.03.2024"));
}

#[tokio::test]
async fn test_rejected_message_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", TOKEN)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "description": "Bad Request: chat not found"
        })))
        .mount(&server)
        .await;

    let result = notifier(&server).send_message("hello").await;

    assert_matches!(
        result,
        Err(NotifyError::Rejected(description)) if description == "Bad Request: chat not found"
    );
}

#[tokio::test]
async fn test_http_failure_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .mount(&server)
        .await;

    let result = notifier(&server).send_message("hello").await;

    assert_matches!(result, Err(NotifyError::Rejected(message)) if message.contains("429"));
}

#[tokio::test]
async fn test_missing_workbook_sends_nothing() {
    let server = MockServer::start().await;
    let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

    let result = deliver_report(
        &notifier(&server),
        std::path::Path::new("/nonexistent/report.xlsx"),
        date,
        None,
    )
    .await;

    assert_matches!(result, Err(NotifyError::AttachmentNotFound(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}
