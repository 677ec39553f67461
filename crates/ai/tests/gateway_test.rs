//! Gateway behavior against a mock server.

use chrono::NaiveDate;
use contta_ai::{AiGateway, GatewaySettings};
use contta_core::classification::{AdvisorError, ChartAccount, ClassificationAdvisor};
use contta_core::statements::StatementLine;
use rust_decimal_macros::dec;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(server: &MockServer, max_retries: u32) -> AiGateway {
    AiGateway::new(GatewaySettings {
        base_url: server.uri(),
        api_key: "test-key".to_string(),
        model: "google/gemini-2.5-flash".to_string(),
        timeout: Duration::from_secs(5),
        max_retries,
        initial_backoff: Duration::from_millis(1),
    })
    .unwrap()
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    })
}

fn line() -> StatementLine {
    StatementLine::from_signed(
        NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
        "PAG BOLETO IMOBILIARIA SOL",
        dec!(-2500.00),
        None,
    )
}

fn chart() -> Vec<ChartAccount> {
    vec![ChartAccount {
        code: "4.1.2.01".to_string(),
        name: "Aluguel".to_string(),
    }]
}

#[tokio::test]
async fn test_suggestion_parsed_from_fenced_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "```json\n{\"account_code\": \"4.1.2.01\", \"confidence\": 0.92, \"rationale\": \"aluguel\"}\n```",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let suggestion = gateway(&server, 0).suggest(&line(), &chart()).await.unwrap();
    assert_eq!(suggestion.account_code, "4.1.2.01");
    assert_eq!(suggestion.confidence, dec!(0.92));
    assert_eq!(suggestion.rationale, "aluguel");
}

#[tokio::test]
async fn test_retries_rate_limit_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"account_code": "4.1.2.01", "confidence": 0.85}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let suggestion = gateway(&server, 3).suggest(&line(), &chart()).await.unwrap();
    assert_eq!(suggestion.confidence, dec!(0.85));
    assert!(suggestion.rationale.is_empty());
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = gateway(&server, 2).suggest(&line(), &chart()).await.unwrap_err();
    assert!(matches!(err, AdvisorError::Unavailable(_)));
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = gateway(&server, 3).suggest(&line(), &chart()).await.unwrap_err();
    assert!(matches!(err, AdvisorError::Unavailable(msg) if msg.contains("401")));
}

#[tokio::test]
async fn test_non_json_reply_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion("Provavelmente aluguel.")),
        )
        .mount(&server)
        .await;

    let err = gateway(&server, 3).suggest(&line(), &chart()).await.unwrap_err();
    assert!(matches!(err, AdvisorError::InvalidResponse(_)));
}
