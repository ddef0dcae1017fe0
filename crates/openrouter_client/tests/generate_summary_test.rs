use openrouter_client::{ClientConfig, ClientError, OpenRouterClient, SummaryClientTrait};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OpenRouterClient {
    OpenRouterClient::new(ClientConfig::new("test-key", server.uri())).expect("client")
}

#[tokio::test]
async fn generate_summary_builds_record_from_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "openai/gpt-4",
            "stream": false,
            "messages": [
                {"role": "system"},
                {"role": "user", "content": "Some long article text to summarize."}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "A short summary."}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = client
        .generate_summary("openai/gpt-4", "Some long article text to summarize.", None, "en")
        .await
        .expect("summary");

    assert_eq!(outcome.summary, "A short summary.");
    assert_eq!(outcome.record.model_id, "gpt-4");
    assert_eq!(outcome.record.provider, "OpenAI");
    assert_eq!(outcome.record.tokens_used, 150);
    assert!(outcome.record.response_time_ms >= 0.0);
    // 120 in + 30 out at GPT-4 rates.
    let expected_cost = 0.12 * 0.03 + 0.03 * 0.06;
    assert!((outcome.record.cost_usd - expected_cost).abs() < 1e-9);
    assert!(outcome.record.validate().is_ok());
}

#[tokio::test]
async fn generate_summary_estimates_tokens_when_usage_missing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "abcdefgh"}}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let text = "x".repeat(40);
    let outcome = client
        .generate_summary("gemini-pro", &text, Some(100), "en")
        .await
        .expect("summary");

    // 40 chars in + 8 chars out at 4 chars/token.
    assert_eq!(outcome.record.tokens_used, 12);
    assert_eq!(outcome.record.provider, "Google");
    assert!(outcome.record.cost_usd > 0.0);
}

#[tokio::test]
async fn generate_summary_surfaces_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "rate limited"}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = client
        .generate_summary("gpt-4", "Some text to summarize.", None, "en")
        .await;

    match outcome {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 429);
            assert_eq!(message, "rate limited");
        }
        other => panic!("expected API error, got {:?}", other.map(|o| o.summary)),
    }
}

#[tokio::test]
async fn generate_summary_rejects_unknown_models_without_a_request() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let outcome = client
        .generate_summary("llama-2-70b", "Some text to summarize.", None, "en")
        .await;

    assert!(matches!(outcome, Err(ClientError::UnsupportedModel(_))));
    assert!(server.received_requests().await.expect("requests").is_empty());
}

#[tokio::test]
async fn generate_summary_requires_an_api_key() {
    let server = MockServer::start().await;
    let client = OpenRouterClient::new(ClientConfig::new("", server.uri())).expect("client");

    let outcome = client
        .generate_summary("gpt-4", "Some text to summarize.", None, "en")
        .await;

    assert!(matches!(outcome, Err(ClientError::Auth(_))));
}

#[tokio::test]
async fn generate_summary_rejects_empty_completions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "   "}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 0, "total_tokens": 10}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = client
        .generate_summary("gpt-4", "Some text to summarize.", None, "en")
        .await;

    assert!(matches!(outcome, Err(ClientError::EmptyCompletion(_))));
}
