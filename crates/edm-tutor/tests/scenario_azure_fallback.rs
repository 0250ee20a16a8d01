//! scenario_azure_fallback
//!
//! Drives the Azure OpenAI client against a local mock HTTP server and
//! checks that the tutor facade uses live answers when they are usable and
//! falls back to the mock tutor when they are not.

use std::sync::Arc;
use std::time::Duration;

use edm_schemas::{Difficulty, LearningStyle};
use edm_tutor::{AzureOpenAi, AzureSettings, ChatRequest, LlmClient, Tutor, TutorError};
use httpmock::prelude::*;
use serde_json::json;

const PATH: &str = "/openai/deployments/gpt-4/chat/completions";

fn client(server: &MockServer) -> AzureOpenAi {
    AzureOpenAi::new(AzureSettings {
        endpoint: server.base_url(),
        api_key: "test-key".into(),
        deployment: "gpt-4".into(),
        api_version: "2024-10-21".into(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content } }
        ]
    })
}

#[tokio::test]
async fn client_sends_key_and_returns_first_choice() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(PATH)
                .query_param("api-version", "2024-10-21")
                .header("api-key", "test-key")
                .body_contains("\"max_tokens\":42");
            then.status(200).json_body(completion("hello from the model"));
        })
        .await;

    let text = client(&server)
        .complete(ChatRequest {
            system: "sys".into(),
            user: "usr".into(),
            max_tokens: 42,
            temperature: 0.2,
        })
        .await
        .unwrap();
    assert_eq!(text, "hello from the model");
    m.assert_async().await;
}

#[tokio::test]
async fn non_success_status_is_an_api_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(PATH);
            then.status(429).body("rate limited");
        })
        .await;

    let err = client(&server)
        .complete(ChatRequest {
            system: "s".into(),
            user: "u".into(),
            max_tokens: 10,
            temperature: 0.0,
        })
        .await
        .unwrap_err();
    assert!(err.is_rate_limited());
    assert!(matches!(err, TutorError::Api { code: 429, .. }));
}

#[tokio::test]
async fn tutor_uses_live_explanation() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(PATH);
            then.status(200)
                .json_body(completion("Volcanoes vent molten rock."));
        })
        .await;

    let tutor = Tutor::with_client(Arc::new(client(&server)));
    assert!(tutor.status().ai_enabled);
    let e = tutor
        .explain("volcanoes", Difficulty::Beginner, LearningStyle::Visual)
        .await;
    assert!(!e.is_mock);
    assert_eq!(e.explanation, "Volcanoes vent molten rock.");
}

#[tokio::test]
async fn tutor_falls_back_on_server_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(PATH);
            then.status(500).body("boom");
        })
        .await;

    let tutor = Tutor::with_client(Arc::new(client(&server)));
    let e = tutor
        .explain("algebra", Difficulty::Beginner, LearningStyle::Reading)
        .await;
    assert!(e.is_mock);
    assert!(e.explanation.starts_with("Algebra uses letters"));
}

#[tokio::test]
async fn unparseable_questions_fall_back_to_mock() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(PATH);
            then.status(200)
                .json_body(completion("Here are some questions: 1) ..."));
        })
        .await;

    let tutor = Tutor::with_client(Arc::new(client(&server)));
    let q = tutor.questions("algebra", 2, Difficulty::Beginner).await;
    assert!(q.is_mock);
    assert_eq!(q.questions.len(), 2);
}

#[tokio::test]
async fn fenced_json_questions_are_accepted() {
    let server = MockServer::start_async().await;
    let body = "```json\n[{\"question\":\"2+2?\",\"options\":[\"1\",\"2\",\"3\",\"4\"],\"correctAnswer\":3,\"explanation\":\"four\"}]\n```";
    server
        .mock_async(|when, then| {
            when.method(POST).path(PATH);
            then.status(200).json_body(completion(body));
        })
        .await;

    let tutor = Tutor::with_client(Arc::new(client(&server)));
    let q = tutor.questions("arithmetic", 1, Difficulty::Beginner).await;
    assert!(!q.is_mock);
    assert_eq!(q.questions[0].question, "2+2?");
    assert_eq!(q.questions[0].correct_answer, 3);
}
