use std::sync::Arc;

use async_trait::async_trait;
use nexus_backend::api_server::{build_router, cors_layer, AppState};
use nexus_backend::config::API_KEY_VAR;
use nexus_backend::error::AppError;
use nexus_backend::llm_gateway::{ChatRequest, ModelGateway};
use serde_json::{json, Value};

struct FixedGateway(Result<&'static str, &'static str>);

#[async_trait]
impl ModelGateway for FixedGateway {
    async fn send_message(&self, _request: ChatRequest) -> anyhow::Result<String> {
        self.0.map(str::to_string).map_err(|e| anyhow::anyhow!(e))
    }

    fn model(&self) -> &str {
        "fixed"
    }
}

async fn spawn_server(state: AppState) -> String {
    let app = build_router(state, cors_layer(&[]));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn without_gateway() -> AppState {
    AppState::new(
        Err(AppError::ConfigurationUnavailable(format!("{} is not set", API_KEY_VAR))),
        false,
        "claude-sonnet-4-20250514",
    )
}

fn with_gateway(reply: Result<&'static str, &'static str>) -> AppState {
    AppState::new(Ok(Arc::new(FixedGateway(reply)) as Arc<dyn ModelGateway>), true, "fixed")
}

#[tokio::test]
async fn health_reports_missing_credential() {
    let base = spawn_server(without_gateway()).await;
    let body: Value = reqwest::get(format!("{}/api/health", base)).await.unwrap().json().await.unwrap();

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["llm_available"], false);
    assert_eq!(body["llm_key_configured"], false);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn move_action_is_echoed() {
    let base = spawn_server(without_gateway()).await;
    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/api/desktop/action", base))
        .json(&json!({ "type": "move", "payload": { "x": 100, "y": 200 } }))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["executed"], false);
    assert_eq!(body["action"], "move");
    assert_eq!(body["payload"], json!({ "x": 100, "y": 200 }));
}

#[tokio::test]
async fn screenshot_is_acknowledged_without_pixels() {
    let base = spawn_server(without_gateway()).await;
    let body: Value = reqwest::Client::new()
        .post(format!("{}/api/desktop/screenshot", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    assert!(body["screenshot"].is_null());
    assert_eq!(body["resolution"], json!({ "width": 1920, "height": 1080 }));
}

#[tokio::test]
async fn gateway_failure_is_a_soft_failure() {
    let base = spawn_server(with_gateway(Err("model endpoint returned 529 overloaded"))).await;
    let res = reqwest::Client::new()
        .post(format!("{}/api/ai/analyze", base))
        .json(&json!({ "userIntent": "open the settings" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["analysis"]["explanation"], "model endpoint returned 529 overloaded");
    assert_eq!(body["analysis"]["confidence"], 0);
}

#[tokio::test]
async fn analysis_returns_structured_suggestion() {
    let reply = r#"Here you go: {"explanation":"Open System Settings","command":"open -a 'System Settings'","steps":["Open the Apple menu","Choose System Settings"],"confidence":81}"#;
    let base = spawn_server(with_gateway(Ok(reply))).await;
    let body: Value = reqwest::Client::new()
        .post(format!("{}/api/ai/analyze", base))
        .json(&json!({ "userIntent": "open the settings", "screenshot": null }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["analysis"]["command"], "open -a 'System Settings'");
    assert_eq!(body["analysis"]["steps"], json!(["Open the Apple menu", "Choose System Settings"]));
    assert!(body["analysis"]["coordinates"].is_null());
    assert_eq!(body["analysis"]["confidence"], 81);
    assert_eq!(
        body["response"],
        "Open System Settings\n\nSteps:\n1. Open the Apple menu\n2. Choose System Settings"
    );
}

#[tokio::test]
async fn analysis_without_credential_reports_unavailable() {
    let base = spawn_server(without_gateway()).await;
    let body: Value = reqwest::Client::new()
        .post(format!("{}/api/ai/analyze", base))
        .json(&json!({ "userIntent": "open the settings" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], false);
    assert_eq!(body["analysis"]["confidence"], 0);
    assert!(body["analysis"]["explanation"].as_str().unwrap().contains(API_KEY_VAR));
}

#[tokio::test]
async fn missing_intent_is_rejected_by_the_extractor() {
    let base = spawn_server(without_gateway()).await;
    let res = reqwest::Client::new()
        .post(format!("{}/api/ai/analyze", base))
        .json(&json!({ "screenshot": "AAAA" }))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_client_error());
}

#[tokio::test]
async fn root_and_status_describe_the_service() {
    let base = spawn_server(with_gateway(Ok("{}"))).await;

    let root: Value = reqwest::get(format!("{}/", base)).await.unwrap().json().await.unwrap();
    assert_eq!(root["name"], "Nexus API");
    assert_eq!(root["endpoints"].as_array().unwrap().len(), 4);

    let status: Value = reqwest::get(format!("{}/api/ai/analyze", base)).await.unwrap().json().await.unwrap();
    assert_eq!(status["ready"], true);
    assert_eq!(status["hasApiKey"], true);
    assert_eq!(status["model"], "fixed");
}
