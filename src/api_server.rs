use axum::{
    extract::State,
    http::HeaderValue,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{ServerConfig, API_KEY_VAR};
use crate::desktop;
use crate::error::AppError;
use crate::interpreter;
use crate::llm_gateway::{ChatRequest, LLMClient, ModelGateway};
use crate::prompts;
use crate::schema::{
    ActionEcho, AnalysisRequest, AnalysisResult, AnalyzerStatus, DesktopActionRequest, HealthReport,
    ScreenshotAck, Suggestion,
};

pub const SERVICE_NAME: &str = "Nexus API";
pub const SERVICE_DESCRIPTION: &str = "AI Desktop Automation Backend";

/// Shared, read-only request state. Nothing in here is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    gateway: Option<Arc<dyn ModelGateway>>,
    key_configured: bool,
    model: String,
    unavailable_reason: String,
}

impl AppState {
    pub fn new(gateway: Result<Arc<dyn ModelGateway>, AppError>, key_configured: bool, model: impl Into<String>) -> Self {
        match gateway {
            Ok(gateway) => Self {
                gateway: Some(gateway),
                key_configured,
                model: model.into(),
                unavailable_reason: String::new(),
            },
            Err(e) => Self {
                gateway: None,
                key_configured,
                model: model.into(),
                unavailable_reason: e.to_string(),
            },
        }
    }

    /// Builds the Anthropic client when the credential is present.
    pub fn from_config(config: &ServerConfig) -> Self {
        let gateway = LLMClient::new(&config.llm).map(|c| Arc::new(c) as Arc<dyn ModelGateway>);
        if let Err(e) = &gateway {
            warn!("⚠️ LLM gateway disabled: {}", e);
        }
        Self::new(gateway, config.llm.key_configured(), config.llm.model.clone())
    }

    pub fn llm_available(&self) -> bool {
        self.gateway.is_some()
    }
}

pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_check))
        .route("/api/desktop/screenshot", post(capture_screenshot))
        .route("/api/desktop/action", post(execute_desktop_action))
        .route("/api/ai/analyze", post(analyze_screen).get(analyzer_status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match allowed_origins(origins) {
        Some(allowed) => layer.allow_origin(AllowOrigin::list(allowed)),
        None => layer.allow_origin(Any),
    }
}

/// Parsed origin allow-list; `None` means any origin. A list in which no
/// entry parses also means any origin rather than blocking every caller.
fn allowed_origins(origins: &[String]) -> Option<Vec<HeaderValue>> {
    if origins.is_empty() {
        return None;
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();
    if allowed.is_empty() {
        warn!("No valid CORS origin in {:?}; allowing any origin", origins);
        return None;
    }
    Some(allowed)
}

/// Start the HTTP API server
pub async fn start_api_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let app = build_router(state, cors_layer(&config.cors_origins));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;
    println!("🌐 {} running on http://{}", SERVICE_NAME, addr);

    axum::serve(listener, app).await.map_err(|e| anyhow::anyhow!("Server error: {}", e))?;
    Ok(())
}

async fn root_handler() -> Json<Value> {
    Json(json!({
        "name": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "description": SERVICE_DESCRIPTION,
        "endpoints": [
            "/api/health",
            "/api/desktop/screenshot",
            "/api/desktop/action",
            "/api/ai/analyze"
        ]
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        llm_available: state.llm_available(),
        llm_key_configured: state.key_configured,
    })
}

async fn capture_screenshot() -> Json<ScreenshotAck> {
    Json(desktop::screenshot_ack())
}

async fn execute_desktop_action(Json(req): Json<DesktopActionRequest>) -> Json<ActionEcho> {
    let echo = desktop::echo_action(req);
    info!(action = %echo.action, "desktop action echoed");
    Json(echo)
}

async fn analyzer_status(State(state): State<AppState>) -> Json<AnalyzerStatus> {
    let message = if state.llm_available() {
        format!("AI analysis ready with model {}", state.model)
    } else {
        format!("AI analysis unavailable: set {} to enable it", API_KEY_VAR)
    };
    Json(AnalyzerStatus {
        ready: state.llm_available(),
        has_api_key: state.key_configured,
        model: state.model.clone(),
        message,
    })
}

async fn analyze_screen(State(state): State<AppState>, Json(req): Json<AnalysisRequest>) -> Json<AnalysisResult> {
    Json(analyze(&state, &req).await)
}

/// One gateway round trip. Every failure is reported in the body.
pub async fn analyze(state: &AppState, req: &AnalysisRequest) -> AnalysisResult {
    let Some(gateway) = &state.gateway else {
        let reason = state.unavailable_reason.clone();
        warn!("Analysis requested without a model gateway: {}", reason);
        return AnalysisResult {
            success: false,
            response: reason.clone(),
            analysis: Suggestion::failure(reason),
        };
    };

    let chat = ChatRequest {
        system_prompt: prompts::SYSTEM_PROMPT.trim().to_string(),
        session_id: Uuid::new_v4().to_string(),
        model: gateway.model().to_string(),
        message: prompts::build_user_message(&req.user_intent, req.image()),
    };
    let session_id = chat.session_id.clone();

    match gateway.send_message(chat).await {
        Ok(raw) => {
            let result = interpreter::interpret(&raw);
            info!(%session_id, confidence = result.analysis.confidence, "analysis complete");
            result
        }
        Err(e) => {
            error!(%session_id, "AI analysis error: {:#}", e);
            let message = e.to_string();
            AnalysisResult {
                success: false,
                response: format!("Analysis failed: {}", message),
                analysis: Suggestion::failure(message),
            }
        }
    }
}
