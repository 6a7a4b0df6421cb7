use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Deserialize, Debug, Clone)]
pub struct AnalysisRequest {
    #[serde(rename = "userIntent")]
    pub user_intent: String,
    #[serde(default)]
    pub screenshot: Option<String>,
}

impl AnalysisRequest {
    /// Screenshot payload, treating an empty string as absent.
    pub fn image(&self) -> Option<&str> {
        self.screenshot
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coordinates {
    pub x: i64,
    pub y: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub coordinates: Option<Coordinates>,
    pub command: Option<String>,
    pub explanation: String,
    pub steps: Vec<String>,
    pub confidence: u8,
}

impl Suggestion {
    /// Suggestion used for failures: explanation only, zero confidence.
    pub fn failure(explanation: impl Into<String>) -> Self {
        Self {
            coordinates: None,
            command: None,
            explanation: explanation.into(),
            steps: Vec::new(),
            confidence: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    pub success: bool,
    pub response: String,
    pub analysis: Suggestion,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DesktopActionRequest {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ActionEcho {
    pub success: bool,
    pub action: String,
    pub payload: Map<String, Value>,
    pub message: String,
    /// Always false: nothing runs in this process.
    pub executed: bool,
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ScreenshotAck {
    pub success: bool,
    pub screenshot: Option<String>,
    pub message: String,
    pub resolution: Resolution,
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthReport {
    pub status: String,
    pub timestamp: String,
    pub llm_available: bool,
    pub llm_key_configured: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AnalyzerStatus {
    pub ready: bool,
    #[serde(rename = "hasApiKey")]
    pub has_api_key: bool,
    pub model: String,
    pub message: String,
}
