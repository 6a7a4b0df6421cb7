//! Placeholder desktop actions.
//!
//! This process has no native agent and no browser automation channel, so
//! every action is echoed back without running. Screen capture happens in the
//! browser client.

use chrono::Utc;
use serde_json::{Map, Value};

use crate::schema::{ActionEcho, DesktopActionRequest, Resolution, ScreenshotAck};

pub const DEFAULT_RESOLUTION: Resolution = Resolution {
    width: 1920,
    height: 1080,
};

const TYPED_PREVIEW_CHARS: usize = 20;

pub fn echo_action(request: DesktopActionRequest) -> ActionEcho {
    let payload = request.payload.unwrap_or_default();
    let message = describe(&request.action_type, &payload);

    ActionEcho {
        success: true,
        action: request.action_type,
        payload,
        message,
        executed: false,
        timestamp: Utc::now().to_rfc3339(),
    }
}

pub fn screenshot_ack() -> ScreenshotAck {
    ScreenshotAck {
        success: true,
        screenshot: None,
        message: "Screen capture is performed by the browser client; this server has no capture capability.".to_string(),
        resolution: DEFAULT_RESOLUTION,
        timestamp: Utc::now().to_rfc3339(),
    }
}

/// What the action would have done, for display in the client's log.
fn describe(action_type: &str, payload: &Map<String, Value>) -> String {
    match action_type {
        "move" => format!(
            "Cursor move to ({}, {}) acknowledged (not executed)",
            field(payload, "x", "0"),
            field(payload, "y", "0")
        ),
        "click" => format!(
            "{} click at ({}, {}) acknowledged (not executed)",
            field(payload, "button", "left"),
            field(payload, "x", "0"),
            field(payload, "y", "0")
        ),
        "type" => {
            let text = field(payload, "text", "");
            let preview: String = text.chars().take(TYPED_PREVIEW_CHARS).collect();
            let ellipsis = if text.chars().count() > TYPED_PREVIEW_CHARS { "..." } else { "" };
            format!("Typing \"{}{}\" acknowledged (not executed)", preview, ellipsis)
        }
        "command" => format!(
            "Command `{}` acknowledged (not executed)",
            field(payload, "command", "")
        ),
        "screenshot" => "Screenshot request acknowledged; capture happens in the browser client".to_string(),
        "file_operation" => format!(
            "File operation {} acknowledged (not executed)",
            field(payload, "operation", "unknown")
        ),
        other => format!("Action {} acknowledged (not executed)", other),
    }
}

fn field(payload: &Map<String, Value>, key: &str, default_val: &str) -> String {
    match payload.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => default_val.to_string(),
        Some(other) => other.to_string(),
    }
}
