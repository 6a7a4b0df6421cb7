//! Turns free-text model output into an [`AnalysisResult`].
//!
//! The model is asked for a JSON object but routinely wraps it in prose or
//! code fences, or ignores the instruction entirely. Extraction is therefore
//! best effort: the widest `{ ... }` span is tried first, then the first
//! syntactically complete object found by an incremental scan. Anything that
//! still fails to decode is returned as a plain-text explanation. This module
//! never fails.

use std::fmt::Write;

use serde_json::{Map, Value};

use crate::schema::{AnalysisResult, Coordinates, Suggestion};

/// Confidence for output that carried no decodable object.
pub const FALLBACK_CONFIDENCE: u8 = 50;
/// Confidence for a decoded object that omitted the field.
pub const DEFAULT_CONFIDENCE: u8 = 70;

pub fn interpret(raw: &str) -> AnalysisResult {
    let analysis = match extract_payload(raw) {
        Some(fields) => suggestion_from_fields(&fields),
        None => Suggestion {
            coordinates: None,
            command: None,
            explanation: raw.to_string(),
            steps: Vec::new(),
            confidence: FALLBACK_CONFIDENCE,
        },
    };

    AnalysisResult {
        success: true,
        response: render(&analysis, raw),
        analysis,
    }
}

/// Human-readable text: explanation, numbered steps, click point.
pub fn render(analysis: &Suggestion, raw: &str) -> String {
    let mut out = if analysis.explanation.is_empty() {
        raw.trim().to_string()
    } else {
        analysis.explanation.clone()
    };

    if !analysis.steps.is_empty() {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str("Steps:");
        for (i, step) in analysis.steps.iter().enumerate() {
            let _ = write!(out, "\n{}. {}", i + 1, step);
        }
    }

    if let Some(point) = analysis.coordinates {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        let _ = write!(out, "Suggested click point: ({}, {})", point.x, point.y);
    }

    out
}

fn extract_payload(raw: &str) -> Option<Map<String, Value>> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }

    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(&raw[start..=end]) {
        return Some(fields);
    }

    first_complete_object(&raw[start..])
}

const SUGGESTION_FIELDS: [&str; 5] = ["coordinates", "command", "explanation", "steps", "confidence"];

/// First `{` from which a full JSON object carrying at least one suggestion
/// field parses; trailing text is ignored. Objects nested in a truncated
/// reply (a bare `{"x":..,"y":..}`) do not count.
fn first_complete_object(text: &str) -> Option<Map<String, Value>> {
    for (idx, _) in text.match_indices('{') {
        let mut stream = serde_json::Deserializer::from_str(&text[idx..]).into_iter::<Value>();
        if let Some(Ok(Value::Object(fields))) = stream.next() {
            if SUGGESTION_FIELDS.iter().any(|k| fields.contains_key(*k)) {
                return Some(fields);
            }
        }
    }
    None
}

fn suggestion_from_fields(fields: &Map<String, Value>) -> Suggestion {
    Suggestion {
        coordinates: fields.get("coordinates").and_then(coordinates_from),
        command: fields
            .get("command")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
        explanation: fields
            .get("explanation")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        steps: fields.get("steps").map(steps_from).unwrap_or_default(),
        confidence: fields
            .get("confidence")
            .and_then(confidence_from)
            .unwrap_or(DEFAULT_CONFIDENCE),
    }
}

fn coordinates_from(value: &Value) -> Option<Coordinates> {
    let point = value.as_object()?;
    Some(Coordinates {
        x: integer_from(point.get("x")?)?,
        y: integer_from(point.get("y")?)?,
    })
}

fn integer_from(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.round() as i64))
}

fn steps_from(value: &Value) -> Vec<String> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect()
}

fn confidence_from(value: &Value) -> Option<u8> {
    let score = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !score.is_finite() {
        return None;
    }
    Some(score.round().clamp(0.0, 100.0) as u8)
}
