use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::llm_gateway::{ImageAttachment, UserMessage};

pub const SYSTEM_PROMPT: &str = r#"
You are Nexus, an intelligent desktop automation assistant.
You read the user's request (and a screenshot of their screen when one is provided) in order to:
1. Identify the relevant interface elements
2. Suggest the coordinates where the user should click
3. Propose a system command when one would accomplish the task
4. Explain the suggested actions clearly and briefly

Always answer with a single JSON object in exactly this format:
{
  "coordinates": {"x": number, "y": number} or null,
  "command": "system command" or null,
  "explanation": "short explanation for the user",
  "steps": ["first step", "second step"],
  "confidence": number between 0 and 100
}

Rules:
- Coordinates are screen pixels measured from the top-left corner of the screenshot.
- Only give coordinates for elements you can actually see. Never guess coordinates without a screenshot.
- "steps" may be an empty list when a single action is enough.
- Output ONLY the JSON object, with no text before or after it.
"#;

const SCREEN_INSTRUCTION: &str = r#"The user asks: "{intent}"

A screenshot of the user's current screen is attached.
Locate the elements relevant to this request on the screenshot and answer with the JSON object described above."#;

const GENERIC_INSTRUCTION: &str = r#"The user asks: "{intent}"

No screenshot is available, so you cannot see the user's screen.
Give generic, screen-agnostic guidance: describe where such controls are usually found and which keyboard shortcuts or commands apply.
Set "coordinates" to null. Answer with the JSON object described above."#;

/// Templated user turn; attaches the image when one was supplied.
pub fn build_user_message(intent: &str, screenshot: Option<&str>) -> UserMessage {
    let intent = intent.trim();
    match screenshot {
        Some(raw) => UserMessage {
            text: SCREEN_INSTRUCTION.replace("{intent}", intent),
            image: Some(image_attachment(raw)),
        },
        None => UserMessage {
            text: GENERIC_INSTRUCTION.replace("{intent}", intent),
            image: None,
        },
    }
}

/// Accepts bare base64 or a `data:<mime>;base64,` URL.
pub fn image_attachment(raw: &str) -> ImageAttachment {
    let raw = raw.trim();
    if let Some(rest) = raw.strip_prefix("data:") {
        if let Some((header, data)) = rest.split_once(',') {
            let declared = header.trim_end_matches(";base64");
            let media_type = known_media_type(declared).unwrap_or_else(|| sniff_media_type(data));
            return ImageAttachment {
                media_type,
                data: data.trim().to_string(),
            };
        }
    }

    ImageAttachment {
        media_type: sniff_media_type(raw),
        data: raw.to_string(),
    }
}

fn known_media_type(declared: &str) -> Option<&'static str> {
    match declared.to_ascii_lowercase().as_str() {
        "image/png" => Some("image/png"),
        "image/jpeg" | "image/jpg" => Some("image/jpeg"),
        "image/gif" => Some("image/gif"),
        "image/webp" => Some("image/webp"),
        _ => None,
    }
}

/// Media type from the decoded magic bytes; PNG when unrecognised.
fn sniff_media_type(data: &str) -> &'static str {
    let head: String = data
        .chars()
        .filter(|c| !c.is_whitespace())
        .take(16)
        .collect();
    if !head.is_ascii() {
        return "image/png";
    }
    let usable = head.len() - head.len() % 4;
    let Ok(bytes) = STANDARD.decode(&head[..usable]) else {
        return "image/png";
    };

    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/png"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    #[test]
    fn system_prompt_names_every_field() {
        for field in ["coordinates", "command", "explanation", "steps", "confidence"] {
            assert!(SYSTEM_PROMPT.contains(field), "missing {}", field);
        }
    }

    #[test]
    fn without_screenshot_asks_for_generic_guidance() {
        let msg = build_user_message("  open the downloads folder ", None);
        assert!(msg.image.is_none());
        assert!(msg.text.contains("\"open the downloads folder\""));
        assert!(msg.text.contains("screen-agnostic"));
        assert!(msg.text.contains("\"coordinates\" to null"));
    }

    #[test]
    fn with_screenshot_attaches_image() {
        let png = b64(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D]);
        let msg = build_user_message("click save", Some(&png));
        let image = msg.image.expect("image attached");
        assert_eq!(image.media_type, "image/png");
        assert_eq!(image.data, png);
        assert!(msg.text.contains("screenshot of the user's current screen is attached"));
        assert!(!msg.text.contains("screen-agnostic"));
    }

    #[test]
    fn sniffs_jpeg_gif_and_webp() {
        assert_eq!(sniff_media_type(&b64(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F', 0, 1])), "image/jpeg");
        assert_eq!(sniff_media_type(&b64(b"GIF89a\x01\x00\x01\x00\x00\x00")), "image/gif");
        assert_eq!(sniff_media_type(&b64(b"RIFF\x24\x00\x00\x00WEBPVP8 ")), "image/webp");
    }

    #[test]
    fn unknown_or_invalid_data_defaults_to_png() {
        assert_eq!(sniff_media_type("not base64 at all!!"), "image/png");
        assert_eq!(sniff_media_type(""), "image/png");
    }

    #[test]
    fn data_url_prefix_is_stripped() {
        let jpeg = b64(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F', 0, 1]);
        let image = image_attachment(&format!("data:image/jpeg;base64,{}", jpeg));
        assert_eq!(image.media_type, "image/jpeg");
        assert_eq!(image.data, jpeg);

        // Undeclared type in the prefix falls back to sniffing.
        let image = image_attachment(&format!("data:application/octet-stream;base64,{}", jpeg));
        assert_eq!(image.media_type, "image/jpeg");
    }
}
