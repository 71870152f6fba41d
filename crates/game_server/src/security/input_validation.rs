//! Input validation for inbound JSON frames.

use super::ValidationError;
use crate::config::SecurityConfig;
use serde_json::Value;

/// Checks size and shape of a raw frame and returns the parsed JSON.
///
/// String content is never screened beyond length and embedded NULs; chat
/// text is relayed as typed.
///
/// # Arguments
///
/// * `message` - The raw frame bytes
/// * `config` - Limits to enforce
///
/// # Returns
///
/// The parsed [`Value`] so callers do not parse twice, or the first
/// [`ValidationError`] found.
pub fn validate_json_message(
    message: &[u8],
    config: &SecurityConfig,
) -> Result<Value, ValidationError> {
    if message.len() > config.max_message_size {
        return Err(ValidationError::MessageTooLarge(message.len()));
    }

    let json: Value = serde_json::from_slice(message)
        .map_err(|e| ValidationError::InvalidMessageFormat(e.to_string()))?;

    validate_json_value(&json, 0, config)?;
    Ok(json)
}

fn validate_json_value(
    value: &Value,
    depth: usize,
    config: &SecurityConfig,
) -> Result<(), ValidationError> {
    if depth > config.max_json_depth {
        return Err(ValidationError::InvalidMessageFormat(
            "JSON nesting too deep".to_string(),
        ));
    }

    match value {
        Value::String(s) => validate_string(s, config)?,
        Value::Array(items) => {
            if items.len() > config.max_collection_size {
                return Err(ValidationError::InvalidMessageFormat(format!(
                    "Array too large: {} elements",
                    items.len()
                )));
            }
            for item in items {
                validate_json_value(item, depth + 1, config)?;
            }
        }
        Value::Object(fields) => {
            if fields.len() > config.max_collection_size {
                return Err(ValidationError::InvalidMessageFormat(format!(
                    "Object too large: {} keys",
                    fields.len()
                )));
            }
            for (key, field) in fields {
                validate_string(key, config)?;
                validate_json_value(field, depth + 1, config)?;
            }
        }
        Value::Number(_) | Value::Bool(_) | Value::Null => {}
    }

    Ok(())
}

fn validate_string(s: &str, config: &SecurityConfig) -> Result<(), ValidationError> {
    if s.chars().count() > config.max_string_length {
        return Err(ValidationError::InvalidMessageFormat(format!(
            "String too long: {} characters",
            s.chars().count()
        )));
    }

    if s.contains('\0') {
        return Err(ValidationError::EmbeddedNul);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_move_message() {
        let json = br#"{"namespace": "match", "event": "move",
            "data": {"room_id": "den", "row": 1, "col": 2}}"#;
        let value = validate_json_message(json, &SecurityConfig::default()).unwrap();
        assert_eq!(value["data"]["row"], 1);
    }

    #[test]
    fn test_rejects_oversized_frame() {
        let config = SecurityConfig {
            max_message_size: 32,
            ..SecurityConfig::default()
        };
        let json = format!(r#"{{"data": "{}"}}"#, "x".repeat(64));
        assert_eq!(
            validate_json_message(json.as_bytes(), &config),
            Err(ValidationError::MessageTooLarge(json.len()))
        );
    }

    #[test]
    fn test_rejects_deep_nesting() {
        let mut json = String::new();
        for _ in 0..15 {
            json.push_str(r#"{"nested": "#);
        }
        json.push_str("true");
        for _ in 0..15 {
            json.push('}');
        }
        assert!(matches!(
            validate_json_message(json.as_bytes(), &SecurityConfig::default()),
            Err(ValidationError::InvalidMessageFormat(_))
        ));
    }

    #[test]
    fn test_chat_text_is_not_screened() {
        let texts = [
            "try javascript: in the url bar",
            "<script> tags go in the head",
            "document.cookie and onclick= are DOM things",
            "tabs\tand\u{7}bells\u{7}are\u{7}fine\u{7}here\u{7}ok\u{7}",
        ];
        for text in texts {
            let json =
                serde_json::json!({"namespace": "chat", "event": "send", "data": {"text": text}});
            let json = json.to_string();
            let value = validate_json_message(json.as_bytes(), &SecurityConfig::default())
                .unwrap_or_else(|e| panic!("{text:?} refused: {e}"));
            assert_eq!(value["data"]["text"], text);
        }
    }

    #[test]
    fn test_rejects_embedded_nul() {
        let json = br#"{"namespace": "chat", "event": "send", "data": {"text": "a\u0000b"}}"#;
        assert_eq!(
            validate_json_message(json, &SecurityConfig::default()),
            Err(ValidationError::EmbeddedNul)
        );
    }

    #[test]
    fn test_rejects_non_json() {
        assert!(matches!(
            validate_json_message(b"hello there", &SecurityConfig::default()),
            Err(ValidationError::InvalidMessageFormat(_))
        ));
    }

    #[test]
    fn test_custom_limits() {
        let config = SecurityConfig {
            max_string_length: 5,
            max_collection_size: 2,
            max_json_depth: 2,
            ..SecurityConfig::default()
        };

        assert!(validate_json_message(br#"{"key": "toolong"}"#, &config).is_err());
        assert!(validate_json_message(br#"{"key": "ok"}"#, &config).is_ok());
        assert!(validate_json_message(br#"[1, 2, 3]"#, &config).is_err());
    }
}
