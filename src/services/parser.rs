use serde_json::Value;

/// Raised when no usable object can be recovered from model output
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("PARSE_FAILURE: {0}")]
pub struct ParseError(pub String);

/// Extracts the answer object from raw model text
///
/// Tries the whole text first, then the first balanced top-level `{...}`
/// block, so answers wrapped in prose or code fences still parse. The result
/// is guaranteed to be an object with a `recommendations` array; nothing
/// else about its structure is checked here.
pub fn parse_response(text: &str) -> Result<Value, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError("model returned no text".to_string()));
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if has_recommendations(&value) {
            return Ok(value);
        }
    }

    let block = first_object_block(trimmed)
        .ok_or_else(|| ParseError("no JSON object found in model output".to_string()))?;
    let value = serde_json::from_str::<Value>(block)
        .map_err(|e| ParseError(format!("embedded JSON object is malformed: {}", e)))?;

    if has_recommendations(&value) {
        Ok(value)
    } else {
        Err(ParseError(
            "no object with a `recommendations` array".to_string(),
        ))
    }
}

fn has_recommendations(value: &Value) -> bool {
    matches!(value.get("recommendations"), Some(Value::Array(_)))
}

/// Returns the first balanced `{...}` substring, skipping braces inside string literals
fn first_object_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}
