use serde_json::Value;

/// Joins the usable pieces of a mapping-tree content object.
///
/// The vendor shape is `{ "content_type": ..., "parts": [...] }` where each
/// part is either a raw string or an object tagged `"content_type": "text"`
/// carrying a `text` field. Every other part shape (images, tool payloads)
/// contributes nothing. Surviving parts are newline-joined and trimmed; a
/// content object without a usable `parts` list yields the empty string.
#[must_use]
pub fn join_content_parts(content: Option<&Value>) -> String {
    let Some(parts) = content
        .and_then(Value::as_object)
        .and_then(|object| object.get("parts"))
        .and_then(Value::as_array)
    else {
        return String::new();
    };

    let fragments: Vec<&str> = parts.iter().filter_map(part_text).collect();
    fragments
        .into_iter()
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn part_text(part: &Value) -> Option<&str> {
    match part {
        Value::String(text) => Some(text.as_str()),
        Value::Object(object) => {
            if object.get("content_type").and_then(Value::as_str) == Some("text") {
                object.get("text").and_then(Value::as_str)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Non-empty trimmed string field access, shared by the extractors.
#[must_use]
pub fn extract_string(value: Option<&Value>) -> Option<String> {
    let text = value?.as_str()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{extract_string, join_content_parts};

    #[test]
    fn joins_string_and_text_tagged_parts() {
        let content = json!({
            "content_type": "text",
            "parts": [
                "hello",
                { "content_type": "text", "text": "world" },
                { "content_type": "image_asset_pointer", "asset_pointer": "file://x" },
                42,
            ]
        });
        assert_eq!(join_content_parts(Some(&content)), "hello\nworld");
    }

    #[test]
    fn drops_empty_fragments_and_trims() {
        let content = json!({ "parts": ["  leading", "", "trailing  "] });
        assert_eq!(join_content_parts(Some(&content)), "leading\ntrailing");
    }

    #[test]
    fn missing_or_malformed_parts_yield_empty() {
        assert_eq!(join_content_parts(None), "");
        assert_eq!(join_content_parts(Some(&json!({ "parts": "oops" }))), "");
        assert_eq!(join_content_parts(Some(&json!("bare string"))), "");
        assert_eq!(join_content_parts(Some(&serde_json::Value::Null)), "");
    }

    #[test]
    fn extract_string_rejects_blank_and_non_string() {
        assert_eq!(extract_string(Some(&json!("  ok  "))).as_deref(), Some("ok"));
        assert_eq!(extract_string(Some(&json!("   "))), None);
        assert_eq!(extract_string(Some(&json!(7))), None);
        assert_eq!(extract_string(None), None);
    }
}
