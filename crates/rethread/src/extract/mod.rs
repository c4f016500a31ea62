use serde_json::Value;

use crate::models::Message;
use crate::utils::content::{extract_string, join_content_parts};
use crate::utils::time::RawTimestamp;

const MAPPING_STATUS_DEFAULT: &str = "unknown";
const FLAT_STATUS_DEFAULT: &str = "done";

/// A message pulled out of one vendor record, before it is bound to its
/// owning thread. The raw creation instant is kept alongside the canonical
/// fields so ordering and `last_message_at` use numeric comparison, not the
/// canonicalized strings.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedMessage {
    pub id: String,
    pub role: String,
    pub content: String,
    pub raw_created: RawTimestamp,
    pub model: Option<String>,
    pub status: String,
}

impl ExtractedMessage {
    /// Numeric ordering key. Messages whose raw instant cannot be
    /// interpreted sort before every epoch-bearing one.
    #[must_use]
    pub fn epoch_seconds(&self) -> Option<f64> {
        self.raw_created.epoch_seconds()
    }

    /// Binds the message to its owning thread and canonicalizes the
    /// creation instant. Normalization failure leaves `created_at` null;
    /// the message is still emitted because a raw instant was present.
    #[must_use]
    pub fn into_message(self, thread_id: &str) -> Message {
        Message {
            id: self.id,
            thread_id: thread_id.to_string(),
            role: self.role,
            content: self.content,
            created_at: self.raw_created.normalize(),
            model: self.model,
            status: self.status,
        }
    }
}

/// Per-record extraction outcome. Rejections are local anomalies that the
/// pipeline aggregates as warnings; nothing here is fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Message(ExtractedMessage),
    /// A mapping node with no embedded payload; expected, not an anomaly.
    Skipped,
    Rejected { reason: String },
}

/// Extracts a message from one mapping-tree node.
///
/// The node is keyed by an opaque id inside the conversation's node map and
/// optionally wraps a `message` payload. Incomplete payloads (missing id,
/// role, content, or creation time) are rejected with a reason.
#[must_use]
pub fn extract_mapping_node(node_id: &str, node: &Value) -> Extraction {
    let Some(node_object) = node.as_object() else {
        return Extraction::Rejected {
            reason: format!("node `{node_id}` is not an object"),
        };
    };

    let message = match node_object.get("message") {
        None | Some(Value::Null) => return Extraction::Skipped,
        Some(Value::Object(message)) => message,
        Some(_) => {
            return Extraction::Rejected {
                reason: format!("node `{node_id}` has a non-object message payload"),
            };
        }
    };

    let Some(id) = extract_string(message.get("id")) else {
        return Extraction::Rejected {
            reason: format!("node `{node_id}` message has no id"),
        };
    };

    let role = match message.get("author") {
        Some(Value::Object(author)) => match extract_string(author.get("role")) {
            Some(role) => role,
            None => {
                return Extraction::Rejected {
                    reason: format!("message `{id}` has an author without a role"),
                };
            }
        },
        // Absent or malformed author: the message is still attributable,
        // just not to a known actor.
        _ => "unknown".to_string(),
    };

    let content = join_content_parts(message.get("content"));
    if content.is_empty() {
        return Extraction::Rejected {
            reason: format!("message `{id}` has no usable text content"),
        };
    }

    let Some(raw_created) = message.get("create_time").and_then(RawTimestamp::from_value) else {
        return Extraction::Rejected {
            reason: format!("message `{id}` has no create_time"),
        };
    };

    let model = message
        .get("metadata")
        .and_then(Value::as_object)
        .and_then(|metadata| extract_string(metadata.get("model_slug")));
    let status = extract_string(message.get("status"))
        .unwrap_or_else(|| MAPPING_STATUS_DEFAULT.to_string());

    Extraction::Message(ExtractedMessage {
        id,
        role,
        content,
        raw_created,
        model,
        status,
    })
}

/// Extracts a message from one flat-list record.
///
/// The record is the message itself: `uuid`/`id`, `role`, a plain `content`
/// string, and `created_at` are required. This variant carries no
/// per-message model.
#[must_use]
pub fn extract_flat_record(index: usize, record: &Value) -> Extraction {
    let Some(object) = record.as_object() else {
        return Extraction::Rejected {
            reason: format!("chat message {index} is not an object"),
        };
    };

    let Some(id) = extract_string(object.get("uuid")).or_else(|| extract_string(object.get("id")))
    else {
        return Extraction::Rejected {
            reason: format!("chat message {index} has no uuid or id"),
        };
    };

    let Some(role) = extract_string(object.get("role")) else {
        return Extraction::Rejected {
            reason: format!("chat message `{id}` has no role"),
        };
    };

    let Some(content) = extract_string(object.get("content")) else {
        return Extraction::Rejected {
            reason: format!("chat message `{id}` has no content"),
        };
    };

    let Some(raw_created) = object.get("created_at").and_then(RawTimestamp::from_value) else {
        return Extraction::Rejected {
            reason: format!("chat message `{id}` has no created_at"),
        };
    };

    let status =
        extract_string(object.get("status")).unwrap_or_else(|| FLAT_STATUS_DEFAULT.to_string());

    Extraction::Message(ExtractedMessage {
        id,
        role,
        content,
        raw_created,
        model: None,
        status,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Extraction, extract_flat_record, extract_mapping_node};

    fn mapping_node(message: serde_json::Value) -> serde_json::Value {
        json!({ "message": message })
    }

    #[test]
    fn extracts_complete_mapping_message() {
        let node = mapping_node(json!({
            "id": "m1",
            "author": { "role": "user" },
            "content": { "parts": ["hello"] },
            "create_time": 1000,
            "metadata": { "model_slug": "gpt-4o" },
            "status": "finished_successfully",
        }));

        let Extraction::Message(message) = extract_mapping_node("n1", &node) else {
            panic!("complete node should extract");
        };
        assert_eq!(message.id, "m1");
        assert_eq!(message.role, "user");
        assert_eq!(message.content, "hello");
        assert_eq!(message.epoch_seconds(), Some(1_000.0));
        assert_eq!(message.model.as_deref(), Some("gpt-4o"));
        assert_eq!(message.status, "finished_successfully");

        let canonical = message.into_message("c1");
        assert_eq!(canonical.thread_id, "c1");
        assert_eq!(canonical.created_at.as_deref(), Some("1970-01-01T00:16:40.000Z"));
    }

    #[test]
    fn payload_less_node_is_skipped_silently() {
        assert_eq!(extract_mapping_node("n1", &json!({ "message": null })), Extraction::Skipped);
        assert_eq!(extract_mapping_node("n1", &json!({})), Extraction::Skipped);
    }

    #[test]
    fn absent_author_defaults_role_to_unknown() {
        let node = mapping_node(json!({
            "id": "m1",
            "content": { "parts": ["hi"] },
            "create_time": 5,
        }));
        let Extraction::Message(message) = extract_mapping_node("n1", &node) else {
            panic!("author-less node should extract");
        };
        assert_eq!(message.role, "unknown");
        assert_eq!(message.status, "unknown");
        assert_eq!(message.model, None);
    }

    #[test]
    fn rejects_incomplete_mapping_messages() {
        let missing_time = mapping_node(json!({
            "id": "m1",
            "author": { "role": "user" },
            "content": { "parts": ["hi"] },
        }));
        let Extraction::Rejected { reason } = extract_mapping_node("n1", &missing_time) else {
            panic!("missing create_time must reject");
        };
        assert!(reason.contains("create_time"), "unexpected reason: {reason}");

        let empty_content = mapping_node(json!({
            "id": "m2",
            "author": { "role": "user" },
            "content": { "parts": [{ "content_type": "code", "text": "x" }] },
            "create_time": 5,
        }));
        assert!(matches!(
            extract_mapping_node("n2", &empty_content),
            Extraction::Rejected { .. }
        ));
    }

    #[test]
    fn extracts_flat_record_with_done_default_status() {
        let record = json!({
            "uuid": "m1",
            "role": "user",
            "content": "hi",
            "created_at": "2024-01-01T00:00:00Z",
        });
        let Extraction::Message(message) = extract_flat_record(0, &record) else {
            panic!("complete record should extract");
        };
        assert_eq!(message.id, "m1");
        assert_eq!(message.model, None);
        assert_eq!(message.status, "done");
        assert_eq!(
            message.into_message("c1").created_at.as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn flat_record_falls_back_to_id_field() {
        let record = json!({
            "id": "m9",
            "role": "assistant",
            "content": "sure",
            "created_at": "2024-01-01T00:00:01Z",
        });
        let Extraction::Message(message) = extract_flat_record(3, &record) else {
            panic!("record with plain id should extract");
        };
        assert_eq!(message.id, "m9");
    }

    #[test]
    fn rejects_incomplete_flat_records() {
        let missing_content = json!({
            "uuid": "m1",
            "role": "user",
            "created_at": "2024-01-01T00:00:00Z",
        });
        assert!(matches!(
            extract_flat_record(0, &missing_content),
            Extraction::Rejected { .. }
        ));
        assert!(matches!(
            extract_flat_record(1, &json!("not an object")),
            Extraction::Rejected { .. }
        ));
    }
}
