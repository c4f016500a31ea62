use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use crate::detect::{ExportVariant, detect_variant};
use crate::error::{ConvertError, Result};
use crate::extract::{ExtractedMessage, Extraction, extract_flat_record, extract_mapping_node};
use crate::models::{ConvertedDocument, Message, THREAD_STATUS_DONE, Thread};
use crate::utils::content::extract_string;
use crate::utils::time::RawTimestamp;

const CONVERSATIONS_FIELD: &str = "conversations";

/// Default name for a written converted document, shared by the CLI and
/// the HTTP attachment header.
pub const OUTPUT_FILENAME: &str = "converted_threads.json";

/// Per-run metrics. These describe the run, not the output document, and
/// are reported alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertStats {
    pub elapsed_ms: u64,
    pub input_bytes: usize,
    pub conversations_seen: usize,
    pub conversations_skipped: usize,
    pub duplicate_conversations: usize,
    pub threads_emitted: usize,
    pub messages_emitted: usize,
    pub messages_rejected: usize,
    pub variant_counts: BTreeMap<String, usize>,
    pub warnings: usize,
}

/// A completed conversion: the canonical document plus run metrics and the
/// aggregated per-record warnings (anomalies recovered locally, never
/// surfaced as errors).
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub document: ConvertedDocument,
    pub stats: ConvertStats,
    pub warnings: Vec<String>,
}

/// Parses raw bytes and converts the decoded document.
pub fn convert_bytes(bytes: &[u8]) -> Result<Conversion> {
    let raw: Value = serde_json::from_slice(bytes)?;
    convert_document(&raw, bytes.len())
}

/// Converts one decoded export document into the canonical
/// `{threads, messages}` shape.
///
/// Conversations are processed independently in document order and the
/// output preserves that order (conversation order, then message-creation
/// order within each conversation). An entirely empty result is still a
/// successful conversion; treating it as `NoValidConversations` is a
/// boundary policy, not a pipeline one.
pub fn convert_document(raw: &Value, input_bytes: usize) -> Result<Conversion> {
    let started = Instant::now();
    let records = conversation_records(raw)?;

    let mut warnings = Vec::new();
    let mut threads = Vec::new();
    let mut messages = Vec::new();
    let mut seen_ids = BTreeSet::new();
    let mut variant_counts = seeded_counts(&["mapping_tree", "flat_list"]);
    let mut conversations_skipped = 0_usize;
    let mut duplicate_conversations = 0_usize;
    let mut messages_rejected = 0_usize;

    for (index, record) in records.iter().enumerate() {
        let Some(object) = record.as_object() else {
            warnings.push(format!("skipping item {index}: not a conversation object"));
            conversations_skipped += 1;
            continue;
        };

        let Some(thread_id) = conversation_id(object) else {
            warnings.push(format!("skipping conversation {index}: missing id"));
            conversations_skipped += 1;
            continue;
        };

        if !seen_ids.insert(thread_id.clone()) {
            warnings.push(format!(
                "duplicate conversation id `{thread_id}`; keeping the first occurrence"
            ));
            duplicate_conversations += 1;
            continue;
        }

        let variant = detect_variant(record);
        increment_count(&mut variant_counts, variant.as_str());

        let mut extracted =
            extract_conversation(object, variant, &thread_id, &mut warnings, &mut messages_rejected);
        if extracted.is_empty() {
            warnings.push(format!(
                "thread `{thread_id}` has no valid messages after filtering; skipped"
            ));
            conversations_skipped += 1;
            continue;
        }

        extracted.sort_by(compare_raw_instants);

        let last_message_at = extracted
            .last()
            .and_then(|message| message.raw_created.normalize());

        threads.push(build_thread(object, &thread_id, last_message_at, &mut warnings));
        messages.extend(
            extracted
                .into_iter()
                .map(|message| message.into_message(&thread_id)),
        );
    }

    if variant_counts.values().filter(|count| **count > 0).count() > 1 {
        warnings.push("document mixes mapping-tree and flat-list conversations".to_string());
    }

    let stats = ConvertStats {
        elapsed_ms: started.elapsed().as_millis() as u64,
        input_bytes,
        conversations_seen: records.len(),
        conversations_skipped,
        duplicate_conversations,
        threads_emitted: threads.len(),
        messages_emitted: messages.len(),
        messages_rejected,
        variant_counts,
        warnings: warnings.len(),
    };

    Ok(Conversion {
        document: ConvertedDocument { threads, messages },
        stats,
        warnings,
    })
}

/// Serializes a converted document the way the boundary emits it.
pub fn encode_document(document: &ConvertedDocument) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(document).map_err(|error| {
        ConvertError::malformed(format!("failed to encode converted document: {error}"))
    })
}

fn conversation_records(raw: &Value) -> Result<&Vec<Value>> {
    match raw {
        Value::Array(records) => Ok(records),
        Value::Object(object) => match object.get(CONVERSATIONS_FIELD) {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(ConvertError::malformed(format!(
                "top-level object does not expose a `{CONVERSATIONS_FIELD}` list"
            ))),
        },
        other => Err(ConvertError::malformed(format!(
            "top-level value must be a list of conversations or an object, got {}",
            json_type_name(other)
        ))),
    }
}

fn conversation_id(object: &serde_json::Map<String, Value>) -> Option<String> {
    extract_string(object.get("conversation_id"))
        .or_else(|| extract_string(object.get("id")))
        .or_else(|| extract_string(object.get("uuid")))
}

fn extract_conversation(
    object: &serde_json::Map<String, Value>,
    variant: ExportVariant,
    thread_id: &str,
    warnings: &mut Vec<String>,
    messages_rejected: &mut usize,
) -> Vec<ExtractedMessage> {
    let mut extracted = Vec::new();

    match variant {
        ExportVariant::MappingTree => {
            let mapping = match object.get("mapping") {
                Some(Value::Object(mapping)) => Some(mapping),
                Some(_) => {
                    warnings.push(format!(
                        "thread `{thread_id}`: invalid `mapping` format; skipping messages"
                    ));
                    None
                }
                None => None,
            };

            for (node_id, node) in mapping.into_iter().flatten() {
                match extract_mapping_node(node_id, node) {
                    Extraction::Message(message) => extracted.push(message),
                    Extraction::Skipped => {}
                    Extraction::Rejected { reason } => {
                        warnings.push(format!("thread `{thread_id}`: {reason}"));
                        *messages_rejected += 1;
                    }
                }
            }
        }
        ExportVariant::FlatList => {
            let chat_messages = match object.get("chat_messages") {
                Some(Value::Array(chat_messages)) => Some(chat_messages),
                _ => {
                    warnings.push(format!(
                        "thread `{thread_id}`: invalid `chat_messages` format; skipping messages"
                    ));
                    None
                }
            };

            for (index, record) in chat_messages.into_iter().flatten().enumerate() {
                match extract_flat_record(index, record) {
                    Extraction::Message(message) => extracted.push(message),
                    Extraction::Skipped => {}
                    Extraction::Rejected { reason } => {
                        warnings.push(format!("thread `{thread_id}`: {reason}"));
                        *messages_rejected += 1;
                    }
                }
            }
        }
    }

    extracted
}

fn build_thread(
    object: &serde_json::Map<String, Value>,
    thread_id: &str,
    last_message_at: Option<String>,
    warnings: &mut Vec<String>,
) -> Thread {
    let title = extract_string(object.get("title"))
        .or_else(|| extract_string(object.get("name")))
        .unwrap_or_default();
    let model = extract_string(object.get("default_model_slug"));
    let created_at =
        normalize_record_instant(object, &["create_time", "created_at"], thread_id, warnings);
    let updated_at =
        normalize_record_instant(object, &["update_time", "updated_at"], thread_id, warnings);

    Thread {
        id: thread_id.to_string(),
        title,
        user_edited_title: false,
        status: THREAD_STATUS_DONE.to_string(),
        model,
        created_at,
        updated_at,
        last_message_at,
    }
}

fn normalize_record_instant(
    object: &serde_json::Map<String, Value>,
    fields: &[&str],
    thread_id: &str,
    warnings: &mut Vec<String>,
) -> Option<String> {
    let (field, raw) = fields.iter().find_map(|field| {
        object
            .get(*field)
            .and_then(RawTimestamp::from_value)
            .map(|raw| (*field, raw))
    })?;

    let normalized = raw.normalize();
    if normalized.is_none() {
        warnings.push(format!(
            "thread `{thread_id}`: could not normalize `{field}` value"
        ));
    }
    normalized
}

/// Ascending numeric ordering over raw creation instants. Instants that
/// cannot be interpreted sort first; the sort is stable, so extraction
/// order breaks ties deterministically.
fn compare_raw_instants(left: &ExtractedMessage, right: &ExtractedMessage) -> Ordering {
    match (left.epoch_seconds(), right.epoch_seconds()) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(left), Some(right)) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
    }
}

fn seeded_counts(keys: &[&str]) -> BTreeMap<String, usize> {
    keys.iter().map(|key| ((*key).to_string(), 0_usize)).collect()
}

fn increment_count(counts: &mut BTreeMap<String, usize>, key: &str) {
    *counts.entry(key.to_string()).or_insert(0) += 1;
}

/// Referential-integrity view used by the report module and tests: every
/// emitted message must reference exactly one emitted thread.
#[must_use]
pub fn orphan_messages<'a>(document: &'a ConvertedDocument) -> Vec<&'a Message> {
    let thread_ids: BTreeSet<&str> = document
        .threads
        .iter()
        .map(|thread| thread.id.as_str())
        .collect();
    document
        .messages
        .iter()
        .filter(|message| !thread_ids.contains(message.thread_id.as_str()))
        .collect()
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
