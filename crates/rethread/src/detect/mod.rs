use serde_json::Value;

/// The two supported export shapes, decided once per conversation record.
///
/// Detection is deliberately per-conversation rather than per-document: a
/// single archive may mix variants, which is uncommon but permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportVariant {
    /// Messages are nodes in a map keyed by opaque node ids, each
    /// optionally wrapping a message payload.
    MappingTree,
    /// The conversation carries a direct list of message records.
    FlatList,
}

impl ExportVariant {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MappingTree => "mapping_tree",
            Self::FlatList => "flat_list",
        }
    }
}

/// Decides the variant of one conversation record.
///
/// A `mapping` node map wins outright; a `chat_messages` list marks the
/// flat variant; a record with neither marker is treated as mapping-tree,
/// whose extractor then skips it harmlessly.
#[must_use]
pub fn detect_variant(record: &Value) -> ExportVariant {
    let Some(object) = record.as_object() else {
        return ExportVariant::MappingTree;
    };

    if object.contains_key("mapping") {
        ExportVariant::MappingTree
    } else if object.contains_key("chat_messages") {
        ExportVariant::FlatList
    } else {
        ExportVariant::MappingTree
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ExportVariant, detect_variant};

    #[test]
    fn mapping_field_selects_mapping_tree() {
        let record = json!({ "id": "c1", "mapping": {} });
        assert_eq!(detect_variant(&record), ExportVariant::MappingTree);
    }

    #[test]
    fn chat_messages_field_selects_flat_list() {
        let record = json!({ "uuid": "c1", "chat_messages": [] });
        assert_eq!(detect_variant(&record), ExportVariant::FlatList);
    }

    #[test]
    fn mapping_wins_when_both_markers_present() {
        let record = json!({ "mapping": {}, "chat_messages": [] });
        assert_eq!(detect_variant(&record), ExportVariant::MappingTree);
    }

    #[test]
    fn neither_marker_defaults_to_mapping_tree() {
        assert_eq!(detect_variant(&json!({ "id": "c1" })), ExportVariant::MappingTree);
        assert_eq!(detect_variant(&json!(null)), ExportVariant::MappingTree);
    }
}
