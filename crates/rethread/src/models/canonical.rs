use serde::{Deserialize, Serialize};

/// Threads never carry a per-thread lifecycle in the canonical document;
/// every emitted thread is a finished conversation.
pub const THREAD_STATUS_DONE: &str = "done";

/// One canonical message, owned by exactly one [`Thread`] via `thread_id`.
///
/// Nullable fields serialize as explicit `null` so the output document has
/// a fixed shape regardless of the input variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
    pub role: String,
    pub content: String,
    pub created_at: Option<String>,
    pub model: Option<String>,
    pub status: String,
}

/// One canonical thread. `last_message_at` is the canonicalized maximum raw
/// creation instant among the thread's messages; a thread with zero
/// surviving messages is never emitted at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub title: String,
    pub user_edited_title: bool,
    pub status: String,
    pub model: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub last_message_at: Option<String>,
}

/// The unified output document, independent of the input export variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvertedDocument {
    pub threads: Vec<Thread>,
    pub messages: Vec<Message>,
}

impl ConvertedDocument {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty() && self.messages.is_empty()
    }
}
