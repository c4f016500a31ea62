use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::ConvertedDocument;

/// Per-role slice of a converted document: how many messages carry the
/// role, across how many distinct threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoleBreakdown {
    pub messages: usize,
    pub threads: usize,
}

/// Analysis of a converted document: totals, per-role distribution, and
/// the two integrity findings worth flagging — messages whose `threadId`
/// matches no emitted thread, and threads that own no messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub threads_total: usize,
    pub messages_total: usize,
    pub role_counts: BTreeMap<String, RoleBreakdown>,
    pub orphan_message_ids: Vec<String>,
    pub empty_thread_ids: Vec<String>,
}

impl DocumentReport {
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.orphan_message_ids.is_empty() && self.empty_thread_ids.is_empty()
    }
}

pub fn load_document(path: &Path) -> Result<ConvertedDocument> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read converted document: {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to decode converted document: {}", path.display()))
}

#[must_use]
pub fn analyze(document: &ConvertedDocument) -> DocumentReport {
    let thread_ids: BTreeSet<&str> = document
        .threads
        .iter()
        .map(|thread| thread.id.as_str())
        .collect();

    let mut role_messages: BTreeMap<&str, usize> = BTreeMap::new();
    let mut role_threads: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut orphan_message_ids = Vec::new();
    let mut populated_threads: BTreeSet<&str> = BTreeSet::new();

    for message in &document.messages {
        *role_messages.entry(message.role.as_str()).or_insert(0) += 1;
        role_threads
            .entry(message.role.as_str())
            .or_default()
            .insert(message.thread_id.as_str());

        if thread_ids.contains(message.thread_id.as_str()) {
            populated_threads.insert(message.thread_id.as_str());
        } else {
            orphan_message_ids.push(message.id.clone());
        }
    }

    let role_counts = role_messages
        .into_iter()
        .map(|(role, messages)| {
            let threads = role_threads.get(role).map_or(0, BTreeSet::len);
            (role.to_string(), RoleBreakdown { messages, threads })
        })
        .collect();

    let empty_thread_ids = document
        .threads
        .iter()
        .filter(|thread| !populated_threads.contains(thread.id.as_str()))
        .map(|thread| thread.id.clone())
        .collect();

    DocumentReport {
        threads_total: document.threads.len(),
        messages_total: document.messages.len(),
        role_counts,
        orphan_message_ids,
        empty_thread_ids,
    }
}
