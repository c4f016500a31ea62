use thiserror::Error;

/// Result alias for conversion-facing operations.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// The failure taxonomy surfaced to callers.
///
/// Everything below the whole-document level — bad nodes, bad authors, bad
/// timestamps, duplicate conversation ids — is recovered locally and
/// reported as a warning, never as one of these variants.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The document shape is unrecognized or the JSON fundamentally
    /// unparsable. Never retried.
    #[error("malformed input: {detail}")]
    MalformedInput { detail: String },

    /// Structurally valid input from which nothing survived extraction.
    /// A boundary policy, distinct from `MalformedInput` so callers can
    /// give a more specific message.
    #[error("no valid conversations found in the uploaded file")]
    NoValidConversations,

    /// Reassembly was requested before every chunk index arrived.
    #[error("upload `{upload}` is missing chunk indices {missing:?}")]
    MissingChunks {
        upload: String,
        missing: Vec<usize>,
    },

    /// The in-flight conversion ceiling was reached; retry later.
    #[error("server busy: {limit} conversions already in flight")]
    ServerBusy { limit: usize },

    /// The conversion exceeded its wall-clock budget; partial work was
    /// discarded. Retry later.
    #[error("conversion exceeded the {budget_ms} ms deadline")]
    Timeout { budget_ms: u64 },

    /// Chunk or spool I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A truly unexpected failure outside the taxonomy above.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedInput {
            detail: detail.into(),
        }
    }

    /// Stable machine-readable code, used in HTTP error bodies and logs.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MalformedInput { .. } => "malformed_input",
            Self::NoValidConversations => "no_valid_conversations",
            Self::MissingChunks { .. } => "missing_chunks",
            Self::ServerBusy { .. } => "server_busy",
            Self::Timeout { .. } => "timeout",
            Self::Io(_) => "io_error",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for ConvertError {
    fn from(error: serde_json::Error) -> Self {
        Self::MalformedInput {
            detail: format!("invalid JSON: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ConvertError;

    #[test]
    fn missing_chunks_names_exact_indices() {
        let error = ConvertError::MissingChunks {
            upload: "export.json".to_string(),
            missing: vec![1, 4],
        };
        assert_eq!(error.code(), "missing_chunks");
        assert_eq!(
            error.to_string(),
            "upload `export.json` is missing chunk indices [1, 4]"
        );
    }

    #[test]
    fn admission_errors_carry_limits() {
        assert_eq!(
            ConvertError::ServerBusy { limit: 4 }.to_string(),
            "server busy: 4 conversions already in flight"
        );
        assert_eq!(
            ConvertError::Timeout { budget_ms: 30_000 }.to_string(),
            "conversion exceeded the 30000 ms deadline"
        );
    }

    #[test]
    fn json_failures_map_to_malformed_input() {
        let json_error = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let error = ConvertError::from(json_error);
        assert_eq!(error.code(), "malformed_input");
        assert!(error.to_string().contains("invalid JSON"));
    }
}
