use std::path::{Path, PathBuf};

use crate::error::{ConvertError, Result};

/// Filesystem spool for chunked uploads.
///
/// One directory per upload session, one `NNNNN.part` file per chunk
/// index. The layout is the whole state machine: an existing directory is
/// a session in progress, and reassembly consumes the session exactly once,
/// deleting the directory whether or not it succeeds. Chunks may arrive in
/// any order; reassembly concatenates strictly in index order.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    root: PathBuf,
}

impl ChunkStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Opens a session for the named upload. Idempotent: re-starting an
    /// existing session keeps its chunks.
    pub fn start_session(&self, upload: &str) -> Result<()> {
        let dir = self.session_dir(upload)?;
        std::fs::create_dir_all(dir)?;
        Ok(())
    }

    /// Stores one chunk. Returns `true` when this was the final expected
    /// index (`total - 1`), at which point the caller may attempt
    /// reassembly.
    pub fn write_chunk(&self, upload: &str, index: usize, total: usize, bytes: &[u8]) -> Result<bool> {
        if total < 1 {
            return Err(ConvertError::malformed(format!(
                "total_chunks must be at least 1, got {total}"
            )));
        }
        if index >= total {
            return Err(ConvertError::malformed(format!(
                "chunk index {index} is out of range for total_chunks {total}"
            )));
        }
        if bytes.is_empty() {
            return Err(ConvertError::malformed(format!(
                "chunk {index} of upload `{upload}` is empty"
            )));
        }

        let dir = self.session_dir(upload)?;
        std::fs::create_dir_all(&dir)?;
        std::fs::write(chunk_path(&dir, index), bytes)?;
        Ok(index + 1 == total)
    }

    /// Verifies that every index `0..total` is present and concatenates the
    /// chunks in index order. The session is deleted unconditionally: on
    /// success because it is consumed, on failure because partial sessions
    /// are never reused.
    pub fn reassemble(&self, upload: &str, total: usize) -> Result<Vec<u8>> {
        let dir = self.session_dir(upload)?;
        let outcome = reassemble_dir(&dir, upload, total);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        outcome
    }

    /// Drops a session and everything in it, if it exists.
    pub fn discard(&self, upload: &str) -> Result<()> {
        let dir = self.session_dir(upload)?;
        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
        }
        Ok(())
    }

    fn session_dir(&self, upload: &str) -> Result<PathBuf> {
        Ok(self.root.join(sanitize_upload_name(upload)?))
    }
}

/// Reduces an upload name to a single safe path component. Anything that
/// could traverse or collide (`/`, `..`, control characters) is replaced.
pub fn sanitize_upload_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ConvertError::malformed("upload name is empty"));
    }

    let sanitized: String = trimmed
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.chars().all(|ch| ch == '.') {
        return Err(ConvertError::malformed(format!(
            "upload name `{name}` is not usable as a session key"
        )));
    }

    Ok(sanitized)
}

fn reassemble_dir(dir: &Path, upload: &str, total: usize) -> Result<Vec<u8>> {
    if total < 1 {
        return Err(ConvertError::malformed(format!(
            "total_chunks must be at least 1, got {total}"
        )));
    }

    let missing: Vec<usize> = (0..total)
        .filter(|index| !chunk_path(dir, *index).is_file())
        .collect();
    if !missing.is_empty() {
        return Err(ConvertError::MissingChunks {
            upload: upload.to_string(),
            missing,
        });
    }

    let mut assembled = Vec::new();
    for index in 0..total {
        let mut chunk = std::fs::read(chunk_path(dir, index))?;
        assembled.append(&mut chunk);
    }
    Ok(assembled)
}

fn chunk_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("{index:05}.part"))
}

#[cfg(test)]
mod tests {
    use super::sanitize_upload_name;

    #[test]
    fn sanitizes_traversal_and_separators() {
        assert_eq!(
            sanitize_upload_name("../../etc/passwd").expect("sanitizes"),
            ".._.._etc_passwd"
        );
        assert_eq!(
            sanitize_upload_name("my export (1).json").expect("sanitizes"),
            "my_export__1_.json"
        );
    }

    #[test]
    fn rejects_unusable_names() {
        assert!(sanitize_upload_name("   ").is_err());
        assert!(sanitize_upload_name("..").is_err());
    }
}
