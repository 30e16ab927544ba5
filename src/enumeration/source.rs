//! Streams candidate identities from a file or standard input.

use crate::core::error::{AppError, Result};

use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

/// Characters that are illegal in the search lookup path. Lines containing
/// any of them are skipped without producing a job.
pub const ILLEGAL_CHARS: &[char] = &[
    '"', '/', '\\', ':', ';', '|', '=', ',', '+', '*', '?', '<', '>',
];

/// Whether a candidate line may be submitted to the lookup service.
pub fn is_probeable(identity: &str) -> bool {
    !identity.contains(ILLEGAL_CHARS)
}

/// Lazy line source feeding the enumeration queue.
///
/// Yields non-empty lines with terminators stripped, silently dropping lines
/// that contain denylisted characters. Exhaustion closes the downstream
/// queue; a file that cannot be opened is fatal to the run.
pub struct IdentitySource {
    lines: Lines<Box<dyn AsyncBufRead + Send + Unpin>>,
    label: String,
}

impl IdentitySource {
    /// Opens the named file, or standard input when no path is given.
    pub async fn open(path: Option<&Path>) -> Result<Self> {
        let (reader, label): (Box<dyn AsyncBufRead + Send + Unpin>, String) = match path {
            Some(p) => {
                let file = File::open(p).await.map_err(|e| AppError::SourceIo {
                    path: p.display().to_string(),
                    source: e,
                })?;
                (Box::new(BufReader::new(file)), p.display().to_string())
            }
            None => (
                Box::new(BufReader::new(tokio::io::stdin())),
                "<stdin>".to_string(),
            ),
        };
        tracing::debug!(target: "source", "Reading identities from {}", label);

        Ok(Self {
            lines: reader.lines(),
            label,
        })
    }

    /// The next identity that passes the filter, or `None` on exhaustion.
    pub async fn next_identity(&mut self) -> Result<Option<String>> {
        loop {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|e| AppError::SourceIo {
                    path: self.label.clone(),
                    source: e,
                })?;

            match line {
                None => return Ok(None),
                Some(line) => {
                    if line.is_empty() {
                        continue;
                    }
                    if !is_probeable(&line) {
                        tracing::debug!(target: "source",
                            "Skipping line with illegal characters: {}", line);
                        continue;
                    }
                    return Ok(Some(line));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn denylisted_characters_rejected() {
        for c in ILLEGAL_CHARS {
            let identity = format!("user{}name@example.com", c);
            assert!(!is_probeable(&identity), "{:?} should be rejected", c);
        }
    }

    #[test]
    fn plain_email_accepted() {
        assert!(is_probeable("alice@example.com"));
        assert!(is_probeable("first.last@sub.example.co.uk"));
    }

    #[tokio::test]
    async fn file_source_skips_empty_and_illegal_lines() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "alice@example.com").expect("write");
        writeln!(file).expect("write");
        writeln!(file, "a/b@example.com").expect("write");
        writeln!(file, "bob@example.com").expect("write");

        let mut source = IdentitySource::open(Some(file.path()))
            .await
            .expect("source opens");

        let mut collected = Vec::new();
        while let Some(identity) = source.next_identity().await.expect("read") {
            collected.push(identity);
        }
        assert_eq!(collected, vec!["alice@example.com", "bob@example.com"]);
    }

    #[tokio::test]
    async fn missing_file_is_fatal() {
        let result = IdentitySource::open(Some(Path::new("/nonexistent/emails.txt"))).await;
        assert!(matches!(result, Err(AppError::SourceIo { .. })));
    }
}
