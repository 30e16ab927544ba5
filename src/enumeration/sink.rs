//! Serialized fan-in of verdicts to the output destination and console.

use crate::core::error::{AppError, Result};
use crate::core::models::{TransientCause, Verdict};

use colored::Colorize;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Shared writable destination for confirmed identities.
///
/// The output line and the accompanying console line are written under one
/// lock, so concurrent `record` calls never interleave partial lines. The
/// destination is opened once before the pool starts and flushed once after
/// it drains.
pub struct ResultSink {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    label: String,
    console: bool,
}

impl ResultSink {
    /// Opens the named destination, or standard output when no path is given.
    /// `console` controls the human-readable progress lines.
    pub fn create(path: Option<&Path>, console: bool) -> Result<Self> {
        let (out, label): (Box<dyn Write + Send>, String) = match path {
            Some(p) => {
                let file = File::create(p).map_err(|e| AppError::SinkIo {
                    path: p.display().to_string(),
                    source: e,
                })?;
                (Box::new(file), p.display().to_string())
            }
            None => (Box::new(std::io::stdout()), "<stdout>".to_string()),
        };
        tracing::debug!(target: "sink", "Writing confirmed identities to {}", label);

        Ok(Self {
            writer: Mutex::new(BufWriter::new(out)),
            label,
            console,
        })
    }

    /// Records one verdict: appends the identity to the destination when
    /// confirmed, and prints exactly one console line per processed identity.
    pub fn record(&self, identity: &str, verdict: &Verdict) -> Result<()> {
        let mut writer = self.writer.lock();

        match verdict {
            Verdict::Confirmed(details) => {
                if self.console {
                    let line = match (&details.display_name, &details.presence) {
                        (Some(name), Some(presence)) => format!(
                            "[+] {} - {} - {} - {}",
                            identity, name, presence.availability, presence.device_type
                        ),
                        _ => format!("[+] {}", identity),
                    };
                    println!("{}", line.green());
                }
                writeln!(writer, "{}", identity).map_err(|e| AppError::SinkIo {
                    path: self.label.clone(),
                    source: e,
                })?;
            }
            Verdict::NotFound => {
                if self.console {
                    println!("[-] {}", identity);
                }
            }
            Verdict::AuthError => {
                if self.console {
                    println!("[-] {}", identity);
                    println!(
                        "The token may be invalid or expired. The status code returned by the server is 401"
                    );
                }
            }
            Verdict::Transient(cause) => {
                if self.console {
                    println!("[-] {}", identity);
                    match cause {
                        TransientCause::Status(code) => println!(
                            "Something went wrong. The status code returned by the server is {}",
                            code
                        ),
                        TransientCause::Network(msg) => {
                            println!("Something went wrong. The request failed: {}", msg)
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Flushes the destination. Call once after the pool fully drains.
    pub fn finish(&self) -> Result<()> {
        self.writer.lock().flush().map_err(|e| AppError::SinkIo {
            path: self.label.clone(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Confirmation, PresenceRecord};

    fn confirmed() -> Verdict {
        Verdict::Confirmed(Confirmation {
            display_name: Some("Alice A".to_string()),
            presence: Some(PresenceRecord {
                availability: "Available".to_string(),
                device_type: "Desktop".to_string(),
            }),
        })
    }

    #[test]
    fn only_confirmed_identities_reach_the_destination() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("found.txt");

        let sink = ResultSink::create(Some(&path), false).expect("sink opens");
        sink.record("alice@example.com", &confirmed()).expect("record");
        sink.record("ghost@example.com", &Verdict::NotFound).expect("record");
        sink.record("dead@example.com", &Verdict::AuthError).expect("record");
        sink.record(
            "flaky@example.com",
            &Verdict::Transient(TransientCause::Status(500)),
        )
        .expect("record");
        sink.finish().expect("flush");

        let content = std::fs::read_to_string(&path).expect("read output");
        assert_eq!(content, "alice@example.com\n");
    }

    #[test]
    fn confirmed_identities_appear_once_per_record_call() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("found.txt");

        let sink = ResultSink::create(Some(&path), false).expect("sink opens");
        sink.record("a@example.com", &confirmed()).expect("record");
        sink.record("b@example.com", &Verdict::Confirmed(Confirmation::default()))
            .expect("record");
        sink.finish().expect("flush");

        let content = std::fs::read_to_string(&path).expect("read output");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["a@example.com", "b@example.com"]);
    }

    #[test]
    fn unwritable_destination_is_fatal() {
        let result = ResultSink::create(Some(Path::new("/nonexistent/dir/found.txt")), false);
        assert!(matches!(result, Err(AppError::SinkIo { .. })));
    }
}
