//! Maps the directory search outcome to a verdict.

use crate::core::models::{Confirmation, DirectoryRecord, TransientCause, Verdict};
use reqwest::StatusCode;

/// Classifies one search result. Pure function, no hidden state.
///
/// A 200 with a record whose display name differs from its given name is a
/// provisioned account; an equal pair is the service's placeholder for an
/// unprovisioned identity. A 403 confirms existence through the block
/// itself, so no enrichment is attempted for it. A 401 means the credential
/// is dead. Anything else is unexpected and surfaces with its status code.
pub fn classify(status: StatusCode, record: Option<&DirectoryRecord>) -> Verdict {
    match status {
        StatusCode::OK => match record {
            Some(record) if record.is_provisioned() => Verdict::Confirmed(Confirmation::default()),
            _ => Verdict::NotFound,
        },
        StatusCode::FORBIDDEN => Verdict::Confirmed(Confirmation::default()),
        StatusCode::UNAUTHORIZED => Verdict::AuthError,
        other => Verdict::Transient(TransientCause::Status(other.as_u16())),
    }
}
