//! Data types flowing through the enumeration pipeline.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// One entry of the directory search response.
///
/// The service returns a JSON array; only the first element is meaningful for
/// a single-identity search. Fields default to empty strings so partial
/// records still decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryRecord {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub mri: String,
    #[serde(default)]
    pub user_principal_name: String,
    #[serde(default)]
    pub given_name: String,
}

impl DirectoryRecord {
    /// The service returns a placeholder record with identical display and
    /// given names for identities that do not map to a provisioned account.
    /// A differing pair is the only reliable existence signal the search
    /// response carries.
    pub fn is_provisioned(&self) -> bool {
        self.display_name != self.given_name
    }
}

/// Availability and device state for one routing identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    pub availability: String,
    pub device_type: String,
}

impl PresenceRecord {
    /// The degraded value used when the subject is offline, unreachable, or
    /// the presence payload could not be interpreted.
    pub fn unreachable() -> Self {
        Self {
            availability: "error".to_string(),
            device_type: "error".to_string(),
        }
    }
}

/// Outcome of the directory search call, before classification.
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub status: StatusCode,
    pub record: Option<DirectoryRecord>,
}

/// Why a lookup was classified as transient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransientCause {
    /// The service answered with a status the classifier does not know.
    Status(u16),
    /// The call never completed (connect failure, timeout, reset).
    Network(String),
}

impl std::fmt::Display for TransientCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransientCause::Status(code) => write!(f, "status code {}", code),
            TransientCause::Network(msg) => write!(f, "network error: {}", msg),
        }
    }
}

/// Enrichment attached to a confirmed identity when the directory search
/// produced a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Confirmation {
    pub display_name: Option<String>,
    pub presence: Option<PresenceRecord>,
}

/// Final classification of one identity's lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The identity maps to a real account. Enrichment is present when the
    /// search returned a record, absent for block-derived confirmations.
    Confirmed(Confirmation),
    /// No provisioned account behind this identity.
    NotFound,
    /// HTTP 401: the credential is invalid or expired.
    AuthError,
    /// An unexpected status or a transport failure; the identity was not
    /// conclusively probed.
    Transient(TransientCause),
}

impl Verdict {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Verdict::Confirmed(_))
    }
}

/// Aggregate counts for one enumeration run.
#[derive(Debug, Clone, Default)]
pub struct EnumerationSummary {
    pub processed: usize,
    pub confirmed: usize,
    pub not_found: usize,
    pub auth_errors: usize,
    pub transient: usize,
    /// Identities still queued when cancellation tripped; never probed.
    pub abandoned: usize,
    pub cancelled: bool,
}

impl EnumerationSummary {
    pub(crate) fn absorb(&mut self, verdict: &Verdict) {
        self.processed += 1;
        match verdict {
            Verdict::Confirmed(_) => self.confirmed += 1,
            Verdict::NotFound => self.not_found += 1,
            Verdict::AuthError => self.auth_errors += 1,
            Verdict::Transient(_) => self.transient += 1,
        }
    }

    pub(crate) fn merge(&mut self, other: &EnumerationSummary) {
        self.processed += other.processed;
        self.confirmed += other.confirmed;
        self.not_found += other.not_found;
        self.auth_errors += other.auth_errors;
        self.transient += other.transient;
        self.abandoned += other.abandoned;
        self.cancelled |= other.cancelled;
    }
}
