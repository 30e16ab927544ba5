//! Remote lookup abstraction and the production Teams client.
//!
//! The enumeration pipeline talks to the directory through the
//! [`LookupService`] trait so tests can substitute an in-memory
//! implementation for the live service.

mod teams;

pub use teams::TeamsClient;

use crate::core::error::Result;
use crate::core::models::{PresenceRecord, SearchResponse};
use async_trait::async_trait;

/// The two dependent calls the pipeline issues per identity.
///
/// Implementations are stateless beyond the bearer credential, define no
/// retry policy, and are bounded only by the transport's default timeout. A
/// caller that wants retries must wrap them externally.
#[async_trait]
pub trait LookupService: Send + Sync {
    /// Search the directory for one identity. Returns the HTTP status and
    /// the first record of the response array, if any. Malformed payloads
    /// decode to an empty record; only transport-level failures are errors.
    async fn search_identity(&self, identity: &str) -> Result<SearchResponse>;

    /// Fetch availability and device state for a routing identifier obtained
    /// from a search record. An empty response array means the subject is
    /// offline or unreachable and degrades to [`PresenceRecord::unreachable`].
    async fn fetch_presence(&self, mri: &str) -> Result<PresenceRecord>;
}
