use crate::core::config::Config;
use crate::core::models::{PresenceRecord, TransientCause, Verdict};
use crate::enumeration::classify;
use crate::lookup::LookupService;

use reqwest::StatusCode;
use std::sync::Arc;

/// Runs the per-identity lookup pipeline: search, classify, and (for
/// provisioned hits) presence enrichment.
///
/// All failures are contained: transport errors degrade the job to a
/// transient verdict and a failed presence fetch degrades to the
/// `error`/`error` placeholder, so one bad identity never takes down a batch.
#[derive(Clone)]
pub struct Prober {
    lookup: Arc<dyn LookupService>,
    verbose: bool,
}

impl Prober {
    pub fn new(lookup: Arc<dyn LookupService>, config: &Config) -> Self {
        Self {
            lookup,
            verbose: config.verbose,
        }
    }

    /// Evaluates one identity to exactly one verdict.
    pub async fn probe_identity(&self, identity: &str) -> Verdict {
        let search = match self.lookup.search_identity(identity).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(target: "probe_task",
                    "[{}] Search call failed before a status was received: {}", identity, e);
                return Verdict::Transient(TransientCause::Network(e.to_string()));
            }
        };

        tracing::debug!(target: "probe_task",
            "[{}] Search returned status {}", identity, search.status);
        if self.verbose {
            if let Some(record) = &search.record {
                // Verbose dumping re-serializes the typed record rather than
                // keeping a second untyped decode of the body.
                if let Ok(pretty) = serde_json::to_string_pretty(record) {
                    tracing::debug!(target: "probe_task", "[{}] Response:\n{}", identity, pretty);
                }
            }
        }

        let mut verdict = classify(search.status, search.record.as_ref());

        // Presence is fetched at most once per identity, and only for a 200
        // whose record passed the provisioned-user heuristic. A 403-derived
        // confirmation has nothing to enrich from.
        if let Verdict::Confirmed(details) = &mut verdict {
            if search.status == StatusCode::OK {
                if let Some(record) = &search.record {
                    details.display_name = Some(record.display_name.clone());
                    details.presence = Some(self.fetch_presence(identity, &record.mri).await);
                }
            }
        }

        verdict
    }

    async fn fetch_presence(&self, identity: &str, mri: &str) -> PresenceRecord {
        match self.lookup.fetch_presence(mri).await {
            Ok(presence) => {
                tracing::debug!(target: "probe_task",
                    "[{}] Presence: {} on {}", identity, presence.availability, presence.device_type);
                presence
            }
            Err(e) => {
                tracing::warn!(target: "probe_task",
                    "[{}] Presence call failed, degrading: {}", identity, e);
                PresenceRecord::unreachable()
            }
        }
    }
}
