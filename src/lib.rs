//! # Teams Probe Core Library
//!
//! This crate provides the core logic for validating email addresses against
//! the Microsoft Teams search API and enriching confirmed accounts with live
//! presence and device state.
//!
//! It is designed to be used either directly as a library or via the
//! `teams-probe` command-line tool (which uses this library).

mod core;
mod enumeration;
mod lookup;
mod utils;

pub use crate::core::config::{Config, ConfigBuilder, ConfigFile};
pub use crate::core::error::{AppError, Result};
pub use crate::core::models::{
    Confirmation, DirectoryRecord, EnumerationSummary, PresenceRecord, SearchResponse,
    TransientCause, Verdict,
};
pub use crate::core::probe::Prober;
pub use crate::enumeration::{
    classify, is_probeable, IdentitySource, ResultSink, WorkerPool, ILLEGAL_CHARS,
};
pub use crate::lookup::{LookupService, TeamsClient};
pub use crate::utils::token::normalize_bearer_token;

use std::sync::Arc;

/// Builds the production lookup client from the configuration and a
/// normalized bearer credential.
pub fn initialize_client(config: &Config, bearer: impl Into<String>) -> Result<TeamsClient> {
    TeamsClient::new(config, bearer)
}

/// Probes a single identity and records its verdict.
///
/// The identity goes through the same denylist filter as batch input; an
/// identity that could not legally appear in the lookup path is an error
/// rather than a remote call.
///
/// # Returns
/// * The verdict, after it has been recorded to the sink.
pub async fn probe_single_identity(
    config: &Config,
    lookup: Arc<dyn LookupService>,
    sink: &ResultSink,
    identity: &str,
) -> Result<Verdict> {
    if !is_probeable(identity) {
        return Err(AppError::Config(format!(
            "Identity '{}' contains characters that are illegal in lookups",
            identity
        )));
    }

    tracing::info!(target: "probe_single", "[{}] Starting lookup.", identity);
    let prober = Prober::new(lookup, config);
    let verdict = prober.probe_identity(identity).await;
    sink.record(identity, &verdict)?;
    tracing::info!(target: "probe_single", "[{}] Finished: {:?}", identity, verdict);

    Ok(verdict)
}

/// Runs the full enumeration pipeline: source → bounded queue → worker pool
/// → lookup + classification → sink.
///
/// # Arguments
/// * `config` - The application configuration (worker count, queue bound).
/// * `lookup` - The lookup service shared by all workers.
/// * `source` - The identity stream to drain.
/// * `sink` - The shared result sink; flushed by the caller afterwards.
///
/// # Returns
/// * An [`EnumerationSummary`] with per-verdict counts and the cancellation
///   state of the run.
pub async fn enumerate_identities(
    config: Arc<Config>,
    lookup: Arc<dyn LookupService>,
    source: IdentitySource,
    sink: Arc<ResultSink>,
) -> EnumerationSummary {
    let prober = Arc::new(Prober::new(lookup, &config));
    let pool = WorkerPool::new(prober, sink, &config);
    pool.run(source).await
}
