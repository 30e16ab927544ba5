//! `reqwest`-backed [`LookupService`] implementation for the Teams API.

use super::LookupService;
use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use crate::core::models::{DirectoryRecord, PresenceRecord, SearchResponse};

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;

const CLIENT_VERSION_HEADER: &str = "x-ms-client-version";

/// Thin client over the search and presence endpoints.
///
/// Holds the shared HTTP client and the bearer credential for the lifetime of
/// a run. The credential is never mutated after construction.
pub struct TeamsClient {
    http_client: Client,
    search_endpoint: String,
    presence_endpoint: String,
    client_version: String,
    bearer: String,
}

impl TeamsClient {
    /// Creates a client from the run configuration and a normalized bearer
    /// value (the full `Bearer ey…` string).
    pub fn new(config: &Config, bearer: impl Into<String>) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Initialization(format!("Failed to build HTTP client: {}", e)))?;
        tracing::debug!("HTTP client initialized.");

        Ok(Self {
            http_client,
            search_endpoint: config.search_endpoint.trim_end_matches('/').to_string(),
            presence_endpoint: config.presence_endpoint.clone(),
            client_version: config.client_version.clone(),
            bearer: bearer.into(),
        })
    }
}

#[async_trait]
impl LookupService for TeamsClient {
    async fn search_identity(&self, identity: &str) -> Result<SearchResponse> {
        let url = format!("{}/{}/externalsearchv3", self.search_endpoint, identity);
        tracing::trace!(target: "lookup", "GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .header(AUTHORIZATION, &self.bearer)
            .header(CLIENT_VERSION_HEADER, &self.client_version)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Error statuses carry non-array bodies; a failed decode is an empty
        // result, not a failure.
        let mut records: Vec<DirectoryRecord> = match serde_json::from_str(&body) {
            Ok(records) => records,
            Err(e) => {
                tracing::debug!(target: "lookup",
                    "Search response for '{}' (status {}) did not decode as a record array: {}",
                    identity, status, e
                );
                Vec::new()
            }
        };

        Ok(SearchResponse {
            status,
            record: if records.is_empty() {
                None
            } else {
                Some(records.swap_remove(0))
            },
        })
    }

    async fn fetch_presence(&self, mri: &str) -> Result<PresenceRecord> {
        tracing::trace!(target: "lookup", "POST {}", self.presence_endpoint);

        let response = self
            .http_client
            .post(&self.presence_endpoint)
            .header(AUTHORIZATION, &self.bearer)
            .header(CLIENT_VERSION_HEADER, &self.client_version)
            .json(&serde_json::json!([{ "mri": mri }]))
            .send()
            .await?;

        let status = response.status();
        let entries: Vec<PresenceEnvelope> = match response.json().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(target: "lookup",
                    "Presence response (status {}) did not decode: {}", status, e
                );
                Vec::new()
            }
        };

        // An empty array means the subject is offline or unreachable.
        Ok(entries
            .into_iter()
            .next()
            .map(|entry| entry.presence)
            .unwrap_or_else(PresenceRecord::unreachable))
    }
}

/// Wire shape of one presence response entry; only the nested state is kept.
#[derive(Debug, serde::Deserialize)]
struct PresenceEnvelope {
    presence: PresenceRecord,
}
