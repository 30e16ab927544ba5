//! Runtime configuration: defaults, the TOML file schema, and the builder.

mod builder;
mod loading;
mod validation;

pub use builder::ConfigBuilder;

use serde::Deserialize;
use std::time::Duration;

/// Search endpoint the identity is embedded into:
/// `<base>/<identity>/externalsearchv3`.
pub const DEFAULT_SEARCH_URL: &str = "https://teams.microsoft.com/api/mt/emea/beta/users";
/// Presence endpoint receiving the `[{"mri": …}]` body.
pub const DEFAULT_PRESENCE_URL: &str = "https://presence.teams.microsoft.com/v1/presence/getpresence/";
/// Fixed value of the `x-ms-client-version` header the service expects.
pub const DEFAULT_CLIENT_VERSION: &str = "27/1.0.0.2021011237";

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Teams/1.5";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_WORKERS: usize = 5;
const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Effective configuration for one run.
///
/// Built through [`ConfigBuilder`]: defaults, then an optional TOML file,
/// then programmatic overrides, then validation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the directory search endpoint.
    pub search_endpoint: String,
    /// URL of the presence endpoint.
    pub presence_endpoint: String,
    /// Value sent as `x-ms-client-version` on every call.
    pub client_version: String,
    /// User agent attached to the shared HTTP client.
    pub user_agent: String,
    /// Default transport timeout for every outbound call.
    pub request_timeout: Duration,
    /// Number of concurrent workers draining the job queue.
    pub workers: usize,
    /// Bound of the job queue; the producer blocks once it is full.
    pub queue_capacity: usize,
    /// Dump decoded responses at debug level.
    pub verbose: bool,
    /// Path of the TOML file that contributed settings, if any.
    pub loaded_config_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_endpoint: DEFAULT_SEARCH_URL.to_string(),
            presence_endpoint: DEFAULT_PRESENCE_URL.to_string(),
            client_version: DEFAULT_CLIENT_VERSION.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            verbose: false,
            loaded_config_path: None,
        }
    }
}

/// Raw, all-optional representation of a TOML configuration file.
///
/// Every field is optional so a file only needs to name what it changes.
/// Also used internally by the builder to hold programmatic overrides.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub network: NetworkSection,
    #[serde(default)]
    pub endpoints: EndpointsSection,
    #[serde(default)]
    pub enumeration: EnumerationSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct NetworkSection {
    /// Transport timeout in seconds.
    pub request_timeout: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EndpointsSection {
    pub search_url: Option<String>,
    pub presence_url: Option<String>,
    pub client_version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EnumerationSection {
    pub workers: Option<usize>,
    pub queue_capacity: Option<usize>,
}
