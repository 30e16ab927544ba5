//! Error types shared across the library.

use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, AppError>;

/// All failure modes the library surfaces to callers.
///
/// Per-job conditions (transport failures, unexpected statuses, malformed
/// payloads) are contained inside the enumeration pipeline and converted into
/// verdicts or log lines; the variants here are the ones that escape, which
/// means they are fatal to setup or to a single-identity run.
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid or inconsistent configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A shared component (HTTP client, endpoint URL) could not be built.
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// The input source could not be opened or read.
    #[error("Cannot read input '{path}': {source}")]
    SourceIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The output destination could not be created or written.
    #[error("Cannot write output '{path}': {source}")]
    SinkIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The supplied credential could not be normalized into a bearer token.
    #[error("Invalid credential: {0}")]
    Token(String),

    /// A network-level failure talking to the remote service.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
