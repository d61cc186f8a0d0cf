//! Error types for Dealflow
//!
//! Centralized error handling using snafu for ergonomic error definitions.
//! Numeric inputs to the window and score calculators never produce errors;
//! they are clamped instead. Errors here come from configuration, files and
//! the remote data source.

use snafu::Snafu;

/// Failure reported by a remote page source
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum FetchError {
    /// Transport failure (connection refused, reset, DNS)
    #[snafu(display("Network error: {message}"))]
    Network { message: String },

    /// The session is not allowed to read the collection
    #[snafu(display("Unauthorized: {message}"))]
    Unauthorized { message: String },

    /// The backend answered with an error status
    #[snafu(display("Server error {status}: {message}"))]
    Server { status: u16, message: String },

    /// The request did not complete in time
    #[snafu(display("Timeout after {elapsed_ms}ms"))]
    Timeout { elapsed_ms: u64 },

    /// The response could not be decoded into a page
    #[snafu(display("Decode error: {message}"))]
    Decode { message: String },
}

impl FetchError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Network { .. } | FetchError::Server { .. } | FetchError::Timeout { .. }
        )
    }

    /// Short category name, used in log fields and notices
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network { .. } => "network",
            FetchError::Unauthorized { .. } => "unauthorized",
            FetchError::Server { .. } => "server",
            FetchError::Timeout { .. } => "timeout",
            FetchError::Decode { .. } => "decode",
        }
    }
}

/// Main error type for the crate
#[derive(Debug, Snafu)]
pub enum Error {
    /// Invalid input or configuration
    #[snafu(display("Invalid: {message}"))]
    Invalid { message: String },

    /// IO error (config files, log directory)
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    /// JSON serialization/deserialization error
    #[snafu(display("JSON error: {source}"))]
    Json { source: serde_json::Error },

    /// TOML deserialization error
    #[snafu(display("TOML parse error: {source}"))]
    TomlDe { source: toml::de::Error },

    /// TOML serialization error
    #[snafu(display("TOML serialize error: {source}"))]
    TomlSe { source: toml::ser::Error },

    /// Remote page fetch failed
    #[snafu(display("Fetch of page {page} failed: {source}"))]
    Fetch { page: u32, source: FetchError },

    /// Channel send error
    #[snafu(display("Channel send error: {message}"))]
    ChannelSend { message: String },
}

impl Error {
    /// The underlying fetch failure, if this error came from the data source
    pub fn as_fetch(&self) -> Option<&FetchError> {
        match self {
            Error::Fetch { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io { source }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Error::Json { source }
    }
}

impl From<toml::de::Error> for Error {
    fn from(source: toml::de::Error) -> Self {
        Error::TomlDe { source }
    }
}

impl From<toml::ser::Error> for Error {
    fn from(source: toml::ser::Error) -> Self {
        Error::TomlSe { source }
    }
}

/// Result type alias for convenience
pub type Result<T, E = Error> = std::result::Result<T, E>;
