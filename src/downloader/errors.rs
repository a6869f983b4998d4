// Error types for the metadata and download subsystems

use thiserror::Error;

/// Failures reported by an extraction collaborator.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// Network timeout while talking to the upstream site
    #[error("network timeout: upstream is not responding")]
    NetworkTimeout,

    /// Upstream throttled or blocked the request (429, bot detection)
    #[error("upstream blocked the request: {0}")]
    Blocked(String),

    /// Extraction tool not found on this system
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Unsupported or malformed source URL
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Failed to parse the extractor's output
    #[error("parse error: {0}")]
    Parse(String),

    /// Anything else, with details
    #[error("extraction failed: {0}")]
    Other(String),
}

impl From<String> for ExtractError {
    fn from(s: String) -> Self {
        // Classify from free-text tool output
        if s.contains("timeout") || s.contains("timed out") {
            return Self::NetworkTimeout;
        }
        if s.contains("429") || s.contains("bot") || s.contains("blocked") {
            return Self::Blocked(s);
        }
        if s.contains("not found") || s.contains("No such file") {
            return Self::ToolNotFound(s);
        }
        if s.contains("Invalid URL") || s.contains("Unsupported URL") {
            return Self::InvalidUrl(s);
        }
        Self::Other(s)
    }
}

/// Opaque failure from the cache collaborator.
#[derive(Debug, Clone, Error)]
#[error("cache error: {0}")]
pub struct CacheError(pub String);

/// Failures surfaced by metadata resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Caller passed an empty or blank identifier
    #[error("media id must not be empty")]
    InvalidId,

    /// The subject exposes no retrievable encodings at all
    #[error("no formats available for {0}")]
    NotAvailable(String),

    /// Extraction succeeded but the result could not be persisted
    #[error("failed to persist metadata for {0}: {1}")]
    StorageFailure(String, #[source] CacheError),

    /// Upstream extraction failed
    #[error(transparent)]
    Extraction(#[from] ExtractError),
}

/// Rejections from download submission. Both variants are no-ops for the
/// queue: nothing is enqueued and in-flight work is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("download manager is not running")]
    NotRunning,

    #[error("duplicate download ignored: {0}")]
    Duplicate(String),
}
