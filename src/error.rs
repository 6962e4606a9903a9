use thiserror::Error;

/// Failures while obtaining snapshots. None of them is fatal: each one ends up
/// as an `error` string on the acquirer that hit it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AcquireError {
    /// HTTP or network failure while polling (includes undecodable bodies).
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The push transport failed, closed, or the broker reported an error.
    #[error("connection error: {0}")]
    Connection(String),

    /// A push payload that could not be decoded.
    #[error("malformed payload: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}
