use thiserror::Error;

/// Validation errors for values crossing a store or wire boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("timestamp must be RFC3339: '{value}'")]
    InvalidTimestamp { value: String },

    #[error("rank {rank} is outside 1..={max}")]
    RankOutOfRange { rank: i64, max: u32 },

    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
}

/// Startup configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("store endpoint URL is not set")]
    MissingEndpoint,

    #[error("store access key is not set")]
    MissingAccessKey,

    #[error("store endpoint must be an http(s) URL: '{value}'")]
    InvalidEndpoint { value: String },
}
