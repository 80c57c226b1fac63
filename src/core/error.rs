//! Error types shared by the rate-resolution core

use thiserror::Error;

/// Invalid invocation. Raised before any query is sent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing BCM API base URL")]
    MissingApiBase,

    #[error("Invalid BCM API base URL '{url}': {reason}")]
    InvalidApiBase { url: String, reason: String },

    #[error("Invalid value for header {header}: '{value}'")]
    InvalidHeader { header: &'static str, value: String },

    #[error("--lookback-days must be > 0 (got {0})")]
    NonPositiveLookback(i64),

    #[error("--max-lookback-days must be >= --lookback-days ({max} < {initial})")]
    MaxBelowInitial { initial: i64, max: i64 },

    #[error("Invalid --to-date '{0}', expected YYYY-MM-DD")]
    InvalidTargetDate(String),
}

/// Hard failure while resolving a rate. Aborts the whole run.
#[derive(Debug, Error)]
pub enum RateError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Malformed JSON response for {currency}: {source}")]
    MalformedJson {
        currency: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot parse date from value: '{raw}' ({currency})")]
    InvalidDate { currency: String, raw: String },

    #[error("Cannot parse Decimal from value: '{raw}' ({currency})")]
    InvalidValue { currency: String, raw: String },
}
