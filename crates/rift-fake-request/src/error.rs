//! Error types for the fake request backend.
//!
//! Expected test-authoring situations (missing index, no match, empty
//! registry) are never errors. These variants only cover building selectors,
//! payloads and fixtures from untrusted text.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FakeRequestError {
    #[error("Invalid regex selector '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Response payload must be a JSON object, got {0}")]
    PayloadNotObject(String),
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Fixture rule {index} must name exactly one of url, regex or index (found {found})")]
    AmbiguousSelector { index: usize, found: usize },
    #[error("Fixture {location} has invalid status {status} (expected an integer in 100..=999)")]
    InvalidStatus { location: String, status: String },
}

pub type Result<T> = std::result::Result<T, FakeRequestError>;
