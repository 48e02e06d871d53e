//! Fixture files: declarative rules and a default response for a `Registry`.
//!
//! ```yaml
//! default_response: { status: 204 }
//! rules:
//!   - url: "http://api.test/users?id="
//!     response: { status: 200, responseText: "[]" }
//!   - regex: "/orders/\\d+"
//!     response: { status: 404 }
//!   - index: 0
//!     response: { status: 500 }
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

use crate::error::{FakeRequestError, Result};
use crate::matcher::Selector;
use crate::request::{ResponseData, STATUS_KEY};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FixtureConfig {
    /// Broadcast applied after all rules are queued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_response: Option<ResponseData>,

    /// Applied in declaration order, so earlier rules win
    #[serde(default)]
    pub rules: Vec<FixtureRule>,
}

/// One queued response. Exactly one of `url`, `regex` or `index` must be set.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FixtureRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default)]
    pub response: ResponseData,
}

impl FixtureConfig {
    /// Load from a file. `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture file {}", path.display()))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_yaml_str(&contents)
        }
        .with_context(|| format!("Invalid fixture file {}", path.display()))?;

        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: FixtureConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: FixtureConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (index, rule) in self.rules.iter().enumerate() {
            let found = [rule.url.is_some(), rule.regex.is_some(), rule.index.is_some()]
                .into_iter()
                .filter(|set| *set)
                .count();
            if found != 1 {
                error!(index, found, "fixture rule must name exactly one selector");
                return Err(FakeRequestError::AmbiguousSelector { index, found });
            }

            rule.selector()?;
            validate_status(&rule.response, || format!("rule {index}"))?;
        }

        if let Some(ref default_response) = self.default_response {
            validate_status(default_response, || "default_response".to_string())?;
        }

        Ok(())
    }
}

impl FixtureRule {
    pub fn selector(&self) -> Result<Selector> {
        match (&self.url, &self.regex, self.index) {
            (Some(url), None, None) => Ok(Selector::url(url)),
            (None, Some(pattern), None) => Selector::regex(pattern),
            (None, None, Some(index)) => Ok(Selector::Index(index)),
            (url, regex, index) => Err(FakeRequestError::AmbiguousSelector {
                index: 0,
                found: [url.is_some(), regex.is_some(), index.is_some()]
                    .into_iter()
                    .filter(|set| *set)
                    .count(),
            }),
        }
    }
}

fn validate_status(response: &ResponseData, location: impl Fn() -> String) -> Result<()> {
    let Some(status) = response.get(STATUS_KEY) else {
        return Ok(());
    };

    let valid = match status {
        Value::Number(number) => number
            .as_u64()
            .is_some_and(|code| (100..=999).contains(&code)),
        _ => false,
    };
    if valid {
        return Ok(());
    }

    let location = location();
    warn!(%location, %status, "fixture status is not a valid HTTP status code");
    Err(FakeRequestError::InvalidStatus {
        location,
        status: status.to_string(),
    })
}
