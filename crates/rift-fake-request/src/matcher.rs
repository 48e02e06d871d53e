//! Request selectors and the URL-structural match predicate.
//!
//! A `Selector` picks requests by creation index, by URL structure, or by a
//! regex over the raw URL. Requests that were never opened have no URL and
//! only ever match index selectors.

use crate::error::{FakeRequestError, Result};
use crate::request::FakeRequest;
use crate::url::RequestUrl;
use regex::Regex;
use std::fmt;

#[derive(Clone)]
pub enum Selector {
    /// Exact creation index
    Index(usize),
    /// Host, path and required query keys of a URL
    Url(RequestUrl),
    /// Unanchored search over the raw URL
    Regex(Regex),
}

impl Selector {
    pub fn url(url: &str) -> Self {
        Selector::Url(RequestUrl::parse(url))
    }

    pub fn regex(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Selector::Regex)
            .map_err(|source| FakeRequestError::InvalidRegex {
                pattern: pattern.to_string(),
                source,
            })
    }

    pub fn matches(&self, request: &FakeRequest) -> bool {
        match self {
            Selector::Index(index) => request.index() == *index,
            Selector::Url(rule) => request
                .uri()
                .is_some_and(|candidate| url_matches(&candidate, rule)),
            Selector::Regex(regex) => request.url().is_some_and(|url| regex.is_match(&url)),
        }
    }
}

/// Does `request` satisfy the URL `rule`?
///
/// Hosts must be equal. A rule path of `""` or `"/"` accepts any path,
/// otherwise paths must be equal. Every query key in the rule must be present
/// in the request; values are not compared and extra request keys are fine.
pub fn url_matches(request: &RequestUrl, rule: &RequestUrl) -> bool {
    if request.host() != rule.host() {
        return false;
    }

    let rule_path = rule.path();
    if !rule_path.is_empty() && rule_path != "/" && rule_path != request.path() {
        return false;
    }

    let request_query = request.query();
    rule.query()
        .keys()
        .all(|key| request_query.contains_key(key))
}

impl From<usize> for Selector {
    fn from(index: usize) -> Self {
        Selector::Index(index)
    }
}

impl From<&str> for Selector {
    fn from(url: &str) -> Self {
        Selector::url(url)
    }
}

impl From<String> for Selector {
    fn from(url: String) -> Self {
        Selector::url(&url)
    }
}

impl From<Regex> for Selector {
    fn from(regex: Regex) -> Self {
        Selector::Regex(regex)
    }
}

impl From<&Regex> for Selector {
    fn from(regex: &Regex) -> Self {
        Selector::Regex(regex.clone())
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Index(index) => write!(f, "Index({index})"),
            Selector::Url(url) => write!(f, "Url({})", url.as_str()),
            Selector::Regex(regex) => write!(f, "Regex({})", regex.as_str()),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Index(index) => write!(f, "#{index}"),
            Selector::Url(url) => f.write_str(url.as_str()),
            Selector::Regex(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}
