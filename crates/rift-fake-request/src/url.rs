//! Decomposed request URL.
//!
//! `RequestUrl` is an owned value computed once per URL assignment. It exposes
//! the host/path/query accessors the URL matcher and request accessors need.

use hyper::Uri;
use std::collections::HashMap;
use std::net::IpAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUrl {
    raw: String,
    hostname: String,
    port: Option<u16>,
    path: String,
    query: Option<String>,
}

impl RequestUrl {
    /// Decompose `raw`. Never fails: text `Uri` rejects is split by hand.
    ///
    /// Only absolute URLs and absolute paths go through `Uri`, which would
    /// otherwise read a bare relative reference like `data.json` as an
    /// authority.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<Uri>() {
            Ok(uri) if uri.scheme().is_some() || raw.starts_with('/') => {
                Self::from_uri(raw, &uri)
            }
            _ => Self::split_lossy(raw),
        }
    }

    fn from_uri(raw: &str, uri: &Uri) -> Self {
        Self {
            raw: raw.to_string(),
            hostname: uri.host().unwrap_or_default().to_string(),
            port: uri.port_u16(),
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
        }
    }

    fn split_lossy(raw: &str) -> Self {
        let without_fragment = raw.split('#').next().unwrap_or_default();
        let (before_query, query) = match without_fragment.split_once('?') {
            Some((before, query)) => (before, Some(query.to_string())),
            None => (without_fragment, None),
        };

        let (authority, path) = match before_query.split_once("://") {
            Some((_scheme, rest)) => match rest.find('/') {
                Some(slash) => (&rest[..slash], &rest[slash..]),
                None => (rest, "/"),
            },
            None => ("", before_query),
        };

        // Drop userinfo
        let authority = authority.rsplit('@').next().unwrap_or_default();
        let (hostname, port) = match authority.rsplit_once(':') {
            Some((host, port)) => match port.parse::<u16>() {
                Ok(port) => (host, Some(port)),
                Err(_) => (authority, None),
            },
            None => (authority, None),
        };

        Self {
            raw: raw.to_string(),
            hostname: hostname.to_string(),
            port,
            path: path.to_string(),
            query,
        }
    }

    /// The URL exactly as assigned
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Host plus explicit port (`api.test:8080`); empty for relative URLs
    pub fn host(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.hostname, port),
            None => self.hostname.clone(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Registrable part of the hostname: the last two labels.
    /// IP literals and single-label hosts come back whole.
    pub fn domain(&self) -> String {
        let bare = self.hostname.trim_start_matches('[').trim_end_matches(']');
        if bare.parse::<IpAddr>().is_ok() {
            return self.hostname.clone();
        }

        let labels: Vec<&str> = bare.split('.').filter(|l| !l.is_empty()).collect();
        if labels.len() <= 2 {
            return bare.to_string();
        }
        labels[labels.len() - 2..].join(".")
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query text after `?`, without the fragment
    pub fn query_string(&self) -> &str {
        self.query.as_deref().unwrap_or_default()
    }

    /// Decoded query parameters; repeated keys keep the last value
    pub fn query(&self) -> HashMap<String, String> {
        parse_query_string(self.query_string())
    }
}

/// Decode `application/x-www-form-urlencoded` text into key/value pairs.
///
/// `+` reads as a space, keys and values are percent-decoded, and a key with
/// no `=` maps to an empty value.
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode_component(key), decode_component(value)),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

fn decode_component(component: &str) -> String {
    let spaced = component.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}
