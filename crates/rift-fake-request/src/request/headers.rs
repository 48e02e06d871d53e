//! Raw header block parsing for `get_response_header`.

use std::collections::HashMap;

/// Parse a raw `Name: value` header block into a lowercase-keyed map.
///
/// Lines split on CRLF or LF. A final line shorter than 3 characters is the
/// blank terminator and is dropped. Each line splits at its first colon.
///
/// A line without a colon names no header and is skipped rather than kept
/// under a made-up key, so `get_all_response_headers` is the only way to see it.
pub fn parse_response_headers(raw: &str) -> HashMap<String, String> {
    let mut lines: Vec<&str> = raw
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    if lines.last().is_some_and(|last| last.chars().count() < 3) {
        lines.pop();
    }

    lines
        .into_iter()
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.to_lowercase(), value.trim().to_string()))
        .collect()
}

/// Render request headers as `name: value` lines joined by `\n`
pub fn serialize_headers(headers: &HashMap<String, String>) -> String {
    let mut names: Vec<&String> = headers.keys().collect();
    names.sort();
    names
        .into_iter()
        .map(|name| format!("{}: {}", name, headers[name]))
        .collect::<Vec<_>>()
        .join("\n")
}
