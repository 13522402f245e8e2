//! Input validation shared by the tools
//!
//! Failures are plain messages that the tools return as `ToolResult::failure`.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Minimum search term length
pub const MIN_QUERY_LENGTH: usize = 3;
/// Maximum search term length
pub const MAX_QUERY_LENGTH: usize = 1000;

static PUNCTUATION_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\W_]+$").expect("valid regex"));

/// Validate a URL: it must parse, use http(s) and have a host
pub fn validate_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|_| "Invalid URL format".to_string())?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err("Invalid scheme. Allowed: http, https".to_string());
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("Invalid URL format".to_string());
    }

    Ok(url)
}

/// Validate a search term's length and content
pub fn validate_search_query(term: &str) -> Result<(), String> {
    let len = term.chars().count();
    if len < MIN_QUERY_LENGTH {
        return Err(format!(
            "Query too short (minimum {} characters)",
            MIN_QUERY_LENGTH
        ));
    }
    if len > MAX_QUERY_LENGTH {
        return Err(format!(
            "Query too long (maximum {} characters)",
            MAX_QUERY_LENGTH
        ));
    }
    if term.trim().is_empty() || PUNCTUATION_ONLY.is_match(term) {
        return Err("Invalid query format".to_string());
    }
    Ok(())
}

/// Split a `a|b|c` query into trimmed parts, rejecting more than `max_parts`
pub fn split_query<'a>(query: &'a str, max_parts: usize, usage: &str) -> Result<Vec<&'a str>, String> {
    let parts: Vec<&str> = query.split('|').map(str::trim).collect();
    if parts.len() > max_parts {
        return Err(format!("Invalid query format. Use: {}", usage));
    }
    Ok(parts)
}

/// Parse a result count within an inclusive range
pub fn parse_count(raw: &str, min: u8, max: u8) -> Result<u8, String> {
    match raw.trim().parse::<u8>() {
        Ok(n) if (min..=max).contains(&n) => Ok(n),
        _ => Err(format!(
            "Number of results must be between {} and {}",
            min, max
        )),
    }
}

/// Validate a lowercase ASCII code of the given lengths (languages, countries)
pub fn parse_code(raw: &str, lengths: &[usize], what: &str) -> Result<String, String> {
    let code = raw.trim().to_lowercase();
    if lengths.contains(&code.len()) && code.chars().all(|c| c.is_ascii_lowercase()) {
        Ok(code)
    } else {
        let lens = lengths
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        Err(format!("{} code must be {} letters (e.g., 'en')", what, lens))
    }
}
