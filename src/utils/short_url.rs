//! Helpers for building, parsing and validating URLs.

use url::Url;

/// Joins the base domain and a short code.
///
/// A trailing slash on the base is tolerated.
pub fn build_short_url(base_url: &str, short_code: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), short_code)
}

/// Extracts the short code from a full short URL (first path segment).
///
/// Returns `None` if the input is not an absolute URL or has an empty path.
pub fn short_code_from_url(short_url: &str) -> Option<String> {
    let parsed = Url::parse(short_url).ok()?;
    let code = parsed.path_segments()?.find(|s| !s.is_empty())?;

    Some(code.to_string())
}

/// Checks that a long URL is absolute, uses http(s) and has a host, and
/// returns its canonical form.
///
/// Surrounding whitespace is dropped, the scheme and host are lowercased,
/// default ports are removed and an empty path becomes `/`. Stores only ever
/// see this form, so spellings of one URL share a single live code.
///
/// # Errors
///
/// Returns a human-readable reason when the URL is rejected.
pub fn normalize_long_url(input: &str) -> Result<String, String> {
    if input.trim().is_empty() {
        return Err("URL cannot be empty".to_string());
    }

    let parsed = Url::parse(input.trim()).map_err(|e| e.to_string())?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme: {other}")),
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err("URL must have a host".to_string());
    }

    Ok(parsed.into())
}
