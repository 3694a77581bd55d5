//! Base-URL normalization and scheme translation.

use url::Url;

use crate::error::{RunAgentError, RunAgentResult};

/// Normalize a user-supplied base URL.
///
/// Trims whitespace, prepends `https://` when no scheme is given, and strips
/// trailing slashes.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    with_scheme.trim_end_matches('/').to_string()
}

/// Translate an HTTP-family URL into the matching streaming scheme
/// (`https` to `wss`, `http` to `ws`). Streaming URLs pass through unchanged.
pub fn to_stream_scheme(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        url.to_string()
    }
}

/// Append a `token` query credential to `url`.
pub fn with_token(url: &str, token: &str) -> RunAgentResult<String> {
    let mut parsed = Url::parse(url).map_err(|e| {
        RunAgentError::validation(format!("invalid stream URL '{url}': {e}")).with_cause(e)
    })?;
    parsed.query_pairs_mut().append_pair("token", token);
    Ok(parsed.into())
}

/// Replace any `token` query value with `***` so the URL is safe to log.
pub fn redact_token(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    if !parsed.query_pairs().any(|(k, _)| k == "token") {
        return url.to_string();
    }
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "token" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.into()
}
