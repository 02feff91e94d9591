//! Endpoint list parsing and URL construction.

use url::Url;

use crate::error::ConnectError;

const DEFAULT_SCHEME: &str = "http";

/// Parse a comma-delimited endpoint list.
///
/// Entries are trimmed; an entry without a scheme is read as `http://entry`.
/// Order is preserved and duplicates are kept.
pub fn parse_endpoints(endpoints: &str) -> Result<Vec<Url>, ConnectError> {
    if endpoints.trim().is_empty() {
        return Err(ConnectError::NoEndpoints);
    }

    endpoints.split(',').map(parse_endpoint).collect()
}

/// Parse a single endpoint address.
pub fn parse_endpoint(endpoint: &str) -> Result<Url, ConnectError> {
    let trimmed = endpoint.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("{}://{}", DEFAULT_SCHEME, trimmed)
    };

    let url = Url::parse(&with_scheme).map_err(|source| ConnectError::InvalidEndpoint {
        endpoint: trimmed.to_string(),
        source,
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ConnectError::UnsupportedScheme {
            endpoint: trimmed.to_string(),
            scheme: scheme.to_string(),
        }),
    }
}

/// Clean a key path the way `path.Clean` does: one leading slash, no empty,
/// `.` or `..` segments. The empty key is the root.
pub fn normalize_key(key: &str) -> String {
    let segments = key_segments(key);
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

fn key_segments(key: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in key.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments
}

/// Resolve `prefix` and then `key` below the endpoint's own path.
pub fn join_path(endpoint: &Url, prefix: &[&str], key: &str) -> Url {
    let mut url = endpoint.clone();
    url.set_query(None);
    url.set_fragment(None);
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty();
        path.extend(prefix.iter().copied());
        path.extend(key_segments(key));
    }
    url
}
