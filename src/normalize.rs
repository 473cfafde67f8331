use crate::model::UrlComponents;
use url::Url;

/// Canonicalize a URL into a comparison key:
/// `scheme://lowercased-host<path-without-trailing-slash>[?query][#fragment]`.
///
/// The root path collapses to nothing (`http://x.com/` -> `http://x.com`).
/// Unparseable input is returned verbatim: normalization is a best-effort
/// comparison key, not a validity gate.
pub fn normalize_url(raw: &str) -> String {
    let parsed = match Url::parse(raw) {
        Ok(parsed) => parsed,
        Err(_) => return raw.to_string(),
    };

    let host = parsed.host_str().unwrap_or("").to_lowercase();
    let mut normalized = format!("{}://{}", parsed.scheme(), host);
    if let Some(port) = parsed.port() {
        normalized.push_str(&format!(":{port}"));
    }
    normalized.push_str(parsed.path().trim_end_matches('/'));
    if let Some(query) = parsed.query() {
        normalized.push('?');
        normalized.push_str(query);
    }
    if let Some(fragment) = parsed.fragment() {
        normalized.push('#');
        normalized.push_str(fragment);
    }
    normalized
}

/// Break a URL into the pieces the rule engine works on. Malformed URLs
/// degrade to empty components so the pipeline keeps running.
pub fn extract_components(raw: &str) -> UrlComponents {
    match Url::parse(raw) {
        Ok(parsed) => UrlComponents {
            host: parsed.host_str().unwrap_or("").to_lowercase(),
            path: parsed.path().to_string(),
            query: parsed.query().unwrap_or("").to_string(),
        },
        Err(_) => UrlComponents::default(),
    }
}
