//! URL normalization, eligibility filtering, and domain derivation.
//!
//! Navigation sources fire events for everything a browser can show,
//! including internal pages (chrome://, about:, edge://) and local files.
//! Only http(s) URLs with a host are eligible for the visit history.

use crate::Error;

/// Normalize a URL string for use as a primary key.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Require an explicit http or https scheme
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn normalize(input: &str) -> Result<url::Url, Error> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("empty URL".into()));
    }

    let mut parsed = url::Url::parse(trimmed).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(Error::InvalidUrl(format!("unsupported scheme: {scheme}"))),
    }

    let host = match parsed.host_str() {
        Some(h) => h.to_lowercase(),
        None => return Err(Error::InvalidUrl(format!("missing host: {trimmed}"))),
    };
    parsed
        .set_host(Some(host.as_str()))
        .map_err(|e| Error::InvalidUrl(e.to_string()))?;

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Whether a URL may enter (or leave) the visit history.
///
/// Also applied on the read path: rows written before a filter rule
/// existed must not surface in query results.
pub fn is_eligible(input: &str) -> bool {
    normalize(input).is_ok()
}

/// Derive the display domain from a normalized URL.
///
/// Lowercase host with a leading `www.` stripped. A pure function of the
/// URL; stored denormalized for search and display but never mutated
/// independently.
pub fn domain_of(url: &url::Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    host.strip_prefix("www.").unwrap_or(&host).to_string()
}
