//! Feed URL discovery: from a site's human-facing URL to its feed URL.
//!
//! The site's HTML is scanned for `<link>` tags whose `title` attribute
//! names RSS or Atom; each distinct href is then fetched and the first one
//! serving `application/rss+xml` wins. Candidates live in a true `HashSet`,
//! so verification order is deliberately unspecified — callers must not rely
//! on it.

use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during feed URL discovery.
///
/// `NoFeedLinks` and `NoVerifiedCandidate` are both "not found" to a caller
/// that only cares about the outcome, but they are kept distinct: the former
/// means the page advertises no feeds at all, the latter that advertised
/// candidates exist but none passed the content-type check.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// HTTP request for the site page failed
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Site page request exceeded the discovery timeout
    #[error("request timed out")]
    Timeout,
    /// Site page responded with a non-2xx status
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// The page's HTML carries no RSS/Atom `<link>` tags
    #[error("no feed links advertised on page")]
    NoFeedLinks,
    /// Link tags were found but no candidate served application/rss+xml
    #[error("no advertised feed candidate could be verified")]
    NoVerifiedCandidate,
}

/// Discover the feed URL for a site.
///
/// Candidate verification failures (network errors, wrong content type) are
/// local — the next candidate is tried. Only the initial page fetch can fail
/// the discovery outright.
pub async fn discover_feed_url(
    client: &reqwest::Client,
    site_url: &str,
    timeout: Duration,
) -> Result<String, DiscoveryError> {
    let response = tokio::time::timeout(timeout, client.get(site_url).send())
        .await
        .map_err(|_| DiscoveryError::Timeout)?
        .map_err(DiscoveryError::Network)?;

    if !response.status().is_success() {
        return Err(DiscoveryError::HttpStatus(response.status().as_u16()));
    }

    let html = response.text().await.map_err(DiscoveryError::Network)?;
    let candidates = scan_feed_links(&html, site_url);
    if candidates.is_empty() {
        return Err(DiscoveryError::NoFeedLinks);
    }

    tracing::debug!(site = %site_url, candidates = candidates.len(), "Verifying feed candidates");

    for href in &candidates {
        match verify_candidate(client, href, timeout).await {
            Ok(true) => return Ok(href.clone()),
            Ok(false) => {
                tracing::debug!(candidate = %href, "Candidate is not application/rss+xml");
            }
            Err(e) => {
                // A failing candidate is local; keep trying the rest
                tracing::debug!(candidate = %href, error = %e, "Candidate fetch failed");
            }
        }
    }

    Err(DiscoveryError::NoVerifiedCandidate)
}

/// Fetch one candidate href and check its `Content-Type` header.
async fn verify_candidate(
    client: &reqwest::Client,
    href: &str,
    timeout: Duration,
) -> Result<bool, DiscoveryError> {
    let response = tokio::time::timeout(timeout, client.get(href).send())
        .await
        .map_err(|_| DiscoveryError::Timeout)?
        .map_err(DiscoveryError::Network)?;

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    Ok(content_type.contains("application/rss+xml"))
}

/// Scan HTML for `<link>` tags whose `title` attribute matches RSS or Atom
/// (case-insensitive) and collect their distinct hrefs.
///
/// Simple string scanning, no HTML parser dependency. Relative hrefs resolve
/// against the page URL. Duplicate hrefs collapse — the return type is a set.
fn scan_feed_links(html: &str, base_url: &str) -> HashSet<String> {
    // ASCII-only lowering keeps byte offsets valid for slicing the original
    // (full Unicode lowercasing can change a string's length)
    let html_lower = html.to_ascii_lowercase();
    let mut hrefs = HashSet::new();
    let mut search_from = 0;

    while let Some(link_start) = html_lower[search_from..].find("<link") {
        let abs_start = search_from + link_start;
        let remaining = &html_lower[abs_start..];

        let tag_end = match remaining.find('>') {
            Some(pos) => pos,
            None => break,
        };

        let tag_lower = &remaining[..=tag_end];
        if title_names_feed(tag_lower) {
            // Extract href from the original HTML to preserve URL case
            let original_tag = &html[abs_start..abs_start + tag_end + 1];
            if let Some(href) = extract_attr_value(original_tag, "href") {
                hrefs.insert(resolve_url(href, base_url));
            }
        }

        search_from = abs_start + tag_end + 1;
    }

    hrefs
}

/// Whether a lowercased `<link>` tag carries a `title` attribute naming an
/// RSS or Atom feed.
fn title_names_feed(tag_lower: &str) -> bool {
    match extract_attr_value(tag_lower, "title") {
        Some(title) => title.contains("rss") || title.contains("atom"),
        None => false,
    }
}

/// Extracts the value of an attribute from a tag string (case-preserving).
fn extract_attr_value<'a>(tag: &'a str, attr_name: &str) -> Option<&'a str> {
    // Same offset-preservation constraint as in scan_feed_links
    let tag_lower = tag.to_ascii_lowercase();
    let attr_prefix = format!("{attr_name}=");

    let attr_start = tag_lower.find(&attr_prefix)?;
    let value_start = attr_start + attr_prefix.len();

    if value_start >= tag.len() {
        return None;
    }

    let rest = &tag[value_start..];
    let quote = rest.as_bytes().first()?;

    if *quote != b'"' && *quote != b'\'' {
        return None;
    }

    let quote_char = *quote as char;
    let inner = &rest[1..];
    let end = inner.find(quote_char)?;

    Some(&inner[..end])
}

/// Resolves a potentially relative URL against a base URL.
fn resolve_url(href: &str, base_url: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_owned();
    }

    // Protocol-relative: normalize through the URL parser
    if href.starts_with("//") {
        let with_scheme = format!("https:{}", href);
        if let Ok(parsed) = url::Url::parse(&with_scheme) {
            return parsed.to_string();
        }
    }

    if let Ok(base) = url::Url::parse(base_url) {
        if let Ok(resolved) = base.join(href) {
            return resolved.to_string();
        }
    }

    href.to_owned()
}
