use crate::{UrlError, UrlResult};
use url::{form_urlencoded, Url};

/// Query parameters that carry per-visit state rather than page identity
const SESSION_PARAMS: &[&str] = &[
    "s",
    "sid",
    "phpsessid",
    "sessionid",
    "fbclid",
    "gclid",
    "mc_eid",
];

/// Canonicalizes an absolute URL for use as a natural key
///
/// # Canonicalization Steps
///
/// 1. Reject anything that is not `http` or `https`
/// 2. Remove the fragment
/// 3. Remove an empty query string
///
/// The query is otherwise left byte-for-byte as linked: forums encode page
/// identity there (`showthread.php?12345-Title`) and re-encoding it would
/// produce a different URL from the one the page links to.
pub fn canonicalize_url(mut url: Url) -> UrlResult<Url> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    url.set_fragment(None);

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

/// Removes session and tracking parameters (`s`, `sid`, `utm_*`, ...)
///
/// Works on the raw `&`-separated segments, so the parameters that remain
/// keep their order and their original encoding. A query with nothing to
/// remove is not touched.
pub fn strip_session_params(mut url: Url) -> Url {
    let rebuilt = url.query().and_then(|query| {
        let segments: Vec<&str> = query.split('&').collect();
        let kept: Vec<&str> = segments
            .iter()
            .copied()
            .filter(|segment| !is_session_segment(segment))
            .collect();

        (kept.len() != segments.len()).then(|| kept.join("&"))
    });

    match rebuilt.as_deref() {
        Some("") => url.set_query(None),
        Some(query) => url.set_query(Some(query)),
        None => {}
    }

    url
}

fn is_session_segment(segment: &str) -> bool {
    let raw_key = segment.split('=').next().unwrap_or_default();
    let key = form_urlencoded::parse(raw_key.as_bytes())
        .next()
        .map(|(key, _)| key.to_ascii_lowercase())
        .unwrap_or_default();

    SESSION_PARAMS.contains(&key.as_str()) || key.starts_with("utm_")
}
