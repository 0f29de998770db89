//! URL handling for Forum-Scraper
//!
//! Every href extracted from a page is resolved against the forum's base URL and
//! canonicalized before it is used as a natural key (subforum, thread and post
//! URLs are the store's deduplication keys).

mod normalize;

pub use normalize::{canonicalize_url, strip_session_params};

use crate::{UrlError, UrlResult};
use url::Url;

/// Resolves an extracted href against the forum base URL
///
/// Relative and absolute hrefs are both accepted. The result is canonicalized
/// with [`canonicalize_url`]. Links on the forum's own host also go through
/// [`strip_session_params`], so the same page always maps to the same key no
/// matter which session hash the markup carried; off-forum links keep their
/// query as written.
///
/// # Examples
///
/// ```
/// use forum_scraper::url::resolve_href;
/// use url::Url;
///
/// let base = Url::parse("https://forum.example.com/index.php").unwrap();
/// let url = resolve_href(&base, "/f1#top").unwrap();
/// assert_eq!(url.as_str(), "https://forum.example.com/f1");
/// ```
pub fn resolve_href(base: &Url, href: &str) -> UrlResult<Url> {
    let href = href.trim();
    if href.is_empty() {
        return Err(UrlError::Empty);
    }

    let joined = base.join(href).map_err(|e| UrlError::Resolve {
        href: href.to_string(),
        reason: e.to_string(),
    })?;

    let url = canonicalize_url(joined)?;
    if url.host_str() == base.host_str() {
        Ok(strip_session_params(url))
    } else {
        Ok(url)
    }
}
