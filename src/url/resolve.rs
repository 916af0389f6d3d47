use crate::{UrlError, UrlResult};
use url::Url;

/// Resolves a link found on `current` to an absolute URL
///
/// # Resolution Rules
///
/// 1. An absolute `http`/`https` URL is returned unchanged
/// 2. A root-relative link (`/...`) is resolved against the scheme and host
///    of `current`, whatever the depth of its path
/// 3. Any other relative link is resolved against the directory holding
///    `current` (its path with the last segment removed)
///
/// Listing pages live side by side under one directory, so relative
/// pagination links are peers of the current page.
///
/// # Examples
///
/// ```
/// use shelfwalk::url::resolve_link;
/// use url::Url;
///
/// let current = Url::parse("https://site/catalogue/page-2.html").unwrap();
/// let next = resolve_link(&current, "page-3.html").unwrap();
/// assert_eq!(next.as_str(), "https://site/catalogue/page-3.html");
/// ```
pub fn resolve_link(current: &Url, href: &str) -> UrlResult<Url> {
    let href = href.trim();

    if href.is_empty() {
        return Err(UrlError::Malformed("empty link".to_string()));
    }

    let resolved = match Url::parse(href) {
        Ok(absolute) => absolute,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = if href.starts_with('/') && !href.starts_with("//") {
                site_root(current)
            } else {
                page_directory(current)
            };
            base.join(href)
                .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?
        }
        Err(e) => return Err(UrlError::Parse(format!("{}: {}", href, e))),
    };

    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return Err(UrlError::InvalidScheme(resolved.scheme().to_string()));
    }

    Ok(resolved)
}

/// Returns the scheme, host and port of `url` with an empty path
pub fn site_root(url: &Url) -> Url {
    let mut root = url.clone();
    root.set_path("/");
    root.set_query(None);
    root.set_fragment(None);
    root
}

/// Returns `url` with its last path segment, query and fragment removed
///
/// `https://site/catalogue/page-2.html` becomes `https://site/catalogue/`.
pub fn page_directory(url: &Url) -> Url {
    let path = url.path();
    let cut = path.rfind('/').map_or(0, |i| i + 1);

    let mut directory = url.clone();
    directory.set_path(&path[..cut]);
    directory.set_query(None);
    directory.set_fragment(None);
    directory
}
