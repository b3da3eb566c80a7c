//! Utility functions and helpers.

pub mod html;
pub mod http;

use url::Url;

/// Parse a link and keep it only if it is an absolute http(s) URL.
pub fn web_url(link: &str) -> Option<Url> {
    Url::parse(link)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
}
