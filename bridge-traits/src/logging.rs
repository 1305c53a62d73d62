//! Log hygiene helpers shared by every crate that logs clip locators.

/// Strip query string and fragment from a URL before logging it.
///
/// Storage download URLs carry access tokens in the query.
///
/// ```
/// use bridge_traits::logging::redact_url;
///
/// assert_eq!(redact_url("https://x/a.mp3?alt=media&token=abc"), "https://x/a.mp3");
/// ```
pub fn redact_url(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_url() {
        assert_eq!(redact_url("https://x/a.mp3"), "https://x/a.mp3");
        assert_eq!(redact_url("https://x/a.mp3#t=3"), "https://x/a.mp3");
        assert_eq!(redact_url(""), "");
    }
}
