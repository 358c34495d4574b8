use url::Url;

/// Normalizes a raw URL string into its canonical, comparable form
///
/// # Normalization Steps
///
/// 1. Prepend `http://` when no `http://`/`https://` prefix is present
///    (checked case-insensitively)
/// 2. Parse into components; the `url` crate lowercases scheme and host
/// 3. Clear the fragment
/// 4. Reserialize and strip any trailing `/`
///
/// Malformed input is returned unchanged: the frontier treats strings it
/// cannot parse as opaque keys rather than rejecting them, so this function
/// never fails.
///
/// Guarantee: idempotent. Normalizing an already-normalized URL returns the
/// same string.
///
/// # Examples
///
/// ```
/// use crawl_swarm::url::normalize;
///
/// assert_eq!(normalize("example.com/a"), "http://example.com/a");
/// assert_eq!(normalize("HTTP://Example.COM/a#frag"), "http://example.com/a");
/// ```
pub fn normalize(raw: &str) -> String {
    let candidate = if has_http_scheme(raw) {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };

    let mut url = match Url::parse(&candidate) {
        Ok(u) => u,
        // Opaque key: hand the caller back exactly what came in
        Err(_) => return raw.to_string(),
    };

    url.set_fragment(None);

    url.to_string().trim_end_matches('/').to_string()
}

/// Case-insensitive check for an explicit http/https scheme prefix
fn has_http_scheme(raw: &str) -> bool {
    let lower = raw.get(..8).unwrap_or(raw).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepends_default_scheme() {
        assert_eq!(normalize("example.com/a"), "http://example.com/a");
    }

    #[test]
    fn test_keeps_https_scheme() {
        assert_eq!(normalize("https://example.com/a"), "https://example.com/a");
    }

    #[test]
    fn test_scheme_case_insensitive() {
        assert_eq!(normalize("HTTP://example.com/a"), "http://example.com/a");
        assert_eq!(normalize("HtTpS://example.com/a"), "https://example.com/a");
    }

    #[test]
    fn test_lowercases_host() {
        assert_eq!(normalize("http://EXAMPLE.COM/Page"), "http://example.com/Page");
    }

    #[test]
    fn test_strips_fragment() {
        assert_eq!(
            normalize("http://example.com/page#section"),
            "http://example.com/page"
        );
    }

    #[test]
    fn test_strips_trailing_slash() {
        assert_eq!(normalize("http://example.com/page/"), "http://example.com/page");
    }

    #[test]
    fn test_bare_host_has_no_trailing_slash() {
        assert_eq!(normalize("http://example.com/"), "http://example.com");
        assert_eq!(normalize("example.com"), "http://example.com");
    }

    #[test]
    fn test_keeps_query() {
        assert_eq!(
            normalize("http://example.com/page?a=1&b=2"),
            "http://example.com/page?a=1&b=2"
        );
    }

    #[test]
    fn test_malformed_returned_unchanged() {
        assert_eq!(normalize("not a url"), "not a url");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("ftp://example.com/file"), "ftp://example.com/file");
    }

    #[test]
    fn test_idempotent_on_valid_urls() {
        let inputs = [
            "example.com",
            "example.com/a/b/",
            "HTTPS://WWW.Example.com/Page#x",
            "http://example.com:8080/p?q=1",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {}", input);
        }
    }

    #[test]
    fn test_idempotent_on_malformed_inputs() {
        let inputs = ["not a url", "", "://", "http://", "ftp://x/y"];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_scheme_casing_collapses_to_same_key() {
        assert_eq!(
            normalize("HTTP://example.com/a"),
            normalize("http://example.com/a")
        );
    }
}
