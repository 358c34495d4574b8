use url::Url;

/// Derives the `scheme://host[:port]` origin of a URL
///
/// robots.txt is an origin-level resource, so the robots cache is keyed by
/// this value rather than by registrable domain. Returns `None` when the URL
/// cannot be parsed or has no host.
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    match parsed.port() {
        Some(port) => Some(format!("{}://{}:{}", parsed.scheme(), host, port)),
        None => Some(format!("{}://{}", parsed.scheme(), host)),
    }
}
