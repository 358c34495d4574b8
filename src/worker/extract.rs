//! Text and link extraction from fetched HTML
//!
//! Parse errors never propagate: unusable markup degrades to empty text and
//! no links, and the caller reports whatever was recovered.

use crate::url::normalize;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Elements whose text is never page content
const SKIP_TAGS: &[&str] = &["script", "style"];

/// Extracts readable text from an HTML document
///
/// Prefers heading (h1..h6) then paragraph text, matching what a summary
/// view of the page would show; falls back to the whole document's visible
/// text when the page has neither.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts: Vec<String> = Vec::new();

    for css in ["h1, h2, h3, h4, h5, h6", "p"] {
        if let Ok(selector) = Selector::parse(css) {
            for element in document.select(&selector) {
                let text = visible_text(element);
                if !text.is_empty() {
                    parts.push(text);
                }
            }
        }
    }

    if !parts.is_empty() {
        return parts.join(" ");
    }

    visible_text(document.root_element())
}

/// Extracts the page title, with the indexer's placeholder fallback
pub fn extract_title(html: &str) -> String {
    let document = Html::parse_document(html);
    if let Ok(selector) = Selector::parse("title") {
        if let Some(element) = document.select(&selector).next() {
            let title = element.text().collect::<String>().trim().to_string();
            if !title.is_empty() {
                return title;
            }
        }
    }
    "No Title".to_string()
}

/// Extracts followable links from an HTML document
///
/// `a[href]` values are resolved against `base_url`; fragment-only anchors
/// and non-HTTP schemes are dropped, cross-host links are dropped when
/// `restrict_domain` is set, and the result is deduplicated in page order
/// using each link's normalized form.
pub fn extract_links(html: &str, base_url: &Url, restrict_domain: bool) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen: HashSet<String> = HashSet::new();
    let mut links: Vec<String> = Vec::new();

    let Ok(selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(resolved) = resolve_link(href, base_url) else {
            continue;
        };

        if restrict_domain && resolved.host_str() != base_url.host_str() {
            continue;
        }

        let canonical = normalize(resolved.as_str());
        if seen.insert(canonical.clone()) {
            links.push(canonical);
        }
    }

    links
}

/// Resolves an href to an absolute HTTP(S) URL, or None when it should be
/// skipped
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let resolved = base_url.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}

/// Collects the text nodes under an element, skipping script/style content
fn visible_text(element: ElementRef) -> String {
    let mut parts: Vec<String> = Vec::new();

    for node in element.descendants() {
        if let Some(text) = node.value().as_text() {
            let in_skipped = node
                .parent()
                .and_then(|p| p.value().as_element())
                .map(|e| SKIP_TAGS.contains(&e.name()))
                .unwrap_or(false);
            if in_skipped {
                continue;
            }
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        }
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("http://example.com/a").unwrap()
    }

    #[test]
    fn test_extract_text_prefers_headings_and_paragraphs() {
        let html = r#"<html><body>
            <h1>Main Title</h1>
            <div>navigation junk</div>
            <p>First paragraph.</p>
        </body></html>"#;
        assert_eq!(extract_text(html), "Main Title First paragraph.");
    }

    #[test]
    fn test_extract_text_headings_come_before_paragraphs() {
        let html = r#"<html><body>
            <p>Body text.</p>
            <h2>Late Heading</h2>
        </body></html>"#;
        assert_eq!(extract_text(html), "Late Heading Body text.");
    }

    #[test]
    fn test_extract_text_skips_script_and_style() {
        let html = r#"<html><head><style>p { color: red; }</style></head><body>
            <p>Visible <script>var hidden = 1;</script>content</p>
        </body></html>"#;
        let text = extract_text(html);
        assert_eq!(text, "Visible content");
    }

    #[test]
    fn test_extract_text_falls_back_to_document_text() {
        let html = r#"<html><body><div>Only a div here</div></body></html>"#;
        assert_eq!(extract_text(html), "Only a div here");
    }

    #[test]
    fn test_extract_text_fallback_skips_script() {
        let html = r#"<html><body><script>var x = 1;</script><div>Real text</div></body></html>"#;
        assert_eq!(extract_text(html), "Real text");
    }

    #[test]
    fn test_extract_text_empty_document() {
        assert_eq!(extract_text(""), "");
    }

    #[test]
    fn test_extract_title() {
        let html = r#"<html><head><title>  My Page  </title></head><body></body></html>"#;
        assert_eq!(extract_title(html), "My Page");
    }

    #[test]
    fn test_extract_title_missing() {
        let html = r#"<html><body>no title</body></html>"#;
        assert_eq!(extract_title(html), "No Title");
    }

    #[test]
    fn test_extract_relative_link() {
        let html = r#"<a href="/b">B</a>"#;
        let links = extract_links(html, &base_url(), false);
        assert_eq!(links, vec!["http://example.com/b"]);
    }

    #[test]
    fn test_extract_absolute_link() {
        let html = r#"<a href="http://other.com/c">C</a>"#;
        let links = extract_links(html, &base_url(), false);
        assert_eq!(links, vec!["http://other.com/c"]);
    }

    #[test]
    fn test_restrict_domain_drops_cross_host_links() {
        let html = r#"<a href="/b">B</a><a href="http://other.com/c">C</a>"#;
        let links = extract_links(html, &base_url(), true);
        assert_eq!(links, vec!["http://example.com/b"]);
    }

    #[test]
    fn test_fragment_only_links_dropped() {
        let html = r##"<a href="#section">Jump</a><a href="/real">Real</a>"##;
        let links = extract_links(html, &base_url(), false);
        assert_eq!(links, vec!["http://example.com/real"]);
    }

    #[test]
    fn test_fragment_stripped_from_resolved_links() {
        let html = r##"<a href="/b#part">B</a>"##;
        let links = extract_links(html, &base_url(), false);
        assert_eq!(links, vec!["http://example.com/b"]);
    }

    #[test]
    fn test_special_schemes_dropped() {
        let html = r#"
            <a href="javascript:void(0)">js</a>
            <a href="mailto:x@example.com">mail</a>
            <a href="tel:+123">tel</a>
            <a href="data:text/html,hi">data</a>
        "#;
        assert!(extract_links(html, &base_url(), false).is_empty());
    }

    #[test]
    fn test_links_deduplicated_within_page() {
        let html = r#"<a href="/b">one</a><a href="/b#frag">two</a><a href="/b/">three</a>"#;
        let links = extract_links(html, &base_url(), false);
        assert_eq!(links, vec!["http://example.com/b"]);
    }

    #[test]
    fn test_link_order_preserved() {
        let html = r#"<a href="/z">z</a><a href="/a">a</a>"#;
        let links = extract_links(html, &base_url(), false);
        assert_eq!(links, vec!["http://example.com/z", "http://example.com/a"]);
    }

    #[test]
    fn test_malformed_html_degrades_to_best_effort() {
        let html = "<html><body><p>Unclosed <a href='/ok'>link";
        let links = extract_links(html, &base_url(), false);
        assert_eq!(links, vec!["http://example.com/ok"]);
    }
}
