//! Pattern-based metadata lookups on raw HTML
//!
//! Not a document parser: each lookup is a case-insensitive regex over the
//! body, and attribute order matters (`property` then `content`, or the
//! reverse, as separate patterns).

use regex::{Regex, RegexBuilder};

/// Quoted attribute value: single or double quotes, non-empty, no quotes inside
const VALUE: &str = r#"["']([^"']+)["']"#;

fn capture(pattern: &str, html: &str) -> Option<String> {
    let re: Regex = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .ok()?;
    re.captures(html).map(|c| c[1].to_string())
}

/// `content` of `<meta {key}="{name}" content="...">`, in either attribute order
pub fn meta_content(html: &str, key: &str, name: &str) -> Option<String> {
    let key = regex::escape(key);
    let name = regex::escape(name);

    let key_first = format!(r#"<meta\s+{key}=["']{name}["']\s+content={VALUE}"#);
    let content_first = format!(r#"<meta\s+content={VALUE}\s+{key}=["']{name}["']"#);

    capture(&key_first, html).or_else(|| capture(&content_first, html))
}

/// `<meta property="og:{name}" content="...">`
pub fn open_graph(html: &str, name: &str) -> Option<String> {
    meta_content(html, "property", &format!("og:{name}"))
}

/// Text of the first `<title>` element
pub fn title_text(html: &str) -> Option<String> {
    capture(r"<title[^>]*>([^<]+)</title>", html)
}

/// `href` of `<link rel="{rel}" href="...">`
pub fn link_href(html: &str, rel: &str) -> Option<String> {
    let rel = regex::escape(rel);
    capture(&format!(r#"<link\s+rel=["']{rel}["']\s+href={VALUE}"#), html)
}
