//! Link previews: fetch a page and pull title, description and image
//!
//! Fallback order per field is fixed:
//! - title: og:title -> <title> -> placeholder
//! - description: og:description -> meta description -> ""
//! - image: og:image -> link rel=image_src -> ""

use crate::config::PreviewConfig;
use crate::error::PreviewError;
use crate::meta;
use anyhow::Result;
use clap::Args;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

#[derive(Args)]
pub struct PreviewArgs {
    /// URL to preview
    pub url: String,

    /// Output format: json (default) or yaml
    #[arg(long, short, default_value = "json")]
    pub format: String,
}

/// Preview title: extracted from the page, or the placeholder sentinel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewTitle {
    Extracted(String),
    Placeholder,
}

impl PreviewTitle {
    /// Wire value of the placeholder
    pub const PLACEHOLDER: &'static str = "Sem título";

    pub fn as_str(&self) -> &str {
        match self {
            PreviewTitle::Extracted(t) => t,
            PreviewTitle::Placeholder => Self::PLACEHOLDER,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, PreviewTitle::Placeholder)
    }

    /// Title worth pre-filling a gift name with; never the placeholder
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            PreviewTitle::Extracted(t) if !t.is_empty() => Some(t),
            _ => None,
        }
    }
}

impl std::fmt::Display for PreviewTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PreviewTitle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PreviewTitle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let title = String::deserialize(deserializer)?;
        if title == Self::PLACEHOLDER {
            Ok(PreviewTitle::Placeholder)
        } else {
            Ok(PreviewTitle::Extracted(title))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewResult {
    pub title: PreviewTitle,
    pub description: String,
    /// Absolute URL, or empty
    pub image: String,
    /// The requested URL, verbatim
    pub url: String,
}

/// HTTP fetcher for previews, with a browser user agent
#[derive(Debug, Clone)]
pub struct PreviewClient {
    client: reqwest::Client,
}

impl PreviewClient {
    pub fn new(config: &PreviewConfig) -> Result<Self, PreviewError> {
        let client = config
            .http_client()
            .map_err(|e| PreviewError::PreviewUnavailable(e.to_string()))?;
        Ok(Self { client })
    }

    /// Fetch `url` and extract its preview.
    ///
    /// `url` must be absolute; otherwise fails with `InvalidUrl` before any
    /// request is made.
    pub async fn extract_preview(&self, url: &str) -> Result<PreviewResult, PreviewError> {
        let parsed = Url::parse(url)?;

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| PreviewError::FetchFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PreviewError::FetchFailed(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| PreviewError::PreviewUnavailable(e.to_string()))?;

        parse_document(&html, &parsed, url)
    }
}

/// Extract a preview from an already-fetched document.
///
/// `base` supplies the origin for relative image URLs; `url` is echoed.
pub fn parse_document(html: &str, base: &Url, url: &str) -> Result<PreviewResult, PreviewError> {
    let title = meta::open_graph(html, "title")
        .or_else(|| meta::title_text(html))
        .map(|t| PreviewTitle::Extracted(t.trim().to_string()))
        .unwrap_or(PreviewTitle::Placeholder);

    let description = meta::open_graph(html, "description")
        .or_else(|| meta::meta_content(html, "name", "description"))
        .unwrap_or_default();

    let image = meta::open_graph(html, "image")
        .or_else(|| meta::link_href(html, "image_src"))
        .unwrap_or_default();

    Ok(PreviewResult {
        title,
        description: description.trim().to_string(),
        image: absolutize(&image, base)?,
        url: url.to_string(),
    })
}

/// Resolve a scheme-less image reference against the page's origin
fn absolutize(image: &str, base: &Url) -> Result<String, PreviewError> {
    if image.is_empty() || image.starts_with("http") {
        return Ok(image.to_string());
    }

    let origin = base.origin().ascii_serialization();
    Url::parse(&origin)
        .and_then(|origin| origin.join(image))
        .map(String::from)
        .map_err(|e| {
            PreviewError::PreviewUnavailable(format!("cannot resolve image {}: {}", image, e))
        })
}

/// Run the preview command
pub async fn run_preview(args: PreviewArgs, config: &PreviewConfig) -> Result<()> {
    let client = PreviewClient::new(config)?;

    eprintln!("Fetching preview for {}...", truncate(&args.url, 60));

    let preview = match client.extract_preview(&args.url).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(url = %args.url, error = %e, "no preview available");
            let output = serde_json::json!({ "error": e.to_string(), "url": args.url });
            println!("{}", serde_json::to_string(&output)?);
            std::process::exit(1);
        }
    };

    let output = match args.format.as_str() {
        "yaml" | "yml" => serde_yaml::to_string(&preview)?,
        _ => serde_json::to_string_pretty(&preview)?,
    };
    println!("{}", output);

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str, url: &str) -> PreviewResult {
        parse_document(html, &Url::parse(url).unwrap(), url).unwrap()
    }

    #[test]
    fn test_og_title_wins_over_title_element() {
        let html = r#"
            <html><head>
            <title>Shop - Lamp</title>
            <meta property="og:title" content="Desk Lamp">
            </head></html>
        "#;
        let preview = parse(html, "https://shop.example/p/1");
        assert_eq!(preview.title, PreviewTitle::Extracted("Desk Lamp".to_string()));
    }

    #[test]
    fn test_title_element_fallback_is_trimmed() {
        let html = "<title>\n  Desk Lamp \n</title>";
        let preview = parse(html, "https://shop.example/p/1");
        assert_eq!(preview.title.as_str(), "Desk Lamp");
    }

    #[test]
    fn test_placeholder_when_no_title() {
        let preview = parse("<html><body>nothing</body></html>", "https://shop.example/");
        assert_eq!(preview.title, PreviewTitle::Placeholder);
        assert_eq!(preview.title.as_str(), "Sem título");
        assert_eq!(preview.title.suggestion(), None);
        assert_eq!(preview.description, "");
        assert_eq!(preview.image, "");
    }

    #[test]
    fn test_description_fallback_chain() {
        let og = r#"<meta name="description" content="plain"><meta property="og:description" content=" og ">"#;
        assert_eq!(parse(og, "https://a.example/").description, "og");

        let plain = r#"<meta content="plain text" name="description">"#;
        assert_eq!(parse(plain, "https://a.example/").description, "plain text");
    }

    #[test]
    fn test_image_absolutized_against_origin() {
        let html = r#"<meta property="og:image" content="/img/a.png">"#;
        let preview = parse(html, "https://shop.example/p/1");
        assert_eq!(preview.image, "https://shop.example/img/a.png");
    }

    #[test]
    fn test_path_relative_image_uses_origin_not_page_path() {
        let html = r#"<link rel="image_src" href="img/a.png">"#;
        let preview = parse(html, "https://shop.example:8443/p/1");
        assert_eq!(preview.image, "https://shop.example:8443/img/a.png");
    }

    #[test]
    fn test_absolute_image_untouched() {
        let html = r#"<meta content="http://cdn.example/a.png" property="og:image">"#;
        let preview = parse(html, "https://shop.example/p/1");
        assert_eq!(preview.image, "http://cdn.example/a.png");
    }

    #[test]
    fn test_url_echoed_verbatim() {
        let url = "https://shop.example/p/1?ref=abc";
        assert_eq!(parse("", url).url, url);
    }

    #[test]
    fn test_title_serializes_as_string() {
        let preview = parse("", "https://shop.example/");
        let json = serde_json::to_value(&preview).unwrap();
        assert_eq!(json["title"], "Sem título");

        let back: PreviewResult = serde_json::from_value(json).unwrap();
        assert!(back.title.is_placeholder());
    }

    #[test]
    fn test_extracted_empty_is_not_placeholder() {
        let html = r#"<meta property="og:title" content="   ">"#;
        let preview = parse(html, "https://shop.example/");
        assert_eq!(preview.title, PreviewTitle::Extracted(String::new()));
        assert_eq!(preview.title.suggestion(), None);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
    }
}
