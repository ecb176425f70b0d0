use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::domain::RawCandidate;
use crate::sources::barchart_client::BASE_URL;
use crate::sources::traits::PageParser;

static STORY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.story.clearfix").expect("valid selector"));
static LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.story-link[href]").expect("valid selector"));
static META_SMALL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.story-meta.show-for-small-up").expect("valid selector"));
static META: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.story-meta").expect("valid selector"));
static EXCERPT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p.story-excerpt").expect("valid selector"));

static NEWS_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/news/(\d+)/").expect("valid regex"));
static FEED_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^-]+)-").expect("valid regex"));

/// Extracts stories from the HTML fragment returned by the "load more stories" endpoint
pub struct BarchartStoryParser {
    base_url: Option<Url>,
}

impl BarchartStoryParser {
    pub fn new() -> Self {
        Self {
            base_url: Url::parse(BASE_URL).ok(),
        }
    }

    /// Collapse an element's text into single-spaced, trimmed form
    fn element_text(element: ElementRef<'_>) -> String {
        element
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn absolute_url(&self, href: &str) -> String {
        if href.starts_with("http") {
            return href.to_string();
        }
        self.base_url
            .as_ref()
            .and_then(|base| base.join(href).ok())
            .map(|u| u.to_string())
            .unwrap_or_else(|| format!("{}{}", BASE_URL, href))
    }

    /// "Barchart - Tue Jun 10, 5:00PM CDT" -> ("Barchart", "Tue Jun 10, 5:00PM CDT")
    fn split_meta(meta: &str) -> (String, String) {
        match FEED_PREFIX.captures(meta) {
            Some(caps) => {
                let prefix_len = caps.get(0).map(|m| m.end()).unwrap_or(0);
                let feed = caps
                    .get(1)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default();
                (feed, meta[prefix_len..].trim().to_string())
            }
            None => ("Unknown".to_string(), meta.trim().to_string()),
        }
    }

    fn parse_story(&self, story: ElementRef<'_>) -> Option<RawCandidate> {
        let link = story.select(&LINK).next();
        let meta = story
            .select(&META_SMALL)
            .next()
            .or_else(|| story.select(&META).next());

        let (link, meta) = match (link, meta) {
            (Some(link), Some(meta)) => (link, meta),
            _ => {
                debug!("Skipping story without link or meta");
                return None;
            }
        };

        let url = self.absolute_url(link.value().attr("href")?);
        let title = Self::element_text(link);

        let id = match NEWS_ID.captures(&url).and_then(|caps| caps.get(1)) {
            Some(id) => id.as_str().to_string(),
            None => {
                debug!(%url, title = %title, "Skipping story without an id in its URL");
                return None;
            }
        };

        let (feed, published) = Self::split_meta(&Self::element_text(meta));
        let summary = story
            .select(&EXCERPT)
            .next()
            .map(Self::element_text)
            .unwrap_or_default();

        Some(
            RawCandidate::new(id, title)
                .with_url(url)
                .with_published(published)
                .with_summary(summary)
                .with_source_feed(feed),
        )
    }
}

impl Default for BarchartStoryParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PageParser for BarchartStoryParser {
    fn extract(&self, raw_content: &str) -> Vec<RawCandidate> {
        if raw_content.trim().is_empty() {
            return Vec::new();
        }

        let document = Html::parse_fragment(raw_content);
        document
            .select(&STORY)
            .filter_map(|story| self.parse_story(story))
            .collect()
    }
}
