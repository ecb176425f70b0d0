use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::Cursor;
use crate::errors::{HarvestError, HarvestResult};
use crate::sources::traits::{Credential, PageFetcher, PagePayload, SessionProvider};

pub const BASE_URL: &str = "https://www.barchart.com";
const LOAD_MORE_PATH: &str = "/news/load-more-stories";
const ALL_COMMODITIES: &str = "all-commodities";
const XSRF_COOKIE: &str = "XSRF-TOKEN";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36";
const PAGE_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,\
image/avif,image/webp,image/apng,*/*;q=0.8";

/// Request body for the "load more stories" endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadMoreRequest<'a> {
    section: &'a str,
    sub_section: &'a str,
    search: Vec<String>,
    use_thumbnail: bool,
    symbol_type: bool,
    before: String,
}

#[derive(Debug, Deserialize)]
struct LoadMoreResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    timestamp: Option<i64>,
}

/// The endpoint reports the next cursor as either a string or a number.
/// Anything that is not an integer is treated as "no hint".
fn deserialize_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct OptionalTimestampVisitor;

    impl<'de> Visitor<'de> for OptionalTimestampVisitor {
        type Value = Option<i64>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer timestamp")
        }

        fn visit_i64<E>(self, v: i64) -> Result<Option<i64>, E> {
            Ok(Some(v))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Option<i64>, E> {
            Ok(i64::try_from(v).ok())
        }

        fn visit_f64<E>(self, v: f64) -> Result<Option<i64>, E> {
            Ok(v.is_finite().then(|| v.trunc() as i64))
        }

        fn visit_str<E>(self, v: &str) -> Result<Option<i64>, E>
        where
            E: de::Error,
        {
            let parsed = v.trim().parse().ok();
            if parsed.is_none() && !v.trim().is_empty() {
                warn!(timestamp = v, "Ignoring unparseable next-page timestamp");
            }
            Ok(parsed)
        }

        fn visit_bool<E>(self, _v: bool) -> Result<Option<i64>, E> {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Option<i64>, E> {
            Ok(None)
        }

        fn visit_none<E>(self) -> Result<Option<i64>, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(OptionalTimestampVisitor)
}

/// Decode one "load more stories" response body
pub fn decode_page(body: &str) -> HarvestResult<PagePayload> {
    let response: LoadMoreResponse =
        serde_json::from_str(body).map_err(|e| HarvestError::Decode(e.to_string()))?;

    Ok(PagePayload {
        raw_content: response.content.unwrap_or_default(),
        next_cursor_hint: response.timestamp.map(Cursor::from_secs),
    })
}

/// Session bootstrap and page transport for one Barchart news section
pub struct BarchartClient {
    client: Client,
    base_url: String,
    section: String,
}

impl BarchartClient {
    pub fn new(section: &str) -> HarvestResult<Self> {
        Self::with_base_url(section, BASE_URL)
    }

    pub fn with_base_url(section: &str, base_url: &str) -> HarvestResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            section: section.to_string(),
        })
    }

    /// The HTML page that hands out the session cookie for a section
    fn news_page_url(&self, section: &str) -> String {
        if section.eq_ignore_ascii_case(ALL_COMMODITIES) {
            format!("{}/news/commodities", self.base_url)
        } else {
            format!("{}/news/commodities/{}", self.base_url, section)
        }
    }

    fn load_more_request(&self, cursor: Cursor) -> LoadMoreRequest<'_> {
        LoadMoreRequest {
            section: "market_commentary",
            sub_section: &self.section,
            search: Vec::new(),
            use_thumbnail: true,
            symbol_type: false,
            before: cursor.as_secs().to_string(),
        }
    }

    /// XSRF cookies arrive URL-encoded; fall back to the raw value if decoding fails
    fn decode_token(raw: &str) -> String {
        match urlencoding::decode(raw) {
            Ok(decoded) => decoded.into_owned(),
            Err(e) => {
                warn!(error = %e, "Could not URL-decode XSRF token, using raw value");
                raw.to_string()
            }
        }
    }
}

impl SessionProvider for BarchartClient {
    fn obtain_credential(&self, section: &str) -> HarvestResult<Credential> {
        let url = self.news_page_url(section);
        info!(%url, "Fetching session page");

        let response = self
            .client
            .get(&url)
            .header("accept", PAGE_ACCEPT)
            .header("accept-language", "en-US,en;q=0.9")
            .header("sec-fetch-dest", "document")
            .header("sec-fetch-mode", "navigate")
            .header("sec-fetch-site", "none")
            .header("upgrade-insecure-requests", "1")
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| HarvestError::Auth(format!("session page {}: {}", url, e)))?;

        let raw_token = response
            .cookies()
            .find(|cookie| cookie.name() == XSRF_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .ok_or_else(|| {
                HarvestError::Auth(format!("{} cookie missing from {}", XSRF_COOKIE, url))
            })?;

        debug!("Obtained XSRF token");
        Ok(Credential(Self::decode_token(&raw_token)))
    }
}

impl PageFetcher for BarchartClient {
    fn fetch_page(&self, cursor: Cursor, credential: &Credential) -> HarvestResult<PagePayload> {
        let referer = self.news_page_url(&self.section);
        let body = self
            .client
            .post(format!("{}{}", self.base_url, LOAD_MORE_PATH))
            .header("accept", "application/json")
            .header("origin", &self.base_url)
            .header("referer", referer)
            .header("x-xsrf-token", credential.as_str())
            .json(&self.load_more_request(cursor))
            .send()?
            .error_for_status()?
            .text()?;

        decode_page(&body)
    }
}
