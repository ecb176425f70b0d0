use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One story as the page parser saw it, before any time resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    pub id: String,
    pub title: String,
    pub url: String,
    pub published_raw: String,
    pub summary: String,
    pub source_feed: String,
}

impl RawCandidate {
    pub fn new(id: String, title: String) -> Self {
        Self {
            id,
            title,
            url: String::new(),
            published_raw: String::new(),
            summary: String::new(),
            source_feed: String::new(),
        }
    }

    pub fn with_url(mut self, url: String) -> Self {
        self.url = url;
        self
    }

    pub fn with_published(mut self, published_raw: String) -> Self {
        self.published_raw = published_raw;
        self
    }

    pub fn with_summary(mut self, summary: String) -> Self {
        self.summary = summary;
        self
    }

    pub fn with_source_feed(mut self, source_feed: String) -> Self {
        self.source_feed = source_feed;
        self
    }

    pub fn into_record(self, published_at: DateTime<Utc>) -> Record {
        Record {
            id: self.id,
            title: self.title,
            url: self.url,
            published_raw: self.published_raw,
            published_at,
            summary: self.summary,
            source_feed: self.source_feed,
        }
    }
}

/// An accepted item; identity is `id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(rename = "published_str_original")]
    pub published_raw: String,
    #[serde(rename = "published_timestamp_utc", with = "chrono::serde::ts_seconds")]
    pub published_at: DateTime<Utc>,
    pub summary: String,
    #[serde(skip)]
    pub source_feed: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Record {
        RawCandidate::new("48211234".to_string(), "Corn Rallies".to_string())
            .with_url("https://www.barchart.com/story/news/48211234/corn-rallies".to_string())
            .with_published("Tue Jun 10, 5:00PM CDT".to_string())
            .with_summary("Corn futures closed higher.".to_string())
            .with_source_feed("Barchart".to_string())
            .into_record(Utc.with_ymd_and_hms(2025, 6, 10, 22, 0, 0).unwrap())
    }

    #[test]
    fn test_record_serializes_artifact_fields() {
        let value = serde_json::to_value(sample()).unwrap();

        assert_eq!(value["id"], "48211234");
        assert_eq!(value["published_str_original"], "Tue Jun 10, 5:00PM CDT");
        assert_eq!(value["published_timestamp_utc"], 1749592800);
        assert_eq!(value["summary"], "Corn futures closed higher.");
        assert!(value.get("source_feed").is_none());
    }

    #[test]
    fn test_into_record_keeps_candidate_fields() {
        let record = sample();
        assert_eq!(record.title, "Corn Rallies");
        assert_eq!(record.source_feed, "Barchart");
    }
}
