use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::domain::Record;
use crate::errors::HarvestResult;
use crate::storage::traits::ArtifactStore;

/// Writes one pretty-printed JSON array per (date, section) into a directory
pub struct JsonArtifactStore {
    dir: PathBuf,
}

impl JsonArtifactStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn file_name(date: NaiveDate, section: &str) -> String {
        format!(
            "{}_barchart_{}_news.json",
            date.format("%Y%m%d"),
            section.replace('/', "-")
        )
    }

    /// Serialize records newest id first
    pub fn render(records: &[Record]) -> HarvestResult<String> {
        let mut sorted = records.to_vec();
        sorted.sort_by(|a, b| compare_ids(&b.id, &a.id));
        Ok(serde_json::to_string_pretty(&sorted)?)
    }
}

/// Numeric ids compare as numbers so "100" sorts after "99"
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

impl ArtifactStore for JsonArtifactStore {
    fn save(
        &self,
        date: NaiveDate,
        section: &str,
        records: &[Record],
    ) -> HarvestResult<Option<PathBuf>> {
        if records.is_empty() {
            warn!(section, date = %date, "No news items were fetched, nothing written");
            return Ok(None);
        }

        fs::create_dir_all(&self.dir)?;

        let path = self.dir.join(Self::file_name(date, section));
        fs::write(&path, Self::render(records)?)?;

        info!(path = %path.display(), count = records.len(), "Saved harvest artifact");
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawCandidate;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn record(id: &str) -> Record {
        RawCandidate::new(id.to_string(), format!("Story {}", id))
            .with_published("Tue Jun 10, 5:00PM CDT".to_string())
            .into_record(Utc.with_ymd_and_hms(2025, 6, 10, 22, 0, 0).unwrap())
    }

    #[test]
    fn test_file_name() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 11).unwrap();
        assert_eq!(
            JsonArtifactStore::file_name(date, "all-commodities"),
            "20250611_barchart_all-commodities_news.json"
        );
        assert_eq!(
            JsonArtifactStore::file_name(date, "grains/wheat"),
            "20250611_barchart_grains-wheat_news.json"
        );
    }

    #[test]
    fn test_render_sorts_ids_descending() {
        let records = [record("99"), record("100"), record("7")];
        let rendered = JsonArtifactStore::render(&records).unwrap();
        let parsed: Vec<Record> = serde_json::from_str(&rendered).unwrap();

        let ids: Vec<&str> = parsed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["100", "99", "7"]);
    }

    #[test]
    fn test_save_creates_directory_and_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonArtifactStore::new(temp_dir.path().join("news-dataset"));
        let date = NaiveDate::from_ymd_opt(2025, 6, 11).unwrap();

        let path = store
            .save(date, "all-commodities", &[record("1")])
            .unwrap()
            .unwrap();

        assert!(path.ends_with("20250611_barchart_all-commodities_news.json"));
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"published_timestamp_utc\": 1749592800"));
    }

    #[test]
    fn test_empty_harvest_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("news-dataset");
        let store = JsonArtifactStore::new(&dir);
        let date = NaiveDate::from_ymd_opt(2025, 6, 11).unwrap();

        let saved = store.save(date, "all-commodities", &[]).unwrap();

        assert!(saved.is_none());
        assert!(!dir.exists());
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(JsonArtifactStore::render(&[]).unwrap(), "[]");
    }
}
