use std::str::FromStr;
use std::time::Duration;

use chrono::{FixedOffset, NaiveDate};

use crate::errors::{HarvestError, HarvestResult};

pub const DEFAULT_SECTION: &str = "all-commodities";
pub const DEFAULT_COUNT_LIMIT: usize = 35;
pub const DEFAULT_MAX_ITERATIONS: u32 = 500;
pub const DEFAULT_DELAY_MS: u64 = 1000;
pub const DEFAULT_ACCEPTED_FEEDS: &str = "Barchart";
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = -5;
pub const DEFAULT_OUTPUT_DIR: &str = "data/news-dataset";

/// Everything one harvest needs to know. Built fresh per invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestConfig {
    pub section: String,
    /// Absent means "most recent" mode bounded by `count_limit`
    pub target_date: Option<NaiveDate>,
    pub count_limit: usize,
    pub max_iterations: u32,
    pub inter_page_delay: Duration,
    /// Case-insensitive; empty accepts every feed
    pub accepted_feed_names: Vec<String>,
    /// The feed's reporting offset, used for windows and timestamps without a zone
    pub feed_offset: FixedOffset,
}

impl HarvestConfig {
    pub fn new(section: &str, feed_offset: FixedOffset) -> Self {
        Self {
            section: section.to_string(),
            target_date: None,
            count_limit: DEFAULT_COUNT_LIMIT,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            inter_page_delay: Duration::from_millis(DEFAULT_DELAY_MS),
            accepted_feed_names: vec![DEFAULT_ACCEPTED_FEEDS.to_string()],
            feed_offset,
        }
    }

    pub fn with_target_date(mut self, target_date: Option<NaiveDate>) -> Self {
        self.target_date = target_date;
        self
    }

    pub fn with_count_limit(mut self, count_limit: usize) -> Self {
        self.count_limit = count_limit;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_inter_page_delay(mut self, delay: Duration) -> Self {
        self.inter_page_delay = delay;
        self
    }

    pub fn with_accepted_feed_names(mut self, names: Vec<String>) -> Self {
        self.accepted_feed_names = names;
        self
    }

    pub fn accepts_feed(&self, feed_name: &str) -> bool {
        self.accepted_feed_names.is_empty()
            || self
                .accepted_feed_names
                .iter()
                .any(|name| name.eq_ignore_ascii_case(feed_name.trim()))
    }

    pub fn validate(&self) -> HarvestResult<()> {
        if self.section.trim().is_empty() {
            return Err(HarvestError::Config("section cannot be empty".to_string()));
        }
        if self.max_iterations == 0 {
            return Err(HarvestError::Config("max iterations must be at least 1".to_string()));
        }
        if self.target_date.is_none() && self.count_limit == 0 {
            return Err(HarvestError::Config("count limit must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Settings read from the environment (and `.env`), overridable on the command line
#[derive(Debug, Clone)]
pub struct Config {
    pub section: String,
    pub count_limit: usize,
    pub max_iterations: u32,
    pub delay_ms: u64,
    pub accepted_feeds: Vec<String>,
    pub utc_offset_hours: i32,
    pub output_dir: String,
}

impl Config {
    /// Get the directory where the executable is located
    fn exe_dir() -> Option<std::path::PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    pub fn from_env() -> HarvestResult<Self> {
        // Try to load .env from executable's directory first
        if let Some(dir) = Self::exe_dir() {
            let env_path = dir.join(".env");
            if env_path.exists() {
                dotenvy::from_path(&env_path).ok();
            }
        }
        // Fall back to current directory
        dotenvy::dotenv().ok();

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<L>(lookup: L) -> HarvestResult<Self>
    where
        L: Fn(&str) -> Option<String>,
    {
        let section = lookup("HARVEST_SECTION")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SECTION.to_string());

        let accepted_feeds = lookup("HARVEST_ACCEPTED_FEEDS")
            .unwrap_or_else(|| DEFAULT_ACCEPTED_FEEDS.to_string())
            .split(',')
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        let utc_offset_hours =
            parse_var(&lookup, "HARVEST_UTC_OFFSET_HOURS", DEFAULT_UTC_OFFSET_HOURS)?;
        utc_offset(utc_offset_hours)?;

        Ok(Self {
            section,
            count_limit: parse_var(&lookup, "HARVEST_COUNT_LIMIT", DEFAULT_COUNT_LIMIT)?,
            max_iterations: parse_var(&lookup, "HARVEST_MAX_ITERATIONS", DEFAULT_MAX_ITERATIONS)?,
            delay_ms: parse_var(&lookup, "HARVEST_DELAY_MS", DEFAULT_DELAY_MS)?,
            accepted_feeds,
            utc_offset_hours,
            output_dir: lookup("HARVEST_OUTPUT_DIR")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
        })
    }

    pub fn feed_offset(&self) -> HarvestResult<FixedOffset> {
        utc_offset(self.utc_offset_hours)
    }

    /// Harvest settings for one run
    pub fn harvest_config(&self, target_date: Option<NaiveDate>) -> HarvestResult<HarvestConfig> {
        let config = HarvestConfig::new(&self.section, self.feed_offset()?)
            .with_target_date(target_date)
            .with_count_limit(self.count_limit)
            .with_max_iterations(self.max_iterations)
            .with_inter_page_delay(Duration::from_millis(self.delay_ms))
            .with_accepted_feed_names(self.accepted_feeds.clone());

        config.validate()?;
        Ok(config)
    }
}

pub fn utc_offset(hours: i32) -> HarvestResult<FixedOffset> {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| HarvestError::Config(format!("UTC offset out of range: {} hours", hours)))
}

fn parse_var<L, T>(lookup: &L, name: &str, default: T) -> HarvestResult<T>
where
    L: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| HarvestError::Config(format!("{} has invalid value '{}'", name, value))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> HarvestResult<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.section, "all-commodities");
        assert_eq!(config.count_limit, 35);
        assert_eq!(config.max_iterations, 500);
        assert_eq!(config.delay_ms, 1000);
        assert_eq!(config.accepted_feeds, vec!["Barchart"]);
        assert_eq!(config.feed_offset().unwrap(), FixedOffset::west_opt(5 * 3600).unwrap());
        assert_eq!(config.output_dir, "data/news-dataset");
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("HARVEST_SECTION", "grains"),
            ("HARVEST_COUNT_LIMIT", "10"),
            ("HARVEST_MAX_ITERATIONS", "5"),
            ("HARVEST_DELAY_MS", "0"),
            ("HARVEST_ACCEPTED_FEEDS", "Barchart, Associated Press ,"),
            ("HARVEST_UTC_OFFSET_HOURS", "-6"),
        ])
        .unwrap();

        assert_eq!(config.section, "grains");
        assert_eq!(config.count_limit, 10);
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.delay_ms, 0);
        assert_eq!(config.accepted_feeds, vec!["Barchart", "Associated Press"]);
        assert_eq!(config.utc_offset_hours, -6);
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        let result = config_from(&[("HARVEST_MAX_ITERATIONS", "many")]);
        assert!(matches!(result, Err(HarvestError::Config(_))));

        let result = config_from(&[("HARVEST_UTC_OFFSET_HOURS", "30")]);
        assert!(matches!(result, Err(HarvestError::Config(_))));
    }

    #[test]
    fn test_harvest_config_from_settings() {
        let config = config_from(&[("HARVEST_DELAY_MS", "250")]).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 6, 11);

        let harvest = config.harvest_config(date).unwrap();

        assert_eq!(harvest.target_date, date);
        assert_eq!(harvest.inter_page_delay, Duration::from_millis(250));
        assert_eq!(harvest.section, "all-commodities");
    }

    fn harvest(section: &str) -> HarvestConfig {
        HarvestConfig::new(section, utc_offset(-5).unwrap())
    }

    #[test]
    fn test_harvest_config_validation() {
        assert!(harvest("energy").validate().is_ok());
        assert!(harvest(" ").validate().is_err());
        assert!(harvest("energy").with_max_iterations(0).validate().is_err());
        assert!(harvest("energy").with_count_limit(0).validate().is_err());
        assert!(harvest("energy")
            .with_count_limit(0)
            .with_target_date(NaiveDate::from_ymd_opt(2025, 6, 11))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_accepts_feed() {
        let config = harvest("energy");
        assert!(config.accepts_feed("Barchart"));
        assert!(config.accepts_feed("barchart "));
        assert!(!config.accepts_feed("Associated Press"));

        let open = config.with_accepted_feed_names(Vec::new());
        assert!(open.accepts_feed("Associated Press"));
    }
}
