use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::errors::{HarvestError, HarvestResult};

/// Inclusive UTC range covering one calendar day in the feed's reporting offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// Local midnight through local 23:59:59.999999 of `date`, expressed in UTC.
    /// The offset is fixed; daylight saving is not applied.
    pub fn for_day(date: NaiveDate, offset: FixedOffset) -> HarvestResult<Self> {
        let start_time = NaiveTime::from_hms_opt(0, 0, 0)
            .ok_or_else(|| HarvestError::InvalidDate("start of day".to_string()))?;
        let end_time = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)
            .ok_or_else(|| HarvestError::InvalidDate("end of day".to_string()))?;

        let start = offset
            .from_local_datetime(&date.and_time(start_time))
            .single()
            .ok_or_else(|| HarvestError::InvalidDate(date.to_string()))?;
        let end = offset
            .from_local_datetime(&date.and_time(end_time))
            .single()
            .ok_or_else(|| HarvestError::InvalidDate(date.to_string()))?;

        Ok(Self {
            start: start.with_timezone(&Utc),
            end: end.with_timezone(&Utc),
        })
    }

    /// Parse a `YYYYMMDD` day and compute its window
    pub fn parse_day(date_str: &str, offset: FixedOffset) -> HarvestResult<Self> {
        let date = parse_date(date_str)?;
        Self::for_day(date, offset)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Parse a compact `YYYYMMDD` calendar date
pub fn parse_date(date_str: &str) -> HarvestResult<NaiveDate> {
    let trimmed = date_str.trim();
    if trimmed.len() != 8 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(HarvestError::InvalidDate(format!(
            "expected YYYYMMDD, got '{}'",
            date_str
        )));
    }

    NaiveDate::parse_from_str(trimmed, "%Y%m%d")
        .map_err(|e| HarvestError::InvalidDate(format!("'{}': {}", date_str, e)))
}
