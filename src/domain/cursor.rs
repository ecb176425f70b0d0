use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A "before" instant in whole seconds since the epoch, used to request older pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(i64);

impl Cursor {
    pub fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    /// Floors sub-second precision away
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        Self(instant.timestamp())
    }

    pub fn as_secs(&self) -> i64 {
        self.0
    }

    pub fn to_instant(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.0, 0)
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_instant() {
            Some(instant) => write!(f, "{} ({})", self.0, instant.format("%Y-%m-%d %H:%M:%S UTC")),
            None => write!(f, "{}", self.0),
        }
    }
}
