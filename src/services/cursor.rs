use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::domain::{Cursor, Window};

/// Neither the page hint nor the batch minimum would move the cursor backwards
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("pagination stalled at cursor {current}: hint {hint:?}, batch minimum {fallback:?}")]
pub struct StallError {
    pub current: Cursor,
    pub hint: Option<Cursor>,
    pub fallback: Option<Cursor>,
}

/// Owns the single "before" cursor of a harvest. Every value it hands out is
/// strictly older than the one before it.
#[derive(Debug)]
pub struct CursorController {
    current: Cursor,
}

impl CursorController {
    /// Just past the window end when harvesting a day, otherwise "now"
    pub fn initialize(window: Option<&Window>, now: DateTime<Utc>) -> Self {
        let current = match window {
            Some(window) => Cursor::from_instant(window.end + Duration::seconds(1)),
            None => Cursor::from_instant(now),
        };
        Self { current }
    }

    pub fn current(&self) -> Cursor {
        self.current
    }

    /// Prefer the feed's own hint, fall back to the oldest item seen on the page
    pub fn advance(
        &mut self,
        hint: Option<Cursor>,
        batch_min: Option<DateTime<Utc>>,
    ) -> Result<Cursor, StallError> {
        let fallback = batch_min.map(Cursor::from_instant);

        let next = hint
            .filter(|h| *h < self.current)
            .or_else(|| fallback.filter(|f| *f < self.current))
            .ok_or(StallError {
                current: self.current,
                hint,
                fallback,
            })?;

        self.current = next;
        Ok(next)
    }
}
