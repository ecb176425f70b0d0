use std::path::PathBuf;

use chrono::NaiveDate;

use crate::domain::Record;
use crate::errors::HarvestResult;

#[cfg_attr(test, mockall::automock)]
pub trait ArtifactStore {
    /// Persist one harvest for a (date, section) pair, returning where it went.
    /// An empty harvest writes nothing and returns `None`.
    fn save(
        &self,
        date: NaiveDate,
        section: &str,
        records: &[Record],
    ) -> HarvestResult<Option<PathBuf>>;
}
