pub mod cursor;
pub mod outcome;
pub mod record;
pub mod timestamp;
pub mod window;

pub use cursor::Cursor;
pub use outcome::{HarvestOutcome, TerminationReason};
pub use record::{RawCandidate, Record};
pub use timestamp::TimestampNormalizer;
pub use window::Window;
