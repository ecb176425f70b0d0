pub mod cursor;
pub mod harvest_service;

pub use cursor::{CursorController, StallError};
pub use harvest_service::{Clock, HarvestService};
