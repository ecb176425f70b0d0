use serde::Serialize;

use super::Record;

/// Why a harvest stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The feed returned an empty page with no next cursor
    ExhaustedFeed,
    /// An item older than the window start was reached
    BelowWindow,
    /// Neither the page hint nor the batch minimum moved the cursor back
    Stalled,
    /// Unbounded mode collected `count_limit` records
    LimitReached,
    /// `max_iterations` pages were fetched
    SafetyLimitReached,
    Transport(String),
    Decode(String),
}

impl TerminationReason {
    /// Expected stops, as opposed to the harvest being cut short by a failure
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            TerminationReason::ExhaustedFeed
                | TerminationReason::BelowWindow
                | TerminationReason::LimitReached
                | TerminationReason::SafetyLimitReached
        )
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::ExhaustedFeed => write!(f, "feed exhausted"),
            TerminationReason::BelowWindow => write!(f, "reached items older than the window"),
            TerminationReason::Stalled => write!(f, "pagination stalled"),
            TerminationReason::LimitReached => write!(f, "count limit reached"),
            TerminationReason::SafetyLimitReached => write!(f, "iteration safety limit reached"),
            TerminationReason::Transport(e) => write!(f, "transport error: {}", e),
            TerminationReason::Decode(e) => write!(f, "decode error: {}", e),
        }
    }
}

/// Everything validly collected, plus the reason collection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestOutcome {
    pub records: Vec<Record>,
    pub reason: TerminationReason,
    pub pages_fetched: u32,
}
