//! The backward-pagination harvest loop.
//!
//! One harvest walks a feed from a starting cursor towards older pages,
//! keeping the items that fall inside the target window, until one of the
//! named stopping conditions in [`TerminationReason`] fires. Each phase of
//! the loop is an explicit [`Phase`] so every exit has a reason attached.

use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, info, warn};

use crate::config::HarvestConfig;
use crate::domain::{
    Cursor, HarvestOutcome, RawCandidate, Record, TerminationReason, TimestampNormalizer, Window,
};
use crate::errors::{HarvestError, HarvestResult};
use crate::services::cursor::CursorController;
use crate::sources::traits::{Credential, PageFetcher, PageParser, PagePayload, SessionProvider};
use crate::storage::DedupStore;

/// Source of "now"; swapped out in tests
pub type Clock = fn() -> DateTime<Utc>;

enum Phase {
    Fetching,
    Extracting(PagePayload),
    Filtering {
        candidates: Vec<RawCandidate>,
        hint: Option<Cursor>,
    },
    DecidingNextCursor {
        hint: Option<Cursor>,
        batch_min: Option<DateTime<Utc>>,
    },
    Terminated(TerminationReason),
}

/// Mutable state of a single harvest; never shared between runs
struct HarvestState {
    cursor: CursorController,
    seen: DedupStore,
    collected: Vec<Record>,
    iteration: u32,
    pages_fetched: u32,
}

pub struct HarvestService<S: SessionProvider, F: PageFetcher, P: PageParser> {
    session: S,
    fetcher: F,
    parser: P,
    config: HarvestConfig,
    normalizer: TimestampNormalizer,
    clock: Clock,
}

impl<S: SessionProvider, F: PageFetcher, P: PageParser> HarvestService<S, F, P> {
    pub fn new(session: S, fetcher: F, parser: P, config: HarvestConfig) -> Self {
        let normalizer = TimestampNormalizer::new(config.feed_offset);
        Self {
            session,
            fetcher,
            parser,
            config,
            normalizer,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// The target window, if the harvest is for a specific day
    pub fn window(&self) -> HarvestResult<Option<Window>> {
        self.config
            .target_date
            .map(|date| Window::for_day(date, self.config.feed_offset))
            .transpose()
    }

    /// Obtain a credential, then harvest. Configuration and authentication
    /// failures abort before any page is requested.
    pub fn harvest(&self) -> HarvestResult<HarvestOutcome> {
        self.config.validate()?;
        let credential = self.session.obtain_credential(&self.config.section)?;
        self.harvest_with_credential(&credential)
    }

    /// Harvest with a credential obtained elsewhere.
    ///
    /// Once paging starts, failures end the harvest instead of erroring: the
    /// outcome carries whatever was collected plus the reason it stopped.
    pub fn harvest_with_credential(
        &self,
        credential: &Credential,
    ) -> HarvestResult<HarvestOutcome> {
        self.config.validate()?;

        let window = self.window()?;
        let now = (self.clock)();
        let reference_year = now.with_timezone(&self.config.feed_offset).year();

        let mut state = HarvestState {
            cursor: CursorController::initialize(window.as_ref(), now),
            seen: DedupStore::new(),
            collected: Vec::new(),
            iteration: 1,
            pages_fetched: 0,
        };

        match &window {
            Some(w) => info!(
                section = %self.config.section,
                local_start = %w.start.with_timezone(&self.config.feed_offset),
                local_end = %w.end.with_timezone(&self.config.feed_offset),
                start = %w.start,
                end = %w.end,
                cursor = %state.cursor.current(),
                "Harvesting window"
            ),
            None => info!(
                section = %self.config.section,
                limit = self.config.count_limit,
                cursor = %state.cursor.current(),
                "Harvesting most recent items"
            ),
        }

        let mut phase = Phase::Fetching;
        let reason = loop {
            phase = match phase {
                Phase::Fetching => self.fetch(&mut state, credential),
                Phase::Extracting(page) => self.extract(page),
                Phase::Filtering { candidates, hint } => {
                    self.filter(&mut state, candidates, hint, window.as_ref(), reference_year)
                }
                Phase::DecidingNextCursor { hint, batch_min } => {
                    self.decide_next_cursor(&mut state, hint, batch_min, window.is_some())
                }
                Phase::Terminated(reason) => break reason,
            };
        };

        let records = retain_window(state.collected, window.as_ref());

        if reason.is_success() {
            info!(
                reason = %reason,
                pages = state.pages_fetched,
                count = records.len(),
                "Harvest finished"
            );
        } else {
            warn!(
                reason = %reason,
                pages = state.pages_fetched,
                count = records.len(),
                "Harvest cut short"
            );
        }

        Ok(HarvestOutcome {
            records,
            reason,
            pages_fetched: state.pages_fetched,
        })
    }

    fn fetch(&self, state: &mut HarvestState, credential: &Credential) -> Phase {
        let cursor = state.cursor.current();
        info!(page = state.iteration, cursor = %cursor, "Requesting page");

        state.pages_fetched += 1;
        match self.fetcher.fetch_page(cursor, credential) {
            Ok(page) => Phase::Extracting(page),
            Err(HarvestError::Decode(e)) => Phase::Terminated(TerminationReason::Decode(e)),
            Err(e) => Phase::Terminated(TerminationReason::Transport(e.to_string())),
        }
    }

    fn extract(&self, page: PagePayload) -> Phase {
        let candidates = self.parser.extract(&page.raw_content);

        if candidates.is_empty() && page.next_cursor_hint.is_none() {
            info!("Empty page without a next cursor, no older items");
            return Phase::Terminated(TerminationReason::ExhaustedFeed);
        }

        Phase::Filtering {
            candidates,
            hint: page.next_cursor_hint,
        }
    }

    fn filter(
        &self,
        state: &mut HarvestState,
        candidates: Vec<RawCandidate>,
        hint: Option<Cursor>,
        window: Option<&Window>,
        reference_year: i32,
    ) -> Phase {
        let total = candidates.len();
        let mut added = 0usize;
        let mut batch_min: Option<DateTime<Utc>> = None;

        for candidate in candidates {
            if !self.config.accepts_feed(&candidate.source_feed) {
                debug!(
                    id = %candidate.id,
                    feed = %candidate.source_feed,
                    "Skipping item from another feed"
                );
                continue;
            }

            let published_at = match self
                .normalizer
                .normalize(&candidate.published_raw, reference_year)
            {
                Ok(instant) => instant,
                Err(e) => {
                    warn!(
                        id = %candidate.id,
                        error = %e,
                        "Skipping item with unparseable timestamp"
                    );
                    continue;
                }
            };

            batch_min = Some(batch_min.map_or(published_at, |min| min.min(published_at)));

            if let Some(window) = window {
                if published_at < window.start {
                    info!(
                        id = %candidate.id,
                        published = %candidate.published_raw,
                        at = %published_at,
                        "Reached an item older than the window"
                    );
                    info!(processed = total, added, total = state.collected.len(), "Batch summary");
                    return Phase::Terminated(TerminationReason::BelowWindow);
                }
                if published_at > window.end {
                    debug!(
                        id = %candidate.id,
                        at = %published_at,
                        "Skipping item newer than the window"
                    );
                    continue;
                }
            }

            if state.seen.insert_if_new(&candidate.id) {
                state.collected.push(candidate.into_record(published_at));
                added += 1;
            } else {
                debug!(id = %candidate.id, "Skipping duplicate item");
            }
        }

        info!(processed = total, added, total = state.collected.len(), "Batch summary");
        Phase::DecidingNextCursor { hint, batch_min }
    }

    fn decide_next_cursor(
        &self,
        state: &mut HarvestState,
        hint: Option<Cursor>,
        batch_min: Option<DateTime<Utc>>,
        windowed: bool,
    ) -> Phase {
        let next = match state.cursor.advance(hint, batch_min) {
            Ok(next) => next,
            Err(stall) => {
                warn!(error = %stall, "Cursor did not move backwards");
                return Phase::Terminated(TerminationReason::Stalled);
            }
        };

        if hint != Some(next) {
            debug!(
                hint = ?hint,
                cursor = %next,
                "Using oldest item on the page as the next cursor"
            );
        }

        if !windowed && state.collected.len() >= self.config.count_limit {
            return Phase::Terminated(TerminationReason::LimitReached);
        }
        if state.iteration >= self.config.max_iterations {
            return Phase::Terminated(TerminationReason::SafetyLimitReached);
        }

        state.iteration += 1;
        if !self.config.inter_page_delay.is_zero() {
            std::thread::sleep(self.config.inter_page_delay);
        }
        Phase::Fetching
    }
}

/// Last containment check on everything collected
fn retain_window(records: Vec<Record>, window: Option<&Window>) -> Vec<Record> {
    let Some(window) = window else {
        return records;
    };

    let before = records.len();
    let kept: Vec<Record> = records
        .into_iter()
        .filter(|record| window.contains(record.published_at))
        .collect();

    if kept.len() != before {
        warn!(removed = before - kept.len(), "Final window check removed records");
    }
    kept
}
