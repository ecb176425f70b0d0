use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

use harvester::config::HarvestConfig;
use harvester::domain::{Cursor, TerminationReason};
use harvester::errors::{HarvestError, HarvestResult};
use harvester::services::HarvestService;
use harvester::sources::{
    BarchartStoryParser, Credential, PageFetcher, PagePayload, SessionProvider,
};
use harvester::storage::JsonArtifactStore;

struct StaticSession;

impl SessionProvider for StaticSession {
    fn obtain_credential(&self, _section: &str) -> HarvestResult<Credential> {
        Ok(Credential("test-token".to_string()))
    }
}

/// Serves canned pages in order and remembers which cursors were asked for
struct ScriptedFetcher {
    pages: RefCell<VecDeque<PagePayload>>,
    requested: RefCell<Vec<Cursor>>,
}

impl ScriptedFetcher {
    fn new(pages: Vec<(String, Option<i64>)>) -> Self {
        let pages = pages
            .into_iter()
            .map(|(raw_content, hint)| PagePayload {
                raw_content,
                next_cursor_hint: hint.map(Cursor::from_secs),
            })
            .collect();
        Self {
            pages: RefCell::new(pages),
            requested: RefCell::new(Vec::new()),
        }
    }

    fn requested(&self) -> Vec<Cursor> {
        self.requested.borrow().clone()
    }
}

impl PageFetcher for ScriptedFetcher {
    fn fetch_page(&self, cursor: Cursor, credential: &Credential) -> HarvestResult<PagePayload> {
        assert_eq!(credential.as_str(), "test-token");
        self.requested.borrow_mut().push(cursor);
        self.pages
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| HarvestError::Transport("no more scripted pages".to_string()))
    }
}

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 12, 12, 0, 0).unwrap()
}

fn config_for(day: &str) -> HarvestConfig {
    let offset = FixedOffset::west_opt(5 * 3600).unwrap();
    let date = NaiveDate::parse_from_str(day, "%Y%m%d").unwrap();
    HarvestConfig::new("all-commodities", offset)
        .with_target_date(Some(date))
        .with_inter_page_delay(Duration::ZERO)
}

fn day_service<S: SessionProvider>(
    session: S,
    fetcher: &ScriptedFetcher,
) -> HarvestService<S, &ScriptedFetcher, BarchartStoryParser> {
    HarvestService::new(session, fetcher, BarchartStoryParser::new(), config_for("20250610"))
        .with_clock(fixed_now)
}

fn story(id: u64, meta: &str) -> String {
    format!(
        r#"<div class="story clearfix">
  <a class="story-link" href="/story/news/{id}/headline-{id}">Headline {id}</a>
  <span class="story-meta show-for-small-up">{meta}</span>
  <p class="story-excerpt">Excerpt for {id}.</p>
</div>"#
    )
}

fn html(stories: &[String]) -> String {
    stories.join("\n")
}

#[test]
fn test_harvests_barchart_pages_for_one_day() {
    let fetcher = ScriptedFetcher::new(vec![
        (
            html(&[
                story(48211300, "Barchart - Wed Jun 11, 1:00AM CDT"),
                story(48211234, "Barchart - Tue Jun 10, 5:00PM CDT"),
                story(48211200, "Associated Press - Tue Jun 10, 3:00PM CDT"),
            ]),
            Some(1749592800),
        ),
        (
            html(&[
                story(48211234, "Barchart - Tue Jun 10, 5:00PM CDT"),
                story(48211000, "Barchart - Tue Jun 10, 12:00AM CDT"),
                story(48210000, "Barchart - Mon Jun 9, 11:00PM CDT"),
            ]),
            Some(1749520000),
        ),
    ]);

    let service = day_service(StaticSession, &fetcher);
    let outcome = service.harvest().unwrap();

    assert_eq!(outcome.reason, TerminationReason::BelowWindow);
    let ids: Vec<&str> = outcome.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["48211234", "48211000"]);

    // Day starts at 2025-06-10T05:00:00Z, so the first cursor is 2025-06-11T05:00:00Z
    assert_eq!(
        fetcher.requested(),
        vec![Cursor::from_secs(1749618000), Cursor::from_secs(1749592800)]
    );

    let first = &outcome.records[0];
    assert_eq!(first.published_at, Utc.with_ymd_and_hms(2025, 6, 10, 22, 0, 0).unwrap());
    assert_eq!(first.url, "https://www.barchart.com/story/news/48211234/headline-48211234");
    assert_eq!(first.summary, "Excerpt for 48211234.");
}

#[test]
fn test_overlapping_pages_render_identically() {
    let a = story(501, "Barchart - Tue Jun 10, 9:00PM CDT");
    let b = story(502, "Barchart - Tue Jun 10, 3:00PM CDT");
    let c = story(503, "Barchart - Tue Jun 10, 8:00AM CDT");
    let old = story(400, "Barchart - Mon Jun 9, 6:00PM CDT");

    let run = |pages: Vec<(String, Option<i64>)>| {
        let fetcher = ScriptedFetcher::new(pages);
        let service = day_service(StaticSession, &fetcher);
        let outcome = service.harvest().unwrap();
        assert_eq!(outcome.reason, TerminationReason::BelowWindow);
        JsonArtifactStore::render(&outcome.records).unwrap()
    };

    let overlapping = run(vec![
        (html(&[a.clone(), b.clone()]), Some(1749600000)),
        (html(&[b.clone(), c.clone()]), Some(1749570000)),
        (html(&[c.clone(), old.clone()]), Some(1749500000)),
    ]);
    let disjoint = run(vec![
        (html(&[a.clone()]), Some(1749600000)),
        (html(&[b.clone(), c.clone(), old.clone()]), Some(1749500000)),
    ]);
    let repeated = run(vec![
        (html(&[a.clone(), b.clone()]), Some(1749600000)),
        (html(&[b, c.clone()]), Some(1749570000)),
        (html(&[c, old]), Some(1749500000)),
    ]);

    assert_eq!(overlapping, disjoint);
    assert_eq!(overlapping, repeated);

    let ids: Vec<serde_json::Value> = serde_json::from_str(&overlapping).unwrap();
    let ids: Vec<&str> = ids.iter().filter_map(|r| r["id"].as_str()).collect();
    assert_eq!(ids, vec!["503", "502", "501"]);
}

#[test]
fn test_cursors_strictly_decrease_and_records_stay_in_window() {
    // Some hints are stale or missing, which forces the batch-minimum fallback
    let fetcher = ScriptedFetcher::new(vec![
        (html(&[story(10, "Barchart - Tue Jun 10, 11:00PM CDT")]), Some(1749700000)),
        (html(&[story(9, "Barchart - Tue Jun 10, 7:00PM CDT")]), Some(1749590000)),
        (html(&[story(8, "Barchart - Tue Jun 10, 1:00PM CDT")]), None),
        (html(&[story(7, "Barchart - Tue Jun 10, 2:00AM CDT")]), Some(1749540000)),
        (String::new(), None),
    ]);

    let service = day_service(StaticSession, &fetcher);
    let window = service.window().unwrap().unwrap();
    let outcome = service.harvest().unwrap();

    assert_eq!(outcome.reason, TerminationReason::ExhaustedFeed);
    assert_eq!(outcome.records.len(), 4);
    assert!(outcome.records.iter().all(|r| window.contains(r.published_at)));

    let requested = fetcher.requested();
    assert_eq!(requested.len(), 5);
    assert!(requested.windows(2).all(|pair| pair[1] < pair[0]));
}

#[test]
fn test_auth_failure_is_an_error() {
    struct RefusingSession;

    impl SessionProvider for RefusingSession {
        fn obtain_credential(&self, section: &str) -> HarvestResult<Credential> {
            Err(HarvestError::Auth(format!("no session for {}", section)))
        }
    }

    let fetcher = ScriptedFetcher::new(Vec::new());
    let service = day_service(RefusingSession, &fetcher);

    assert!(matches!(service.harvest(), Err(HarvestError::Auth(_))));
    assert!(fetcher.requested().is_empty());
}
