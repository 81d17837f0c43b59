// tests/pipeline.rs
//
// Batch runs against a scripted in-memory page. The mock answers the
// navigator's readiness probe and the extractor's outerHTML read the way a
// rendered Garmin Connect tab would.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value as Json};

use gc_scrape::batch::{BatchResult, Failure, HaltReason, Outcome};
use gc_scrape::browser::PageDriver;
use gc_scrape::config::NavOptions;
use gc_scrape::progress::{NullProgress, Progress};
use gc_scrape::record::Value;
use gc_scrape::request::ActivityRequest;
use gc_scrape::runner::{CancelToken, Runner};
use gc_scrape::specs::PageProfile;
use gc_scrape::{FailureKind, Result};

const STRENGTH: &str = include_str!("fixtures/strength.html");
const RUN: &str = include_str!("fixtures/run.html");
const NAMELESS: &str = include_str!("fixtures/nameless.html");

#[derive(Clone)]
enum Behavior {
    Page(&'static str),
    NeverReady,
    NotFound,
    SignIn,
    /// Stays loading for the first `n` navigations, then renders.
    SlowThen(u32, &'static str),
}

struct MockPage {
    site: HashMap<String, Behavior>,
    current: Mutex<String>,
    navigations: Mutex<Vec<String>>,
    /// Navigation requests are accepted but the tab never leaves `current`.
    frozen: bool,
}

impl MockPage {
    fn new(site: &[(&str, Behavior)]) -> Self {
        Self {
            site: site.iter().map(|(id, b)| (id.to_string(), b.clone())).collect(),
            current: Mutex::new(String::from("https://connect.garmin.com/modern/")),
            navigations: Mutex::new(Vec::new()),
            frozen: false,
        }
    }

    fn stuck_at(mut self, url: &str) -> Self {
        *self.current.get_mut().unwrap() = url.to_string();
        self.frozen = true;
        self
    }

    fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    fn visits(&self, id: &str) -> u32 {
        self.navigations().iter().filter(|u| u.ends_with(&format!("/{id}"))).count() as u32
    }

    fn current_id(&self) -> String {
        let url = self.current.lock().unwrap().clone();
        url.rsplit('/').next().unwrap_or_default().to_string()
    }

    fn behavior(&self) -> Option<Behavior> {
        self.site.get(&self.current_id()).cloned()
    }

    fn probe(&self) -> Json {
        let href = self.current.lock().unwrap().clone();
        let state = match self.behavior() {
            Some(Behavior::Page(_)) => "ready",
            Some(Behavior::SlowThen(n, _)) if self.visits(&self.current_id()) > n => "ready",
            Some(Behavior::SlowThen(..)) | Some(Behavior::NeverReady) => "loading",
            Some(Behavior::NotFound) | None => "not_found",
            Some(Behavior::SignIn) => {
                return json!({ "state": "signin", "href": "https://sso.garmin.com/sso/signin" });
            }
        };
        json!({ "state": state, "href": href })
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.navigations.lock().unwrap().push(url.to_string());
        if !self.frozen {
            *self.current.lock().unwrap() = url.to_string();
        }
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Json> {
        match expression {
            "location.href" => Ok(json!(self.current.lock().unwrap().clone())),
            "document.documentElement.outerHTML" => Ok(match self.behavior() {
                Some(Behavior::Page(html)) | Some(Behavior::SlowThen(_, html)) => json!(html),
                _ => json!("<html><body></body></html>"),
            }),
            _ => Ok(self.probe()),
        }
    }
}

#[derive(Default)]
struct Recorder {
    started: Vec<String>,
    retries: Vec<(usize, u32)>,
    done: usize,
    failed: usize,
    finished: bool,
}

impl Progress for Recorder {
    fn item_started(&mut self, _index: usize, req: &ActivityRequest) {
        self.started.push(req.id().to_string());
    }
    fn item_retry(&mut self, index: usize, attempt: u32, _failure: &Failure) {
        self.retries.push((index, attempt));
    }
    fn item_done(&mut self, _index: usize, _req: &ActivityRequest) {
        self.done += 1;
    }
    fn item_failed(&mut self, _index: usize, _req: &ActivityRequest, _failure: &Failure) {
        self.failed += 1;
    }
    fn finish(&mut self) {
        self.finished = true;
    }
}

fn fast_nav(retries: u32) -> NavOptions {
    NavOptions {
        timeout: Duration::from_millis(60),
        poll_interval: Duration::from_millis(5),
        retries,
    }
}

fn req(id: &str) -> ActivityRequest {
    ActivityRequest::new(id, None)
}

async fn run(page: &MockPage, requests: &[ActivityRequest], nav: &NavOptions) -> BatchResult {
    let profile = PageProfile::builtin().unwrap();
    Runner::new(&profile, nav)
        .run(page, requests, &mut NullProgress, &CancelToken::new())
        .await
}

fn kind(outcome: &Outcome) -> Option<FailureKind> {
    match outcome {
        Outcome::Failed(f) => Some(f.kind),
        Outcome::Recorded(_) => None,
    }
}

#[tokio::test]
async fn mixed_batch_keeps_order_and_isolates_failures() {
    let page = MockPage::new(&[("12345", Behavior::Page(STRENGTH)), ("99999", Behavior::NotFound)]);
    let requests = vec![
        ActivityRequest::new("12345", NaiveDate::from_ymd_opt(2024, 1, 10)),
        req(""),
        req("99999"),
    ];

    let batch = run(&page, &requests, &fast_nav(2)).await;

    assert_eq!(batch.items.len(), 3);
    assert!(batch.halted.is_none());
    let ids: Vec<&str> = batch.items.iter().map(|i| i.request.id()).collect();
    assert_eq!(ids, vec!["12345", "", "99999"]);

    let rec = batch.items[0].record().expect("first activity recorded");
    assert_eq!(rec.id(), "12345");
    assert_eq!(rec.get("date"), Some(&Value::Text("2024-01-10".into())));
    assert_eq!(kind(&batch.items[1].outcome), Some(FailureKind::InvalidRequest));
    assert_eq!(kind(&batch.items[2].outcome), Some(FailureKind::ActivityNotFound));

    // the empty id never reached the page; not-found is not retried
    assert_eq!(page.navigations().len(), 2);
    assert_eq!(batch.items[1].attempts, 0);
    assert_eq!(batch.items[2].attempts, 1);
}

#[tokio::test]
async fn strength_page_yields_normalized_fields_and_sets() {
    let page = MockPage::new(&[("1", Behavior::Page(STRENGTH))]);
    let batch = run(&page, &[req("1")], &fast_nav(0)).await;
    let rec = batch.items[0].record().unwrap();

    assert_eq!(rec.get("activity_name"), Some(&Value::Text("Leg Day".into())));
    assert_eq!(rec.get("activity_type"), Some(&Value::Text("strength_training".into())));
    assert_eq!(rec.get("duration_sec"), Some(&Value::Duration(2710.0)));
    assert_eq!(rec.get("avg_hr"), Some(&Value::Number(112.0)));
    assert_eq!(rec.get("calories"), Some(&Value::Number(1234.0)));
    assert_eq!(rec.get("distance"), Some(&Value::Empty));

    assert_eq!(rec.sets().len(), 3);
    assert_eq!(rec.sets()[2].weight, "Bodyweight");
    assert_eq!(rec.get("total_sets"), Some(&Value::Number(3.0)));
    assert_eq!(rec.get("total_reps"), Some(&Value::Number(18.0)));
    assert_eq!(rec.get("total_volume"), Some(&Value::Number(1000.0)));
}

#[tokio::test]
async fn cardio_page_has_no_sets() {
    let page = MockPage::new(&[("2", Behavior::Page(RUN))]);
    let batch = run(&page, &[req("2")], &fast_nav(0)).await;
    let rec = batch.items[0].record().unwrap();

    assert_eq!(rec.get("distance"), Some(&Value::Number(5.2)));
    assert_eq!(rec.get("avg_pace_sec"), Some(&Value::Duration(330.0)));
    assert_eq!(rec.get("avg_hr"), Some(&Value::Number(148.0)));
    assert!(rec.sets().is_empty());
    assert_eq!(rec.get("total_sets"), None);
}

#[tokio::test]
async fn never_ready_page_times_out_after_all_attempts() {
    let page = MockPage::new(&[("7", Behavior::NeverReady), ("8", Behavior::Page(RUN))]);
    let profile = PageProfile::builtin().unwrap();
    let nav = fast_nav(2);
    let mut progress = Recorder::default();

    let batch = Runner::new(&profile, &nav)
        .run(&page, &[req("7"), req("8")], &mut progress, &CancelToken::new())
        .await;

    assert_eq!(batch.items.len(), 2);
    assert_eq!(kind(&batch.items[0].outcome), Some(FailureKind::NavigationTimeout));
    assert_eq!(batch.items[0].attempts, 3);
    assert_eq!(page.visits("7"), 3);
    assert_eq!(progress.retries, vec![(0, 1), (0, 2)]);

    // the run carries on past the timeout
    assert!(batch.items[1].record().is_some());
    assert_eq!(progress.started, vec!["7", "8"]);
    assert_eq!((progress.done, progress.failed), (1, 1));
    assert!(progress.finished);
}

#[tokio::test]
async fn slow_page_recovers_on_retry() {
    let page = MockPage::new(&[("5", Behavior::SlowThen(1, RUN))]);
    let batch = run(&page, &[req("5")], &fast_nav(2)).await;
    assert!(batch.items[0].record().is_some());
    assert_eq!(batch.items[0].attempts, 2);
}

#[tokio::test]
async fn missing_required_field_is_terminal() {
    let page = MockPage::new(&[("6", Behavior::Page(NAMELESS))]);
    let batch = run(&page, &[req("6")], &fast_nav(2)).await;
    assert_eq!(kind(&batch.items[0].outcome), Some(FailureKind::ExtractionIncomplete));
    assert_eq!(batch.items[0].attempts, 1);
}

#[tokio::test]
async fn duplicates_are_processed_independently() {
    let page = MockPage::new(&[("1", Behavior::Page(RUN))]);
    let batch = run(&page, &[req("1"), req("1")], &fast_nav(0)).await;
    assert_eq!(batch.records().count(), 2);
    assert_eq!(page.visits("1"), 2);
}

#[tokio::test]
async fn logged_out_session_halts_the_rest() {
    let page = MockPage::new(&[
        ("1", Behavior::Page(RUN)),
        ("2", Behavior::SignIn),
        ("3", Behavior::Page(RUN)),
    ]);
    let batch = run(&page, &[req("1"), req("2"), req("3")], &fast_nav(2)).await;

    assert_eq!(batch.items.len(), 3);
    assert_eq!(batch.halted, Some(HaltReason::LoggedOut));
    assert!(batch.items[0].record().is_some());
    assert_eq!(kind(&batch.items[1].outcome), Some(FailureKind::LoggedOut));
    assert_eq!(kind(&batch.items[2].outcome), Some(FailureKind::Cancelled));
    assert_eq!(page.visits("3"), 0);
}

#[tokio::test]
async fn cancelled_run_still_reports_every_request() {
    let page = MockPage::new(&[("1", Behavior::Page(RUN))]);
    let profile = PageProfile::builtin().unwrap();
    let nav = fast_nav(0);
    let cancel = CancelToken::new();
    cancel.cancel();

    let batch = Runner::new(&profile, &nav)
        .run(&page, &[req("1"), req("2")], &mut NullProgress, &cancel)
        .await;

    assert_eq!(batch.items.len(), 2);
    assert_eq!(batch.halted, Some(HaltReason::Cancelled));
    assert!(batch.items.iter().all(|i| kind(&i.outcome) == Some(FailureKind::Cancelled)));
    assert!(page.navigations().is_empty());
}

#[tokio::test]
async fn same_page_same_records() {
    let page = MockPage::new(&[("1", Behavior::Page(STRENGTH)), ("2", Behavior::Page(RUN))]);
    let requests = [req("1"), req("2")];
    let first = run(&page, &requests, &fast_nav(0)).await;
    let second = run(&page, &requests, &fast_nav(0)).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn previous_activity_still_on_screen_is_not_taken_for_the_request() {
    // 1234 is a prefix of the id whose page is still showing
    let page = MockPage::new(&[("12345", Behavior::Page(STRENGTH)), ("1234", Behavior::Page(RUN))])
        .stuck_at("https://connect.garmin.com/modern/activity/12345");
    let batch = run(&page, &[req("1234")], &fast_nav(0)).await;

    assert_eq!(kind(&batch.items[0].outcome), Some(FailureKind::NavigationTimeout));
    assert!(batch.records().next().is_none());
    assert_eq!(page.navigations(), vec!["https://connect.garmin.com/modern/activity/1234"]);
}

#[tokio::test]
async fn not_found_marker_of_another_activity_is_ignored() {
    let page = MockPage::new(&[("99999", Behavior::NotFound)])
        .stuck_at("https://connect.garmin.com/modern/activity/99999");
    let batch = run(&page, &[req("9999")], &fast_nav(0)).await;
    assert_eq!(kind(&batch.items[0].outcome), Some(FailureKind::NavigationTimeout));
}

#[tokio::test]
async fn page_missing_a_required_field_is_saved_when_asked() {
    let tmp = tempfile::tempdir().unwrap();
    let page = MockPage::new(&[("6", Behavior::Page(NAMELESS)), ("2", Behavior::Page(RUN))]);
    let profile = PageProfile::builtin().unwrap();
    let nav = fast_nav(0);

    let batch = Runner::new(&profile, &nav)
        .dump_pages_to(tmp.path())
        .run(&page, &[req("6"), req("2")], &mut NullProgress, &CancelToken::new())
        .await;

    assert_eq!(kind(&batch.items[0].outcome), Some(FailureKind::ExtractionIncomplete));
    let saved = tmp.path().join("garmin_page_6.html");
    assert_eq!(std::fs::read_to_string(&saved).unwrap(), NAMELESS);
    // recorded pages are not kept
    assert!(batch.items[1].record().is_some());
    assert!(!tmp.path().join("garmin_page_2.html").exists());
}
