// src/runner.rs
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{
    batch::{BatchItem, BatchResult, Failure, HaltReason, Outcome},
    browser::{self, PageDriver},
    config::{NavOptions, RunOptions},
    error::{FailureKind, Result},
    extract::Extractor,
    file::{write_outputs, Written},
    navigate::Navigator,
    progress::Progress,
    record::ActivityRecord,
    request::ActivityRequest,
    specs::PageProfile,
};

/// Lifecycle of one activity within a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityState {
    Pending,
    Navigating,
    Ready,
    Extracting,
    Recorded,
    Failed,
}

impl ActivityState {
    /// Legal transitions. `Failed → Pending` is the bounded retry.
    pub fn can_advance_to(self, next: ActivityState) -> bool {
        use ActivityState::*;
        matches!(
            (self, next),
            (Pending, Navigating)
                | (Pending, Failed)
                | (Navigating, Ready)
                | (Navigating, Failed)
                | (Ready, Extracting)
                | (Extracting, Recorded)
                | (Extracting, Failed)
                | (Failed, Pending)
        )
    }
}

/// Cooperative stop signal, checked between activities only.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self { Self::default() }
    pub fn cancel(&self) { self.0.store(true, Ordering::SeqCst); }
    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::SeqCst) }
}

pub struct Runner<'a> {
    profile: &'a PageProfile,
    nav: &'a NavOptions,
    dump_dir: Option<&'a Path>,
}

impl<'a> Runner<'a> {
    pub fn new(profile: &'a PageProfile, nav: &'a NavOptions) -> Self {
        Self { profile, nav, dump_dir: None }
    }

    /// Save pages that miss a required field into `dir` (`--dump-pages`).
    pub fn dump_pages_to(mut self, dir: &'a Path) -> Self {
        self.dump_dir = Some(dir);
        self
    }

    /// Process `requests` strictly in order on one page.
    ///
    /// The result always has one item per request. Once the session is lost or
    /// the run is cancelled, the remaining items are `Failed(Cancelled)` and
    /// `halted` says why.
    pub async fn run<P>(
        &self,
        page: &P,
        requests: &[ActivityRequest],
        progress: &mut dyn Progress,
        cancel: &CancelToken,
    ) -> BatchResult
    where
        P: PageDriver + ?Sized,
    {
        progress.begin(requests.len());
        let mut batch = BatchResult { items: Vec::with_capacity(requests.len()), halted: None };

        for (index, req) in requests.iter().enumerate() {
            if batch.halted.is_none() && cancel.is_cancelled() {
                logw!("cancelled; {} activities left unattempted", requests.len() - index);
                progress.log("Cancelled.");
                batch.halted = Some(HaltReason::Cancelled);
            }
            if let Some(reason) = batch.halted {
                batch.items.push(BatchItem {
                    request: req.clone(),
                    outcome: Outcome::Failed(Failure::cancelled(reason)),
                    attempts: 0,
                });
                continue;
            }

            progress.item_started(index, req);
            let item = self.process(page, index, req, progress).await;
            match &item.outcome {
                Outcome::Recorded(_) => progress.item_done(index, req),
                Outcome::Failed(f) => {
                    progress.item_failed(index, req, f);
                    if f.kind.halts_batch() {
                        loge!("activity {:?}: {}; stopping the run", req.id(), f.message);
                        batch.halted = Some(match f.kind {
                            FailureKind::LoggedOut => HaltReason::LoggedOut,
                            _ => HaltReason::Disconnected,
                        });
                    }
                }
            }
            batch.items.push(item);
        }

        progress.finish();
        batch
    }

    async fn process<P>(
        &self,
        page: &P,
        index: usize,
        req: &ActivityRequest,
        progress: &mut dyn Progress,
    ) -> BatchItem
    where
        P: PageDriver + ?Sized,
    {
        let done = |outcome, attempts| BatchItem { request: req.clone(), outcome, attempts };

        if let Err(e) = req.validate() {
            logw!("skipping request #{}: {e}", index + 1);
            return done(Outcome::Failed(Failure::new(e.failure_kind(), e.to_string())), 0);
        }

        let mut state = ActivityState::Pending;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.attempt(page, req, &mut state).await {
                Ok(record) => return done(Outcome::Recorded(record), attempts),
                Err(e) => {
                    advance(req, &mut state, ActivityState::Failed);
                    let failure = Failure::new(e.failure_kind(), e.to_string());
                    if failure.kind.is_transient() && attempts <= self.nav.retries {
                        logw!("activity {}: {} (attempt {}/{}), retrying",
                            req.id(), failure.message, attempts, self.nav.retries + 1);
                        progress.item_retry(index, attempts, &failure);
                        advance(req, &mut state, ActivityState::Pending);
                        continue;
                    }
                    logw!("activity {}: {}", req.id(), failure.message);
                    return done(Outcome::Failed(failure), attempts);
                }
            }
        }
    }

    async fn attempt<P>(&self, page: &P, req: &ActivityRequest, state: &mut ActivityState) -> Result<ActivityRecord>
    where
        P: PageDriver + ?Sized,
    {
        advance(req, state, ActivityState::Navigating);
        let ready = Navigator::new(self.profile, self.nav).navigate(page, req).await?;
        advance(req, state, ActivityState::Ready);
        logd!("activity {}: {} rendered in {:?}", req.id(), ready.url, ready.elapsed);

        advance(req, state, ActivityState::Extracting);
        let record = Extractor::new(self.profile)
            .dump_pages_to(self.dump_dir)
            .extract(page, req)
            .await?;
        advance(req, state, ActivityState::Recorded);
        Ok(record)
    }
}

fn advance(req: &ActivityRequest, state: &mut ActivityState, next: ActivityState) {
    debug_assert!(state.can_advance_to(next), "illegal transition {state:?} -> {next:?}");
    ::tracing::trace!(id = req.id(), from = ?state, to = ?next, "activity state");
    *state = next;
}

/* ---------------- Full pipeline ---------------- */

/// Everything one invocation produced.
pub struct RunReport {
    pub batch: BatchResult,
    pub written: Written,
}

/// Attach, process every request, detach, write outputs.
///
/// Session-level failures (no browser, no page, bad profile) return `Err`
/// before anything is written.
pub async fn scrape(
    opts: &RunOptions,
    requests: &[ActivityRequest],
    progress: &mut dyn Progress,
    cancel: &CancelToken,
) -> Result<RunReport> {
    let profile = PageProfile::resolve(opts.profile.as_deref())?;
    logd!("page profile {} v{}", profile.name, profile.version);

    let batch = if requests.is_empty() {
        logw!("no activities requested");
        BatchResult::default()
    } else {
        let session = browser::connect(&opts.endpoint, &profile).await?;
        let mut runner = Runner::new(&profile, &opts.nav);
        if opts.export.dump_pages {
            runner = runner.dump_pages_to(&opts.export.out_dir);
        }
        let batch = runner.run(&session, requests, progress, cancel).await;
        session.detach().await;
        batch
    };

    let summary = batch.summary();
    logf!("{summary}");

    let written = write_outputs(&opts.export, &batch).map_err(|e| {
        loge!("writing outputs failed: {e}");
        e
    })?;
    Ok(RunReport { batch, written })
}
