// src/progress.rs
use crate::batch::Failure;
use crate::request::ActivityRequest;

/// Lightweight progress reporting for a batch run.
/// Frontends implement this to surface status to users; every hook is optional.
pub trait Progress {
    /// Called at the start with the number of requests.
    fn begin(&mut self, _total: usize) {}

    /// Free-form status line for human eyes.
    fn log(&mut self, _msg: &str) {}

    /// An item (0-based `index`) is about to be navigated.
    fn item_started(&mut self, _index: usize, _req: &ActivityRequest) {}

    /// A transient failure; the item will be tried again.
    fn item_retry(&mut self, _index: usize, _attempt: u32, _failure: &Failure) {}

    fn item_done(&mut self, _index: usize, _req: &ActivityRequest) {}

    fn item_failed(&mut self, _index: usize, _req: &ActivityRequest, _failure: &Failure) {}

    /// Called at the end, successful or not.
    fn finish(&mut self) {}
}

/// A no-op progress sink.
pub struct NullProgress;
impl Progress for NullProgress {}
