//! Progress reporting for a fetch run.
//!
//! The aggregator reports one unit of progress per `(area, month)` unit,
//! whether it came from the cache or the network. Rendering lives in the
//! CLI; this crate only knows the [`ProgressCallback`] trait.

/// Receives progress updates from the aggregator.
///
/// Shared across concurrent fetches, so implementations must be
/// `Send + Sync`.
pub trait ProgressCallback: Send + Sync {
    /// Total units of work in the run.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Short status text, e.g. the area currently being fetched.
    fn set_message(&self, msg: String);

    /// Mark the run complete with a summary line.
    fn finish(&self, msg: String);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}
