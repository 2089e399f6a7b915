//! Progress-callback trait for per-record generation events.
//!
//! Inject an [`Arc<dyn LayoutProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to receive
//! events as the layout engine places each record, plus the human-readable
//! [`Status`] messages the boundary layer would otherwise only log.
//!
//! Callbacks are an observational side channel: nothing they do can change
//! the result of the run.
//!
//! # Example
//!
//! ```rust
//! use roster_qr::{LayoutProgressCallback, GenerationConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     placed: Arc<AtomicUsize>,
//! }
//!
//! impl LayoutProgressCallback for CountingCallback {
//!     fn on_record_complete(&self, index: usize, total: usize) {
//!         let done = self.placed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("placed {}/{} (record #{})", done, total, index);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     placed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = GenerationConfig::builder()
//!     .progress_callback(counter as Arc<dyn LayoutProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::session::Status;
use std::sync::Arc;

/// Called by the layout engine as it processes each record.
///
/// Implementations must be `Send + Sync` so the callback can be moved into
/// spawned tasks together with the config. All methods have default no-op
/// implementations so callers only override what they care about.
pub trait LayoutProgressCallback: Send + Sync {
    /// Called once before the first symbol is requested.
    fn on_layout_start(&self, total_records: usize) {
        let _ = total_records;
    }

    /// Called just before the symbol for a record is requested.
    ///
    /// # Arguments
    /// * `index`: 0-based record index
    /// * `total`: number of records in the run
    /// * `name` : display name of the record
    fn on_record_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called after the symbol and both labels of a record were placed.
    fn on_record_complete(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called once when the run aborts. No document is produced afterwards.
    fn on_layout_error(&self, index: usize, total: usize, error: String) {
        let _ = (index, total, error);
    }

    /// Called once after the document has been finalised.
    fn on_layout_complete(&self, total_records: usize, page_count: usize) {
        let _ = (total_records, page_count);
    }

    /// Called for every operator-facing status message.
    fn on_status(&self, status: &Status) {
        let _ = status;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl LayoutProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn LayoutProgressCallback>;
