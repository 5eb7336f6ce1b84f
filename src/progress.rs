//! Progress-callback trait for scan events.
//!
//! Inject an [`Arc<dyn ScanProgressCallback>`] via
//! [`crate::config::ScanConfigBuilder::progress_callback`] to receive events
//! while the exhaustion driver keeps asking the document to grow, and once
//! the parse and aggregate stages finish.
//!
//! Draining a slow page can take a while (up to two seconds per round with
//! the default polling settings), so a frontend usually wants something to
//! show. Callers can forward events to a terminal spinner, a channel, or a
//! log without the library knowing how the host communicates.
//!
//! # Example
//!
//! ```rust
//! use ordertally::{ScanConfig, ScanProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct GrowthCounter {
//!     grown: AtomicUsize,
//! }
//!
//! impl ScanProgressCallback for GrowthCounter {
//!     fn on_round(&self, _attempt: usize, _extent: u64, grew: bool) {
//!         if grew {
//!             self.grown.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let counter = Arc::new(GrowthCounter { grown: AtomicUsize::new(0) });
//!
//! let config = ScanConfig::builder()
//!     .progress_callback(counter as Arc<dyn ScanProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::exhaust::ExhaustionOutcome;
use std::sync::Arc;

/// Called by the scan pipeline as it drives and then parses a document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ScanProgressCallback: Send + Sync {
    /// Called once before the first scroll request.
    ///
    /// # Arguments
    /// * `max_attempts` — the hard cap on outer rounds for this scan
    fn on_scan_start(&self, max_attempts: usize) {
        let _ = max_attempts;
    }

    /// Called after every outer round of the exhaustion driver.
    ///
    /// # Arguments
    /// * `attempt` — 1-indexed round number
    /// * `extent`  — document extent after the round
    /// * `grew`    — whether the extent changed during this round
    fn on_round(&self, attempt: usize, extent: u64, grew: bool) {
        let _ = (attempt, extent, grew);
    }

    /// Called when a "show more" / "view more" control was clicked.
    fn on_load_more(&self, attempt: usize) {
        let _ = attempt;
    }

    /// Called once when the driver stops asking for more content.
    fn on_exhausted(&self, outcome: &ExhaustionOutcome) {
        let _ = outcome;
    }

    /// Called once the final line sequence has been parsed and aggregated.
    ///
    /// # Arguments
    /// * `line_count`  — lines in the fully-materialised document
    /// * `order_count` — transaction records kept after filtering
    fn on_scan_complete(&self, line_count: usize, order_count: usize) {
        let _ = (line_count, order_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ScanProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ScanConfig`].
pub type ProgressCallback = Arc<dyn ScanProgressCallback>;
