//! # ordertally
//!
//! Turn a lazily-loaded food-delivery order history into a spend report.
//!
//! ## Why this crate?
//!
//! Order-history pages only show a few entries at a time and load the rest
//! as you scroll (or click "Show more"). There is no API, no structured
//! markup to rely on, and no signal that the last page has arrived. This
//! crate drains the page by watching its extent stop changing, flattens it
//! into visible lines, and recovers orders from the line layout alone:
//! a date header, a vendor name somewhere above the price, a price, and
//! possibly a refund marker right after it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! LineSource
//!  │
//!  ├─ 1. Exhaust    scroll / click "show more" until the extent settles
//!  ├─ 2. Classify   date header? price? refund marker?
//!  ├─ 3. Parse      single pass → TransactionRecord per kept price line
//!  ├─ 4. Aggregate  total, count, per-vendor sums, top 3, largest order
//!  ├─ 5. Render     typed report blocks, page text escaped once
//!  └─ 6. Publish    job state scanning → complete for observers
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ordertally::{load_fixture, scan, ScanConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut page = load_fixture("orders.txt").await?;
//!     let output = scan(&mut page, &ScanConfig::default()).await;
//!     println!("{}", output.report.to_html());
//!     eprintln!("{} orders, total {}",
//!         output.aggregate.order_count,
//!         output.aggregate.total_spend);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ordertally` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! ordertally = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod fixture;
pub mod job;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod scan;
pub mod source;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ScanConfig, ScanConfigBuilder, UNKNOWN_DATE, UNKNOWN_STORE};
pub use error::OrderTallyError;
pub use fixture::{load_fixture, parse_fixture, FixtureControl, FixturePage, PagedLineSource, Reveal};
pub use job::{FileJobStore, JobRunner, JobState, JobStatus, JobStore, JobUpdate, MemoryJobStore, TargetId};
pub use output::{AggregateResult, ScanOutput, ScanStats, TransactionRecord, VendorTotal};
pub use pipeline::exhaust::{ExhaustionOutcome, ExhaustionReason};
pub use pipeline::render::{Report, ReportBlock, SafeText, VendorRow};
pub use progress::{NoopProgressCallback, ProgressCallback, ScanProgressCallback};
pub use scan::{scan, scan_lines, scan_sync, scan_text, write_report};
pub use source::{flatten_lines, lines_from, Line, LineSource, StaticLineSource};
pub use stream::{observe_target, watch_target, JobStateStream};
