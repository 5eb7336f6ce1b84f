//! Eager scan entry points.
//!
//! [`scan`] drives a [`LineSource`] until it stops growing, then parses,
//! aggregates and renders in one synchronous pass over the final lines.
//! [`scan_lines`] skips the driving for callers that already hold the full
//! text (a saved dump, a test fixture).

use crate::config::ScanConfig;
use crate::error::OrderTallyError;
use crate::output::{ScanOutput, ScanStats};
use crate::pipeline::{aggregate, exhaust, parse, render};
use crate::source::{flatten_lines, LineSource};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Scan a live (or replayed) document.
///
/// Never fails: an unrecognised line is skipped, and a document that keeps
/// growing past the attempt cap is analysed as far as it loaded.
///
/// # Example
/// ```rust
/// use ordertally::{scan, ScanConfig, StaticLineSource};
///
/// # #[tokio::main(flavor = "current_thread", start_paused = true)]
/// # async fn main() {
/// let mut page = StaticLineSource::from_text("Jan 5\nTaco Place\nCompleted\n$12.50");
/// let output = scan(&mut page, &ScanConfig::default()).await;
/// assert_eq!(output.aggregate.order_count, 1);
/// # }
/// ```
pub async fn scan<S: LineSource>(source: &mut S, config: &ScanConfig) -> ScanOutput {
    let drive_start = Instant::now();
    info!("Starting scan (cap {} rounds)", config.max_attempts);

    // ── Step 1: Drain the document ───────────────────────────────────────
    let outcome = exhaust::drive(source, config).await;
    let drive_duration_ms = drive_start.elapsed().as_millis() as u64;

    // ── Step 2: Analyse the final line sequence ──────────────────────────
    let lines = source.current_lines();
    let mut output = analyse(&lines, config);
    output.stats.exhaustion = Some(outcome);
    output.stats.drive_duration_ms = drive_duration_ms;

    info!(
        "Scan complete: {} orders from {} lines, {}ms total",
        output.aggregate.order_count,
        output.stats.line_count,
        drive_duration_ms + output.stats.analyse_duration_ms
    );
    output
}

/// Parse, aggregate and render a fixed line sequence.
pub fn scan_lines<S: AsRef<str>>(lines: &[S], config: &ScanConfig) -> ScanOutput {
    analyse(lines, config)
}

/// Flatten a text dump and analyse it.
pub fn scan_text(text: &str, config: &ScanConfig) -> ScanOutput {
    analyse(&flatten_lines(text), config)
}

/// Synchronous wrapper around [`scan`].
///
/// Creates a temporary tokio runtime internally.
pub fn scan_sync<S: LineSource>(source: &mut S, config: &ScanConfig) -> Result<ScanOutput, OrderTallyError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| OrderTallyError::Internal(format!("Failed to create tokio runtime: {}", e)))?;
    Ok(rt.block_on(scan(source, config)))
}

/// Write the HTML report to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_report(output: &ScanOutput, path: impl AsRef<Path>) -> Result<(), OrderTallyError> {
    let path = path.as_ref();
    let write_err = |e| OrderTallyError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let tmp_path = path.with_extension("html.tmp");
    tokio::fs::write(&tmp_path, output.report.to_html())
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn analyse<S: AsRef<str>>(lines: &[S], config: &ScanConfig) -> ScanOutput {
    let start = Instant::now();

    let parsed = parse::parse_summary(lines, config.header_max_len);
    let aggregate = aggregate::aggregate(&parsed.records, config.top_vendors);
    let report = render::render(&aggregate);
    debug!(
        "Analysed {} lines: {} price lines, {} refunded, {} kept",
        lines.len(),
        parsed.price_lines,
        parsed.refunded,
        parsed.records.len()
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_scan_complete(lines.len(), aggregate.order_count);
    }

    let stats = ScanStats {
        line_count: lines.len(),
        price_lines: parsed.price_lines,
        records: parsed.records.len(),
        exhaustion: None,
        drive_duration_ms: 0,
        analyse_duration_ms: start.elapsed().as_millis() as u64,
    };

    ScanOutput {
        records: parsed.records,
        aggregate,
        report,
        stats,
    }
}
