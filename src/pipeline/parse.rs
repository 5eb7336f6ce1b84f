//! Transaction parsing: turn the flat line sequence into purchase records.
//!
//! The order page has no schema. A typical entry flattens to
//!
//! ```text
//! Jan 5            ← date header, scopes everything below it
//! Taco Place       ← vendor
//! Completed        ← status
//! $12.50 • 2 items ← price line
//! ```
//!
//! but status lines, thumbnails' alt text and refund notes come and go.
//! The parser makes one left-to-right pass. It keeps the current date
//! header in scope and, for each price line, checks two lines ahead for
//! refund vocabulary and looks back for the vendor.

use crate::config::{UNKNOWN_DATE, UNKNOWN_STORE};
use crate::output::TransactionRecord;
use crate::pipeline::classify::{extract_price, is_date_header, is_refund_marker, looks_like_date};
use rust_decimal::Decimal;
use tracing::debug;

/// Status line that sits between the vendor and the price.
const STATUS_COMPLETED: &str = "Completed";

/// Lines this short (badges, bullets, initials) are never vendor names.
const MIN_VENDOR_LEN: usize = 3;

/// Lines after a price line that can still mark it refunded.
const REFUND_LOOKAHEAD: usize = 2;

/// Parse summary with the counters the scan statistics need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseSummary {
    pub records: Vec<TransactionRecord>,
    /// Lines that carried a price token.
    pub price_lines: usize,
    /// Price lines dropped because of refund or cancellation vocabulary.
    pub refunded: usize,
}

/// Parse lines into transaction records, in document order.
///
/// `header_max_len` is the exclusive length bound for date headers
/// (see [`crate::config::ScanConfig::header_max_len`]).
pub fn parse_transactions<S: AsRef<str>>(lines: &[S], header_max_len: usize) -> Vec<TransactionRecord> {
    parse_summary(lines, header_max_len).records
}

/// Like [`parse_transactions`], also counting price lines and refunds.
pub fn parse_summary<S: AsRef<str>>(lines: &[S], header_max_len: usize) -> ParseSummary {
    let mut summary = ParseSummary::default();
    let mut current_date = UNKNOWN_DATE;

    for (i, line) in lines.iter().enumerate() {
        let line = line.as_ref();

        if is_date_header(line, header_max_len) {
            current_date = line;
            continue;
        }

        let Some(amount) = extract_price(line) else {
            continue;
        };
        summary.price_lines += 1;

        if is_refund_tainted(lines, i) {
            summary.refunded += 1;
            debug!("Line {}: price {} dropped as refunded", i, amount);
            continue;
        }

        if amount <= Decimal::ZERO {
            continue;
        }

        summary.records.push(TransactionRecord {
            vendor_name: resolve_vendor(lines, i).to_string(),
            amount,
            date: current_date.to_string(),
            line_index: i,
        });
    }

    debug!(
        "Parsed {} records from {} price lines ({} refunded)",
        summary.records.len(),
        summary.price_lines,
        summary.refunded
    );
    summary
}

/// The price line itself or either of the next two lines mentions a refund.
fn is_refund_tainted<S: AsRef<str>>(lines: &[S], i: usize) -> bool {
    lines
        .iter()
        .skip(i)
        .take(REFUND_LOOKAHEAD + 1)
        .any(|l| is_refund_marker(l.as_ref()))
}

/// Nearest preceding line that can be a vendor name.
///
/// Skips date-like lines, the `Completed` status and very short lines. The
/// scan has no lookback bound.
fn resolve_vendor<S: AsRef<str>>(lines: &[S], i: usize) -> &str {
    lines[..i]
        .iter()
        .rev()
        .map(|l| l.as_ref())
        .find(|prev| is_vendor_candidate(prev))
        .unwrap_or(UNKNOWN_STORE)
}

fn is_vendor_candidate(line: &str) -> bool {
    !looks_like_date(line) && line != STATUS_COMPLETED && line.chars().count() >= MIN_VENDOR_LEN
}
