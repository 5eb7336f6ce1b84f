//! Result types produced by a scan.

use crate::pipeline::exhaust::ExhaustionOutcome;
use crate::pipeline::render::Report;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One purchase recovered from the order-history text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Nearest qualifying line above the price, or `"Unknown Store"`.
    pub vendor_name: String,
    /// Always strictly positive.
    pub amount: Decimal,
    /// Text of the governing date header, or `"Unknown Date"`.
    pub date: String,
    /// Index of the price line in the flattened document.
    pub line_index: usize,
}

/// A vendor and the sum of its orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorTotal {
    pub vendor: String,
    pub total: Decimal,
}

/// Spend analytics over a sequence of [`TransactionRecord`]s.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Exact sum of all kept amounts.
    pub total_spend: Decimal,
    pub order_count: usize,
    /// Per-vendor sums in first-seen order.
    pub per_vendor_total: Vec<VendorTotal>,
    /// Highest totals first, at most `top_vendors` entries. Ties keep
    /// first-seen order.
    pub top_vendors: Vec<VendorTotal>,
    /// First record holding the maximum amount.
    pub largest_order: Option<TransactionRecord>,
}

impl AggregateResult {
    /// Sum for one vendor, if it has any orders.
    pub fn vendor_total(&self, vendor: &str) -> Option<Decimal> {
        self.per_vendor_total
            .iter()
            .find(|v| v.vendor == vendor)
            .map(|v| v.total)
    }

    pub fn is_empty(&self) -> bool {
        self.order_count == 0
    }
}

/// Timing and volume statistics for one scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStats {
    /// Lines in the document once it stopped growing.
    pub line_count: usize,
    /// Lines that carried a price token, kept or not.
    pub price_lines: usize,
    /// Records kept after refund and zero-amount filtering.
    pub records: usize,
    /// Absent when the lines were supplied directly (no driving).
    pub exhaustion: Option<ExhaustionOutcome>,
    /// Wall-clock time spent waiting for the document to stop growing.
    pub drive_duration_ms: u64,
    /// Wall-clock time for parse + aggregate + render.
    pub analyse_duration_ms: u64,
}

/// Complete output of a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutput {
    pub records: Vec<TransactionRecord>,
    pub aggregate: AggregateResult,
    pub report: Report,
    pub stats: ScanStats,
}
