//! Aggregation: reduce transaction records to spend analytics.

use crate::output::{AggregateResult, TransactionRecord, VendorTotal};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::warn;

/// Reduce records to totals, per-vendor sums, top vendors and the largest
/// single order.
///
/// Sums are exact decimals; a sum that would overflow `Decimal` saturates at
/// `Decimal::MAX` with a warning. `top_n` caps the ranked vendor list; ties keep
/// the order in which vendors were first seen.
pub fn aggregate(records: &[TransactionRecord], top_n: usize) -> AggregateResult {
    let mut total_spend = Decimal::ZERO;
    let mut per_vendor: Vec<VendorTotal> = Vec::new();
    let mut slot: HashMap<&str, usize> = HashMap::new();
    let mut largest: Option<&TransactionRecord> = None;

    for rec in records {
        total_spend = add_saturating(total_spend, rec.amount, "total spend");

        let idx = *slot.entry(rec.vendor_name.as_str()).or_insert_with(|| {
            per_vendor.push(VendorTotal {
                vendor: rec.vendor_name.clone(),
                total: Decimal::ZERO,
            });
            per_vendor.len() - 1
        });
        per_vendor[idx].total = add_saturating(per_vendor[idx].total, rec.amount, &rec.vendor_name);

        // Strictly greater: the first of equal amounts stays.
        if largest.is_none_or(|l| rec.amount > l.amount) {
            largest = Some(rec);
        }
    }

    let mut top_vendors = per_vendor.clone();
    // `sort_by` is stable, so equal totals keep first-seen order.
    top_vendors.sort_by(|a, b| b.total.cmp(&a.total));
    top_vendors.truncate(top_n);

    AggregateResult {
        total_spend,
        order_count: records.len(),
        per_vendor_total: per_vendor,
        top_vendors,
        largest_order: largest.cloned(),
    }
}

fn add_saturating(sum: Decimal, amount: Decimal, what: &str) -> Decimal {
    sum.checked_add(amount).unwrap_or_else(|| {
        warn!("Sum for {} overflowed; capping at {}", what, Decimal::MAX);
        Decimal::MAX
    })
}
