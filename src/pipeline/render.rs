//! Report model: typed, pre-escaped blocks and their HTML rendering.
//!
//! Vendor names and date labels come straight from page text, so they are
//! untrusted. They enter the report only as [`SafeText`], which can only be
//! built by escaping (or by validating text that is already escaped).
//! Everything that crosses into a display surface has therefore been escaped
//! exactly once, here, and consumers must not escape it again.
//!
//! Amounts are formatted from decimal arithmetic and need no escaping.

use crate::output::AggregateResult;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Escaping ─────────────────────────────────────────────────────────────────

/// Escape the five HTML-special characters.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 16);
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}

const ENTITIES: [&str; 5] = ["&amp;", "&lt;", "&gt;", "&quot;", "&#039;"];

/// True if `text` could be the output of [`escape_html`].
fn is_escaped(text: &str) -> bool {
    if text.contains(['<', '>', '"', '\'']) {
        return false;
    }
    text.match_indices('&')
        .all(|(i, _)| ENTITIES.iter().any(|e| text[i..].starts_with(e)))
}

/// Text that is safe to embed in markup as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SafeText(String);

impl SafeText {
    /// Escape untrusted text.
    pub fn escape(raw: &str) -> Self {
        Self(escape_html(raw))
    }

    /// Accept text that is already escaped, e.g. a persisted report.
    pub fn from_escaped(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        is_escaped(&text).then_some(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SafeText {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_escaped(value.clone()).ok_or_else(|| format!("text is not HTML-escaped: {value:?}"))
    }
}

impl From<SafeText> for String {
    fn from(value: SafeText) -> Self {
        value.0
    }
}

impl fmt::Display for SafeText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Format an amount to exactly two decimals, rounding half away from zero.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}

// ── Model ────────────────────────────────────────────────────────────────────

/// One ranked vendor row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorRow {
    /// 1-indexed.
    pub rank: usize,
    pub vendor: SafeText,
    pub total: String,
}

/// A block of the rendered report, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportBlock {
    Summary {
        total_spend: String,
        order_count: usize,
    },
    TopVendors {
        rows: Vec<VendorRow>,
    },
    /// Stands in for [`ReportBlock::TopVendors`] when nothing was found.
    NoOrders,
    BiggestPurchase {
        vendor: SafeText,
        amount: String,
        date: SafeText,
    },
}

/// The complete, pre-sanitised report.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Report {
    pub blocks: Vec<ReportBlock>,
}

/// Build the report for an aggregate.
///
/// Always a summary, then either ranked vendors or the "no orders" marker,
/// then the biggest purchase if there is one.
pub fn render(result: &AggregateResult) -> Report {
    let mut blocks = vec![ReportBlock::Summary {
        total_spend: format_amount(result.total_spend),
        order_count: result.order_count,
    }];

    if result.top_vendors.is_empty() {
        blocks.push(ReportBlock::NoOrders);
    } else {
        let rows = result
            .top_vendors
            .iter()
            .enumerate()
            .map(|(i, v)| VendorRow {
                rank: i + 1,
                vendor: SafeText::escape(&v.vendor),
                total: format_amount(v.total),
            })
            .collect();
        blocks.push(ReportBlock::TopVendors { rows });
    }

    if let Some(ref largest) = result.largest_order {
        blocks.push(ReportBlock::BiggestPurchase {
            vendor: SafeText::escape(&largest.vendor_name),
            amount: format_amount(largest.amount),
            date: SafeText::escape(&largest.date),
        });
    }

    Report { blocks }
}

impl Report {
    /// Render the report as card markup for the popup surface.
    ///
    /// No escaping happens here; every text field is already [`SafeText`].
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for block in &self.blocks {
            match block {
                ReportBlock::Summary {
                    total_spend,
                    order_count,
                } => {
                    html.push_str(r#"<div class="stat-card center-col">"#);
                    html.push_str(&format!(r#"<div class="total-amount">${total_spend}</div>"#));
                    html.push_str(&format!(
                        r#"<div class="total-pill">{order_count} ORDERS TOTAL</div>"#
                    ));
                    html.push_str("</div>");
                }
                ReportBlock::TopVendors { rows } => {
                    html.push_str(r#"<div class="stat-card">"#);
                    html.push_str(r#"<div class="section-label">Top Cravings</div>"#);
                    for row in rows {
                        html.push_str(&format!(
                            r#"<div class="list-row"><span class="store-name">{}. {}</span> <span class="price-tag">${}</span></div>"#,
                            row.rank, row.vendor, row.total
                        ));
                    }
                    html.push_str("</div>");
                }
                ReportBlock::NoOrders => {
                    html.push_str(r#"<div class="stat-card">"#);
                    html.push_str(r#"<div class="section-label">Top Cravings</div>"#);
                    html.push_str(r#"<div class="empty-note">No orders found.</div>"#);
                    html.push_str("</div>");
                }
                ReportBlock::BiggestPurchase {
                    vendor,
                    amount,
                    date,
                } => {
                    html.push_str(r#"<div class="stat-card">"#);
                    html.push_str(r#"<div class="section-label">Biggest Splurge</div>"#);
                    html.push_str(&format!(
                        r#"<div class="expensive-row"><span class="expensive-store">{vendor}</span> <span class="price-tag">${amount}</span></div>"#
                    ));
                    html.push_str(&format!(r#"<span class="expensive-date">{date}</span>"#));
                    html.push_str("</div>");
                }
            }
        }
        html
    }

    pub fn has_no_orders_marker(&self) -> bool {
        self.blocks.iter().any(|b| matches!(b, ReportBlock::NoOrders))
    }
}
