//! Line classification: date headers, price tokens, refund markers.
//!
//! Every function here is pure and total. Input that does not match simply
//! yields `false` / `None`. A line that superficially resembles a price or a
//! date but fails these rules is not an error; the parser skips it.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

// ── Date headers ─────────────────────────────────────────────────────────────
//
// Anchored at line start: an optional weekday / relative-day token, any run of
// spaces and commas, a three-letter month, the day, and an optional year.
// Matches "Jan 5", "Today, Mar 12", "Sat Dec 30, 2023".

static RE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:Today|Yesterday|Mon|Tue|Wed|Thu|Fri|Sat|Sun)?[\s,]*",
        r"(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d{1,2}",
        r"(?:,\s+\d{4})?"
    ))
    .unwrap()
});

/// True if the line starts like a calendar date, regardless of its length.
///
/// Vendor resolution uses this looser test: a long line that opens with a
/// date is never a vendor name either.
pub fn looks_like_date(line: &str) -> bool {
    RE_DATE.is_match(line)
}

/// True if the line is a date header that scopes the entries below it.
///
/// The line must look like a date and be shorter than `max_len` characters.
pub fn is_date_header(line: &str, max_len: usize) -> bool {
    line.chars().count() < max_len && looks_like_date(line)
}

// ── Prices ───────────────────────────────────────────────────────────────────

/// Whole-number digits a plausible order total can have. Longer runs are
/// order ids or tracking numbers that happen to follow a `$`.
const MAX_PRICE_WHOLE_DIGITS: usize = 9;

static RE_PRICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(?:CA\$|US\$|\$)([\d.,]+)").unwrap());

/// Extract the first currency-prefixed amount on the line.
///
/// Commas are digit-group separators. The number ends at a second decimal
/// point, so `$1.2.3` reads as `1.2`. Returns `None` when the run after the
/// prefix holds no digits or more than nine whole-number digits.
pub fn extract_price(line: &str) -> Option<Decimal> {
    let caps = RE_PRICE.captures(line)?;
    let raw: String = caps[1].chars().filter(|c| *c != ',').collect();

    let mut parts = raw.split('.');
    let whole = parts.next().unwrap_or("");
    let frac = parts.next().unwrap_or("");
    if whole.len() > MAX_PRICE_WHOLE_DIGITS {
        return None;
    }

    let number = match (whole.is_empty(), frac.is_empty()) {
        (true, true) => return None,
        (false, true) => whole.to_string(),
        (true, false) => format!("0.{frac}"),
        (false, false) => format!("{whole}.{frac}"),
    };
    Decimal::from_str(&number).ok()
}

// ── Refunds ──────────────────────────────────────────────────────────────────

static RE_REFUND: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Refund|Canceled|Cancelled").unwrap());

/// True if the line carries refund or cancellation vocabulary.
pub fn is_refund_marker(line: &str) -> bool {
    RE_REFUND.is_match(line)
}

// ── Controls ─────────────────────────────────────────────────────────────────

/// True if a control's visible text asks the page for more entries.
pub fn is_load_more_label(text: &str) -> bool {
    let t = text.to_lowercase();
    t.contains("show more") || t.contains("view more")
}
