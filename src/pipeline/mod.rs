//! Pipeline stages for turning an order-history page into a spend report.
//!
//! Each submodule implements exactly one step. Only the first one waits on
//! the document; the rest are pure functions over the final line sequence.
//!
//! ## Data Flow
//!
//! ```text
//! exhaust ──▶ parse ──▶ aggregate ──▶ render
//! (scroll)   (lines)   (totals)     (escaped blocks)
//!              ▲
//!           classify
//! ```
//!
//! 1. [`exhaust`]   — scroll / click "show more" until the extent stops
//!    changing; the only stage with suspension points
//! 2. [`classify`]  — per-line predicates: date header, price, refund
//! 3. [`parse`]     — single pass producing `TransactionRecord`s
//! 4. [`aggregate`] — totals, per-vendor sums, top vendors, largest order
//! 5. [`render`]    — typed report blocks with every page-sourced string
//!    escaped once

pub mod aggregate;
pub mod classify;
pub mod exhaust;
pub mod parse;
pub mod render;
