//! End-to-end integration tests for ordertally.
//!
//! Everything runs against in-memory sources and the recorded fixture in
//! `./fixtures/`, with tokio's clock paused so the exhaustion driver's
//! polling costs no wall time.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use futures::StreamExt;
use ordertally::pipeline::aggregate::aggregate;
use ordertally::pipeline::classify::{extract_price, is_date_header, is_refund_marker};
use ordertally::pipeline::parse::parse_transactions;
use ordertally::pipeline::render::render;
use ordertally::{
    load_fixture, observe_target, scan, scan_lines, watch_target, ExhaustionReason, FileJobStore,
    JobRunner, JobStatus, JobStore, LineSource, MemoryJobStore, PagedLineSource, ReportBlock,
    ScanConfig, StaticLineSource, TargetId, VendorTotal,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::PathBuf;
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
}

fn vt(vendor: &str, total: Decimal) -> VendorTotal {
    VendorTotal {
        vendor: vendor.to_string(),
        total,
    }
}

const HEADER_MAX: usize = 35;

/// Random order-page-like line soup.
fn random_lines(rng: &mut StdRng, len: usize) -> Vec<String> {
    const DATES: [&str; 5] = ["Jan 5", "Mon, Feb 12, 2024", "Yesterday Mar 3", "Dec 30, 2023", "Today Apr 1"];
    const VENDORS: [&str; 6] = [
        "Taco Place",
        "Pho House",
        "Burger Spot",
        "Ben & Jerry's",
        "<b>Bold</b> Cafe",
        "Sushi \"Bar\"",
    ];
    const NOISE: [&str; 6] = ["Completed", "•", "4", "View receipt", "Reorder", "2 items"];
    const REFUNDS: [&str; 3] = ["Refund issued", "Order Cancelled", "Canceled by store"];

    (0..len)
        .map(|_| match rng.random_range(0..10) {
            0 | 1 => DATES[rng.random_range(0..DATES.len())].to_string(),
            2 | 3 => VENDORS[rng.random_range(0..VENDORS.len())].to_string(),
            4 | 5 => NOISE[rng.random_range(0..NOISE.len())].to_string(),
            6 => REFUNDS[rng.random_range(0..REFUNDS.len())].to_string(),
            7 => "$0.00".to_string(),
            8 => format!("CA${},{:03}.{:02}", rng.random_range(1..5), rng.random_range(0..1000), rng.random_range(0..100)),
            _ => format!("${}.{:02} • {} items", rng.random_range(0..80), rng.random_range(0..100), rng.random_range(1..6)),
        })
        .collect()
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&amp;", "&")
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[test]
fn scenario_two_completed_orders() {
    let lines = [
        "Jan 5", "Taco Place", "Completed", "$12.50", "Jan 3", "Burger Spot", "Completed", "$8.00",
    ];
    let out = scan_lines(&lines, &ScanConfig::default());
    let agg = &out.aggregate;

    assert_eq!(agg.total_spend, dec!(20.50));
    assert_eq!(agg.order_count, 2);
    assert_eq!(
        agg.top_vendors,
        vec![vt("Taco Place", dec!(12.50)), vt("Burger Spot", dec!(8.00))]
    );
    let largest = agg.largest_order.as_ref().unwrap();
    assert_eq!(largest.vendor_name, "Taco Place");
    assert_eq!(largest.amount, dec!(12.50));
    assert_eq!(largest.date, "Jan 5");

    let html = out.report.to_html();
    assert!(html.contains("$20.50"));
    assert!(html.contains("2 ORDERS TOTAL"));
    assert!(html.contains("1. Taco Place"));
}

#[test]
fn scenario_refund_excluded() {
    let out = scan_lines(&["Jan 5", "Taco Place", "$12.50", "Refund issued"], &ScanConfig::default());
    let agg = &out.aggregate;

    assert_eq!(agg.order_count, 0);
    assert_eq!(agg.total_spend, dec!(0.00));
    assert!(agg.top_vendors.is_empty());
    assert!(agg.largest_order.is_none());
    assert!(out.report.has_no_orders_marker());
    assert!(out.report.to_html().contains("No orders found."));
}

#[test]
fn scenario_unknown_vendor_and_date() {
    let records = parse_transactions(&["$5.00"], HEADER_MAX);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].vendor_name, "Unknown Store");
    assert_eq!(records[0].date, "Unknown Date");
    assert_eq!(records[0].amount, dec!(5.00));
}

#[test]
fn scenario_vendor_skips_status_and_header() {
    let records = parse_transactions(&["Jan 5", "Completed", "Sushi Bar", "Completed", "$30.00"], HEADER_MAX);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].vendor_name, "Sushi Bar");
    assert_eq!(records[0].date, "Jan 5");
}

// ── Properties over generated pages ──────────────────────────────────────────

#[test]
fn kept_amounts_are_positive_and_totals_agree() {
    let mut rng = StdRng::seed_from_u64(0x0dd5);
    for _ in 0..200 {
        let len = rng.random_range(0..60);
        let lines = random_lines(&mut rng, len);
        let records = parse_transactions(&lines, HEADER_MAX);
        let agg = aggregate(&records, 3);

        assert!(records.iter().all(|r| r.amount > Decimal::ZERO), "{lines:?}");
        assert_eq!(agg.order_count, records.len());
        assert_eq!(agg.total_spend, records.iter().map(|r| r.amount).sum::<Decimal>());
        assert_eq!(
            agg.per_vendor_total.iter().map(|v| v.total).sum::<Decimal>(),
            agg.total_spend
        );
        if let Some(ref largest) = agg.largest_order {
            assert!(records.iter().all(|r| r.amount <= largest.amount));
        }
    }
}

#[test]
fn refund_window_decides_exactly_which_prices_survive() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..200 {
        let len = rng.random_range(0..60);
        let lines = random_lines(&mut rng, len);
        let records = parse_transactions(&lines, HEADER_MAX);

        let expected: Vec<usize> = (0..lines.len())
            .filter(|&i| !is_date_header(&lines[i], HEADER_MAX))
            .filter(|&i| extract_price(&lines[i]).is_some_and(|a| a > Decimal::ZERO))
            .filter(|&i| !lines[i..(i + 3).min(lines.len())].iter().any(|l| is_refund_marker(l)))
            .collect();
        let kept: Vec<usize> = records.iter().map(|r| r.line_index).collect();
        assert_eq!(kept, expected, "{lines:?}");
    }
}

#[test]
fn top_vendors_are_bounded_sorted_and_stable() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let len = rng.random_range(0..80);
        let lines = random_lines(&mut rng, len);
        let agg = aggregate(&parse_transactions(&lines, HEADER_MAX), 3);

        assert!(agg.top_vendors.len() <= 3);
        assert_eq!(agg.top_vendors.len(), agg.per_vendor_total.len().min(3));

        let first_seen = |name: &str| agg.per_vendor_total.iter().position(|v| v.vendor == name);
        for pair in agg.top_vendors.windows(2) {
            assert!(pair[0].total >= pair[1].total);
            if pair[0].total == pair[1].total {
                assert!(first_seen(&pair[0].vendor) < first_seen(&pair[1].vendor));
            }
        }
        // Nothing left out beats the last one in.
        if let Some(last) = agg.top_vendors.last() {
            for v in &agg.per_vendor_total {
                if !agg.top_vendors.contains(v) {
                    assert!(v.total <= last.total);
                }
            }
        }
    }
}

#[test]
fn report_text_is_escaped_exactly_once() {
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..100 {
        let len = rng.random_range(0..60);
        let lines = random_lines(&mut rng, len);
        let agg = aggregate(&parse_transactions(&lines, HEADER_MAX), 3);
        let report = render(&agg);
        let html = report.to_html();

        assert!(!html.contains("<b>Bold</b>"));
        for block in &report.blocks {
            match block {
                ReportBlock::TopVendors { rows } => {
                    for (row, vendor) in rows.iter().zip(&agg.top_vendors) {
                        assert_eq!(unescape(row.vendor.as_str()), vendor.vendor);
                    }
                }
                ReportBlock::BiggestPurchase { vendor, date, .. } => {
                    let largest = agg.largest_order.as_ref().unwrap();
                    assert_eq!(unescape(vendor.as_str()), largest.vendor_name);
                    assert_eq!(unescape(date.as_str()), largest.date);
                }
                ReportBlock::Summary { .. } | ReportBlock::NoOrders => {}
            }
        }
    }

    let agg = aggregate(&parse_transactions(&["Ben & Jerry's", "$4.00"], HEADER_MAX), 3);
    let html = render(&agg).to_html();
    assert!(html.contains("Ben &amp; Jerry&#039;s"));
    assert!(!html.contains("&amp;amp;"));
}

// ── Exhaustion ───────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn exhaustion_terminates_within_the_cap() {
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..20 {
        let pages = rng.random_range(1..8);
        let text: Vec<String> = (0..pages)
            .map(|p| {
                let sep = if rng.random_bool(0.5) { "--- page ---" } else { "--- show more ---" };
                let body = format!("Jan {}\nStore {p}\n${}.00\n", p + 1, p + 1);
                if p == 0 { body } else { format!("{sep}\n{body}") }
            })
            .collect();
        let mut src = PagedLineSource::from_text(&text.concat()).with_latency(rng.random_range(0..15));

        let config = ScanConfig::builder()
            .max_attempts(rng.random_range(1..30))
            .build()
            .unwrap();
        let out = scan(&mut src, &config).await;
        let ex = out.stats.exhaustion.unwrap();

        assert!(ex.attempts <= config.max_attempts);
        match ex.reason {
            ExhaustionReason::Stabilized => {
                assert!(ex.attempts >= config.stability_rounds);
                assert_eq!(src.pages_revealed(), src.page_count());
                assert_eq!(out.aggregate.order_count, pages);
            }
            ExhaustionReason::AttemptCapReached => assert_eq!(ex.attempts, config.max_attempts),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn recorded_fixture_drains_through_scroll_and_show_more() {
    let mut page = load_fixture(fixture_path("orders.txt"))
        .await
        .unwrap()
        .with_latency(4)
        .with_decoy_control("Help");
    assert_eq!(page.page_count(), 3);
    assert_eq!(page.extent(), 10);

    let out = scan(&mut page, &ScanConfig::default()).await;
    let ex = out.stats.exhaustion.as_ref().unwrap();
    assert_eq!(ex.reason, ExhaustionReason::Stabilized);
    assert_eq!(ex.load_more_clicks, 1);
    assert_eq!(ex.growth_events, 2);
    assert_eq!(ex.final_extent, 26);

    let agg = &out.aggregate;
    assert_eq!(agg.order_count, 5);
    assert_eq!(agg.total_spend, dec!(1261.64));
    assert_eq!(
        agg.top_vendors,
        vec![
            vt("Ben & Jerry's", dec!(1204.50)),
            vt("Taco Place", dec!(25.00)),
            vt("Pho House", dec!(22.15)),
        ]
    );
    assert_eq!(agg.largest_order.as_ref().unwrap().date, "Feb 27, 2024");
    assert!(out.report.to_html().contains("Ben &amp; Jerry&#039;s"));
}

// ── Job state ────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn observer_sees_scanning_then_complete() {
    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let target = TargetId::from("tab-3");
    let runner = JobRunner::new(Arc::clone(&store), ScanConfig::default());
    let feed = watch_target(&store, target.clone());
    let mut page = StaticLineSource::from_text("Jan 5\nTaco Place\n$12.50");

    let (run, seen) = tokio::join!(runner.run(&target, &mut page), feed.take(2).collect::<Vec<_>>());
    let out = run.unwrap();

    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].status, JobStatus::Scanning);
    assert!(seen[0].report.is_none());
    assert_eq!(seen[1].status, JobStatus::Complete);
    assert_eq!(seen[1].report.as_ref(), Some(&out.report));
}

#[tokio::test(start_paused = true)]
async fn late_observer_starts_from_stored_state() {
    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let target = TargetId::from("tab-4");
    let runner = JobRunner::new(Arc::clone(&store), ScanConfig::default());
    let mut page = StaticLineSource::from_text("Jan 5\nTaco Place\n$12.50");
    runner.run(&target, &mut page).await.unwrap();

    let mut feed = observe_target(&store, target).unwrap();
    let first = feed.next().await.unwrap();
    assert_eq!(first.status, JobStatus::Complete);
}

#[tokio::test(start_paused = true)]
async fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let target = TargetId::from("tab-5");
    let expected = {
        let store: Arc<dyn JobStore> = Arc::new(FileJobStore::open(dir.path()).unwrap());
        let runner = JobRunner::new(store, ScanConfig::default());
        let mut page = StaticLineSource::from_text("Jan 5\nBen & Jerry's\n$12.50");
        runner.run(&target, &mut page).await.unwrap().report
    };

    let reopened = FileJobStore::open(dir.path()).unwrap();
    assert!(reopened.path_for(&target).ends_with("stats_tab-5.json"));
    let state = reopened.read(&target).unwrap().unwrap();
    assert_eq!(state.status, JobStatus::Complete);
    assert_eq!(state.report, Some(expected));
}
