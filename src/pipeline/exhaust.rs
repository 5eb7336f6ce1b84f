//! Exhaustion driver: keep the document growing until it stops.
//!
//! The order page loads more entries when scrolled to the bottom (and
//! sometimes only after a "Show more" button is clicked). Nothing signals
//! that the last page has arrived, so exhaustion is inferred by repeatedly
//! failing to grow:
//!
//! ```text
//! for attempt in 1..=max_attempts
//!     scroll to bottom; click "show more" if present (resets stability)
//!     poll extent up to polls_per_round times, poll_interval apart
//!         changed → grew, reset stability, next round
//!     no change all round → stability += 1; stop at stability_rounds
//! ```
//!
//! Hitting the attempt cap is normal termination with whatever content has
//! loaded; it is logged, not returned as an error.

use crate::config::ScanConfig;
use crate::source::LineSource;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Why the driver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionReason {
    /// `stability_rounds` consecutive rounds without growth.
    Stabilized,
    /// `max_attempts` rounds ran out first.
    AttemptCapReached,
}

/// Diagnostics for one drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExhaustionOutcome {
    /// Outer rounds executed, never more than `max_attempts`.
    pub attempts: usize,
    pub final_extent: u64,
    /// Rounds in which the extent changed.
    pub growth_events: usize,
    pub load_more_clicks: usize,
    pub reason: ExhaustionReason,
}

/// Drive `source` until it is judged exhausted.
pub async fn drive<S: LineSource>(source: &mut S, config: &ScanConfig) -> ExhaustionOutcome {
    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_scan_start(config.max_attempts);
    }

    let mut last_extent = source.extent();
    let mut stable_rounds = 0usize;
    let mut attempts = 0usize;
    let mut growth_events = 0usize;
    let mut load_more_clicks = 0usize;
    let mut reason = ExhaustionReason::AttemptCapReached;

    while attempts < config.max_attempts {
        attempts += 1;
        source.scroll_to_extent();

        if let Some(control) = source.find_load_more_control() {
            source.click(control);
            load_more_clicks += 1;
            stable_rounds = 0;
            debug!("Round {}: clicked load-more control", attempts);
            if let Some(cb) = cb {
                cb.on_load_more(attempts);
            }
        }

        let mut grew = false;
        for _ in 0..config.polls_per_round {
            sleep(config.poll_interval).await;
            let extent = source.extent();
            if extent != last_extent {
                grew = true;
                last_extent = extent;
                stable_rounds = 0;
                break;
            }
        }

        if grew {
            growth_events += 1;
        } else {
            stable_rounds += 1;
        }
        debug!(
            "Round {}: extent {} grew={} stable={}/{}",
            attempts, last_extent, grew, stable_rounds, config.stability_rounds
        );
        if let Some(cb) = cb {
            cb.on_round(attempts, last_extent, grew);
        }

        if stable_rounds >= config.stability_rounds {
            reason = ExhaustionReason::Stabilized;
            break;
        }
    }

    let outcome = ExhaustionOutcome {
        attempts,
        final_extent: last_extent,
        growth_events,
        load_more_clicks,
        reason,
    };

    match reason {
        ExhaustionReason::Stabilized => info!(
            "Document exhausted after {} rounds (extent {}, {} load-more clicks)",
            attempts, last_extent, load_more_clicks
        ),
        ExhaustionReason::AttemptCapReached => warn!(
            "Attempt cap of {} reached before the document stabilised; using what has loaded",
            config.max_attempts
        ),
    }
    if let Some(cb) = cb {
        cb.on_exhausted(&outcome);
    }
    outcome
}
