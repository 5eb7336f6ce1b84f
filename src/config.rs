//! Configuration types for an order-history scan.
//!
//! All scan behaviour is controlled through [`ScanConfig`], built via its
//! [`ScanConfigBuilder`]. The defaults reproduce the polling heuristic that
//! works for the delivery site's order page: 300 rounds at most, 20 polls of
//! 100 ms per round, and 3 consecutive quiet rounds before the page counts as
//! exhausted.
//!
//! The three tiers (attempt cap, polls per round, stability threshold) are
//! independent knobs. Tests shrink the poll interval; a slower page may
//! want more polls per round.

use crate::error::OrderTallyError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::time::Duration;

/// Label given to transactions that appear before any date header.
pub const UNKNOWN_DATE: &str = "Unknown Date";

/// Vendor name used when the backward scan finds no candidate line.
pub const UNKNOWN_STORE: &str = "Unknown Store";

/// Smallest usable header bound: the shortest header, `Jan 5`, is five
/// characters and the bound is exclusive.
const MIN_HEADER_MAX_LEN: usize = 6;

/// Configuration for an order-history scan.
///
/// Built via [`ScanConfig::builder()`] or using [`ScanConfig::default()`].
///
/// # Example
/// ```rust
/// use ordertally::ScanConfig;
/// use std::time::Duration;
///
/// let config = ScanConfig::builder()
///     .max_attempts(50)
///     .poll_interval(Duration::from_millis(10))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ScanConfig {
    /// Hard cap on outer scroll rounds. Default: 300.
    ///
    /// Reaching the cap is not an error: whatever content loaded by then is
    /// parsed as-is.
    pub max_attempts: usize,

    /// Extent reads per round before the round counts as quiet. Default: 20.
    pub polls_per_round: usize,

    /// Delay before each extent read. Default: 100 ms.
    pub poll_interval: Duration,

    /// Consecutive quiet rounds after which the document is exhausted. Default: 3.
    pub stability_rounds: usize,

    /// Lines at or above this many characters are never date headers. Default: 35.
    ///
    /// Long prose lines often mention a month ("Ordered on Mar 3 from ...");
    /// treating those as headers would reset the date scope mid-order.
    pub header_max_len: usize,

    /// How many vendors the report ranks. Default: 3.
    pub top_vendors: usize,

    /// Optional progress callback for round-by-round events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_attempts: 300,
            polls_per_round: 20,
            poll_interval: Duration::from_millis(100),
            stability_rounds: 3,
            header_max_len: 35,
            top_vendors: 3,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfig")
            .field("max_attempts", &self.max_attempts)
            .field("polls_per_round", &self.polls_per_round)
            .field("poll_interval", &self.poll_interval)
            .field("stability_rounds", &self.stability_rounds)
            .field("header_max_len", &self.header_max_len)
            .field("top_vendors", &self.top_vendors)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ScanProgressCallback>"),
            )
            .finish()
    }
}

impl ScanConfig {
    /// Create a new builder for `ScanConfig`.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder {
            config: Self::default(),
        }
    }

    /// Worst-case time one round can spend polling.
    pub fn round_budget(&self) -> Duration {
        self.poll_interval * self.polls_per_round as u32
    }
}

/// Builder for [`ScanConfig`].
#[derive(Debug)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    pub fn max_attempts(mut self, n: usize) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn polls_per_round(mut self, n: usize) -> Self {
        self.config.polls_per_round = n;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval = Duration::from_millis(ms);
        self
    }

    pub fn stability_rounds(mut self, n: usize) -> Self {
        self.config.stability_rounds = n;
        self
    }

    pub fn header_max_len(mut self, n: usize) -> Self {
        self.config.header_max_len = n;
        self
    }

    pub fn top_vendors(mut self, n: usize) -> Self {
        self.config.top_vendors = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ScanConfig, OrderTallyError> {
        let c = &self.config;
        if c.max_attempts == 0 {
            return Err(OrderTallyError::InvalidConfig(
                "max_attempts must be ≥ 1".into(),
            ));
        }
        if c.polls_per_round == 0 {
            return Err(OrderTallyError::InvalidConfig(
                "polls_per_round must be ≥ 1".into(),
            ));
        }
        if c.stability_rounds == 0 {
            return Err(OrderTallyError::InvalidConfig(
                "stability_rounds must be ≥ 1".into(),
            ));
        }
        if c.header_max_len < MIN_HEADER_MAX_LEN {
            return Err(OrderTallyError::InvalidConfig(format!(
                "header_max_len must be ≥ {MIN_HEADER_MAX_LEN}"
            )));
        }
        if c.top_vendors == 0 {
            return Err(OrderTallyError::InvalidConfig(
                "top_vendors must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_page_heuristic() {
        let c = ScanConfig::default();
        assert_eq!(c.max_attempts, 300);
        assert_eq!(c.polls_per_round, 20);
        assert_eq!(c.poll_interval, Duration::from_millis(100));
        assert_eq!(c.stability_rounds, 3);
        assert_eq!(c.header_max_len, 35);
        assert_eq!(c.top_vendors, 3);
        assert_eq!(c.round_budget(), Duration::from_secs(2));
    }

    #[test]
    fn builder_rejects_zero_attempts() {
        let err = ScanConfig::builder().max_attempts(0).build().unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn builder_rejects_zero_stability() {
        assert!(ScanConfig::builder().stability_rounds(0).build().is_err());
        assert!(ScanConfig::builder().polls_per_round(0).build().is_err());
        assert!(ScanConfig::builder().top_vendors(0).build().is_err());
    }

    #[test]
    fn builder_overrides() {
        let c = ScanConfig::builder()
            .max_attempts(10)
            .polls_per_round(2)
            .poll_interval_ms(5)
            .stability_rounds(1)
            .header_max_len(6)
            .build()
            .unwrap();
        assert_eq!(c.max_attempts, 10);
        assert_eq!(c.polls_per_round, 2);
        assert_eq!(c.poll_interval, Duration::from_millis(5));
        assert_eq!(c.stability_rounds, 1);
        assert_eq!(c.header_max_len, 6);
    }

    #[test]
    fn header_bound_must_admit_the_shortest_header() {
        for n in [0, 1, 5] {
            let err = ScanConfig::builder().header_max_len(n).build().unwrap_err();
            assert!(err.to_string().contains("header_max_len"), "got: {err}");
        }
        let c = ScanConfig::builder().header_max_len(6).build().unwrap();
        assert!(crate::pipeline::classify::is_date_header("Jan 5", c.header_max_len));
    }

    #[test]
    fn debug_hides_callback() {
        use crate::progress::NoopProgressCallback;
        use std::sync::Arc;

        let c = ScanConfig::builder()
            .progress_callback(Arc::new(NoopProgressCallback))
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("<dyn ScanProgressCallback>"));
    }
}
