//! CLI binary for ordertally.
//!
//! A thin shim over the library crate that replays a recorded order-history
//! fixture through the scan pipeline and prints the report.

use anyhow::{Context, Result};
use clap::Parser;
use ordertally::pipeline::render::format_amount;
use ordertally::{
    load_fixture, write_report, AggregateResult, ExhaustionOutcome, ExhaustionReason, FileJobStore,
    JobRunner, JobStore, MemoryJobStore, ProgressCallback, ScanConfig, ScanProgressCallback, TargetId,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner that follows the exhaustion driver round by round.
struct CliProgressCallback {
    bar: ProgressBar,
    max_attempts: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Loading");
        bar.set_message("Opening order history…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            max_attempts: AtomicUsize::new(0),
        })
    }
}

impl ScanProgressCallback for CliProgressCallback {
    fn on_scan_start(&self, max_attempts: usize) {
        self.max_attempts.store(max_attempts, Ordering::SeqCst);
        self.bar.set_prefix("Scrolling");
    }

    fn on_round(&self, attempt: usize, extent: u64, grew: bool) {
        let marker = if grew { green("▲") } else { dim("·") };
        self.bar.set_message(format!(
            "round {attempt}/{}  {marker} {extent} lines",
            self.max_attempts.load(Ordering::SeqCst)
        ));
    }

    fn on_load_more(&self, attempt: usize) {
        self.bar.println(format!(
            "  {} round {attempt}: clicked \"show more\"",
            cyan("↻")
        ));
    }

    fn on_exhausted(&self, outcome: &ExhaustionOutcome) {
        self.bar.finish_and_clear();
        let (mark, how) = match outcome.reason {
            ExhaustionReason::Stabilized => (green("✔"), "history fully loaded"),
            ExhaustionReason::AttemptCapReached => (cyan("⚠"), "attempt cap reached"),
        };
        eprintln!(
            "{} {}  {} rounds, {} lines",
            mark,
            bold(how),
            outcome.attempts,
            outcome.final_extent
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Print the HTML report for a recorded page
  ordertally orders.txt

  # Write the report to a file
  ordertally orders.txt -o report.html

  # Full scan output (records, totals, report blocks) as JSON
  ordertally --json orders.txt > scan.json

  # Simulate a slow page: content shows up 5 polls after each scroll
  ordertally --latency 5 orders.txt

  # Persist job state under a directory (stats_<target>.json)
  ordertally --store-dir state/ --target tab-1 orders.txt

FIXTURE FORMAT:
  One document line per text line. Separator lines split the recording
  into chunks that appear one at a time:
    --- page ---        next chunk loads when scrolled to the bottom
    --- show more ---   next chunk loads after clicking "Show more"

ENVIRONMENT VARIABLES:
  RUST_LOG                 Override the log filter (e.g. ordertally=debug)
  ORDERTALLY_OUTPUT        Default for --output
  ORDERTALLY_MAX_ATTEMPTS  Default for --max-attempts
  ORDERTALLY_POLL_MS       Default for --poll-interval-ms
"#;

/// Tally spend from a recorded food-delivery order history.
#[derive(Parser, Debug)]
#[command(
    name = "ordertally",
    version,
    about = "Tally spend from a recorded food-delivery order history",
    long_about = "Replays a recorded order-history page, scrolling and clicking \"show more\" \
until it stops growing, then extracts every order and reports total spend, order count, \
top vendors and the biggest purchase.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Recorded order-history text file.
    input: PathBuf,

    /// Write the HTML report to this file instead of stdout.
    #[arg(short, long, env = "ORDERTALLY_OUTPUT")]
    output: Option<PathBuf>,

    /// Print the full scan result as JSON instead of HTML.
    #[arg(long, env = "ORDERTALLY_JSON", conflicts_with = "output")]
    json: bool,

    /// Hard cap on scroll rounds.
    #[arg(long, env = "ORDERTALLY_MAX_ATTEMPTS", default_value_t = 300)]
    max_attempts: usize,

    /// Extent polls per round before it counts as quiet.
    #[arg(long, env = "ORDERTALLY_POLLS_PER_ROUND", default_value_t = 20)]
    polls_per_round: usize,

    /// Milliseconds between extent polls.
    #[arg(long, env = "ORDERTALLY_POLL_MS", default_value_t = 100)]
    poll_interval_ms: u64,

    /// Consecutive quiet rounds before the page counts as fully loaded.
    #[arg(long, env = "ORDERTALLY_STABILITY_ROUNDS", default_value_t = 3)]
    stability_rounds: usize,

    /// Number of vendors in the "Top Cravings" list.
    #[arg(long, env = "ORDERTALLY_TOP", default_value_t = 3)]
    top: usize,

    /// Polls between a scroll/click and the next chunk appearing.
    #[arg(long, env = "ORDERTALLY_LATENCY", default_value_t = 0)]
    latency: usize,

    /// Job target id (defaults to the fixture file name).
    #[arg(long, env = "ORDERTALLY_TARGET")]
    target: Option<String>,

    /// Persist job state as JSON files in this directory.
    #[arg(long, env = "ORDERTALLY_STORE_DIR")]
    store_dir: Option<PathBuf>,

    /// Disable the progress spinner.
    #[arg(long, env = "ORDERTALLY_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ORDERTALLY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "ORDERTALLY_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO-level library logs while it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ScanProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Load fixture ─────────────────────────────────────────────────────
    let mut page = load_fixture(&cli.input)
        .await
        .context("Failed to load fixture")?
        .with_latency(cli.latency);

    let target = TargetId::new(cli.target.clone().unwrap_or_else(|| {
        cli.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "default".to_string())
    }));

    let store: Arc<dyn JobStore> = match cli.store_dir {
        Some(ref dir) => Arc::new(FileJobStore::open(dir).context("Failed to open job store")?),
        None => Arc::new(MemoryJobStore::new()),
    };
    let runner = JobRunner::new(store, config);

    if runner.is_scanning(&target)? && !cli.quiet {
        eprintln!(
            "{} previous scan of '{}' never completed; starting over",
            cyan("⚠"),
            target
        );
    }

    // ── Run scan ─────────────────────────────────────────────────────────
    let output = runner.run(&target, &mut page).await.context("Scan failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if let Some(ref output_path) = cli.output {
        write_report(&output, output_path)
            .await
            .context("Failed to write report")?;
    } else {
        let html = output.report.to_html();
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(html.as_bytes())
            .context("Failed to write to stdout")?;
        if !html.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    // ── Summary ──────────────────────────────────────────────────────────
    if !cli.quiet && !cli.json {
        let agg = &output.aggregate;
        let dest = cli
            .output
            .as_ref()
            .map(|p| format!("  →  {}", bold(&p.display().to_string())))
            .unwrap_or_default();
        eprintln!(
            "{} {} orders  total {}  {}{}",
            green("✔"),
            bold(&agg.order_count.to_string()),
            total_label(agg),
            dim(&format!(
                "{}ms",
                output.stats.drive_duration_ms + output.stats.analyse_duration_ms
            )),
            dest,
        );
    }

    Ok(())
}

/// Map CLI args to `ScanConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ScanConfig> {
    let mut builder = ScanConfig::builder()
        .max_attempts(cli.max_attempts)
        .polls_per_round(cli.polls_per_round)
        .poll_interval_ms(cli.poll_interval_ms)
        .stability_rounds(cli.stability_rounds)
        .top_vendors(cli.top);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Total spend as shown in the report card.
fn total_label(agg: &AggregateResult) -> String {
    format!("${}", format_amount(agg.total_spend))
}
