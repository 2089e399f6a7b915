//! CLI binary for roster-qr.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `GenerationConfig`, shows the operator the extracted roster, and saves
//! the generated sheet.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use roster_qr::labels::found_summary;
use roster_qr::{
    extract_roster, generate_on, GenerationConfig, LayoutProgressCallback, PageSize,
    ProgressCallback, RosterQrError, RosterSnapshot, Session, Status, StatusKind,
};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

fn paint(status: &Status) -> String {
    match status.kind {
        StatusKind::Info => cyan(&status.message),
        StatusKind::Success => green(&status.message),
        StatusKind::Warning => yellow(&status.message),
        StatusKind::Error => red(&status.message),
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar while symbols are placed, plus
/// coloured status lines printed above it.
struct CliProgressCallback {
    bar: ProgressBar,
    record_started: Mutex<Option<Instant>>,
    placed: AtomicUsize,
}

impl CliProgressCallback {
    /// The bar stays hidden until layout starts so it never draws over the
    /// roster preview or the confirmation prompt.
    fn new() -> Arc<Self> {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::hidden());
        Arc::new(Self {
            bar,
            record_started: Mutex::new(None),
            placed: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} students  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Generating");
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }
}

impl LayoutProgressCallback for CliProgressCallback {
    fn on_layout_start(&self, total_records: usize) {
        self.activate_bar(total_records);
    }

    fn on_record_start(&self, _index: usize, _total: usize, name: &str) {
        if let Ok(mut started) = self.record_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_record_complete(&self, _index: usize, _total: usize) {
        self.placed.fetch_add(1, Ordering::SeqCst);
        self.bar.inc(1);
    }

    fn on_layout_error(&self, index: usize, total: usize, error: String) {
        let elapsed_ms = self
            .record_started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);
        self.bar.println(format!(
            "  {} Student {:>3}/{:<3}  {}  {}",
            red("✗"),
            index + 1,
            total,
            red(&error),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.finish_and_clear();
    }

    fn on_layout_complete(&self, total_records: usize, page_count: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {}/{} placed on {} pages",
            cyan("◆"),
            self.placed.load(Ordering::SeqCst),
            total_records,
            page_count
        );
    }

    fn on_status(&self, status: &Status) {
        match status.kind {
            StatusKind::Info => self.bar.set_message(status.message.clone()),
            _ if self.bar.is_hidden() || self.bar.is_finished() => eprintln!("{}", paint(status)),
            _ => self.bar.println(paint(status)),
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Save the course People page from the browser (Ctrl+S), then:
  roster2qr people.html

  # Write into a folder, skip the confirmation prompt
  roster2qr people.html -o sheets/ --yes

  # Preview the extracted roster only
  roster2qr --list-only people.html
  roster2qr --list-only --json people.html > roster.json

  # Denser grid on US Letter paper
  roster2qr --page-size letter --columns 3 --rows 7 --symbol-size 22 people.html

  # Fixed date and course name for reproducible file names
  roster2qr --date 2024-03-15 --title "Biology 101" people.html

TIPS:
  Scroll to the bottom of the People page before saving it so every
  student is loaded. Only one roster2qr run may use an output directory at
  a time; a stale .roster2qr.lock left by a killed run can be deleted.

ENVIRONMENT VARIABLES:
  Every flag can also be set as ROSTER2QR_<FLAG>, e.g. ROSTER2QR_OUTPUT_DIR.
  RUST_LOG overrides the log filter.
"#;

/// Generate printable QR-code sheets from a course roster page.
#[derive(Parser, Debug)]
#[command(
    name = "roster2qr",
    version,
    about = "Generate printable QR-code sheets from a course roster page",
    long_about = "Read a saved (or downloadable) course People page, extract every student \
link, and lay out a paginated PDF with one QR code per student. Each code encodes \
\"Name (ID)\"; the name and ID are printed beneath it.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local HTML file path or HTTP/HTTPS URL of the roster page.
    input: String,

    /// Directory the PDF is written into.
    #[arg(short, long, env = "ROSTER2QR_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Course title used for the file name (default: the page title).
    #[arg(long, env = "ROSTER2QR_TITLE")]
    title: Option<String>,

    /// Date printed on the sheet and used in the file name (YYYY-MM-DD).
    #[arg(long, env = "ROSTER2QR_DATE", value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// Heading printed at the top of every page.
    #[arg(long, env = "ROSTER2QR_HEADING")]
    heading: Option<String>,

    /// QR codes per row.
    #[arg(long, env = "ROSTER2QR_COLUMNS", default_value_t = 2,
          value_parser = clap::value_parser!(u32).range(1..=10))]
    columns: u32,

    /// Rows per page.
    #[arg(long, env = "ROSTER2QR_ROWS", default_value_t = 6,
          value_parser = clap::value_parser!(u32).range(1..=20))]
    rows: u32,

    /// Page margin in millimetres.
    #[arg(long, env = "ROSTER2QR_MARGIN", default_value_t = 20.0)]
    margin: f32,

    /// Printed QR code edge length in millimetres.
    #[arg(long, env = "ROSTER2QR_SYMBOL_SIZE", default_value_t = 25.0)]
    symbol_size: f32,

    /// Paper size.
    #[arg(long, env = "ROSTER2QR_PAGE_SIZE", value_enum, default_value = "a4")]
    page_size: PageSizeArg,

    /// Print the extracted roster and exit without generating.
    #[arg(long, env = "ROSTER2QR_LIST_ONLY")]
    list_only: bool,

    /// Output structured JSON instead of human-readable text.
    #[arg(long, env = "ROSTER2QR_JSON")]
    json: bool,

    /// Generate without asking for confirmation.
    #[arg(short, long, env = "ROSTER2QR_YES")]
    yes: bool,

    /// Disable progress bar.
    #[arg(long, env = "ROSTER2QR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ROSTER2QR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the confirmation prompt.
    #[arg(short, long, env = "ROSTER2QR_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "ROSTER2QR_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum PageSizeArg {
    A4,
    Letter,
}

impl From<PageSizeArg> for PageSize {
    fn from(v: PageSizeArg) -> Self {
        match v {
            PageSizeArg::A4 => PageSize::A4,
            PageSizeArg::Letter => PageSize::Letter,
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD ({e})"))
}

/// JSON summary printed after a successful run with `--json`.
#[derive(Serialize)]
struct RunSummary<'a> {
    path: String,
    file_stem: &'a str,
    stats: &'a roster_qr::GenerationStats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO logs would interleave with the progress bar; the bar and the
    // status lines carry everything the operator needs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress || cli.json {
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
        Some(CliProgressCallback::new() as Arc<dyn LayoutProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Claim the output directory ───────────────────────────────────────
    // Held from extraction through save; a second run is refused up front.
    let session = if cli.list_only {
        None
    } else {
        Some(Session::open(&cli.output_dir).context("Cannot use output directory")?)
    };

    // ── Extract ──────────────────────────────────────────────────────────
    let mut snapshot = extract_roster(&cli.input, &config)
        .await
        .context("Failed to read roster page")?;
    if let Some(ref title) = cli.title {
        snapshot.title = Some(title.clone());
    }

    let Some(session) = session else {
        print_roster(&snapshot, cli.json)?;
        return Ok(());
    };

    // The progress callback has already reported the empty roster.
    if snapshot.is_empty() {
        if cli.json {
            print_roster(&snapshot, true)?;
        } else if !cli.quiet && !show_progress {
            eprintln!("{}", paint(&Status::from(&RosterQrError::NoDataFound)));
        }
        return Ok(());
    }

    // ── Operator review ──────────────────────────────────────────────────
    if !cli.quiet && !cli.json {
        print_roster(&snapshot, false)?;
    }
    if !cli.yes && !confirm(snapshot.len())? {
        eprintln!("{}", dim("Cancelled; nothing was generated."));
        return Ok(());
    }

    // ── Generate and save ────────────────────────────────────────────────
    let date = cli.date.unwrap_or_else(|| Local::now().date_naive());

    let document = generate_on(&snapshot, &config, date)
        .await
        .context("Generation failed")?;
    let path = session.save(&document).await.context("Saving failed")?;

    if cli.json {
        let summary = RunSummary {
            path: path.display().to_string(),
            file_stem: &document.file_stem,
            stats: &document.stats,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {} students  {} pages  {}ms  →  {}",
            green("✔"),
            document.stats.record_count,
            document.stats.page_count,
            document.stats.total_duration_ms,
            bold(&path.display().to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `GenerationConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder()
        .page_size(cli.page_size.clone().into())
        .grid(cli.columns as usize, cli.rows as usize)
        .margin(cli.margin)
        .symbol_size(cli.symbol_size)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref heading) = cli.heading {
        builder = builder.heading(heading.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_roster(snapshot: &RosterSnapshot, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(snapshot).context("Failed to serialise roster")?
        );
        return Ok(());
    }

    println!("{}", bold(&found_summary(snapshot.len())));
    if let Some(ref pattern) = snapshot.pattern {
        println!("{}", dim(&format!("matched by: {pattern}")));
    }
    for (i, record) in snapshot.records.iter().enumerate() {
        println!("  {:>3}. {}  {}", i + 1, record.name, dim(&format!("(ID: {})", record.identifier)));
    }
    Ok(())
}

fn confirm(count: usize) -> Result<bool> {
    eprint!("Generate QR codes for {count} students? [y/N] ");
    io::stderr().flush().ok();

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
