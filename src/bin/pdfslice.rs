//! CLI binary for pdf-slicer.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, streams pages through the extractor and writes the
//! resulting JSON.

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_slicer::{
    extract_stream, write_output, ContentExtractor, ExtractionConfig, ExtractionOutput,
    ExtractionProgressCallback, ImageFormat, OcrPipeline, ProgressCallback, Source,
};
use pdf_slicer::extract::PDF_CONTENT_TYPE;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    fallbacks: AtomicUsize,
    skipped: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            fallbacks: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
        })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, first_page: usize, last_page: usize) {
        let total = (last_page + 1).saturating_sub(first_page);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Slicing");
        self.bar.reset_eta();
    }

    fn on_page_start(&self, page_no: usize) {
        self.bar.set_message(format!("page {page_no}"));
    }

    fn on_stage_fallback(&self, page_no: usize, _from: &str, to: &str) {
        self.fallbacks.fetch_add(1, Ordering::SeqCst);
        self.bar.set_message(format!("page {page_no} ({to})"));
    }

    fn on_page_complete(&self, page_no: usize, slice_count: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}  {}",
            green("✓"),
            page_no,
            dim(&format!("{slice_count:>4} slices")),
        ));
        self.bar.inc(1);
    }

    fn on_page_skipped(&self, page_no: usize) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
        self.bar
            .println(format!("  {} Page {:>3}  {}", yellow("–"), page_no, dim("no content")));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, page_count: usize, slice_count: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages, {} slices  {}",
            green("✔"),
            bold(&page_count.to_string()),
            bold(&slice_count.to_string()),
            dim(&format!(
                "({} fallbacks, {} skipped)",
                self.fallbacks.load(Ordering::SeqCst),
                self.skipped.load(Ordering::SeqCst)
            )),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # All pages, JSON on stdout
  pdfslice report.pdf

  # Pages 3 to 10 into a file
  pdfslice report.pdf --first-page 3 --last-page 10 -o report.json

  # Scanned document: skip the text layer
  pdfslice --pipeline full scan.pdf -o scan.json

  # Smaller output: no renders
  pdfslice --no-page-screenshots --no-slice-screenshots report.pdf

PIPELINES:
  fast     text layer only
  full     full-page stage only
  hybrid   text layer, then full-page stage for pages without text (default)

ENVIRONMENT VARIABLES:
  RUST_LOG   Override the log filter (e.g. pdf_slicer=debug)

SETUP:
  pdfium must be available: place libpdfium next to the working directory
  or install it system-wide.
"#;

/// Decompose PDF pages into typed, positioned content slices.
#[derive(Parser, Debug)]
#[command(
    name = "pdfslice",
    version,
    about = "Decompose PDF pages into typed, positioned content slices",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Write JSON to this file instead of stdout.
    #[arg(short, long, env = "PDFSLICE_OUTPUT")]
    output: Option<PathBuf>,

    /// First page to extract (1-indexed).
    #[arg(long, default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..))]
    first_page: u32,

    /// Last page to extract (inclusive). Default: last page of the document.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    last_page: Option<u32>,

    /// Recognition stages to run.
    #[arg(long, env = "PDFSLICE_PIPELINE", value_enum, default_value = "hybrid")]
    pipeline: PipelineArg,

    /// Scale factor for renders (1.0 = 72 DPI).
    #[arg(long, env = "PDFSLICE_IMAGES_SCALE", default_value_t = 3.0)]
    images_scale: f32,

    /// Encoding for emitted images.
    #[arg(long, env = "PDFSLICE_IMAGE_FORMAT", value_enum, default_value = "webp")]
    image_format: ImageFormatArg,

    /// JPEG quality (1–100).
    #[arg(long, default_value_t = 80,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    image_quality: u8,

    /// Decimal places kept in positions (0–6).
    #[arg(long, default_value_t = 2,
          value_parser = clap::value_parser!(u32).range(0..=6))]
    bbox_precision: u32,

    /// Omit page renders.
    #[arg(long)]
    no_page_screenshots: bool,

    /// Omit table, picture, formula and code renders.
    #[arg(long)]
    no_slice_screenshots: bool,

    /// Fail when a converted tree lacks a requested page.
    #[arg(long)]
    strict: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFSLICE_PASSWORD")]
    password: Option<String>,

    /// Disable progress bar.
    #[arg(long, env = "PDFSLICE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFSLICE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFSLICE_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PipelineArg {
    Fast,
    Full,
    Hybrid,
}

impl From<PipelineArg> for OcrPipeline {
    fn from(v: PipelineArg) -> Self {
        match v {
            PipelineArg::Fast => OcrPipeline::Fast,
            PipelineArg::Full => OcrPipeline::Full,
            PipelineArg::Hybrid => OcrPipeline::Hybrid,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ImageFormatArg {
    Webp,
    Png,
    Jpeg,
}

impl From<ImageFormatArg> for ImageFormat {
    fn from(v: ImageFormatArg) -> Self {
        match v {
            ImageFormatArg::Webp => ImageFormat::Webp,
            ImageFormatArg::Png => ImageFormat::Png,
            ImageFormatArg::Jpeg => ImageFormat::Jpeg,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress;
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
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run extraction ───────────────────────────────────────────────────
    let start = Instant::now();
    let source = Source::from_path(&cli.input);
    let document = source.name();
    let size = source.size();

    let extractor = tokio::task::block_in_place(|| ContentExtractor::with_pdfium(source, config))
        .with_context(|| format!("Failed to open {}", cli.input.display()))?;

    let first_page = cli.first_page as usize;
    let last_page = cli.last_page.map(|n| n as usize);
    let mut stream = extract_stream(extractor, first_page, last_page);

    let mut pages = Vec::new();
    while let Some(page) = stream.next().await {
        pages.push(page.context("Extraction failed")?);
    }

    let output = ExtractionOutput {
        document,
        size,
        content_type: PDF_CONTENT_TYPE.to_string(),
        pages,
    };

    // ── Write output ─────────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        write_output(&output, output_path)
            .await
            .context("Failed to write output")?;
        if !cli.quiet {
            eprintln!(
                "{}  {} pages  {} slices  {}ms  →  {}",
                cyan("◆"),
                output.pages.len(),
                output.slice_count(),
                start.elapsed().as_millis(),
                bold(&output_path.display().to_string()),
            );
        }
    } else {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{json}").context("Failed to write to stdout")?;
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    if let Some(last) = cli.last_page {
        if last < cli.first_page {
            anyhow::bail!(
                "Invalid page range '{}-{}': first page must be <= last page",
                cli.first_page,
                last
            );
        }
    }

    let mut builder = ExtractionConfig::builder()
        .ocr_pipeline(cli.pipeline.into())
        .images_scale(cli.images_scale)
        .image_format(cli.image_format.into())
        .image_quality(cli.image_quality)
        .bbox_precision(cli.bbox_precision)
        .include_page_screenshot(!cli.no_page_screenshots)
        .include_slice_screenshot(!cli.no_slice_screenshots)
        .raises_on_error(cli.strict);

    if let Some(name) = cli.input.file_name() {
        builder = builder.filename(name.to_string_lossy());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
