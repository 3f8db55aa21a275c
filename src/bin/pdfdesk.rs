//! CLI binary for pdfdesk.
//!
//! A thin shim over the library crate: one subcommand per action, a spinner
//! as the busy indicator, and the action's status line as the last word.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use pdfdesk::{
    inspect, read_source, Action, CompressionLevel, Dispatcher, NoopProgressCallback, Operation,
    OperationOutput, OperationProgressCallback, OperationReport, Presentation, ProgressCallback,
    RotationAngle, StatusKind, StatusMessage, ToolkitConfig, Workspace,
};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

// ── Busy indicator using indicatif ───────────────────────────────────────────

/// Shows a spinner while an action runs; the spinner message follows the
/// status line and the page counter.
struct SpinnerCallback {
    bar: ProgressBar,
}

impl SpinnerCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::hidden();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        Arc::new(Self { bar })
    }
}

impl OperationProgressCallback for SpinnerCallback {
    fn on_operation_start(&self, action: Action) {
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
        self.bar.set_prefix(action.slug());
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_status(&self, _action: Action, status: &StatusMessage) {
        if status.kind == StatusKind::Neutral {
            self.bar.set_message(status.text.clone());
        }
    }

    fn on_page_complete(&self, _action: Action, page_num: usize, total_pages: usize) {
        self.bar.set_message(format!("page {page_num}/{total_pages}"));
    }

    fn on_operation_complete(&self, _action: Action, _status: &StatusMessage) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Every page of a PDF as JPEG, with an HTML preview page
  pdfdesk to-images report.pdf -o pages/

  # Images to one PDF (pages follow file-name order)
  pdfdesk from-images scan-2.png scan-1.jpg

  # One PDF per page
  pdfdesk split report.pdf -o parts/

  # Merge (file-name order, not argument order)
  pdfdesk merge b.pdf a.pdf

  # Set every page to 90° (absolute, not added to the current rotation)
  pdfdesk rotate --degrees 90 report.pdf

  # Compress
  pdfdesk compress --level high report.pdf

  # Document facts
  pdfdesk inspect report.pdf --json

  # Drop previews and cached pages
  pdfdesk clear

ENVIRONMENT VARIABLES:
  PDFDESK_OUTPUT_DIR   Default for --output-dir
  PDFDESK_CACHE_DIR    Where previews are kept (default: platform cache dir)
  PDFIUM_LIB_PATH      Path to libpdfium (file or directory), needed by to-images
  RUST_LOG             Overrides the log filter, e.g. RUST_LOG=pdfdesk=debug
"#;

/// Local PDF desk: pages to images, images to PDF, split, merge, rotate, compress.
#[derive(Parser, Debug)]
#[command(
    name = "pdfdesk",
    version,
    about = "Local PDF desk: pages to images, images to PDF, split, merge, rotate, compress",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory downloads are written to.
    #[arg(short, long, global = true, env = "PDFDESK_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Render scale for to-images (1.0 = 72 DPI).
    #[arg(long, global = true, env = "PDFDESK_SCALE", default_value_t = 1.5)]
    scale: f32,

    /// JPEG quality for to-images (1–100).
    #[arg(long, global = true, env = "PDFDESK_JPEG_QUALITY", default_value_t = 92,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// PDF user password for encrypted documents (to-images).
    #[arg(long, global = true, env = "PDFDESK_PASSWORD")]
    password: Option<String>,

    /// Print the operation report as JSON on stdout.
    #[arg(long, global = true, env = "PDFDESK_JSON")]
    json: bool,

    /// Disable the busy spinner.
    #[arg(long, global = true, env = "PDFDESK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFDESK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFDESK_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render every page of a PDF to page_N.jpg.
    ToImages {
        input: Option<PathBuf>,
        /// Skip writing the HTML preview page.
        #[arg(long)]
        no_preview: bool,
    },
    /// Build converted_images.pdf from JPEG/PNG files.
    FromImages { inputs: Vec<PathBuf> },
    /// Write page_N.pdf for every page.
    Split { input: Option<PathBuf> },
    /// Concatenate PDFs into merged.pdf.
    Merge { inputs: Vec<PathBuf> },
    /// Set every page's rotation and write rotated.pdf.
    Rotate {
        input: Option<PathBuf>,
        /// Absolute rotation: 0, 90, 180 or 270.
        #[arg(short, long, default_value = "90", value_parser = parse_rotation)]
        degrees: RotationAngle,
    },
    /// Re-save with optimisations as compressed.pdf.
    Compress {
        input: Option<PathBuf>,
        /// low, medium or high.
        #[arg(short, long, default_value = "medium")]
        level: CompressionLevel,
    },
    /// Print page count, version, metadata and page rotations.
    Inspect { input: PathBuf },
    /// Remove previews and cached pages.
    Clear,
}

fn parse_rotation(s: &str) -> std::result::Result<RotationAngle, String> {
    let degrees: i64 = s
        .trim()
        .trim_end_matches('°')
        .parse()
        .map_err(|_| format!("'{s}' is not a number"))?;
    RotationAngle::try_from(degrees).map_err(|e| e.to_string())
}

/// `--json` output of an action.
#[derive(Serialize)]
struct JsonOutput<'a> {
    report: &'a OperationReport,
    presentation: &'a Presentation,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner carries the feedback while it is on; keep library INFO
    // logs out of its way unless asked for.
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

    let mut workspace = Workspace::with_default_preview_dir(&cli.output_dir);

    let (operation, paths) = match &cli.command {
        Command::ToImages { input, no_preview } => {
            workspace.set_previews_enabled(!no_preview);
            (Operation::PdfToImages, input.iter().cloned().collect())
        }
        Command::FromImages { inputs } => (Operation::ImagesToPdf, inputs.clone()),
        Command::Split { input } => (Operation::Split, input.iter().cloned().collect()),
        Command::Merge { inputs } => (Operation::Merge, inputs.clone()),
        Command::Rotate { input, degrees } => (
            Operation::Rotate { angle: *degrees },
            input.iter().cloned().collect(),
        ),
        Command::Compress { input, level } => (
            Operation::Compress { level: *level },
            input.iter().cloned().collect(),
        ),
        Command::Inspect { input } => return run_inspect(&cli, input).await,
        Command::Clear => return run_clear(&cli, &mut workspace),
    };

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = ToolkitConfig::builder()
        .render_scale(cli.scale)
        .jpeg_quality(cli.jpeg_quality);
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    let config = builder.build().context("Invalid configuration")?;

    let progress: ProgressCallback = if show_progress {
        SpinnerCallback::new() as ProgressCallback
    } else {
        Arc::new(NoopProgressCallback)
    };
    let dispatcher = Dispatcher::new(config).with_progress(progress);

    // ── Run ──────────────────────────────────────────────────────────────
    let action = operation.action();
    workspace.select(action, paths);
    let files = workspace
        .load_selection(action)
        .await
        .context("Failed to read input files")?;

    let report = dispatcher.run(operation, files).await;
    let presentation = workspace
        .present(&report)
        .context("Failed to write output files")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&JsonOutput {
            report: &report,
            presentation: &presentation,
        })
        .context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet || report.status.is_error() {
        print_report(&report, &presentation);
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_report(report: &OperationReport, presentation: &Presentation) {
    if report.status.is_error() {
        eprintln!("{} {}", red("✘"), report.status.text);
        return;
    }

    eprintln!(
        "{} {}  {}",
        green("✔"),
        bold(&report.status.text),
        dim(&format!("{}ms", report.duration_ms))
    );
    if let Some(OperationOutput::Compressed { stats, .. }) = &report.output {
        eprintln!(
            "  {} {} → {} bytes ({:.1}% saved)",
            dim("≈"),
            stats.original_size,
            stats.compressed_size,
            stats.savings_ratio() * 100.0
        );
    }
    for path in &presentation.downloads {
        eprintln!("  {} {}", cyan("↓"), path.display());
    }
    if let Some(ref page) = presentation.preview_page {
        eprintln!("  {} preview: {}", cyan("◆"), page.display());
    }
}

async fn run_inspect(cli: &Cli, input: &Path) -> Result<ExitCode> {
    let source = read_source(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let info = inspect(source).await.context("Failed to inspect PDF")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&info).context("Failed to serialise metadata")?
        );
    } else {
        println!("File:         {}", input.display());
        if let Some(ref t) = info.title {
            println!("Title:        {}", t);
        }
        if let Some(ref a) = info.author {
            println!("Author:       {}", a);
        }
        println!("Pages:        {}", info.page_count);
        println!("PDF Version:  {}", info.pdf_version);
        println!("Encrypted:    {}", info.encrypted);
        if let Some(ref p) = info.producer {
            println!("Producer:     {}", p);
        }
        let rotations: Vec<String> = info.page_rotations.iter().map(|r| r.to_string()).collect();
        println!("Rotations:    {}", rotations.join(", "));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_clear(cli: &Cli, workspace: &mut Workspace) -> Result<ExitCode> {
    let summary = workspace.clear().context("Failed to clear workspace")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{} Memory has been cleared. Page resources have been released.  {}",
            green("✔"),
            dim(&format!(
                "{} preview file(s) removed from {}",
                summary.preview_files_removed,
                workspace.preview_dir().display()
            ))
        );
    }
    Ok(ExitCode::SUCCESS)
}
