//! CLI binary for fileconv.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, writes artifacts into a directory and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use fileconv::{
    common_conversions, offered_for, resolve_input, run, scale_applies, BatchOutput,
    ConversionConfig, ConversionKind, ConversionProgressCallback, ConversionSpec,
    ConverterRegistry, DirectorySink, InputFile, PageSize, PdfImageEncoding, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch, one log line per file.
/// The heartbeat percent of the current file is shown in the bar's message.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Name and start time of each file that has started.
    started: Mutex<HashMap<usize, (String, Instant)>>,
    errors: AtomicUsize,
    cancelled: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_batch_start` tells us the file count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading inputs…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
            cancelled: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.set_message("");
    }

    fn finish(&self, index: usize) -> (String, f64) {
        self.started
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&index))
            .map(|(name, t)| (name, t.elapsed().as_secs_f64()))
            .unwrap_or_else(|| (format!("#{}", index + 1), 0.0))
    }

    fn name_of(&self, index: usize) -> String {
        self.started
            .lock()
            .ok()
            .and_then(|m| m.get(&index).map(|(n, _)| n.clone()))
            .unwrap_or_default()
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.activate_bar(total);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total} file(s)…"))
        ));
    }

    fn on_job_start(&self, index: usize, _total: usize, name: &str) {
        if let Ok(mut m) = self.started.lock() {
            m.insert(index, (name.to_string(), Instant::now()));
        }
        self.bar.set_message(name.to_string());
    }

    fn on_job_progress(&self, index: usize, _total: usize, percent: u8) {
        self.bar
            .set_message(format!("{} {}", self.name_of(index), dim(&format!("{percent:>2}%"))));
    }

    fn on_job_complete(&self, index: usize, total: usize, output_name: &str, bytes: usize) {
        let (name, secs) = self.finish(index);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {} → {}  {}  {}",
            green("✓"),
            index + 1,
            total,
            name,
            bold(output_name),
            dim(&format!("{bytes:>8} bytes")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_job_error(&self, index: usize, total: usize, error: &str) {
        let (name, secs) = self.finish(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            red("✗"),
            index + 1,
            total,
            name,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_job_cancelled(&self, _index: usize, _total: usize) {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, completed: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        let cancelled = self.cancelled.load(Ordering::SeqCst);

        if failed == 0 && cancelled == 0 {
            eprintln!(
                "{} {} file(s) converted successfully",
                green("✔"),
                bold(&completed.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} file(s) converted  ({} failed, {} cancelled)",
                if completed == 0 { red("✘") } else { yellow("⚠") },
                bold(&completed.to_string()),
                total,
                red(&failed.to_string()),
                cancelled,
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Rasterise an SVG at 4× its declared size
  fileconv --to to-png --scale 4 logo.svg

  # Re-encode a folder of PNGs as WebP into ./out
  fileconv --to to-webp --out-dir out photos/*.png

  # Put scans on Letter pages, keeping transparency
  fileconv --to to-pdf --page-size letter --lossless-pdf scan1.png scan2.jpg

  # Convert from a URL
  fileconv --to to-png https://example.com/logo.svg

  # Which conversions do these files have in common?
  fileconv --list a.svg b.png

  # Machine-readable summary
  fileconv --to to-webp --json *.jpg > summary.json

CONVERSIONS:
  Key       Sources                              Output
  ────────  ───────────────────────────────────  ─────────────────────────
  to-png    SVG (scaled), PNG, JPEG, WebP, GIF   PNG, alpha kept
  to-webp   SVG (scaled), PNG, JPEG, WebP, GIF   lossy WebP (--quality)
  to-pdf    SVG, PNG, JPEG, WebP, GIF, BMP       single page, image centred

  to-jpg and the office formats are listed by --list but not converted.

OUTPUT NAMES:
  photo.png → converted-photo.webp      scan.pdf → converted-scan.pdf

Press Ctrl-C to stop after the file currently converting.
"#;

/// Convert SVG, PNG, JPEG and WebP files to PNG, WebP or PDF.
#[derive(Parser, Debug)]
#[command(
    name = "fileconv",
    version,
    about = "Batch-convert images: SVG to PNG, images to WebP, images to PDF",
    long_about = "Convert a batch of files (local paths or URLs) with one conversion type. \
Files are converted one at a time in the order given; a file that fails is reported and \
the rest of the batch continues.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file paths or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Conversion type: to-png, to-webp, to-pdf.
    #[arg(short = 't', long = "to", env = "FILECONV_TO")]
    to: Option<String>,

    /// Scale factor for SVG sources (0.5–64).
    #[arg(short, long, env = "FILECONV_SCALE", default_value_t = 1.0)]
    scale: f32,

    /// Directory to write converted files into.
    #[arg(short, long, env = "FILECONV_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Pixel density multiplied into the scale for SVG sources.
    #[arg(long, env = "FILECONV_DENSITY", default_value_t = 1.0)]
    density: f32,

    /// WebP quality (0.0–1.0).
    #[arg(long, env = "FILECONV_QUALITY", default_value_t = 0.8)]
    quality: f32,

    /// JPEG quality for images embedded in PDFs (1–100).
    #[arg(long, env = "FILECONV_JPEG_QUALITY", default_value_t = 92,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// PDF page size: a4, letter, or WIDTHxHEIGHT in points.
    #[arg(long, env = "FILECONV_PAGE_SIZE", default_value = "a4")]
    page_size: String,

    /// Embed PDF images losslessly, keeping transparency.
    #[arg(long, env = "FILECONV_LOSSLESS_PDF")]
    lossless_pdf: bool,

    /// Print the conversions offered for the inputs and exit.
    #[arg(long)]
    list: bool,

    /// Print a JSON summary (BatchOutput) to stdout.
    #[arg(long, env = "FILECONV_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "FILECONV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FILECONV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FILECONV_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "FILECONV_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.list;
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

    // ── Resolve inputs ───────────────────────────────────────────────────
    let mut files = Vec::with_capacity(cli.inputs.len());
    for input in &cli.inputs {
        let file = resolve_input(input, cli.download_timeout)
            .await
            .with_context(|| format!("Failed to read input '{input}'"))?;
        files.push(file);
    }

    // ── List mode ────────────────────────────────────────────────────────
    if cli.list {
        print_offered(&files, cli.json)?;
        return Ok(());
    }

    let Some(to) = cli.to.clone() else {
        anyhow::bail!("--to is required (one of: to-png, to-webp, to-pdf); see --list");
    };

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{}", yellow("Stopping after the current file…"));
                cancel.cancel();
            }
        });
    }

    tokio::fs::create_dir_all(&cli.out_dir)
        .await
        .with_context(|| format!("Failed to create output directory {:?}", cli.out_dir))?;

    let config = build_config(&cli, progress_cb, cancel)?;
    let spec = ConversionSpec::new(to).with_scale(cli.scale);

    // ── Run conversion ───────────────────────────────────────────────────
    let output = run(files, &spec, &config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet && !show_progress {
        print_summary(&output);
    }

    if !cli.quiet && !cli.json && output.stats.completed_files > 0 {
        eprintln!(
            "   {} bytes written to {}  —  {}ms total",
            dim(&output.stats.output_bytes.to_string()),
            bold(&cli.out_dir.display().to_string()),
            output.stats.total_duration_ms,
        );
    }

    output.into_result().context("Some files failed")?;
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(
    cli: &Cli,
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .pixel_density(cli.density)
        .webp_quality(cli.quality)
        .jpeg_quality(cli.jpeg_quality)
        .page_size(parse_page_size(&cli.page_size)?)
        .pdf_image_encoding(if cli.lossless_pdf {
            PdfImageEncoding::Lossless
        } else {
            PdfImageEncoding::Jpeg
        })
        .download_timeout_secs(cli.download_timeout)
        .output_sink(Arc::new(DirectorySink::new(&cli.out_dir)))
        .cancel_token(cancel);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--page-size`: `a4`, `letter` or `WIDTHxHEIGHT` in points.
fn parse_page_size(s: &str) -> Result<PageSize> {
    let s = s.trim().to_lowercase();
    match s.as_str() {
        "a4" => Ok(PageSize::A4),
        "letter" => Ok(PageSize::Letter),
        custom => {
            let (w, h) = custom
                .split_once('x')
                .with_context(|| format!("Invalid page size '{custom}': use a4, letter or WxH"))?;
            let width: f32 = w.trim().parse().context("Invalid page width")?;
            let height: f32 = h.trim().parse().context("Invalid page height")?;
            if !(width > 0.0 && height > 0.0) {
                anyhow::bail!("Page size must be positive (got {width}x{height})");
            }
            Ok(PageSize::Custom { width, height })
        }
    }
}

fn print_summary(output: &BatchOutput) {
    for job in &output.jobs {
        match (&job.output_name, &job.error) {
            (Some(out), _) => eprintln!("{} {} → {}", green("✓"), job.name, out),
            (None, Some(e)) => eprintln!("{} {}: {}", red("✗"), job.name, e),
            (None, None) => eprintln!("{} {}: {}", dim("-"), job.name, job.status),
        }
    }
    eprintln!(
        "Converted {}/{} files in {}ms",
        output.stats.completed_files, output.stats.total_files, output.stats.total_duration_ms
    );
}

/// `--list`: conversions every input offers, and whether this build can run them.
fn print_offered(files: &[InputFile], json: bool) -> Result<()> {
    let media_types: Vec<&str> = files.iter().map(|f| f.media_type()).collect();
    let common = common_conversions(media_types.iter().copied());
    let registry = ConverterRegistry::builtin();

    if json {
        let entries: Vec<_> = common
            .iter()
            .map(|k| {
                serde_json::json!({
                    "key": k.key(),
                    "label": k.label(),
                    "supported": registry.get(*k).is_some(),
                    "scale": scale_applies(media_types.iter().copied(), *k),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("Failed to serialise options")?
        );
        return Ok(());
    }

    for f in files {
        let offered: Vec<&str> = offered_for(f.media_type())
            .iter()
            .map(|k| k.key())
            .collect();
        println!(
            "{}  {}  {}",
            bold(f.name()),
            dim(f.media_type()),
            if offered.is_empty() {
                dim("(no conversions)")
            } else {
                offered.join(", ")
            }
        );
    }

    println!();
    if common.is_empty() {
        println!("No conversion is offered for every file.");
        return Ok(());
    }
    println!("{}", bold("Common to all files:"));
    for kind in common {
        println!("  {}", describe(kind, registry, &media_types));
    }
    Ok(())
}

fn describe(kind: ConversionKind, registry: &ConverterRegistry, media_types: &[&str]) -> String {
    let mut line = format!("{:<8}  {}", kind.key(), kind.label());
    if registry.get(kind).is_none() {
        line.push_str(&format!("  {}", dim("(not available)")));
    } else if scale_applies(media_types.iter().copied(), kind) {
        line.push_str(&format!("  {}", cyan("[--scale 0.5–64]")));
    }
    line
}
