//! CLI binary for md2pdf.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig` and prints results. With no flags it converts
//! `PROJECT_REPORT.md` in the working directory to `PROJECT_REPORT.pdf`.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use md2pdf::{
    convert, ConversionConfig, ConversionOutput, ConversionProgressCallback, Fidelity,
    ImageStage, ProgressCallback, Stage, TypesetState,
};
use std::io;
use std::path::PathBuf;
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner that shows the current stage and, while the browser is
/// working, the math engine's typeset state.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("md2pdf");
        bar.set_message("starting…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    /// Stop the spinner without a completion line; used on the error path.
    fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        // The text stages are instant; only report the slow ones.
        if matches!(stage, Stage::RenderPdf | Stage::WriteOutput) {
            self.bar.println(format!(
                "  {} {:<16} {}",
                green("✓"),
                stage.to_string(),
                dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
            ));
        }
    }

    fn on_typeset_state(&self, state: TypesetState) {
        self.bar.set_message(format!("render pdf… math {state}"));
    }

    fn on_conversion_complete(&self, _fidelity: Fidelity) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # The fixed run: PROJECT_REPORT.md → PROJECT_REPORT.pdf (+ temp.html)
  md2pdf

  # Another report, explicit output
  md2pdf notes.md -o notes.pdf

  # Embed extra images found next to the report
  md2pdf --image plot_a.png --image plot_b.png

  # Offline: give up on MathJax quickly
  md2pdf --load-timeout 2

  # Fail (exit 2) if math could not be typeset
  md2pdf --strict

  # Machine-readable result
  md2pdf --json > result.json

ENVIRONMENT VARIABLES:
  RUST_LOG               Override log filter (e.g. md2pdf=debug)
  MD2PDF_CHROME          Path to a Chrome/Chromium executable

RUNTIME REQUIREMENTS:
  A Chrome or Chromium install, and network access to cdn.jsdelivr.net and
  cdnjs.cloudflare.com for MathJax. Without network access the PDF is still
  written, with formulas shown as raw LaTeX.
"#;

/// Render a Markdown report with LaTeX math to PDF.
#[derive(Parser, Debug)]
#[command(
    name = "md2pdf",
    version,
    about = "Render a Markdown report with LaTeX math and local images to PDF",
    long_about = "Render a Markdown report with LaTeX math (\\(...\\), \\[...\\]) and local \
images to an A4 PDF via headless Chromium and MathJax. The assembled HTML is kept in temp.html \
for inspection.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown source.
    #[arg(default_value = md2pdf::config::DEFAULT_INPUT)]
    input: PathBuf,

    /// PDF destination (overwritten).
    #[arg(short, long, env = "MD2PDF_OUTPUT", default_value = md2pdf::config::DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Where to write the assembled HTML.
    #[arg(long, env = "MD2PDF_DEBUG_HTML", default_value = md2pdf::config::DEFAULT_DEBUG_HTML)]
    debug_html: PathBuf,

    /// Directory the image allow-list is resolved against.
    #[arg(long, env = "MD2PDF_ASSETS", default_value = ".")]
    assets: PathBuf,

    /// Image file to embed as a data-URI (repeatable). Replaces the default list.
    #[arg(long = "image", value_name = "FILE")]
    images: Vec<String>,

    /// When to inline images: before or after Markdown rendering.
    #[arg(long, env = "MD2PDF_IMAGE_STAGE", value_enum, default_value = "after")]
    image_stage: ImageStageArg,

    /// Seconds to wait for MathJax to load.
    #[arg(long, env = "MD2PDF_LOAD_TIMEOUT", default_value_t = 15,
          value_parser = clap::value_parser!(u64).range(1..=600))]
    load_timeout: u64,

    /// Seconds to wait for MathJax to finish typesetting.
    #[arg(long, env = "MD2PDF_TYPESET_TIMEOUT", default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..=600))]
    typeset_timeout: u64,

    /// Chrome/Chromium executable (default: search the usual locations).
    #[arg(long, env = "MD2PDF_CHROME")]
    chrome: Option<PathBuf>,

    /// Exit with status 2 when the PDF was written with unrendered math.
    #[arg(long, env = "MD2PDF_STRICT")]
    strict: bool,

    /// Print the ConversionOutput as JSON on stdout.
    #[arg(long, env = "MD2PDF_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "MD2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MD2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MD2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ImageStageArg {
    Before,
    After,
}

impl From<ImageStageArg> for ImageStage {
    fn from(v: ImageStageArg) -> Self {
        match v {
            ImageStageArg::Before => ImageStage::BeforeRender,
            ImageStageArg::After => ImageStage::AfterRender,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the spinner is active.
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

    let spinner = show_progress.then(CliProgressCallback::new);
    let progress_cb = spinner
        .clone()
        .map(|s| s as Arc<dyn ConversionProgressCallback>);

    match run(&cli, progress_cb).await {
        Ok(output) => report_success(&cli, &output),
        Err(e) => {
            if let Some(ref spinner) = spinner {
                spinner.clear();
            }
            eprintln!("{} {:#}", red("✘ Error:"), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, progress_cb: Option<ProgressCallback>) -> Result<ConversionOutput> {
    let config = build_config(cli, progress_cb)?;
    convert(&config)
        .await
        .with_context(|| format!("Failed to convert {}", cli.input.display()))
}

fn report_success(cli: &Cli, output: &ConversionOutput) -> ExitCode {
    if cli.json {
        match serde_json::to_string_pretty(output) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("{} failed to serialise output: {e}", red("✘ Error:"));
                return ExitCode::FAILURE;
            }
        }
    }

    if !cli.quiet {
        for w in &output.warnings {
            eprintln!("{} {}", yellow("⚠"), w);
        }
        if !cli.json {
            let mark = match output.fidelity {
                Fidelity::Full => green("✔"),
                Fidelity::Degraded => yellow("⚠"),
            };
            println!(
                "{} PDF written to {}",
                mark,
                bold(&output.output_path.display().to_string())
            );
            eprintln!(
                "   {} display / {} inline formulas, {} image(s) embedded, {}ms total",
                output.stats.display_math,
                output.stats.inline_math,
                output.stats.images_inlined,
                output.stats.total_duration_ms,
            );
            eprintln!(
                "   {}",
                dim(&format!(
                    "debug HTML kept at {}",
                    output.debug_html_path.display()
                ))
            );
        }
    }

    if cli.strict && output.fidelity == Fidelity::Degraded {
        return ExitCode::from(2);
    }
    ExitCode::SUCCESS
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .input(&cli.input)
        .output(&cli.output)
        .debug_html(&cli.debug_html)
        .asset_dir(&cli.assets)
        .image_stage(cli.image_stage.into())
        .load_timeout(Duration::from_secs(cli.load_timeout))
        .typeset_timeout(Duration::from_secs(cli.typeset_timeout));

    if !cli.images.is_empty() {
        builder = builder.images(cli.images.iter().cloned());
    }
    if let Some(ref chrome) = cli.chrome {
        builder = builder.chrome_executable(chrome);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_path_clears_the_spinner() {
        let spinner = CliProgressCallback::new();
        spinner.on_stage_start(Stage::RenderPdf);
        spinner.clear();
        assert!(spinner.bar.is_finished());
    }

    #[test]
    fn no_flags_is_the_fixed_run() {
        let cli = Cli::parse_from(["md2pdf"]);
        let config = build_config(&cli, None).unwrap();
        let default = ConversionConfig::default();
        assert_eq!(config.input, default.input);
        assert_eq!(config.output, default.output);
        assert_eq!(config.debug_html, default.debug_html);
        assert_eq!(config.images, default.images);
        assert_eq!(config.typeset, default.typeset);
        assert_eq!(config.image_stage, ImageStage::AfterRender);
    }

    #[test]
    fn image_flags_replace_allow_list() {
        let cli = Cli::parse_from(["md2pdf", "r.md", "--image", "a.png", "--image", "b.jpg"]);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.input, PathBuf::from("r.md"));
        assert_eq!(config.images, vec!["a.png", "b.jpg"]);
    }

    #[test]
    fn zero_timeout_is_rejected_by_clap() {
        assert!(Cli::try_parse_from(["md2pdf", "--load-timeout", "0"]).is_err());
    }
}
