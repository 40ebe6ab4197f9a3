//! CLI binary for edgequake-ocr2md.
//!
//! A thin shim over the library crate that maps CLI flags and an optional
//! settings file to `ConversionConfig`, drives one of the three commands
//! against a vault directory, and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_ocr2md::{
    convert_batch, convert_file, convert_ocr_result, discover_sources, ConversionConfig,
    ConversionProgressCallback, DocumentOutcome, FsStorage, MistralOcrClient, Ocr2MdError,
    OutputArtifact, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
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

/// Terminal progress callback for batches: one bar for the whole queue and
/// a log line per finished document. Documents complete out of order.
struct CliProgressCallback {
    bar: ProgressBar,
    in_flight: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            in_flight: AtomicUsize::new(0),
        })
    }

    fn finish_one(&self) {
        let left = self.in_flight.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        self.bar.set_message(format!("{left} in flight"));
        self.bar.inc(1);
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.bar.set_length(total_documents as u64);
    }

    fn on_document_start(&self, _source: &str) {
        let n = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.bar.set_message(format!("{n} in flight"));
    }

    fn on_document_complete(&self, source: &str, document_path: &str) {
        self.bar.println(format!(
            "  {} {}  {}",
            green("✓"),
            source,
            dim(&format!("→ {document_path}"))
        ));
        self.finish_one();
    }

    fn on_document_error(&self, source: &str, error: &str) {
        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {}  {}", red("✗"), source, red(&msg)));
        self.finish_one();
    }

    fn on_batch_complete(&self, _succeeded: usize, _failed: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert one PDF into the vault at ./notes
  ocr2md --vault notes convert ~/Downloads/paper.pdf

  # Convert every PDF already in the vault, five at a time
  ocr2md --vault notes -c 5 batch

  # Assemble a saved OCR response without calling the API
  ocr2md --vault notes assemble response.json --name paper.pdf

  # Read folders from a settings file, override one of them
  ocr2md --settings data.json --document-folder OCR batch

ENVIRONMENT VARIABLES:
  MISTRAL_API_KEY          OCR API key
  OCR2MD_VAULT             Vault directory (default: current directory)
  OCR2MD_SETTINGS          Settings JSON file
  OCR2MD_DOCUMENT_FOLDER   Folder receiving documents
  OCR2MD_IMAGES_FOLDER     Parent folder of the images folder
  OCR2MD_IMAGES_SUBNAME    Images folder name (default: pdf-mistral-images)
  OCR2MD_CONCURRENCY       Documents converted at once in a batch (default: 3)
"#;

/// Assemble OCR output into Markdown documents with linked images.
#[derive(Parser, Debug)]
#[command(
    name = "ocr2md",
    version,
    about = "Assemble OCR output into Markdown documents with linked images",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    opts: SettingsArgs,

    /// Output structured JSON instead of a summary.
    #[arg(long, global = true, env = "OCR2MD_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "OCR2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "OCR2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "OCR2MD_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// OCR one PDF from anywhere on disk into the vault.
    Convert {
        /// Path to the source PDF.
        input: PathBuf,
    },
    /// OCR PDFs inside the vault with a bounded worker pool.
    Batch {
        /// Vault-relative sources. Default: every `.pdf` in the vault.
        sources: Vec<String>,
    },
    /// Assemble a saved OCR response (JSON) without calling the API.
    Assemble {
        /// Path to the OCR response JSON.
        ocr_json: PathBuf,
        /// Source document name; its stem names the output.
        #[arg(long)]
        name: String,
    },
}

#[derive(Args, Debug)]
struct SettingsArgs {
    /// Vault directory all output paths are relative to.
    #[arg(long, global = true, env = "OCR2MD_VAULT", default_value = ".")]
    vault: PathBuf,

    /// Settings JSON (camelCase keys); flags override its values.
    #[arg(long, global = true, env = "OCR2MD_SETTINGS")]
    settings: Option<PathBuf>,

    /// Folder receiving documents (vault-relative).
    #[arg(long, global = true, env = "OCR2MD_DOCUMENT_FOLDER")]
    document_folder: Option<String>,

    /// Parent folder of the images folder (vault-relative).
    #[arg(long, global = true, env = "OCR2MD_IMAGES_FOLDER")]
    images_folder: Option<String>,

    /// Name of the images sub-folder.
    #[arg(long, global = true, env = "OCR2MD_IMAGES_SUBNAME")]
    images_subname: Option<String>,

    /// Documents converted at once in a batch.
    #[arg(short, long, global = true, env = "OCR2MD_CONCURRENCY")]
    concurrency: Option<usize>,

    /// OCR API key.
    #[arg(long, global = true, env = "MISTRAL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OCR API base URL.
    #[arg(long, global = true, env = "OCR2MD_API_BASE_URL")]
    api_base_url: Option<String>,

    /// OCR model ID.
    #[arg(long, global = true, env = "OCR2MD_MODEL")]
    model: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, env = "OCR2MD_TIMEOUT")]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs during a batch.
    let show_progress = !cli.quiet
        && !cli.no_progress
        && !cli.json
        && matches!(cli.command, Command::Batch { .. });
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

    let config = build_config(&cli.opts).await?;
    let vault = FsStorage::new(cli.opts.vault.clone());

    match &cli.command {
        Command::Convert { input } => {
            let client = MistralOcrClient::from_config(&config).context("Invalid configuration")?;
            let result = convert_file(input, &vault, &client, &config).await;
            report_single(&cli, result)
        }
        Command::Assemble { ocr_json, name } => {
            let raw = tokio::fs::read_to_string(ocr_json)
                .await
                .with_context(|| format!("Failed to read {:?}", ocr_json))?;
            let value: serde_json::Value =
                serde_json::from_str(&raw).context("OCR response is not valid JSON")?;
            let result = convert_ocr_result(value, name, &vault, &config).await;
            report_single(&cli, result)
        }
        Command::Batch { sources } => {
            let client = MistralOcrClient::from_config(&config).context("Invalid configuration")?;
            let sources = if sources.is_empty() {
                discover_sources(&vault)
                    .await
                    .context("Failed to list vault files")?
            } else {
                sources.clone()
            };

            let progress: Option<ProgressCallback> = if show_progress {
                Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
            } else {
                None
            };

            let summary = convert_batch(sources, &vault, &client, &config, progress).await;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&summary).context("Failed to serialise output")?
                );
            } else if !cli.quiet {
                if !show_progress {
                    for report in &summary.reports {
                        match &report.outcome {
                            DocumentOutcome::Converted { document_path, .. } => {
                                eprintln!("  {} {} → {}", green("✓"), report.source, document_path)
                            }
                            DocumentOutcome::AlreadyExists { document_path } => eprintln!(
                                "  {} {}  {} already exists",
                                yellow("•"),
                                report.source,
                                document_path
                            ),
                            DocumentOutcome::Failed { phase, error } => eprintln!(
                                "  {} {}  {} failed: {}",
                                red("✗"),
                                report.source,
                                phase,
                                error
                            ),
                        }
                    }
                }
                eprintln!(
                    "{} {}/{} documents converted  ({} failed, {} already existed)",
                    if summary.failed == 0 { green("✔") } else { yellow("⚠") },
                    bold(&summary.succeeded.to_string()),
                    summary.total(),
                    summary.failed,
                    summary.already_existed,
                );
            }

            if summary.failed > summary.already_existed {
                anyhow::bail!(
                    "{} document(s) failed",
                    summary.failed - summary.already_existed
                );
            }
            Ok(())
        }
    }
}

/// Print the outcome of a single conversion. An existing target is a notice,
/// not an error.
fn report_single(cli: &Cli, result: Result<OutputArtifact, Ocr2MdError>) -> Result<()> {
    let artifact = match result {
        Ok(a) => a,
        Err(Ocr2MdError::AlreadyExists { path }) => {
            if !cli.quiet {
                eprintln!(
                    "{} {} already exists; nothing was written",
                    yellow("•"),
                    bold(&path)
                );
            }
            return Ok(());
        }
        Err(e) => return Err(e).context("Conversion failed"),
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&artifact).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {} pages  {} images  {}ms  →  {}",
            green("✔"),
            artifact.stats.pages,
            artifact.stats.images_written,
            artifact.stats.total_duration_ms,
            bold(&artifact.document_path),
        );
        for failure in &artifact.image_failures {
            eprintln!("   {} {}", yellow("!"), dim(&failure.to_string()));
        }
    }
    Ok(())
}

/// Load the settings file (if any), then apply flag overrides.
async fn build_config(args: &SettingsArgs) -> Result<ConversionConfig> {
    let mut config = if let Some(ref path) = args.settings {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        serde_json::from_str::<ConversionConfig>(&raw)
            .with_context(|| format!("Invalid settings file {:?}", path))?
    } else {
        ConversionConfig::default()
    };

    if let Some(ref v) = args.document_folder {
        config.document_output_folder = v.clone();
    }
    if let Some(ref v) = args.images_folder {
        config.images_output_folder = v.clone();
    }
    if let Some(ref v) = args.images_subname {
        config.images_folder_subname = v.clone();
    }
    if let Some(v) = args.concurrency {
        config.concurrency_limit = v;
    }
    if let Some(ref v) = args.api_key {
        config.api_key = Some(v.clone());
    }
    if let Some(ref v) = args.api_base_url {
        config.api_base_url = v.clone();
    }
    if let Some(ref v) = args.model {
        config.model = v.clone();
    }
    if let Some(v) = args.timeout {
        config.request_timeout_secs = v;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}
