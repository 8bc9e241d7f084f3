//! CLI binary for paper2notion.
//!
//! A thin shim over the library crate: scans for papers, maps CLI flags to
//! `ReviewConfig`, runs the batch with Ctrl-C wired to the interrupt flag,
//! and prints per-paper results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use paper2notion::{
    parse_zotero_bib_file, scan_directory, AnalysisBackend, BatchReport, DocumentTask,
    GeminiBackend, LlmBackend, NotionWriter, Outcome, PaperPair, ProgressCallback, ReviewConfig,
    ReviewPipeline, ReviewProgressCallback, DEFAULT_MODEL,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;
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

/// First `max` chars of `s`, with an ellipsis when cut.
fn clip(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}\u{2026}", &s[..idx]),
        None => s.to_string(),
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch, one log line per paper.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:32.green/238}] {pos:>3}/{len} papers  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(0);
        bar.set_style(style);
        bar.set_prefix("Reviewing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ReviewProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Reviewing {total} paper(s)…"))
        ));
    }

    fn on_document_start(&self, _index: usize, _total: usize, document_id: &str) {
        if let Ok(mut s) = self.started.lock() {
            *s = Some(Instant::now());
        }
        self.bar.set_message(document_id.to_string());
    }

    fn on_document_complete(&self, index: usize, total: usize, document_id: &str) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            index,
            total,
            document_id,
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, _document_id: &str, error: &str) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            red(&clip(error, 100)),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _total: usize, _success_count: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Review every paper directory under ./papers
  paper2notion papers/

  # Review a Zotero export instead of scanning directories
  paper2notion --zotero-bib ~/Zotero/library.bib

  # See what would be reviewed, without calling any API
  paper2notion --dry-run papers/

  # Use another provider through edgequake-llm (PDF sent inline)
  paper2notion --backend llm --provider anthropic --model claude-sonnet-4-20250514 papers/

  # Machine-readable report
  paper2notion --json papers/ > report.json

DIRECTORY LAYOUT:
  papers/attention/attention.bib   one .bib and one .pdf per paper directory
  papers/attention/attention.pdf   (or both directly in the given directory)

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Gemini API key (gemini backend)
  NOTION_TOKEN            Notion integration token
  NOTION_DATABASE_ID      Target database id (32 hex digits, dashes allowed)
  OPENAI_API_KEY, ANTHROPIC_API_KEY, …
                          Provider keys for the llm backend
  RUST_LOG                Override log filter (e.g. paper2notion=debug)

NOTION DATABASE PROPERTIES:
  Name (title), Authors (multi-select), Year (number),
  BibTeX Key (text), URL/DOI (url)

EXIT CODES:
  0  every paper filed (or nothing to do)
  1  at least one paper failed, or setup failed
  130 interrupted with Ctrl-C
"#;

/// Review research papers with an LLM and file the reviews into Notion.
#[derive(Parser, Debug)]
#[command(
    name = "paper2notion",
    version,
    about = "Review research papers with an LLM and file the reviews into Notion",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory to scan for papers.
    #[arg(default_value = ".")]
    directory: PathBuf,

    /// Zotero-exported BibTeX file to read instead of scanning a directory.
    #[arg(short = 'z', long, env = "PAPER2NOTION_ZOTERO_BIB")]
    zotero_bib: Option<PathBuf>,

    /// Analysis backend.
    #[arg(long, env = "PAPER2NOTION_BACKEND", value_enum, default_value = "gemini")]
    backend: BackendArg,

    /// Model ID.
    #[arg(long, env = "PAPER2NOTION_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// LLM provider for the llm backend: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Seconds between readiness checks on an uploaded paper.
    #[arg(long, env = "PAPER2NOTION_POLL_INTERVAL", default_value_t = 2)]
    poll_interval: u64,

    /// Seconds to wait for an uploaded paper to become ready.
    #[arg(long, env = "PAPER2NOTION_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Path to a text file containing a custom system instruction.
    #[arg(long, env = "PAPER2NOTION_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// List the papers that would be reviewed and exit.
    #[arg(long)]
    dry_run: bool,

    /// Print the batch report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PAPER2NOTION_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, hide = true)]
    gemini_api_key: Option<String>,

    #[arg(long, env = "NOTION_TOKEN", hide_env_values = true, hide = true)]
    notion_token: Option<String>,

    #[arg(long, env = "NOTION_DATABASE_ID", hide = true)]
    notion_database_id: Option<String>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum BackendArg {
    /// Gemini Files API (upload, poll, generate).
    Gemini,
    /// Any edgequake-llm provider, PDF sent inline.
    Llm,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs unless -v is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.dry_run;
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

    match run(&cli, show_progress).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {:#}", red("error:"), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, show_progress: bool) -> Result<u8> {
    // ── Discover papers ──────────────────────────────────────────────────
    let pairs = discover(cli)?;
    if pairs.is_empty() {
        if !cli.quiet {
            eprintln!("No papers found. Nothing to do.");
        }
        return Ok(0);
    }

    if cli.dry_run {
        print_pairs(&pairs, cli.json)?;
        return Ok(0);
    }

    // ── Build pipeline ───────────────────────────────────────────────────
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ReviewProgressCallback>)
    } else {
        None
    };
    let config = build_config(cli, progress).await?;
    let backend = build_backend(cli, &config)?;

    let token = cli
        .notion_token
        .as_deref()
        .context("NOTION_TOKEN is not set")?;
    let database_id = cli
        .notion_database_id
        .as_deref()
        .context("NOTION_DATABASE_ID is not set")?;
    let writer = NotionWriter::new(token, database_id).context("Invalid Notion settings")?;

    let pipeline = ReviewPipeline::new(backend, Arc::new(writer), config);
    let tasks: Vec<DocumentTask> = pairs.iter().map(DocumentTask::from_pair).collect();

    // ── Run with Ctrl-C wired to the interrupt flag ──────────────────────
    let (interrupt_tx, interrupt_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = interrupt_tx.send(true);
        }
    });

    let report = pipeline.process_batch_until(&tasks, interrupt_rx).await;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        print_report(&report);
    }

    Ok(report.exit_code())
}

fn discover(cli: &Cli) -> Result<Vec<PaperPair>> {
    match cli.zotero_bib {
        Some(ref bib) => parse_zotero_bib_file(bib)
            .with_context(|| format!("Failed to read Zotero export {}", bib.display())),
        None => scan_directory(&cli.directory)
            .with_context(|| format!("Failed to scan {}", cli.directory.display())),
    }
}

/// Map CLI args to `ReviewConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ReviewConfig> {
    let mut builder = ReviewConfig::builder()
        .model(cli.model.clone())
        .poll_interval_secs(cli.poll_interval)
        .processing_timeout_secs(cli.timeout);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn build_backend(cli: &Cli, config: &ReviewConfig) -> Result<Arc<dyn AnalysisBackend>> {
    match cli.backend {
        BackendArg::Gemini => {
            let Some(ref key) = cli.gemini_api_key else {
                bail!("GEMINI_API_KEY is not set (required by the gemini backend)");
            };
            Ok(Arc::new(GeminiBackend::new(key.clone())?))
        }
        BackendArg::Llm => Ok(Arc::new(
            LlmBackend::from_config(config).context("Failed to initialise LLM provider")?,
        )),
    }
}

fn print_pairs(pairs: &[PaperPair], json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(pairs).context("Failed to serialise papers")?
        );
        return Ok(());
    }

    println!("{} paper(s) would be reviewed:", bold(&pairs.len().to_string()));
    for pair in pairs {
        let meta = &pair.metadata;
        println!(
            "  {:<28} {}  {}",
            meta.bib_key,
            clip(&meta.title, 60),
            dim(&format!(
                "{} · {}",
                meta.year.map(|y| y.to_string()).unwrap_or_else(|| "n.d.".into()),
                pair.pdf_path.display()
            )),
        );
    }
    Ok(())
}

fn print_report(report: &BatchReport) {
    for outcome in &report.outcomes {
        match outcome {
            Outcome::Success {
                document_id,
                page_id,
            } => eprintln!("  {} {}  {}", green("✓"), document_id, dim(page_id)),
            Outcome::Failed { message, .. } => eprintln!("  {} {}", red("✗"), message),
            Outcome::Cancelled { document_id } => {
                eprintln!("  {} {}  {}", yellow("⊘"), document_id, dim("cancelled"))
            }
        }
    }

    let total = report.outcomes.len() + report.not_started;
    let mark = if report.all_ok() {
        green("✔")
    } else if report.succeeded() == 0 {
        red("✘")
    } else {
        yellow("⚠")
    };
    eprintln!(
        "{} {}/{} filed  ({} failed, {} cancelled, {} not started)",
        mark,
        bold(&report.succeeded().to_string()),
        total,
        report.failed(),
        report.cancelled(),
        report.not_started,
    );
    if report.interrupted {
        eprintln!("{}", yellow("Interrupted by user."));
    }
}
