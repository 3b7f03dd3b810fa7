//! CLI binary for pdf2policy.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, drives the streaming API with a progress bar, and
//! prints per-document cards plus optional CSV/JSON exports.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2policy::{
    extract_stream, write_csv, write_json, BatchStats, Document, DocumentResult,
    ExtractionConfig, PolicyRecord, ReplyFormat, DEFAULT_CSV_FILENAME,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio_stream::StreamExt;
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

const AFTER_HELP: &str = r#"EXAMPLES:
  # Single policy, card display only
  pdf2policy policy.pdf

  # A folder's worth, exported to CSV
  pdf2policy invoices/*.pdf -o extracted_policies.csv

  # JSON export, four documents in flight at once
  pdf2policy *.pdf --concurrency 4 -o policies.json

  # Structured batch report (records, errors, stats) on stdout
  pdf2policy policy.pdf --json > report.json

  # A cheaper model through a compatible proxy
  pdf2policy --model gpt-4o-mini --api-base http://localhost:4000/v1 policy.pdf

  # Line-based reply shape for models that fumble JSON
  pdf2policy --reply-format lines policy.pdf

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY         Completion API key (required)
  PDF2POLICY_MODEL       Override model ID
  PDF2POLICY_API_BASE    Override API base URL

SETUP:
  1. Set API key:     export OPENAI_API_KEY=sk-...
  2. Extract:         pdf2policy policy.pdf -o extracted_policies.csv

Failed documents are reported per file and never abort the batch; CSV/JSON
exports contain the successful records only.
"#;

/// Extract structured fields from insurance policy PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2policy",
    version,
    about = "Extract structured fields from insurance policy PDFs with an LLM",
    long_about = "Extract structured policy fields (policy number, parties, dates, amounts) \
from one or more insurance policy PDFs using an OpenAI-compatible completion endpoint, and \
export the results as CSV or JSON.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// One or more local policy PDF paths.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write results to this file; format chosen by extension (.json → JSON,
    /// anything else → CSV).
    #[arg(short, long, env = "PDF2POLICY_OUTPUT")]
    output: Option<PathBuf>,

    /// Model ID sent with every completion request.
    #[arg(long, env = "PDF2POLICY_MODEL", default_value = "gpt-4o")]
    model: String,

    /// Base URL of the OpenAI-compatible API.
    #[arg(long, env = "PDF2POLICY_API_BASE", default_value = "https://api.openai.com/v1")]
    api_base: String,

    /// Number of documents processed concurrently.
    #[arg(short, long, env = "PDF2POLICY_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Retries when the completion service answers HTTP 429.
    #[arg(long, env = "PDF2POLICY_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Max tokens the model may generate per reply.
    #[arg(long, env = "PDF2POLICY_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Per-completion-call timeout in seconds.
    #[arg(long, env = "PDF2POLICY_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Expected reply shape: json, or lines (one "Key: value" per line).
    #[arg(long, env = "PDF2POLICY_REPLY_FORMAT", value_enum, default_value = "json")]
    reply_format: ReplyFormatArg,

    /// Path to a text file containing a custom prompt template
    /// (must contain the {policy_text} placeholder).
    #[arg(long, env = "PDF2POLICY_PROMPT")]
    prompt: Option<PathBuf>,

    /// Print the structured batch report (records, errors, stats) as JSON.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "PDF2POLICY_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2POLICY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and exports.
    #[arg(short, long, env = "PDF2POLICY_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ReplyFormatArg {
    Json,
    Lines,
}

impl From<ReplyFormatArg> for ReplyFormat {
    fn from(v: ReplyFormatArg) -> Self {
        match v {
            ReplyFormatArg::Json => ReplyFormat::Json,
            ReplyFormatArg::Lines => ReplyFormat::KeyValueLines,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
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

    // ── Load documents ───────────────────────────────────────────────────
    let mut documents = Vec::with_capacity(cli.inputs.len());
    for path in &cli.inputs {
        documents.push(
            Document::from_path(path)
                .await
                .with_context(|| format!("Failed to read '{}'", path.display()))?,
        );
    }
    let total = documents.len();

    let config = build_config(&cli).await?;

    // ── Run the batch ────────────────────────────────────────────────────
    let start = Instant::now();
    let bar = if show_progress {
        Some(make_progress_bar(total))
    } else {
        None
    };

    let mut stream = extract_stream(documents, &config)
        .await
        .context("Extraction failed to start")?;

    let mut results: Vec<DocumentResult> = Vec::with_capacity(total);
    while let Some(result) = stream.next().await {
        if let Some(ref bar) = bar {
            let line = match &result.error {
                None => format!(
                    "  {} {:<30} {}",
                    green("✓"),
                    result.filename,
                    dim(&format!("{:.1}s", result.duration_ms as f64 / 1000.0)),
                ),
                Some(e) => {
                    // Keep log lines tidy; the full error resurfaces on the card.
                    let msg: String = e.to_string().chars().take(79).collect();
                    format!("  {} {:<30} {}", red("✗"), result.filename, red(&msg))
                }
            };
            bar.println(line);
            bar.inc(1);
        }
        results.push(result);
    }
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    // Completion order → upload order.
    results.sort_by_key(|r| r.index);

    let extracted = results.iter().filter(|r| r.is_ok()).count();
    let stats = BatchStats {
        total_documents: total,
        extracted,
        failed: total - extracted,
        total_input_tokens: results.iter().map(|r| r.input_tokens as u64).sum(),
        total_output_tokens: results.iter().map(|r| r.output_tokens as u64).sum(),
        total_duration_ms: start.elapsed().as_millis() as u64,
    };

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        let report = pdf2policy::BatchOutput { results, stats };
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
        return Ok(());
    }

    if !cli.quiet {
        for result in &results {
            print_card(result);
        }
        print_summary(&stats);
    }

    // ── Export ───────────────────────────────────────────────────────────
    if let Some(ref path) = cli.output {
        let is_json = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            write_json(&results, path).await?;
        } else {
            write_csv(&results, path).await?;
        }
        if !cli.quiet {
            eprintln!(
                "{} {} record(s) written to {}",
                green("✔"),
                extracted,
                bold(&path.display().to_string())
            );
        }
    } else if extracted > 0 && !cli.quiet {
        // Keep stdout clean for piping: `pdf2policy x.pdf --json | jq`.
        eprintln!(
            "{}",
            dim(&format!(
                "Tip: add -o {DEFAULT_CSV_FILENAME} to export these records."
            ))
        );
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .model(&cli.model)
        .api_base(&cli.api_base)
        .concurrency(cli.concurrency)
        .max_retries(cli.max_retries)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .reply_format(cli.reply_format.clone().into());

    if let Some(ref path) = cli.prompt {
        let template = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt template from {path:?}"))?;
        builder = builder.prompt_template(template);
    }

    builder.build().context("Invalid configuration")
}

fn make_progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>2}/{len} documents  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  "),
    );
    bar.set_prefix("Extracting");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Per-document card, mirroring the canonical field set.
///
/// OD/TP rows appear only for motor policies — the display mirror of the
/// normalizer's rule, gated on the same `is_motor` check.
fn print_card(result: &DocumentResult) {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let _ = writeln!(out, "\n{} {}", cyan("▌"), bold(&result.filename));

    match (&result.record, &result.error) {
        (Some(record), _) => print_record_fields(&mut out, record),
        (None, Some(error)) => {
            let _ = writeln!(out, "  {}", red(&error.to_string()));
            if let Some(raw) = error.raw_reply() {
                let _ = writeln!(out, "  {}", dim("Raw model reply:"));
                for line in raw.lines().take(12) {
                    let _ = writeln!(out, "  {}", dim(line));
                }
            }
        }
        (None, None) => {}
    }
}

fn print_record_fields(out: &mut impl Write, record: &PolicyRecord) {
    let opt = |o: &Option<String>| o.clone().unwrap_or_else(|| "N/A".into());
    let _ = writeln!(out, "  Insurance Company:  {}", opt(&record.insurance_company));
    let _ = writeln!(out, "  Insurance Type:     {}", opt(&record.insurance_type));
    let _ = writeln!(out, "  Customer Name:      {}", opt(&record.customer_name));
    let _ = writeln!(out, "  Policy Number:      {}", opt(&record.policy_number));
    let _ = writeln!(
        out,
        "  Duration:           {} → {}",
        opt(&record.start_date),
        opt(&record.end_date)
    );
    let _ = writeln!(out, "  SP Code:            {}", opt(&record.sp_code));
    let _ = writeln!(out, "  Sum Insured:        {}", record.sum_insured);
    let _ = writeln!(
        out,
        "  Gross Amount:       {}  |  Net Amount: {}",
        record.gross_amount, record.net_amount
    );
    if record.is_motor() {
        let _ = writeln!(
            out,
            "  OD Amount:          {}  |  TP Amount: {}",
            record.od_amount, record.tp_amount
        );
    }
    if !record.extra.is_empty() {
        for (key, value) in &record.extra {
            if !value.is_null() {
                let _ = writeln!(out, "  {}: {}", dim(key), dim(&value.to_string()));
            }
        }
    }
}

fn print_summary(stats: &BatchStats) {
    if stats.failed == 0 {
        eprintln!(
            "\n{} {} document(s) extracted in {}ms",
            green("✔"),
            bold(&stats.extracted.to_string()),
            stats.total_duration_ms
        );
    } else {
        eprintln!(
            "\n{} {}/{} documents extracted  ({} failed)  {}ms",
            if stats.extracted == 0 { red("✘") } else { cyan("⚠") },
            bold(&stats.extracted.to_string()),
            stats.total_documents,
            red(&stats.failed.to_string()),
            stats.total_duration_ms
        );
    }
    eprintln!(
        "   {} tokens in  /  {} tokens out",
        dim(&stats.total_input_tokens.to_string()),
        dim(&stats.total_output_tokens.to_string()),
    );
}
