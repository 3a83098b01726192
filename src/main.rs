use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use c2feed::{
    config::{FeedConfig, MalformedPolicy},
    fetch::{FeedSource, FileFeedSource, HttpFeedSource},
    process::{arrow::preview, run_once, FeedMetadata, RunOutcome},
    render::{JsonRenderer, SvgBarRenderer},
    schema::SchemaVersion,
};
use clap::{Parser, ValueEnum};
use prettytable::{format, Cell, Row, Table};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Svg,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Fetch the C2 master feed once and chart its most frequent IPs, providers and malware families"
)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    schema_version: Option<SchemaVersion>,
    /// Number of leading header lines to skip
    #[arg(long)]
    header_lines: Option<usize>,
    /// Header line (0-based) carrying the generation stamp
    #[arg(long)]
    metadata_line: Option<usize>,
    /// Read a local snapshot instead of fetching over HTTP
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Base URL of the feed directory
    #[arg(long)]
    url: Option<String>,
    #[arg(short, long, default_value = "charts")]
    output: PathBuf,
    #[arg(long, value_enum, default_value_t = Format::Svg)]
    format: Format,
    /// Abort on the first malformed record instead of skipping it
    #[arg(long)]
    strict: bool,
    /// Print the first rows of the normalized table
    #[arg(long)]
    dump_table: bool,
    /// Rows per console summary
    #[arg(long, default_value_t = 10)]
    top: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,c2feed=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) configuration ───────────────────────────────────────────
    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => FeedConfig::from_yaml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => FeedConfig::default(),
    };
    if let Some(v) = args.schema_version {
        cfg.schema_version = v;
    }
    if let Some(h) = args.header_lines {
        cfg.header_lines_to_skip = Some(h);
    }
    if let Some(m) = args.metadata_line {
        cfg.metadata_line = m;
    }
    if let Some(url) = &args.url {
        cfg.osint_url = url.clone();
    }
    if args.strict {
        cfg.malformed_policy = MalformedPolicy::Abort;
    }
    cfg.validate().context("invalid configuration")?;
    info!(url = %cfg.feed_url()?, schema = ?cfg.schema_version, header_lines = cfg.header_lines(), "startup");

    // ─── 3) run once ────────────────────────────────────────────────
    let outcome = match &args.input {
        Some(path) => {
            render_with(&cfg, &FileFeedSource::new(path), args.format, &args.output).await?
        }
        None => {
            let source = HttpFeedSource::new(&cfg.fetch)?;
            render_with(&cfg, &source, args.format, &args.output).await?
        }
    };

    // ─── 4) console report ──────────────────────────────────────────
    if args.dump_table {
        println!("{}", preview(&outcome.report.table, args.top)?);
    }
    print_report(&outcome, args.top);
    info!(charts = outcome.artifacts.len(), "done");
    Ok(())
}

async fn render_with<S: FeedSource>(
    cfg: &FeedConfig,
    source: &S,
    format: Format,
    out: &Path,
) -> Result<RunOutcome> {
    let outcome = match format {
        Format::Svg => run_once(cfg, source, &SvgBarRenderer::new(out)).await?,
        Format::Json => run_once(cfg, source, &JsonRenderer::new(out)).await?,
    };
    Ok(outcome)
}

fn print_report(outcome: &RunOutcome, top: usize) {
    let report = &outcome.report;
    let stats = &report.stats;

    let mut overview = Table::new();
    overview.set_format(*format::consts::FORMAT_BOX_CHARS);
    overview.add_row(Row::new(vec![
        Cell::new("Column").style_spec("bFg"),
        Cell::new("Non-null").style_spec("bFg"),
    ]));
    for col in report.table.describe() {
        overview.add_row(Row::new(vec![
            Cell::new(&col.name),
            Cell::new(&col.non_null.to_string()).style_spec("r"),
        ]));
    }
    println!(
        "\n--- Feed {} : {} records, {} malformed, {} unmatched descriptors ---",
        FeedMetadata::label(report.metadata.as_ref()),
        stats.records,
        stats.malformed_records(),
        stats.unmatched_descriptors
    );
    overview.printstd();

    for (summary, artifact) in report.summaries.iter().zip(&outcome.artifacts) {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);
        table.add_row(Row::new(vec![
            Cell::new(&summary.spec.field).style_spec("bFg"),
            Cell::new("Count").style_spec("bFg"),
        ]));
        let kept = summary.table.len();
        for entry in summary.table.descending().into_iter().take(top) {
            table.add_row(Row::new(vec![
                Cell::new(&entry.token),
                Cell::new(&entry.count.to_string()).style_spec("r"),
            ]));
        }
        println!(
            "\n--- {} (count > {}: {} distinct of {} tokens) → {} ---",
            summary.spec.title,
            summary.spec.threshold,
            kept,
            summary.tokens,
            artifact.path.display()
        );
        if kept == 0 {
            println!("no token occurs more than {} times", summary.spec.threshold);
        } else {
            table.printstd();
        }
    }
}
