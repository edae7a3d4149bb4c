use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use colored::Colorize;
use redline_core::anchor::{ensure_anchored, strip_anchors};
use redline_core::config::{load_or_default, RedlineConfig};
use redline_core::html::{extract_plain_text, PositionMap};
use redline_core::locator::TextLocator;
use redline_core::reconcile::{Outcome, ReconcileReport, Reconciler};
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "redline")]
#[command(about = "Anchor documents and reconcile model corrections", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to $REDLINE_CONFIG, then built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert paragraph anchors into a plain-text document
    Anchor {
        file: PathBuf,

        /// Print the anchor map as JSON instead of the anchored text
        #[arg(long)]
        map: bool,
    },

    /// Apply a correction payload to a document
    Reconcile {
        /// Plain or already-anchored text
        #[arg(short, long)]
        text: PathBuf,

        /// Raw model output holding the correction array
        #[arg(short = 'r', long)]
        corrections: PathBuf,

        /// Write the corrected text here
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Keep anchor tokens in the written output
        #[arg(long)]
        keep_anchors: bool,

        /// Show a line diff of the document before and after
        #[arg(short, long)]
        diff: bool,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find text in a plain or HTML document
    Locate {
        #[arg(long)]
        haystack: PathBuf,

        #[arg(long)]
        needle: String,

        /// Byte offset to start searching from
        #[arg(long)]
        from: Option<usize>,
    },

    /// Translate offsets between plain text and HTML
    #[command(group(ArgGroup::new("position").required(true).args(["plain", "html_pos"])))]
    Map {
        #[arg(long)]
        html: PathBuf,

        /// Plain-text char index to map into the HTML
        #[arg(long)]
        plain: Option<usize>,

        /// HTML byte offset to map into plain text
        #[arg(long)]
        html_pos: Option<usize>,
    },

    /// Print the normalized plain text of an HTML document
    Extract { file: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Anchor { file, map } => cmd_anchor(&config, &file, map),

        Commands::Reconcile {
            text,
            corrections,
            out,
            keep_anchors,
            diff,
            json,
        } => cmd_reconcile(
            &config,
            &text,
            &corrections,
            out.as_deref(),
            keep_anchors,
            diff,
            json,
        ),

        Commands::Locate {
            haystack,
            needle,
            from,
        } => cmd_locate(&config, &haystack, &needle, from),

        Commands::Map {
            html,
            plain,
            html_pos,
        } => cmd_map(&html, plain, html_pos),

        Commands::Extract { file } => {
            println!("{}", extract_plain_text(&read(&file)?));
            Ok(())
        }
    }
}

/// `RUST_LOG` wins; otherwise only warnings and errors are shown.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn cmd_anchor(config: &RedlineConfig, file: &Path, map: bool) -> Result<()> {
    let anchored = ensure_anchored(&read(file)?, config.anchors.min_paragraph_chars)?;
    if map {
        let entries: Vec<_> = anchored.map().iter().collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print!("{}", anchored.as_str());
    }
    Ok(())
}

fn cmd_reconcile(
    config: &RedlineConfig,
    text: &Path,
    corrections: &Path,
    out: Option<&Path>,
    keep_anchors: bool,
    diff: bool,
    json: bool,
) -> Result<()> {
    let anchored = ensure_anchored(&read(text)?, config.anchors.min_paragraph_chars)?;
    let payload = read(corrections)?;

    let report = Reconciler::new(config.reconciler)
        .reconcile_payload(&anchored, &payload)
        .with_context(|| format!("no corrections applied from {}", corrections.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if diff {
        display_diff(
            text,
            &strip_anchors(anchored.as_str()),
            &strip_anchors(&report.text),
        );
    }

    if let Some(out) = out {
        let output = if keep_anchors {
            report.text.clone()
        } else {
            strip_anchors(&report.text)
        };
        fs::write(out, output).with_context(|| format!("failed to write {}", out.display()))?;
    }

    Ok(())
}

fn print_report(report: &ReconcileReport) {
    for item in &report.outcomes {
        let anchor = item.anchor.as_deref().unwrap_or("?");
        let line = match &item.outcome {
            Outcome::Applied { start, end } => {
                format!("{} #{} {anchor}: applied at {start}..{end}", "✓".green(), item.index)
            }
            Outcome::NoChange => {
                format!("{} #{} {anchor}: no change", "⊙".yellow(), item.index)
            }
            Outcome::ValidationMismatch { expected, found } => format!(
                "{} #{} {anchor}: expected {expected:?}, found {found:?}",
                "✗".red(),
                item.index
            ),
            Outcome::AnchorNotFound { .. } => {
                format!("{} #{} {anchor}: anchor not found", "✗".red(), item.index)
            }
            Outcome::ConflictingRange { conflicts_with } => format!(
                "{} #{} {anchor}: overlaps correction #{conflicts_with}",
                "✗".red(),
                item.index
            ),
            Outcome::OffsetOutOfRange { start, end } => format!(
                "{} #{} {anchor}: offsets {start}..{end} out of range",
                "✗".red(),
                item.index
            ),
            Outcome::Malformed { reason } => {
                format!("{} #{}: malformed ({reason})", "✗".red(), item.index)
            }
        };
        println!("{line}");
    }

    let no_change = report.outcomes.len() - report.applied_count() - report.failed_count();
    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{}", report.applied_count()).green());
    println!("  {} unchanged", format!("{no_change}").yellow());
    println!("  {} failed", format!("{}", report.failed_count()).red());
}

/// Line diff of the un-anchored document before and after.
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (corrected)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);
    for change in diff.iter_all_changes() {
        let line = match change.tag() {
            ChangeTag::Delete => format!("-{change}").red(),
            ChangeTag::Insert => format!("+{change}").green(),
            ChangeTag::Equal => format!(" {change}").normal(),
        };
        print!("{line}");
        if change.missing_newline() {
            println!();
        }
    }
}

fn cmd_locate(
    config: &RedlineConfig,
    haystack: &Path,
    needle: &str,
    from: Option<usize>,
) -> Result<()> {
    let haystack = read(haystack)?;
    match TextLocator::new(config.locator).locate(&haystack, needle, from) {
        Some(located) => {
            println!(
                "{} {} {}",
                located.range.start, located.range.end, located.strategy
            );
            Ok(())
        }
        None => {
            eprintln!("{}", "could not locate text".red());
            std::process::exit(1);
        }
    }
}

fn cmd_map(html: &Path, plain: Option<usize>, html_pos: Option<usize>) -> Result<()> {
    let html = read(html)?;
    let map = PositionMap::build(&html);
    match (plain, html_pos) {
        (Some(plain), _) => println!("{}", map.map_plain_to_html(plain)),
        (None, Some(html_pos)) => println!("{}", map.map_html_to_plain(html_pos)),
        (None, None) => anyhow::bail!("either --plain or --html-pos is required"),
    }
    Ok(())
}
