//! dirscope - An incremental, concurrent disk usage analyzer.
//!
//! Usage:
//!   dirscope scan [PATH]               Scan and show the size tree
//!   dirscope stats [PATH]              File counts and category breakdown
//!   dirscope filter [PATH]             List files matching filters or a preset
//!   dirscope delete PATH TARGET...     Delete entries and report freed space
//!   dirscope --help                    Show help

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail, eyre};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use dirscope_analyze::{FileCategory, FilterSet, ScanPreset, ScanStatistics, SmartFilter};
use dirscope_ops::{DeleteMode, DeletionResult, start_deletion};
use dirscope_scan::{Node, ScanConfig, ScanError, ScanReport, Scanner};

#[derive(Parser)]
#[command(
    name = "dirscope",
    version,
    about = "An incremental, concurrent disk usage analyzer",
    long_about = "dirscope shows where your disk space goes.\n\n\
                  Every directory is listed concurrently and sized as soon as its \
                  subtree is known. Press Ctrl-C to stop a running scan."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a directory and show its size tree
    Scan {
        #[command(flatten)]
        scan: ScanArgs,

        /// Maximum depth to display
        #[arg(short, long, default_value = "3")]
        depth: u32,

        /// Show all entries (no depth limit on display)
        #[arg(short, long)]
        all: bool,

        /// Number of top entries to show per directory
        #[arg(short = 'n', long, default_value = "10")]
        top: usize,

        /// Print the whole tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show file counts, the largest file and a category breakdown
    Stats {
        #[command(flatten)]
        scan: ScanArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List files matching smart filters, categories or a preset
    Filter {
        #[command(flatten)]
        scan: ScanArgs,

        /// Smart filter (large-1gb, large-100mb, large-10mb, old-year,
        /// old-6months, recent-week, recent-month); any may match
        #[arg(short, long = "filter", value_parser = parse_filter)]
        filters: Vec<SmartFilter>,

        /// File category (videos, images, audio, documents, archives, code,
        /// applications, other)
        #[arg(short, long = "category", value_parser = parse_category)]
        categories: Vec<FileCategory>,

        /// Preset (standard, large-files, old-files, cache-files, developer-waste)
        #[arg(short, long, value_parser = parse_preset)]
        preset: Option<ScanPreset>,
    },

    /// Delete entries below a scanned directory
    Delete {
        #[command(flatten)]
        scan: ScanArgs,

        /// Entries to delete
        #[arg(required = true)]
        targets: Vec<PathBuf>,

        /// Delete permanently instead of moving to the trash
        #[arg(long)]
        permanent: bool,
    },
}

/// Options shared by every command that scans.
#[derive(Args)]
struct ScanArgs {
    /// Path to scan
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Include hidden entries
    #[arg(long)]
    hidden: bool,

    /// Size bundles such as `.app` directories as single files
    #[arg(long)]
    packages_as_files: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Scan {
            scan,
            depth,
            all,
            top,
            json,
        } => {
            run_scan(&scan, if all { None } else { Some(depth) }, top, json).await?;
        }
        Command::Stats { scan, format } => {
            run_stats(&scan, format).await?;
        }
        Command::Filter {
            scan,
            filters,
            categories,
            preset,
        } => {
            run_filter(&scan, filters, categories, preset).await?;
        }
        Command::Delete {
            scan,
            targets,
            permanent,
        } => {
            let mode = if permanent {
                DeleteMode::Permanent
            } else {
                DeleteMode::Trash
            };
            run_delete(&scan, &targets, mode).await?;
        }
    }

    Ok(())
}

/// Scan `args.path`, stopping the scanner on Ctrl-C.
///
/// Returns `None` when the scan was stopped before it finished.
async fn scan_path(args: &ScanArgs) -> Result<Option<ScanReport>> {
    let path = args.path.canonicalize().context("Invalid path")?;
    let config = ScanConfig::builder()
        .skip_hidden(!args.hidden)
        .treat_packages_as_files(args.packages_as_files)
        .build()
        .map_err(ScanError::from)
        .context("Invalid scan configuration")?;

    let scanner = Arc::new(Scanner::with_config(config));
    let stopper = scanner.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Stopping scan...");
            stopper.stop();
        }
    });

    eprintln!("Scanning {}...", path.display());
    let result = scanner
        .scan(&path, |root| debug!("Root ready: {}", root.path().display()))
        .await;
    ctrl_c.abort();

    finish_scan(result)
}

fn finish_scan(result: Result<ScanReport, ScanError>) -> Result<Option<ScanReport>> {
    match result {
        Ok(report) => {
            if !report.warnings.is_empty() {
                eprintln!("{} warning(s) during scan", report.warnings.len());
            }
            Ok(Some(report))
        }
        Err(e) if e.is_cancelled() => {
            eprintln!("Scan stopped");
            Ok(None)
        }
        Err(e) => Err(e).context("Scan failed"),
    }
}

/// Run a scan and display the size tree.
async fn run_scan(
    args: &ScanArgs,
    max_depth: Option<u32>,
    top_n: usize,
    json: bool,
) -> Result<()> {
    let Some(report) = scan_path(args).await? else {
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report.root.snapshot())?);
        return Ok(());
    }

    let progress = &report.progress;
    println!();
    println!("{}", "─".repeat(60));
    println!(
        " {} - {}",
        report.root.path().display(),
        format_size(report.total_size())
    );
    println!(
        " {} files, {} directories",
        progress.files_scanned, progress.dirs_scanned
    );
    println!(
        " Scanned in {:.2}s ({:.0} files/s)",
        report.duration.as_secs_f64(),
        progress.files_per_second()
    );
    println!("{}", "─".repeat(60));
    println!();

    print_node(
        &report.root,
        0,
        max_depth.unwrap_or(u32::MAX),
        top_n,
        report.total_size(),
    );

    Ok(())
}

/// Run a scan and print tree statistics.
async fn run_stats(args: &ScanArgs, format: OutputFormat) -> Result<()> {
    let Some(report) = scan_path(args).await? else {
        return Ok(());
    };
    let stats = ScanStatistics::from_root(&report.root);

    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "─".repeat(70));
            println!(" Statistics for {}", report.root.path().display());
            println!("{}", "─".repeat(70));
            println!();
            println!(" Total size:        {}", format_size(stats.total_size));
            println!(" Files:             {}", stats.total_files);
            println!(" Folders:           {}", stats.total_folders);
            println!(" Average file size: {}", format_size(stats.average_file_size()));
            if let Some(largest) = &stats.largest_file {
                println!(
                    " Largest file:      {} ({})",
                    largest.path.display(),
                    format_size(largest.size)
                );
            }
            println!(" Scan duration:     {}", format_duration(report.duration));
            println!();

            if !stats.category_stats.is_empty() {
                println!(" Categories:");
                for category in &stats.category_stats {
                    let ratio = category.percentage_of(stats.total_size);
                    println!(
                        "   {:<13} {:>10} {:>8} files {:>5.1}% {}",
                        category.category.to_string(),
                        format_size(category.total_size),
                        category.file_count,
                        ratio,
                        make_bar(ratio / 100.0, 20)
                    );
                }
                println!();
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

/// Run a scan and list the matching entries.
async fn run_filter(
    args: &ScanArgs,
    filters: Vec<SmartFilter>,
    categories: Vec<FileCategory>,
    preset: Option<ScanPreset>,
) -> Result<()> {
    let Some(report) = scan_path(args).await? else {
        return Ok(());
    };
    let now = SystemTime::now();
    let set = FilterSet::builder()
        .filters(filters)
        .categories(categories)
        .reference_time(now)
        .build()
        .context("Invalid filter")?;

    let matched: Vec<Arc<Node>> = match preset {
        Some(preset) => {
            eprintln!("{}: {}", preset.title(), preset.description());
            preset
                .collect(&report.root, now)
                .into_iter()
                .filter(|node| !set.is_active() || set.matches(node))
                .collect()
        }
        None => set.collect(&report.root),
    };

    let total: u64 = matched.iter().map(|n| n.size()).sum();
    for node in &matched {
        println!(
            "{:>10}  {:<10}  {}{}",
            format_size(node.size()),
            format_modified(node),
            node.path().display(),
            if node.is_dir() { "/" } else { "" }
        );
    }
    println!();
    println!("{} entries, {}", matched.len(), format_size(total));

    Ok(())
}

/// Run a scan, then delete `targets` from disk and from the tree.
async fn run_delete(args: &ScanArgs, targets: &[PathBuf], mode: DeleteMode) -> Result<()> {
    let Some(report) = scan_path(args).await? else {
        return Ok(());
    };
    let tree = Arc::new(report.into_tree());

    let mut nodes = Vec::with_capacity(targets.len());
    for target in targets {
        let path = target
            .canonicalize()
            .with_context(|| format!("Invalid target {}", target.display()))?;
        let node = tree
            .find(&path)
            .ok_or_else(|| eyre!("{} is not part of the scanned tree", path.display()))?;
        nodes.push(node);
    }
    if nodes.is_empty() {
        bail!("Nothing to delete");
    }

    let before = tree.total_size();
    let mut rx = start_deletion(tree.clone(), nodes, mode);
    while let Some(result) = rx.recv().await {
        match result {
            DeletionResult::Progress(progress) => {
                if let Some(current) = &progress.current {
                    eprintln!(
                        "[{}/{}] {}",
                        progress.deleted + progress.failed + 1,
                        progress.total,
                        current.display()
                    );
                }
            }
            DeletionResult::Complete(complete) => {
                for error in &complete.errors {
                    eprintln!("  {error}");
                }
                if complete.is_success() {
                    println!(
                        "Deleted {} items, freed {}",
                        complete.deleted,
                        format_size(complete.bytes_freed)
                    );
                } else {
                    println!(
                        "Deleted {}, failed {} (freed {})",
                        complete.deleted,
                        complete.failed,
                        format_size(complete.bytes_freed)
                    );
                }
            }
        }
    }
    println!(
        "{}: {} -> {}",
        tree.root_path().display(),
        format_size(before),
        format_size(tree.total_size())
    );

    Ok(())
}

/// Print a node and its children.
fn print_node(node: &Arc<Node>, depth: u32, max_depth: u32, top_n: usize, root_size: u64) {
    let indent = "  ".repeat(depth as usize);
    let ratio = if root_size > 0 {
        node.size() as f64 / root_size as f64 * 100.0
    } else {
        0.0
    };

    let bar = make_bar(ratio / 100.0, 10);

    let name = if depth == 0 {
        node.path().display().to_string()
    } else {
        node.name().to_string()
    };

    let marker = if node.is_unreadable() {
        " (unreadable)"
    } else if node.is_loading() {
        " (incomplete)"
    } else {
        ""
    };
    let dir_suffix = if node.is_dir() { "/" } else { "" };

    println!(
        "{}{}{:<40} {:>10} {:>5.1}% {} {}{}",
        indent,
        if node.is_dir() { "▼ " } else { "  " },
        truncate(&format!("{name}{dir_suffix}"), 40),
        format_size(node.size()),
        ratio,
        bar,
        format_modified(node),
        marker
    );

    let Some(children) = node.children() else {
        return;
    };
    if depth < max_depth {
        let remaining = children.len().saturating_sub(top_n);

        for child in children.iter().take(top_n) {
            print_node(child, depth + 1, max_depth, top_n, root_size);
        }

        if remaining > 0 {
            let indent = "  ".repeat((depth + 1) as usize);
            println!("{}  ... and {} more", indent, remaining);
        }
    }
}

/// Create a simple ASCII bar.
fn make_bar(ratio: f64, width: usize) -> String {
    let filled = ((ratio * width as f64).round() as usize).min(width);
    let empty = width - filled;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::DECIMAL)
}

/// Format a node's modification date in local time.
fn format_modified(node: &Node) -> String {
    node.modified()
        .map(|m| DateTime::<Local>::from(m).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Format a scan duration the way a person would read it.
fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{secs:.1} sec")
    } else {
        let total = duration.as_secs();
        format!("{}m {}s", total / 60, total % 60)
    }
}

/// Truncate a string to max length (in characters).
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 1).collect();
        format!("{kept}…")
    }
}

fn parse_filter(s: &str) -> Result<SmartFilter, String> {
    s.parse().map_err(|_| format!("unknown filter '{s}'"))
}

fn parse_category(s: &str) -> Result<FileCategory, String> {
    s.parse().map_err(|_| format!("unknown category '{s}'"))
}

fn parse_preset(s: &str) -> Result<ScanPreset, String> {
    s.parse().map_err(|_| format!("unknown preset '{s}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopped_scan_is_not_an_error() {
        let outcome = finish_scan(Err(ScanError::Cancelled)).unwrap();
        assert!(outcome.is_none());
    }

    #[test]
    fn test_failed_scan_is_reported() {
        let result = finish_scan(Err(ScanError::Other {
            message: "boom".to_string(),
        }));
        let err = result.unwrap_err();
        assert!(format!("{err:?}").contains("boom"));
    }

    #[test]
    fn test_truncate_keeps_short_names() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
