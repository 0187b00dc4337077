use std::path::PathBuf;
use std::time::Instant;

use anyhow::bail;
use clap::{Parser, Subcommand};

use drivesweep::config::settings::Settings;
use drivesweep::core::browser::Browser;
use drivesweep::core::cancel::CancelFlag;
use drivesweep::core::cleaner::Cleaner;
use drivesweep::core::events::{progress_channel, ProgressReceiver};
use drivesweep::core::scanner::Scanner;
use drivesweep::core::walker::Walker;
use drivesweep::models::category::{default_categories, CategoryKind, CategorySpec};
use drivesweep::models::entry::human_readable_size;
use drivesweep::models::outcome::ScanReport;

#[derive(Parser, Debug)]
#[command(name = "drivesweep", version, about = "Concurrent disk cleanup and analysis engine")]
struct Cli {
    /// Maximum concurrent I/O operations
    #[arg(short = 'c', long, global = true)]
    concurrency: Option<usize>,

    /// Maximum depth for bounded searches
    #[arg(short = 'd', long, global = true)]
    max_depth: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan cleanup categories and report reclaimable space
    Scan {
        /// Categories to scan (default: all)
        #[arg(long, value_delimiter = ',')]
        categories: Vec<String>,

        /// Export scan report as JSON to file
        #[arg(long)]
        export_json: Option<PathBuf>,
    },
    /// Delete files in the safe-to-clean subset of each category
    Clean {
        /// Categories to clean (default: all)
        #[arg(long, value_delimiter = ',')]
        categories: Vec<String>,
    },
    /// List mounted drives with used space
    Drives,
    /// List a directory with cumulative subdirectory sizes
    Ls {
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Show only directories
        #[arg(long)]
        no_files: bool,
    },
    /// Find the largest folders under a root
    Largest {
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Maximum number of results
        #[arg(short = 'n', long, default_value_t = 20)]
        max_results: usize,
    },
    /// Find large files by extension under a root
    Find {
        root: PathBuf,

        /// Extensions to match, e.g. "iso,mp4,zip"
        #[arg(long, value_delimiter = ',', required = true)]
        extensions: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::default();
    if let Some(conc) = cli.concurrency {
        settings.max_concurrent_io = conc;
    }
    if let Some(depth) = cli.max_depth {
        settings.max_depth = depth;
    }

    let walker = Walker::new(settings);
    let cancel = CancelFlag::new();
    spawn_ctrl_c_handler(cancel.clone());

    match cli.command {
        Command::Scan {
            categories,
            export_json,
        } => {
            let mut specs = select_categories(&categories)?;
            let (tx, rx) = progress_channel();
            let printer = spawn_progress_printer(rx);
            let scanner = Scanner::new(&walker, tx, cancel);

            let start = Instant::now();
            scanner.scan(&mut specs).await;
            let duration = start.elapsed();
            // Dropping the scanner closes the channel and ends the printer.
            drop(scanner);
            let _ = printer.await;

            for spec in &specs {
                match &spec.error {
                    Some(error) => println!("{:<24} {}", spec.name, error),
                    None => println!(
                        "{:<24} {:>8} files  {:>12}",
                        spec.name,
                        spec.found_files,
                        human_readable_size(spec.found_bytes)
                    ),
                }
            }
            let report = ScanReport::from_categories(specs, duration);
            println!(
                "Total: {} files, {} reclaimable",
                report.total_files,
                human_readable_size(report.total_bytes)
            );

            if let Some(ref path) = export_json {
                drivesweep::export::json::export_json(&report, path)?;
                println!("Exported to: {}", path.display());
            }
        }
        Command::Clean { categories } => {
            let specs = select_categories(&categories)?;
            let (tx, rx) = progress_channel();
            let printer = spawn_progress_printer(rx);
            let cleaner = Cleaner::new(&walker, tx, cancel);

            let outcome = cleaner.clean(&specs).await;
            drop(cleaner);
            let _ = printer.await;

            println!(
                "Deleted {} files, freed {}",
                outcome.total_files,
                human_readable_size(outcome.total_bytes)
            );
            for error in &outcome.errors {
                eprintln!("{error}");
            }
            if !outcome.is_clean() {
                std::process::exit(1);
            }
        }
        Command::Drives => {
            let browser = Browser::new(walker);
            for drive in browser.list_drives().await? {
                println!(
                    "{:<40} {:>12}  {:>6.1}%",
                    drive.name,
                    human_readable_size(drive.size_bytes),
                    drive.size_percentage
                );
            }
        }
        Command::Ls { path, no_files } => {
            let browser = Browser::new(walker);
            let path = std::fs::canonicalize(&path)?;
            for entry in browser.list_directory(&path, !no_files).await? {
                println!(
                    "{:>12}  {:>6.1}%  {}",
                    entry.human_readable_size(),
                    entry.size_percentage,
                    entry.name
                );
            }
        }
        Command::Largest { root, max_results } => {
            let browser = Browser::new(walker);
            let root = std::fs::canonicalize(&root)?;
            for entry in browser.find_largest_folders(&root, max_results).await? {
                println!(
                    "{:>12}  {}",
                    entry.human_readable_size(),
                    entry.path.display()
                );
            }
        }
        Command::Find { root, extensions } => {
            let browser = Browser::new(walker);
            let root = std::fs::canonicalize(&root)?;
            for entry in browser.find_files_by_extension(&root, &extensions).await? {
                println!(
                    "{:>12}  {}",
                    entry.human_readable_size(),
                    entry.path.display()
                );
            }
        }
    }

    Ok(())
}

fn select_categories(names: &[String]) -> anyhow::Result<Vec<CategorySpec>> {
    let all = default_categories();
    if names.is_empty() {
        return Ok(all);
    }
    let mut kinds = Vec::new();
    for name in names {
        match CategoryKind::parse(name) {
            Some(kind) => kinds.push(kind),
            None => bail!("unknown category: {name}"),
        }
    }
    Ok(all
        .into_iter()
        .filter(|spec| kinds.contains(&spec.kind))
        .collect())
}

fn spawn_ctrl_c_handler(cancel: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling...");
            cancel.cancel();
        }
    });
}

/// Drain progress events to stderr so piped stdout stays machine-readable.
fn spawn_progress_printer(mut rx: ProgressReceiver) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            eprintln!("[{:>5.1}%] {}", event.percent(), event.operation());
        }
    })
}
