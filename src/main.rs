//! fbls - list a directory or library through the filebrowse engine.
//!
//! Usage:
//!   fbls [PATH]                   List a directory, directories first, natural order
//!   fbls --sort size --reverse    Smallest files first
//!   fbls --recursive 2 src        Include two levels of subdirectories
//!   fbls --library assets/        Browse into library containers
//!   fbls --format json            Machine-readable output

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};
use clap::{ArgAction, Parser, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use filebrowse_core::{FilterSettings, ListConfig, ListKind, SortField, TypeFlags};
use filebrowse_list::{FileIcon, FileList};

/// Poll interval while a read is running.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Parser)]
#[command(
    name = "fbls",
    version,
    about = "List files, library containers and their datablocks",
    long_about = "fbls reads a directory on a background job, then prints its entries \
                  sorted and filtered the way a file browser shows them.\n\n\
                  Set RUST_LOG or pass -v for log output on stderr."
)]
struct Cli {
    /// Directory (or container path, with --library) to list
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Sort field: name, date, size or ext
    #[arg(short, long, default_value = "name")]
    sort: SortField,

    /// Reverse the sort order (directories stay first)
    #[arg(short, long)]
    reverse: bool,

    /// Levels of subdirectories to include
    #[arg(short = 'R', long, value_name = "N")]
    recursive: Option<u32>,

    /// Only show directories
    #[arg(short = 'd', long)]
    folders_only: bool,

    /// Hide dot files and backups
    #[arg(short = 'H', long)]
    hide_dot: bool,

    /// Only show entries matching this text or glob
    #[arg(long)]
    search: Option<String>,

    /// Browse into library containers
    #[arg(short, long)]
    library: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// One printed row.
#[derive(Debug, Serialize)]
struct Row {
    name: String,
    relpath: String,
    icon: Option<FileIcon>,
    is_dir: bool,
    size: u64,
    modified: DateTime<Local>,
    typeflag: TypeFlags,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let root = cli.path.canonicalize().context("Invalid path")?;
    let mut list = FileList::new(build_config(&cli, root)?);
    read(&mut list)?;

    let rows = collect_rows(&mut list);
    match cli.format {
        OutputFormat::Text => print_text(&list, &rows),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
    }

    for warning in &list.read_report().warnings {
        eprintln!("warning: {}: {}", warning.path.display(), warning.message);
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli, root: PathBuf) -> Result<ListConfig> {
    let filter = FilterSettings {
        do_filter: cli.folders_only,
        hide_dot: cli.hide_dot,
        type_mask: if cli.folders_only {
            TypeFlags::FOLDER
        } else {
            TypeFlags::empty()
        },
        search: FilterSettings::search_pattern(cli.search.as_deref().unwrap_or_default()),
        ..Default::default()
    };
    let kind = if cli.library {
        ListKind::Library
    } else {
        ListKind::Directory
    };

    // One extra level lets container files at the last level show their groups.
    let max_recursion = cli.recursive.map_or(0, |levels| levels + 1);

    ListConfig::builder()
        .root(root)
        .kind(kind)
        .max_recursion(max_recursion)
        .sort(cli.sort)
        .sort_inverted(cli.reverse)
        .filter(filter)
        .build()
        .map_err(|e| color_eyre::eyre::eyre!("Invalid configuration: {e}"))
}

/// Run the read job to completion, logging its progress.
fn read(list: &mut FileList) -> Result<()> {
    if !list.refresh() {
        bail!("Cannot read {}", list.root().display());
    }
    let mut progress = list.subscribe_progress();

    while list.is_pending() {
        if let Some(rx) = progress.as_mut() {
            while let Ok(update) = rx.try_recv() {
                tracing::info!(
                    dir = %update.current_dir.display(),
                    done = update.dirs_done,
                    todo = update.dirs_todo,
                    found = update.entries_found,
                    "reading"
                );
            }
        }
        if !list.update().finished {
            std::thread::sleep(POLL_INTERVAL);
        }
    }
    list.ensure_files();
    Ok(())
}

fn collect_rows(list: &mut FileList) -> Vec<Row> {
    let count = list.count();
    let half = list.cache().size() / 2;
    let mut rows = Vec::with_capacity(count);

    for index in 0..count {
        if !list.cache().block_range().contains(&index) {
            list.ensure_block((index + half).min(count - 1));
        }
        let icon = list.icon_for(index);
        let Some(entry) = list.entry_at(index) else {
            continue;
        };
        rows.push(Row {
            name: entry.name.to_string(),
            relpath: entry.relpath.to_string(),
            icon,
            is_dir: entry.is_dir(),
            size: entry.size,
            modified: DateTime::<Local>::from(entry.modified),
            typeflag: entry.typeflag,
        });
    }
    rows
}

fn print_text(list: &FileList, rows: &[Row]) {
    for row in rows {
        let icon = row.icon.map(|icon| icon.to_string()).unwrap_or_default();
        let size = if row.is_dir {
            "-".to_string()
        } else {
            format_size(row.size)
        };
        let modified = if row.modified == DateTime::<Local>::from(SystemTime::UNIX_EPOCH) {
            String::new()
        } else {
            row.modified.format("%Y-%m-%d %H:%M").to_string()
        };
        let marker = if row.is_dir { "/" } else { "" };
        println!(
            "{:<20} {:>10}  {:<16}  {}{}",
            icon,
            size,
            modified,
            row.relpath.trim_end_matches('/'),
            marker
        );
    }

    let stats = list.stats();
    println!();
    println!(
        " {} shown, {} files, {} directories, {}",
        rows.len(),
        stats.total_files,
        stats.total_dirs,
        format_size(stats.total_size)
    );
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
