//! Main entry point for the hashfs CLI application.
//!
//! This binary lists, hashes and extracts members of SCS HashFS archives.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing_subscriber::EnvFilter;

use hashfs::hashfs::normalize;
use hashfs::{Cli, EntryKind, HashFsReader, ReadAt};

/// Application entry point.
///
/// Parses command-line arguments, opens the archive and dispatches to the
/// hash, list or extract handler.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let reader = HashFsReader::open_with_options(&cli.archive, &cli.reader_options())
        .with_context(|| format!("cannot open {}", cli.archive.display()))?;

    if cli.hash {
        for path in cli.targets() {
            println!("{:016x}  {}", reader.hash_path(&path, cli.salt), path);
        }
        return Ok(());
    }

    // List mode: display a directory and exit
    if cli.list || cli.verbose {
        let targets = cli.targets();
        return list_directory(&reader, &targets[0], cli.verbose);
    }

    for target in cli.targets() {
        extract_path(&reader, &target, &cli)?;
    }

    Ok(())
}

/// Install a stderr subscriber honouring `RUST_LOG`.
fn init_logging(cli: &Cli) {
    let default = if cli.is_very_quiet() { "off" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// List one directory of the archive.
///
/// Supports two output formats:
/// - Simple format (`-l`): Just names, one per line
/// - Verbose format (`-v`): Table with sizes and entry flags
fn list_directory<R: ReadAt>(reader: &HashFsReader<R>, path: &str, verbose: bool) -> Result<()> {
    let listing = reader.get_directory_listing(path, false, true)?;

    if !verbose {
        for name in listing.subdirectories.iter().chain(&listing.files) {
            println!("{name}");
        }
        return Ok(());
    }

    println!("{:>10}  {:>10}  {:>5}  Name", "Length", "Size", "Flags");
    println!("{}", "-".repeat(60));

    let mut total_size = 0u64;
    let mut total_stored = 0u64;
    let mut file_count = 0usize;

    for name in listing.subdirectories.iter().chain(&listing.files) {
        let Ok(entry) = reader.get_entry(name) else {
            // Listings may name members that were not packed
            println!("{:>10}  {:>10}  {:>5}  {}", "-", "-", "?", name);
            continue;
        };

        let flags = format!(
            "{}{}{}",
            if entry.is_directory { 'd' } else { '-' },
            if entry.is_compressed { 'z' } else { '-' },
            if entry.is_tobj { 't' } else { '-' },
        );
        println!(
            "{:>10}  {:>10}  {:>5}  {}",
            entry.size,
            entry.stored_size(),
            flags,
            name
        );

        if !entry.is_directory {
            total_size += u64::from(entry.size);
            total_stored += u64::from(entry.stored_size());
            file_count += 1;
        }
    }

    println!("{}", "-".repeat(60));
    println!(
        "{:>10}  {:>10}  {:>5}  {} files",
        format_size(total_size),
        format_size(total_stored),
        "",
        file_count
    );

    Ok(())
}

/// Extract a file, or a directory tree, from the archive.
fn extract_path<R: ReadAt>(reader: &HashFsReader<R>, path: &str, cli: &Cli) -> Result<()> {
    if reader.entry_exists(path) == EntryKind::NotFound {
        bail!("{path}: not found in archive");
    }

    for file in collect_files(reader, path, cli.is_very_quiet())? {
        extract_file(reader, &file, cli)?;
    }

    Ok(())
}

/// Walk the tree below `path` and return every file it names.
///
/// Each directory is expanded at most once, so listings that name an
/// ancestor (or themselves) cannot make the walk loop.
fn collect_files<R: ReadAt>(
    reader: &HashFsReader<R>,
    path: &str,
    quiet: bool,
) -> Result<Vec<String>> {
    let mut pending = vec![normalize(path).to_string()];
    let mut expanded = HashSet::new();
    let mut files = Vec::new();

    while let Some(path) = pending.pop() {
        match reader.entry_exists(&path) {
            // Listings may name members that were not packed
            EntryKind::NotFound => {
                if !quiet {
                    eprintln!("Skipping: {path} (not in archive)");
                }
            }
            EntryKind::File => files.push(path),
            EntryKind::Directory => {
                if !expanded.insert(reader.hash_path(&path, None)) {
                    continue;
                }
                let listing = reader.get_directory_listing(&path, false, true)?;
                pending.extend(listing.files);
                pending.extend(
                    listing
                        .subdirectories
                        .iter()
                        .map(|dir| normalize(dir).to_string()),
                );
            }
        }
    }

    Ok(files)
}

/// Extract a single file.
///
/// Handles pipe mode (`-p`), custom output directory (`-d`) and overwrite
/// control (`-n`, `-o`).
fn extract_file<R: ReadAt>(reader: &HashFsReader<R>, path: &str, cli: &Cli) -> Result<()> {
    // Pipe mode: write file contents directly to stdout
    if cli.pipe {
        let data = reader.extract(path)?;
        std::io::stdout().write_all(&data)?;
        return Ok(());
    }

    let output_path = output_path(cli.extract_dir.as_deref(), path)?;

    // Handle existing files based on overwrite options
    if output_path.exists() {
        if cli.never_overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {path} (file exists)");
            }
            return Ok(());
        }

        if !cli.overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {path} (use -o to overwrite)");
            }
            return Ok(());
        }
    }

    if !cli.is_quiet() {
        println!("  extracting: {path}");
    }

    reader
        .extract_to_file(path, &output_path)
        .with_context(|| format!("failed to extract {path}"))?;

    Ok(())
}

/// Map an archive path below the extraction directory.
///
/// Names come from the archive, so every component must be a plain name.
/// Empty, `.` and `..` components are rejected, as is anything the host
/// would read as a root or prefix.
fn output_path(extract_dir: Option<&Path>, path: &str) -> Result<PathBuf> {
    let relative = path.trim_start_matches('/');
    for component in relative.split('/') {
        let plain = matches!(
            Path::new(component).components().collect::<Vec<_>>().as_slice(),
            [Component::Normal(_)]
        );
        if !plain {
            bail!("{path}: refusing to extract outside the target directory");
        }
    }

    Ok(match extract_dir {
        Some(dir) => dir.join(relative),
        None => PathBuf::from(relative),
    })
}

/// Format a byte size into a human-readable string.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} B", size)
    }
}

#[cfg(test)]
#[path = "../tests/common/mod.rs"]
mod common;
