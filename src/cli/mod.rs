//! Command-line interface for bookfs.
//!
//! Provides commands for browsing the projected tree, reading book
//! contents, and keeping a projection live while the catalog changes.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::{self, ResolvedConfig};
use crate::domain::{Attributes, Node};
use crate::projection::{
    CatalogLoader, Listing, Projection, ResumeFrom, SnapshotLoader, StreamError,
};
use crate::reload::{CatalogWatcher, ReloadScheduler};

/// Chunk size used when streaming a book to stdout
const CHUNK_SIZE: usize = 64 * 1024;

/// bookfs - Read-only series view of ebook catalogs
#[derive(Parser, Debug)]
#[command(name = "bookfs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Catalog root (overrides config file and BOOKFS_ROOT)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List a directory in the projected tree
    Ls {
        /// Virtual path (e.g. "\MyLib\Foo")
        #[arg(default_value = "\\")]
        path: String,

        /// Name filter; supports * and ? and the DOS markers < > "
        #[arg(short, long)]
        pattern: Option<String>,

        /// Start after this entry name
        #[arg(long)]
        after: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show attributes of a path
    Stat {
        /// Virtual path
        path: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a book's contents to stdout
    Cat {
        /// Virtual path of a book
        path: String,

        /// Byte offset to start reading at
        #[arg(long, default_value = "0")]
        offset: u64,

        /// Maximum number of bytes to read (default: to end of file)
        #[arg(long)]
        length: Option<usize>,
    },

    /// Print the whole projected tree
    Tree,

    /// Keep a projection live and log every rebuild until Ctrl-C
    Watch,

    /// Show current configuration
    Config,
}

#[derive(Serialize)]
struct StatOutput<'a> {
    path: &'a str,
    name: &'a str,
    #[serde(flatten)]
    attributes: Attributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    physical_path: Option<PathBuf>,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let root = self.root;
        match self.command {
            Commands::Ls {
                path,
                pattern,
                after,
                json,
            } => list_directory(root, &path, pattern.as_deref(), after, json).await,
            Commands::Stat { path, json } => show_stat(root, &path, json).await,
            Commands::Cat {
                path,
                offset,
                length,
            } => cat_book(root, &path, offset, length).await,
            Commands::Tree => print_tree(root).await,
            Commands::Watch => watch(root).await,
            Commands::Config => show_config(root),
        }
    }
}

/// Resolve configuration, applying the --root override
fn resolve_config(root: Option<PathBuf>) -> Result<ResolvedConfig> {
    let cfg = config::config()?.clone();
    Ok(match root {
        Some(root) => cfg.with_root(root),
        None => cfg,
    })
}

/// Load a snapshot from the configured catalog into a new projection
async fn load_projection(cfg: &ResolvedConfig) -> Result<Arc<Projection>> {
    let loader = CatalogLoader::new(cfg.reader());
    let snapshot = tokio::task::spawn_blocking(move || loader.load())
        .await
        .context("Catalog load task failed")?
        .with_context(|| format!("Failed to load catalog at {}", cfg.catalog_root.display()))?;

    Ok(Arc::new(Projection::with_snapshot(
        cfg.volume_label.clone(),
        snapshot,
    )))
}

fn resolve_node(projection: &Projection, path: &str) -> Result<Node> {
    projection
        .resolve(path)
        .with_context(|| format!("No such path: {}", path))
}

/// List a directory, one entry per line
async fn list_directory(
    root: Option<PathBuf>,
    path: &str,
    pattern: Option<&str>,
    after: Option<String>,
    json: bool,
) -> Result<()> {
    let cfg = resolve_config(root)?;
    let projection = load_projection(&cfg).await?;
    let node = resolve_node(&projection, path)?;

    let mut from = after.map(ResumeFrom::After).unwrap_or_default();
    let mut entries = Vec::new();
    while let Listing::Entry { entry, next } = projection.list_children(&node, pattern, &from)? {
        entries.push(entry);
        from = ResumeFrom::Token(next);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("(empty)");
        return Ok(());
    }

    println!("{:<5} {:>12} {:<20} {}", "TYPE", "SIZE", "MODIFIED", "NAME");
    println!("{}", "-".repeat(70));
    for entry in &entries {
        println!(
            "{:<5} {:>12} {:<20} {}",
            if entry.attributes.is_directory { "dir" } else { "file" },
            entry.attributes.size,
            entry.attributes.modified_at.format("%Y-%m-%d %H:%M:%S"),
            entry.name
        );
    }
    println!("\nTotal: {} entries", entries.len());

    Ok(())
}

/// Show the attributes of one node
async fn show_stat(root: Option<PathBuf>, path: &str, json: bool) -> Result<()> {
    let cfg = resolve_config(root)?;
    let projection = load_projection(&cfg).await?;
    let node = resolve_node(&projection, path)?;

    let output = StatOutput {
        path,
        name: node.name(),
        attributes: projection.attributes(&node),
        physical_path: node.physical_path(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Path:      {}", output.path);
    println!(
        "Type:      {}",
        if output.attributes.is_directory { "directory" } else { "file" }
    );
    println!("Size:      {} bytes", output.attributes.size);
    println!("Created:   {}", output.attributes.created_at);
    println!("Modified:  {}", output.attributes.modified_at);
    if let Some(physical) = &output.physical_path {
        println!("Backed by: {}", physical.display());
    }

    Ok(())
}

/// Stream a book's bytes to stdout
async fn cat_book(
    root: Option<PathBuf>,
    path: &str,
    offset: u64,
    length: Option<usize>,
) -> Result<()> {
    let cfg = resolve_config(root)?;
    let projection = load_projection(&cfg).await?;
    let node = resolve_node(&projection, path)?;
    let stream = projection.open_stream(&node)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut position = offset;
    let mut remaining = length.unwrap_or(usize::MAX);

    while remaining > 0 {
        let chunk = match stream.read(position, remaining.min(CHUNK_SIZE)) {
            Ok(chunk) => chunk,
            Err(StreamError::EndOfFile { .. }) => break,
            Err(e) => return Err(e.into()),
        };
        if chunk.is_empty() {
            break;
        }
        out.write_all(&chunk).context("Failed to write to stdout")?;
        position += chunk.len() as u64;
        remaining -= chunk.len();
    }

    out.flush().context("Failed to flush stdout")?;
    stream.close();
    Ok(())
}

/// Print the full tree with indentation
async fn print_tree(root: Option<PathBuf>) -> Result<()> {
    let cfg = resolve_config(root)?;
    let projection = load_projection(&cfg).await?;
    let snapshot = projection.snapshot();

    println!("{} ({} books)", cfg.volume_label, snapshot.book_count());
    for library in &snapshot.libraries {
        println!("  {}", library.name);
        for series in &library.series {
            println!("    {}", series.name);
            for book in &series.books {
                println!("      {}  [{}]", book.virtual_name(), book.title);
            }
        }
    }

    Ok(())
}

/// Load once, then rebuild on every catalog change until interrupted
async fn watch(root: Option<PathBuf>) -> Result<()> {
    let cfg = resolve_config(root)?;
    let projection = load_projection(&cfg).await?;
    eprintln!(
        "Loaded {} books from {}",
        projection.snapshot().book_count(),
        cfg.catalog_root.display()
    );

    let loader = Arc::new(CatalogLoader::new(cfg.reader()));
    let scheduler = ReloadScheduler::spawn(
        Arc::clone(&projection),
        loader,
        cfg.reload_delay,
        cfg.metadata_file.clone(),
    );
    let watcher = CatalogWatcher::start(&cfg.catalog_root, scheduler.handle())
        .context("Failed to start catalog watcher")?;

    let mut published = scheduler.subscribe();
    eprintln!("Watching for changes (Ctrl-C to stop)...");

    loop {
        tokio::select! {
            changed = published.changed() => {
                if changed.is_err() {
                    break;
                }
                let generation = *published.borrow_and_update();
                let snapshot = projection.snapshot();
                eprintln!(
                    "Generation {}: {} books in {} libraries",
                    generation,
                    snapshot.book_count(),
                    snapshot.libraries.len()
                );
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    drop(watcher);
    scheduler.shutdown().await;
    eprintln!("Stopped");
    Ok(())
}

/// Show current configuration
fn show_config(root: Option<PathBuf>) -> Result<()> {
    let cfg = resolve_config(root)?;

    println!("bookfs configuration");
    println!();
    println!(
        "Config file:   {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!("Catalog root:  {}", cfg.catalog_root.display());
    println!("Metadata file: {}", cfg.metadata_file);
    println!("Reload delay:  {} ms", cfg.reload_delay.as_millis());
    println!("Volume label:  {}", cfg.volume_label);

    Ok(())
}
