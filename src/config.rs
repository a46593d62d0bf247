//! Configuration for bookfs.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (BOOKFS_ROOT, BOOKFS_RELOAD_DELAY_MS)
//! 2. Config file (.bookfs/config.yaml)
//! 3. Defaults (~/Calibre, metadata.db, 3000 ms)
//!
//! Config file discovery:
//! - Searches current directory and parents for .bookfs/config.yaml
//! - Paths in config file are relative to the config file's project root
//!   (the parent of .bookfs/)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::catalog::{CatalogReader, DEFAULT_METADATA_FILE};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const DEFAULT_RELOAD_DELAY_MS: u64 = 3000;
const DEFAULT_VOLUME_LABEL: &str = "Books";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub reload: Option<ReloadConfig>,
    #[serde(default)]
    pub volume: Option<VolumeConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    /// Directory holding one subdirectory per library
    pub root: Option<String>,
    /// Metadata database name inside each library
    pub metadata_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReloadConfig {
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolumeConfig {
    pub label: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Catalog root directory
    pub catalog_root: PathBuf,
    /// Metadata file looked up in each library directory
    pub metadata_file: String,
    /// Quiet period before a change triggers a rebuild
    pub reload_delay: Duration,
    /// Label reported for the projected volume
    pub volume_label: String,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Catalog reader for this configuration
    pub fn reader(&self) -> CatalogReader {
        CatalogReader::new(&self.catalog_root, &self.metadata_file)
    }

    /// Same configuration with a different catalog root
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.catalog_root = root.into();
        self
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".bookfs").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Default catalog root (~/Calibre)
fn default_root() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .context("Failed to determine home directory")?
        .join("Calibre"))
}

/// Merge config file, environment and defaults
fn resolve(
    config_file: Option<(PathBuf, ConfigFile)>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let (config_path, file) = match config_file {
        Some((path, file)) => (Some(path), Some(file)),
        None => (None, None),
    };

    // Project root is the parent of .bookfs/
    let base_dir = config_path
        .as_deref()
        .and_then(Path::parent)
        .and_then(Path::parent)
        .unwrap_or(Path::new("."));

    let catalog_root = if let Some(env_root) = env("BOOKFS_ROOT") {
        PathBuf::from(env_root)
    } else if let Some(root) = file.as_ref().and_then(|f| f.catalog.root.as_deref()) {
        resolve_path(base_dir, root)
    } else {
        default_root()?
    };

    let metadata_file = file
        .as_ref()
        .and_then(|f| f.catalog.metadata_file.clone())
        .unwrap_or_else(|| DEFAULT_METADATA_FILE.to_string());

    let reload_delay_ms = match env("BOOKFS_RELOAD_DELAY_MS") {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("Invalid BOOKFS_RELOAD_DELAY_MS: {:?}", raw))?,
        None => file
            .as_ref()
            .and_then(|f| f.reload.as_ref())
            .and_then(|r| r.delay_ms)
            .unwrap_or(DEFAULT_RELOAD_DELAY_MS),
    };

    let volume_label = file
        .as_ref()
        .and_then(|f| f.volume.as_ref())
        .and_then(|v| v.label.clone())
        .unwrap_or_else(|| DEFAULT_VOLUME_LABEL.to_string());

    Ok(ResolvedConfig {
        catalog_root,
        metadata_file,
        reload_delay: Duration::from_millis(reload_delay_ms),
        volume_label,
        config_file: config_path,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_file = match find_config_file() {
        Some(path) => {
            let file = load_config_file(&path)?;
            Some((path, file))
        }
        None => None,
    };

    resolve(config_file, |key| std::env::var(key).ok())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
