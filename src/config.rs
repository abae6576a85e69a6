//! Configuration for sortify.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SORTIFY_HOME, SORTIFY_LIBRARY)
//! 2. Config file (.sortify/config.yaml)
//! 3. Defaults (~/.sortify, the user's pictures directory)
//!
//! Config file discovery:
//! - Searches current directory and parents for .sortify/config.yaml
//! - Paths in config file are relative to the config file's parent directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::directory::default_include_patterns;
use crate::core::{SessionSettings, SwipeConfig};
use crate::domain::TargetSize;
use crate::store::StoreBackend;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub store: Option<StoreConfig>,
    #[serde(default)]
    pub review: Option<ReviewConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .sortify/)
    pub home: Option<String>,
    /// Photo library directory (relative to the project root)
    pub library: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: Option<StoreBackend>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewConfig {
    pub swipe: Option<SwipeConfig>,
    pub target_width: Option<u32>,
    pub target_height: Option<u32>,
    pub apply_deletes: Option<bool>,
    pub skip_reviewed: Option<bool>,
    pub include: Option<Vec<String>>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to sortify home (decision store)
    pub home: PathBuf,
    /// Photo library directory, if one could be determined
    pub library: Option<PathBuf>,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Decision store backend
    pub store_backend: StoreBackend,
    /// Review behavior
    pub review: ReviewSettings,
}

#[derive(Debug, Clone)]
pub struct ReviewSettings {
    pub swipe: SwipeConfig,
    pub target: TargetSize,
    pub apply_deletes: bool,
    pub skip_reviewed: bool,
    pub include_patterns: Vec<String>,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            swipe: SwipeConfig::default(),
            target: TargetSize::MAXIMUM,
            apply_deletes: false,
            skip_reviewed: true,
            include_patterns: default_include_patterns(),
        }
    }
}

impl ReviewSettings {
    /// Settings handed to a review session
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            swipe: self.swipe.clone(),
            target: self.target,
            apply_deletes: self.apply_deletes,
            skip_reviewed: self.skip_reviewed,
        }
    }

    fn from_file(review: Option<&ReviewConfig>) -> Self {
        let defaults = Self::default();
        let Some(review) = review else {
            return defaults;
        };

        let target = match (review.target_width, review.target_height) {
            (Some(width), Some(height)) => TargetSize::new(width, height),
            _ => defaults.target,
        };

        Self {
            swipe: review.swipe.clone().unwrap_or(defaults.swipe),
            target,
            apply_deletes: review.apply_deletes.unwrap_or(defaults.apply_deletes),
            skip_reviewed: review.skip_reviewed.unwrap_or(defaults.skip_reviewed),
            include_patterns: review
                .include
                .clone()
                .unwrap_or(defaults.include_patterns),
        }
    }
}

impl ResolvedConfig {
    /// Path of the decision store file
    pub fn store_path(&self) -> PathBuf {
        self.home.join(self.store_backend.file_name())
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".sortify").join("config.yaml");
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

/// Resolve a path that may be relative to the config file's parent
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

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".sortify");
    let default_library = dirs::picture_dir();

    let config_file = find_config_file();

    let (home, library, store_backend, review) = if let Some(ref config_path) = config_file {
        let config = load_config_file(config_path)?;

        // .sortify/
        let sortify_dir = config_path.parent().unwrap_or(Path::new("."));
        // project root
        let base_dir = sortify_dir.parent().unwrap_or(Path::new("."));

        let home = if let Ok(env_home) = std::env::var("SORTIFY_HOME") {
            PathBuf::from(env_home)
        } else if let Some(ref home_path) = config.paths.home {
            resolve_path(sortify_dir, home_path)
        } else {
            default_home.clone()
        };

        let library = if let Ok(env_lib) = std::env::var("SORTIFY_LIBRARY") {
            Some(PathBuf::from(env_lib))
        } else if let Some(ref lib_path) = config.paths.library {
            Some(resolve_path(base_dir, lib_path))
        } else {
            default_library
        };

        let store_backend = config
            .store
            .as_ref()
            .and_then(|s| s.backend)
            .unwrap_or_default();

        let review = ReviewSettings::from_file(config.review.as_ref());

        (home, library, store_backend, review)
    } else {
        let home = std::env::var("SORTIFY_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_home.clone());

        let library = std::env::var("SORTIFY_LIBRARY")
            .map(PathBuf::from)
            .ok()
            .or(default_library);

        (home, library, StoreBackend::default(), ReviewSettings::default())
    };

    Ok(ResolvedConfig {
        home,
        library,
        config_file,
        store_backend,
        review,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
