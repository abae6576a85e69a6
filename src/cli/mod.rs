//! Command-line interface for sortify.
//!
//! Provides commands for reviewing a photo directory, showing the decision
//! summary and history, and inspecting the resolved configuration.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{DirectoryLibrary, LibrarySource};
use crate::config;
use crate::domain::Summary;
use crate::store::open_store;

pub mod review;

/// sortify - Swipe through a photo library, keep or delete each photo
#[derive(Parser, Debug)]
#[command(name = "sortify")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Review photos one at a time
    Review {
        /// Photo directory (defaults to the configured library)
        #[arg(short, long, env = "SORTIFY_LIBRARY")]
        library: Option<PathBuf>,

        /// Move deleted photos into the library's trash folder
        #[arg(long)]
        apply_deletes: bool,

        /// Include photos that already have a decision
        #[arg(long)]
        all: bool,
    },

    /// Show kept/deleted counts
    Stats {
        /// Photo directory used to compute completion
        #[arg(short, long, env = "SORTIFY_LIBRARY")]
        library: Option<PathBuf>,
    },

    /// List recent decisions
    History {
        /// Maximum number of decisions to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Review {
                library,
                apply_deletes,
                all,
            } => review::execute_review(library, apply_deletes, all).await,
            Commands::Stats { library } => show_stats(library).await,
            Commands::History { limit } => show_history(limit).await,
            Commands::Config => show_config().await,
        }
    }
}

/// Pick the library directory from the flag or the configuration
pub(crate) fn resolve_library(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    config::config()?
        .library
        .clone()
        .context("No photo library configured. Use --library <dir> or set SORTIFY_LIBRARY")
}

/// Print the summary screen
pub(crate) fn print_summary(summary: &Summary) {
    println!("Kept:    {}", summary.counts.kept);
    println!("Deleted: {}", summary.counts.deleted);
    println!("Total:   {}", summary.counts.total());
    match (summary.library_size, summary.completion()) {
        (Some(size), Some(fraction)) => {
            println!(
                "Progress: {} / {} ({:.0}%)",
                summary.counts.total(),
                size,
                fraction * 100.0
            );
        }
        _ => println!("Progress: library size unknown"),
    }
}

/// Show kept/deleted counts
async fn show_stats(library: Option<PathBuf>) -> Result<()> {
    let cfg = config::config()?;
    let store = open_store(cfg.store_backend, &cfg.home)
        .await
        .with_context(|| format!("Failed to open decision store: {}", cfg.store_path().display()))?;

    let counts = store.aggregate_counts().await?;

    // Completion is measured against the real library, when we can see it
    let library_size = match resolve_library(library) {
        Ok(path) => match DirectoryLibrary::with_patterns(&path, &cfg.review.include_patterns) {
            Ok(lib) => {
                let listed: HashSet<_> = lib.list_assets().await?.into_iter().map(|a| a.id).collect();
                let decided = store.decided_ids().await?;
                // Decided photos that were moved out of the directory still count
                Some(listed.len() + decided.difference(&listed).count())
            }
            Err(e) => {
                tracing::debug!(error = %e, "Library not available for stats");
                None
            }
        },
        Err(_) => None,
    };

    print_summary(&Summary {
        counts,
        library_size,
    });

    Ok(())
}

/// List recent decisions
async fn show_history(limit: usize) -> Result<()> {
    let cfg = config::config()?;
    let store = open_store(cfg.store_backend, &cfg.home).await?;
    let decisions = store.recent(limit).await?;

    if decisions.is_empty() {
        println!("No decisions recorded yet.");
        return Ok(());
    }

    println!("{:<25} {:<18} {:<8}", "DECIDED", "ASSET", "VERDICT");
    println!("{}", "-".repeat(53));
    for decision in decisions {
        println!(
            "{:<25} {:<18} {:<8}",
            decision.timestamp.format("%Y-%m-%d %H:%M:%S"),
            decision.asset_id,
            if decision.kept { "keep" } else { "delete" }
        );
    }

    Ok(())
}

/// Show resolved configuration
async fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("sortify configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:    {}", cfg.home.display());
    println!(
        "  Library: {}",
        cfg.library
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not set)".to_string())
    );
    println!("  Store:   {} ({:?})", cfg.store_path().display(), cfg.store_backend);
    println!();
    println!("Review:");
    println!("  Commit distance: {:.0}% of width", cfg.review.swipe.commit_fraction * 100.0);
    println!("  Commit velocity: {}", cfg.review.swipe.velocity_threshold);
    println!("  Animation:       {}ms", cfg.review.swipe.commit_animation_ms);
    println!("  Apply deletes:   {}", cfg.review.apply_deletes);
    println!("  Skip reviewed:   {}", cfg.review.skip_reviewed);
    println!("  Include:         {}", cfg.review.include_patterns.join(", "));

    Ok(())
}
