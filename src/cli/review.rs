//! Interactive review loop.
//!
//! A terminal stand-in for the swipe screen: shows the current photo and
//! the one behind it, reads `k`/`d` in place of right/left swipes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::{print_summary, resolve_library};
use crate::adapters::{DirectoryLibrary, DirectoryPermission};
use crate::config;
use crate::core::{DecisionRecorder, ReviewSession, ReviewSnapshot, SessionPhase, Slot, SlotState};
use crate::domain::Direction;
use crate::store::open_store;

/// How long to wait for the current image before prompting anyway
const DECODE_WAIT: Duration = Duration::from_secs(5);

enum Command {
    Decide(Direction),
    Stats,
    Quit,
    Help,
}

fn parse_command(input: &str) -> Command {
    match input.trim().to_ascii_lowercase().as_str() {
        "k" | "keep" | "right" => Command::Decide(Direction::Keep),
        "d" | "delete" | "left" => Command::Decide(Direction::Delete),
        "s" | "stats" => Command::Stats,
        "q" | "quit" | "exit" => Command::Quit,
        _ => Command::Help,
    }
}

/// Run an interactive review over a photo directory
pub async fn execute_review(
    library: Option<PathBuf>,
    apply_deletes: bool,
    include_reviewed: bool,
) -> Result<()> {
    let cfg = config::config()?;
    let library_path = resolve_library(library)?;

    let mut settings = cfg.review.session_settings();
    settings.apply_deletes |= apply_deletes;
    if include_reviewed {
        settings.skip_reviewed = false;
    }

    let store = open_store(cfg.store_backend, &cfg.home)
        .await
        .with_context(|| format!("Failed to open decision store: {}", cfg.store_path().display()))?;
    let recorder = DecisionRecorder::spawn(store);

    let gate = DirectoryPermission::new(&library_path);
    let library = match DirectoryLibrary::with_patterns(&library_path, &cfg.review.include_patterns) {
        Ok(library) => library,
        Err(e) => {
            eprintln!("Cannot open photo library: {}", e);
            return Ok(());
        }
    };

    let mut session = ReviewSession::new(Arc::new(library), recorder.clone(), settings);

    match session.bootstrap(&gate).await? {
        SessionPhase::PermissionDenied(state) => {
            eprintln!("Need photo library permission ({:?}).", state);
            eprintln!("Check access to {}", library_path.display());
            return Ok(());
        }
        SessionPhase::Empty => {
            println!("No photos found");
            return Ok(());
        }
        _ => {}
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    loop {
        if tokio::time::timeout(DECODE_WAIT, session.settle()).await.is_err() {
            tracing::warn!("Image decode is taking longer than expected");
        }

        let snapshot = session.snapshot();
        if snapshot.phase == SessionPhase::Finished {
            println!("All photos reviewed.");
            break;
        }
        render(&snapshot, session.slot_state(Slot::Current));

        stdout.write_all(b"[k]eep  [d]elete  [s]tats  [q]uit > ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_command(&line) {
            Command::Decide(direction) => {
                session.commit_decision(direction)?;
            }
            Command::Stats => {
                println!();
                print_summary(&session.summary().await?);
                println!();
            }
            Command::Quit => break,
            Command::Help => {
                println!("k = keep (swipe right), d = delete (swipe left), s = stats, q = quit");
            }
        }
    }

    println!();
    print_summary(&session.summary().await?);

    recorder.shutdown().await?;
    if recorder.failed_appends() > 0 {
        eprintln!(
            "Warning: {} decision(s) could not be saved",
            recorder.failed_appends()
        );
    }

    Ok(())
}

fn render(snapshot: &ReviewSnapshot, current_state: &SlotState) {
    let Some(current) = &snapshot.current else {
        return;
    };

    let image = match current_state {
        SlotState::Ready(image) => format!("{} KB", image.len().div_ceil(1024)),
        SlotState::Pending(_) => "loading".to_string(),
        SlotState::Failed(_) => "could not load".to_string(),
        SlotState::Idle => "-".to_string(),
    };

    let name = current
        .location()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| current.id.to_string());

    println!();
    println!(
        "{} / {}  {}  ({}, {})",
        snapshot.progress.position(),
        snapshot.progress.total(),
        name,
        current.created_at.format("%Y-%m-%d %H:%M"),
        image
    );

    if let Some(next) = &snapshot.next {
        let preview = if snapshot.next_preview.is_some() {
            "ready"
        } else {
            "loading"
        };
        println!("  next: {} ({})", next.id, preview);
    }
}
