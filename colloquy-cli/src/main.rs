//! Colloquy CLI - Command-line tools for stored conversations
//!
//! Works on a JSON file holding an array of conversations, as written by
//! `ConversationManager::export_conversations`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colloquy_core::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "colloquy")]
#[command(about = "Colloquy conversation maintenance CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show budget usage for every conversation
    Stats {
        /// Conversations file
        #[arg(short, long, env = "COLLOQUY_FILE")]
        file: PathBuf,
    },
    /// List active conversations, most recent first
    List {
        /// Conversations file
        #[arg(short, long, env = "COLLOQUY_FILE")]
        file: PathBuf,
        /// Activity window in days
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Compress one conversation and write the file back
    Compress {
        /// Conversations file
        #[arg(short, long, env = "COLLOQUY_FILE")]
        file: PathBuf,
        /// Conversation ID
        #[arg(short, long)]
        id: String,
        /// Strategy override (summarize, truncate, sliding_window)
        #[arg(short, long)]
        strategy: Option<String>,
    },
    /// Archive conversations idle for too long and write the file back
    ArchiveStale {
        /// Conversations file
        #[arg(short, long, env = "COLLOQUY_FILE")]
        file: PathBuf,
        /// Inactivity threshold in days
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ColloquyConfig::load()?;

    match cli.command {
        Commands::Version => {
            println!("colloquy {}", env!("CARGO_PKG_VERSION"));
            println!("colloquy-core {}", colloquy_core::VERSION);
        }
        Commands::Stats { file } => {
            let manager = open(&file, &config).await?;
            for conversation in manager.list_all().await {
                println!("{}", stats_line(&conversation));
            }
        }
        Commands::List { file, days } => {
            let days = days.unwrap_or(config.archive.stale_after_days);
            let manager = open(&file, &config).await?;
            for conversation in manager.list_active(days).await {
                println!(
                    "{}  {}  {:>4} msgs  {}",
                    conversation.id(),
                    conversation.last_active_at().format("%Y-%m-%d %H:%M"),
                    conversation.message_count(),
                    conversation.title().unwrap_or("(untitled)")
                );
            }
        }
        Commands::Compress { file, id, strategy } => {
            if let Some(strategy) = strategy {
                config.compression.strategy = CompressionStrategy::from(strategy.as_str());
            }
            println!("{}", compress(&file, &id, &config).await?);
        }
        Commands::ArchiveStale { file, days } => {
            let days = days.unwrap_or(config.archive.stale_after_days);
            let manager = open(&file, &config).await?;
            let archived = manager.auto_archive_stale(days).await;
            save(&file, &manager).await?;
            println!("Archived {} conversation(s)", archived);
        }
    }

    Ok(())
}

/// Load a conversations file into a manager with no agents registered.
///
/// Without agents, summarization has no backend and falls back to truncation.
async fn open(path: &Path, config: &ColloquyConfig) -> Result<ConversationManager> {
    let conversations = read_conversations(path)?;
    tracing::debug!(path = %path.display(), count = conversations.len(), "Read conversations file");
    let manager = ConversationManager::from_config(Arc::new(AgentRegistry::new()), config);
    manager.load_conversations(conversations).await;
    Ok(manager)
}

/// Compress one stored conversation and report the change
async fn compress(path: &Path, id: &str, config: &ColloquyConfig) -> Result<String> {
    let manager = open(path, config).await?;
    let result = manager.compress_conversation(id).await?;
    save(path, &manager).await?;
    // Counted after the fact so an inserted summary message is included
    let remaining = manager.get(id).await.map_or(0, |c| c.message_count());

    Ok(format!(
        "{}: {} -> {} messages, {} -> {} tokens ({}{})",
        id,
        result.original_message_count,
        remaining,
        result.original_token_count,
        result.compressed_token_count,
        result.strategy,
        if result.fallback_used { ", fallback" } else { "" }
    ))
}

async fn save(path: &Path, manager: &ConversationManager) -> Result<()> {
    write_conversations(path, &manager.export_conversations().await)
}

fn read_conversations(path: &Path) -> Result<Vec<Conversation>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid conversations file {}", path.display()))
}

/// Replace the file through a sibling temp file so a failed write never
/// leaves it truncated
fn write_conversations(path: &Path, conversations: &[Conversation]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut file, conversations)?;
    file.as_file().sync_all()?;
    file.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn stats_line(conversation: &Conversation) -> String {
    let state = conversation.context();
    format!(
        "{}  {:>4} msgs  {:>7} tokens  {:>5.1}%  {:>7} left  {}{}",
        conversation.id(),
        state.total_messages,
        state.total_tokens,
        state.token_percentage_used,
        state.remaining_tokens(),
        if state.compression_triggered {
            "compression due"
        } else {
            "ok"
        },
        if conversation.is_archived() { "  [archived]" } else { "" }
    )
}
