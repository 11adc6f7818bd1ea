//! AI-Kit attachments CLI
//!
//! Inspect and maintain the chatbot's local attachment store.

mod commands;

use std::path::PathBuf;

use ai_kit_attachments::global;
use ai_kit_chatbot::{ChatbotConfig, create_attachment_store, telemetry};
use clap::{Parser, Subcommand};

/// AI-Kit attachments: inspect and maintain the chatbot attachment store.
#[derive(Parser, Debug)]
#[command(name = "ai-kit-attachments", version, about)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "AI_KIT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Override `[attachments] data_dir` from the config.
    #[arg(long, env = "AI_KIT_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a file as an attachment.
    Put(commands::attachments::PutArgs),
    /// Load an attachment and optionally write its payload to disk.
    Get(commands::attachments::GetArgs),
    /// Delete an attachment.
    Delete {
        /// Attachment ID.
        id: String,
    },
    /// Delete every attachment.
    Clear,
    /// Delete every attachment not listed with `--keep`.
    Reconcile(commands::attachments::ReconcileArgs),
    /// Show whether the store is available and what it holds.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => ChatbotConfig::from_file(path)?,
        None => ChatbotConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.attachments.data_dir = Some(dir);
    }

    telemetry::init(&config.logging);

    let store = create_attachment_store(&config.attachments)?;
    let Ok(store) = global::install(store) else {
        anyhow::bail!("attachment store already installed");
    };

    match cli.command {
        Command::Put(args) => commands::attachments::put(store, &args, &cli.format).await,
        Command::Get(args) => commands::attachments::get(store, &args, &cli.format).await,
        Command::Delete { id } => commands::attachments::delete(store, &id).await,
        Command::Clear => commands::attachments::clear(store).await,
        Command::Reconcile(args) => {
            commands::attachments::reconcile(store, &args, &cli.format).await
        }
        Command::Status => commands::status::run(store, &config.attachments, &cli.format).await,
    }
}
