use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ai_kit_attachments::{AttachmentMeta, AttachmentRecord, AttachmentStore};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use clap::Args;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct PutArgs {
    /// File to store.
    pub file: PathBuf,
    /// Attachment ID. A new UUID is generated when omitted.
    #[arg(long)]
    pub id: Option<String>,
    /// Display name. Defaults to the file name.
    #[arg(long)]
    pub name: Option<String>,
    /// MIME type. Guessed from the file extension when omitted.
    #[arg(long)]
    pub content_type: Option<String>,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Attachment ID.
    pub id: String,
    /// Write the payload to this path.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// IDs to keep; everything else is deleted. Repeatable.
    #[arg(long = "keep")]
    pub keep: Vec<String>,
}

/// Guess an image MIME type from the file extension.
fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

fn format_created_at(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map_or_else(|| ms.to_string(), |t| t.to_rfc3339())
}

fn record_json(record: &AttachmentRecord) -> serde_json::Value {
    serde_json::json!({
        "id": record.id,
        "name": record.name,
        "type": record.content_type,
        "size": record.size,
        "createdAt": record.created_at,
    })
}

pub async fn put(store: &AttachmentStore, args: &PutArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let data = tokio::fs::read(&args.file).await?;
    let id = args
        .id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let name = args.name.clone().unwrap_or_else(|| {
        args.file
            .file_name()
            .map_or_else(|| id.clone(), |n| n.to_string_lossy().into_owned())
    });
    let content_type = args
        .content_type
        .clone()
        .unwrap_or_else(|| guess_content_type(&args.file).to_owned());
    let meta = AttachmentMeta::new(name, content_type, data.len() as u64);

    let Some(id) = store.put(id, Bytes::from(data), meta).await else {
        eprintln!("Attachment was not persisted (store unavailable or write failed).");
        std::process::exit(1);
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "id": id })),
        OutputFormat::Text => println!("Stored attachment {id}"),
    }
    Ok(())
}

pub async fn get(store: &AttachmentStore, args: &GetArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let Some(record) = store.get(&args.id).await else {
        eprintln!("Attachment {} not found.", args.id);
        std::process::exit(1);
    };

    if let Some(ref path) = args.output {
        tokio::fs::write(path, &record.blob).await?;
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&record_json(&record))?);
        }
        OutputFormat::Text => {
            println!("ID:         {}", record.id);
            println!("Name:       {}", record.name);
            println!("Type:       {}", record.content_type);
            println!("Size:       {} bytes", record.size);
            println!("Created at: {}", format_created_at(record.created_at));
            if let Some(ref path) = args.output {
                println!("Written to: {}", path.display());
            }
        }
    }
    Ok(())
}

pub async fn delete(store: &AttachmentStore, id: &str) -> anyhow::Result<()> {
    store.delete(id).await;
    println!("Deleted attachment {id} (if it existed).");
    Ok(())
}

pub async fn clear(store: &AttachmentStore) -> anyhow::Result<()> {
    store.clear().await;
    println!("Cleared all attachments.");
    Ok(())
}

pub async fn reconcile(
    store: &AttachmentStore,
    args: &ReconcileArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let keep: HashSet<String> = args.keep.iter().cloned().collect();
    let removed = store.reconcile(&keep).await;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "removed": removed, "kept": keep.len() }));
        }
        OutputFormat::Text => println!("Removed {removed} dangling attachment(s)."),
    }
    Ok(())
}
