use ai_kit_attachments::AttachmentStore;
use ai_kit_chatbot::AttachmentsConfig;

use crate::OutputFormat;

pub async fn run(
    store: &AttachmentStore,
    config: &AttachmentsConfig,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let available = store.is_available().await;
    let mut ids = store.ids().await;
    ids.sort();

    match format {
        OutputFormat::Json => {
            let resp = serde_json::json!({
                "backend": config.backend,
                "available": available,
                "count": ids.len(),
                "ids": ids,
            });
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
        OutputFormat::Text => {
            let state = if available { "available" } else { "unavailable" };
            println!("Backend: {} ({state})", config.backend);
            if let Some(path) = config.sqlite_config().database_path()
                && config.backend == "sqlite"
            {
                println!("Database: {}", path.display());
            }
            println!("{} attachment(s):", ids.len());
            for id in &ids {
                println!("  {id}");
            }
        }
    }
    Ok(())
}
