use finmanager_core::db::{StoredEntry, UndecodableEntry};
use finmanager_core::util::format_timestamp;
use finmanager_core::QueueEntry;
use serde::Serialize;

use crate::commands::common::{short_id, Context};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct QueueItem {
    pub id: String,
    pub action: String,
    pub collection: String,
    pub entity_id: String,
    pub timestamp: Option<String>,
    /// Why the stored row cannot be read, when it cannot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&QueueEntry> for QueueItem {
    fn from(entry: &QueueEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            action: entry.action().to_string(),
            collection: entry.collection.to_string(),
            entity_id: entry.entity_id.to_string(),
            timestamp: Some(format_timestamp(&entry.timestamp)),
            error: None,
        }
    }
}

impl From<&UndecodableEntry> for QueueItem {
    fn from(row: &UndecodableEntry) -> Self {
        Self {
            id: row.id.clone(),
            action: row.action.clone(),
            collection: row.collection.clone(),
            entity_id: row.entity_id.clone(),
            timestamp: None,
            error: Some(row.reason.clone()),
        }
    }
}

fn queue_item(row: &StoredEntry) -> QueueItem {
    match row {
        Ok(entry) => QueueItem::from(entry),
        Err(undecodable) => QueueItem::from(undecodable),
    }
}

pub async fn run_queue(as_json: bool, ctx: &Context) -> Result<(), CliError> {
    let store = ctx.open_store().await?;
    let rows = store.queue_scan().await?;

    if as_json {
        let items = rows.iter().map(queue_item).collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("Nothing to sync.");
        return Ok(());
    }

    for line in format_queue_lines(&rows) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_queue_lines(rows: &[StoredEntry]) -> Vec<String> {
    rows.iter()
        .map(|row| match row {
            Ok(entry) => format!(
                "{}  {:<6}  {:<13}  {}",
                format_timestamp(&entry.timestamp),
                entry.action(),
                entry.collection,
                short_id(&entry.entity_id)
            ),
            Err(undecodable) => format!(
                "{:<24}  {:<6}  {:<13}  {} (unreadable: {})",
                "?",
                undecodable.action,
                undecodable.collection,
                undecodable.entity_id.chars().take(13).collect::<String>(),
                undecodable.reason
            ),
        })
        .collect()
}
