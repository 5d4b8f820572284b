use crate::commands::common::{
    format_record_lines, parse_collection, record_to_list_item, Context, RecordListItem,
};
use crate::error::CliError;

pub async fn run_list(
    collection: &str,
    pending_only: bool,
    as_json: bool,
    ctx: &Context,
) -> Result<(), CliError> {
    let collection = parse_collection(collection)?;
    let store = ctx.open_store().await?;

    let mut records = store.get_all(collection).await?;
    if pending_only {
        records.retain(finmanager_core::Record::needs_sync);
    }

    if as_json {
        let json_items = records
            .iter()
            .map(record_to_list_item)
            .collect::<Result<Vec<RecordListItem>, _>>()?;
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No {collection} records.");
        return Ok(());
    }

    for line in format_record_lines(&records) {
        println!("{line}");
    }
    Ok(())
}
