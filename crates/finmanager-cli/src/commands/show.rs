use finmanager_core::util::format_timestamp;

use crate::commands::common::{parse_collection, record_to_list_item, resolve_record, Context};
use crate::error::CliError;

pub async fn run_show(
    collection: &str,
    id: &str,
    as_json: bool,
    ctx: &Context,
) -> Result<(), CliError> {
    let collection = parse_collection(collection)?;
    let store = ctx.open_store().await?;
    let record = resolve_record(&store, collection, id).await?;

    if as_json {
        let item = record_to_list_item(&record)?;
        println!("{}", serde_json::to_string_pretty(&item)?);
        return Ok(());
    }

    let pending = store.pending_for(collection, &record.id).await?;
    println!("id:          {}", record.id);
    println!("collection:  {collection}");
    println!("sync_status: {}", record.sync_status);
    println!("created_at:  {}", format_timestamp(&record.created_at));
    println!("updated_at:  {}", format_timestamp(&record.updated_at));
    println!("queued:      {}", pending.len());
    println!(
        "{}",
        serde_json::to_string_pretty(&record.data.to_fields()?)?
    );
    Ok(())
}
