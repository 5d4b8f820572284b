use crate::commands::common::{parse_collection, resolve_record, Context};
use crate::error::CliError;

pub async fn run_delete(collection: &str, id: &str, ctx: &Context) -> Result<(), CliError> {
    let collection = parse_collection(collection)?;
    let store = ctx.open_store().await?;
    let record = resolve_record(&store, collection, id).await?;

    store.delete(collection, &record.id).await?;
    ctx.sync_after_change(&store).await;

    println!("{}", record.id);
    Ok(())
}
