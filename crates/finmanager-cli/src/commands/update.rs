use finmanager_core::FieldPatch;

use crate::commands::common::{parse_collection, resolve_fields, resolve_record, Context};
use crate::error::CliError;

pub async fn run_update(
    collection: &str,
    id: &str,
    json: Option<&str>,
    ctx: &Context,
) -> Result<(), CliError> {
    let collection = parse_collection(collection)?;
    let patch = FieldPatch::from(resolve_fields(json)?);
    if patch.is_empty() {
        return Err(CliError::EmptyFields);
    }

    let store = ctx.open_store().await?;
    let record = resolve_record(&store, collection, id).await?;
    store.update(collection, &record.id, patch).await?;
    ctx.sync_after_change(&store).await;

    println!("{}", record.id);
    Ok(())
}
