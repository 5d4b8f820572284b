use crate::commands::common::{parse_collection, resolve_fields, Context};
use crate::error::CliError;

pub async fn run_add(collection: &str, json: Option<&str>, ctx: &Context) -> Result<(), CliError> {
    let collection = parse_collection(collection)?;
    let fields = resolve_fields(json)?;

    let store = ctx.open_store().await?;
    let record = store.create_fields(collection, fields).await?;
    ctx.sync_after_change(&store).await;

    println!("{}", record.id);
    Ok(())
}
