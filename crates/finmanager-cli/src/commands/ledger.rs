use finmanager_core::models::{PayableStatus, ReceivableStatus};
use finmanager_core::{Collection, FieldPatch};

use crate::commands::common::{resolve_record, Context};
use crate::error::CliError;

pub async fn run_pay(id: &str, ctx: &Context) -> Result<(), CliError> {
    settle(
        Collection::Payables,
        id,
        FieldPatch::new().set("status", PayableStatus::Paid),
        ctx,
    )
    .await
}

pub async fn run_receive(id: &str, ctx: &Context) -> Result<(), CliError> {
    settle(
        Collection::Receivables,
        id,
        FieldPatch::new().set("status", ReceivableStatus::Received),
        ctx,
    )
    .await
}

async fn settle(
    collection: Collection,
    id: &str,
    patch: FieldPatch,
    ctx: &Context,
) -> Result<(), CliError> {
    let store = ctx.open_store().await?;
    let record = resolve_record(&store, collection, id).await?;
    store.update(collection, &record.id, patch).await?;
    ctx.sync_after_change(&store).await;

    println!("{}", record.id);
    Ok(())
}
