//! Data models for FinManager

mod cash;
mod collection;
mod entity;
mod ledger;
mod queue;
mod record;
mod supplier;
mod user;

pub use cash::{total_sales, CashSession, CashSessionStatus, Sale};
pub use collection::Collection;
pub use entity::{EntityData, FieldPatch, RESERVED_FIELDS};
pub use ledger::{Payable, PayableStatus, Receivable, ReceivableStatus};
pub use queue::{QueueEntry, QueuePayload, SyncAction};
pub use record::{Record, RecordId, SyncStatus};
pub use supplier::{Purchase, Supplier, SupplierStatus};
pub use user::User;
