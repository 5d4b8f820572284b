pub mod add;
pub mod auth_cmd;
pub mod common;
pub mod config;
pub mod delete;
pub mod ledger;
pub mod list;
pub mod queue;
pub mod show;
pub mod sync;
pub mod update;
