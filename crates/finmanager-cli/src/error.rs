use std::io;

use finmanager_core::auth::AuthError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] finmanager_core::Error),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Sync task failed: {0}")]
    SyncTask(#[from] tokio::task::JoinError),
    #[error("Unknown collection '{0}'. Expected one of: {1}")]
    UnknownCollection(String, String),
    #[error("Record ID cannot be empty")]
    EmptyRecordId,
    #[error("No {collection} record found for id/prefix: {query}")]
    RecordNotFound { collection: String, query: String },
    #[error("{0}")]
    AmbiguousRecordId(String),
    #[error("No JSON fields provided; pass --json or pipe an object on stdin")]
    EmptyFields,
    #[error("Invalid JSON fields: {0}")]
    InvalidFields(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Sync is not configured. Run `finmanager config init --supabase-url <URL> --supabase-anon-key <KEY>`.")]
    SyncNotConfigured,
    #[error("Not signed in. Run `finmanager auth login`.")]
    NotSignedIn,
}
