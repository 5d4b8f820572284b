use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use finmanager_core::auth::{SessionHandle, SupabaseAuthClient};
use finmanager_core::config::{AppConfig, SyncEngineConfig};
use finmanager_core::connectivity::Connectivity;
use finmanager_core::remote::SupabaseRemote;
use finmanager_core::{
    Collection, DrainOutcome, EntityData, EntityStore, Record, RecordId, SyncEngine, SyncStatus,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::auth::SessionStore;
use crate::error::CliError;

const CONFIG_FILE_NAME: &str = "config.json";

pub type CliSyncEngine = SyncEngine<SupabaseRemote, SessionHandle>;

/// Resolved paths and configuration for one CLI invocation.
pub struct Context {
    pub config: AppConfig,
    pub config_path: PathBuf,
    pub db_path: PathBuf,
    pub auto_sync: bool,
}

impl Context {
    pub fn load(
        cli_config: Option<PathBuf>,
        cli_db_path: Option<PathBuf>,
        no_sync: bool,
    ) -> Result<Self, CliError> {
        let config_path = cli_config.map_or_else(default_config_path, Ok)?;
        let config = AppConfig::load_from_path(&config_path)
            .map_err(CliError::Config)?
            .with_env_overrides();
        let db_path = resolve_db_path(cli_db_path, &config)?;

        Ok(Self {
            config,
            config_path,
            db_path,
            auto_sync: !no_sync,
        })
    }

    pub async fn open_store(&self) -> Result<EntityStore, CliError> {
        Ok(EntityStore::open_path(&self.db_path).await?)
    }

    pub fn auth_client(&self) -> Result<SupabaseAuthClient<SessionStore>, CliError> {
        let (url, anon_key) = self
            .config
            .supabase()
            .map_err(CliError::Config)?
            .ok_or(CliError::SyncNotConfigured)?;
        let store = SessionStore::new(&url);
        Ok(SupabaseAuthClient::new(url, anon_key, store)?)
    }

    /// Build an engine over `store` with the restored session and a probed
    /// connectivity flag (`probe = false` treats the network as down).
    pub async fn sync_engine(
        &self,
        store: EntityStore,
        probe: bool,
    ) -> Result<CliSyncEngine, CliError> {
        self.sync_engine_with(store, probe, self.config.sync_engine_config())
            .await
    }

    pub async fn sync_engine_with(
        &self,
        store: EntityStore,
        probe: bool,
        engine_config: SyncEngineConfig,
    ) -> Result<CliSyncEngine, CliError> {
        let (url, anon_key) = self
            .config
            .supabase()
            .map_err(CliError::Config)?
            .ok_or(CliError::SyncNotConfigured)?;
        let remote = SupabaseRemote::new(&url, anon_key.clone())?;

        let sessions = SessionHandle::new();
        let auth = SupabaseAuthClient::new(&url, anon_key, SessionStore::new(&url))?
            .with_handle(sessions.clone());
        auth.restore_session().await?;

        let online = probe && remote.probe().await;
        Ok(SyncEngine::new(
            store,
            remote,
            sessions,
            Connectivity::new(online),
            engine_config,
        ))
    }

    /// Best-effort drain after a local change; never fails the command.
    pub async fn sync_after_change(&self, store: &EntityStore) {
        if !self.auto_sync {
            return;
        }

        let engine = match self.sync_engine(store.clone(), true).await {
            Ok(engine) => engine,
            Err(error) => {
                tracing::debug!("Skipping sync after local change: {}", error);
                return;
            }
        };

        match engine.spawn_drain().await {
            Ok(DrainOutcome::Skipped(reason)) => {
                tracing::debug!("Sync skipped: {}", reason);
            }
            Ok(DrainOutcome::Finished(report)) if !report.is_clean() => {
                tracing::warn!(
                    "Sync incomplete: {} change(s) still queued",
                    report.remaining
                );
            }
            Ok(DrainOutcome::Finished(_)) => {}
            Err(error) => tracing::warn!("Sync task failed: {}", error),
        }
    }
}

pub fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join("finmanager").join(CONFIG_FILE_NAME))
        .ok_or_else(|| CliError::Config("Failed to resolve config directory".to_string()))
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("finmanager").join("finmanager.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve data directory".to_string()))
}

/// Flag, then `FINMANAGER_DB_PATH`/config file, then the platform default.
pub fn resolve_db_path(
    cli_db_path: Option<PathBuf>,
    config: &AppConfig,
) -> Result<PathBuf, CliError> {
    cli_db_path
        .or_else(|| config.db_path.clone())
        .map_or_else(default_db_path, Ok)
}

pub fn parse_collection(value: &str) -> Result<Collection, CliError> {
    value.parse().map_err(|_| {
        let names = Collection::ALL
            .iter()
            .map(|collection| collection.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        CliError::UnknownCollection(value.trim().to_string(), names)
    })
}

pub fn normalize_record_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyRecordId)
    } else {
        Ok(trimmed.to_ascii_lowercase())
    }
}

/// Find a record by full ID or unique ID prefix.
pub async fn resolve_record(
    store: &EntityStore,
    collection: Collection,
    query: &str,
) -> Result<Record, CliError> {
    let query = normalize_record_identifier(query)?;
    let not_found = || CliError::RecordNotFound {
        collection: collection.to_string(),
        query: query.clone(),
    };

    if let Ok(id) = query.parse::<RecordId>() {
        return store.get_by_id(collection, &id).await?.ok_or_else(not_found);
    }

    let mut matches = store
        .get_all(collection)
        .await?
        .into_iter()
        .filter(|record| record.id.as_str().starts_with(&query))
        .collect::<Vec<_>>();

    match matches.len() {
        0 => Err(not_found()),
        1 => Ok(matches.remove(0)),
        _ => {
            let options = matches
                .iter()
                .take(3)
                .map(|record| short_id(&record.id))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousRecordId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

/// JSON object from `--json`, or from piped stdin when the flag is absent.
pub fn resolve_fields(json: Option<&str>) -> Result<Map<String, Value>, CliError> {
    let raw = match json {
        Some(raw) if !raw.trim().is_empty() => raw.to_string(),
        _ => read_piped_stdin()?.ok_or(CliError::EmptyFields)?,
    };
    parse_fields(&raw)
}

pub fn parse_fields(raw: &str) -> Result<Map<String, Value>, CliError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(CliError::InvalidFields(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(error) => Err(CliError::InvalidFields(error.to_string())),
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    let trimmed = buffer.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

pub fn short_id(id: &RecordId) -> String {
    id.as_str().chars().take(13).collect()
}

#[derive(Debug, Serialize)]
pub struct RecordListItem {
    pub id: String,
    pub collection: String,
    pub sync_status: SyncStatus,
    pub created_at: String,
    pub updated_at: String,
    pub summary: String,
    pub fields: Map<String, Value>,
}

pub fn record_to_list_item(record: &Record) -> Result<RecordListItem, CliError> {
    Ok(RecordListItem {
        id: record.id.to_string(),
        collection: record.collection().to_string(),
        sync_status: record.sync_status,
        created_at: finmanager_core::util::format_timestamp(&record.created_at),
        updated_at: finmanager_core::util::format_timestamp(&record.updated_at),
        summary: record_summary(&record.data),
        fields: record.data.to_fields()?,
    })
}

/// One-line human description of a record's domain data.
pub fn record_summary(data: &EntityData) -> String {
    match data {
        EntityData::User(user) => format!("{} <{}>", user.name, user.email),
        EntityData::Supplier(supplier) => {
            if supplier.category.is_empty() {
                supplier.name.clone()
            } else {
                format!("{} ({})", supplier.name, supplier.category)
            }
        }
        EntityData::Purchase(purchase) => format!(
            "{} {:.2} {}",
            purchase.date, purchase.total, purchase.description
        ),
        EntityData::Payable(payable) => format!(
            "{} {:.2} due {} [{:?}]",
            payable.supplier_name, payable.amount, payable.due_date, payable.status
        ),
        EntityData::Receivable(receivable) => format!(
            "{} {:.2} due {} [{:?}]",
            receivable.customer_name, receivable.amount, receivable.due_date, receivable.status
        ),
        EntityData::CashSession(session) => format!(
            "{} opened {:.2} [{:?}]",
            session.operator_name, session.opening_balance, session.status
        ),
        EntityData::Sale(sale) => format!(
            "{} {:.2} {}",
            sale.date,
            sale.total,
            sale.description.as_deref().unwrap_or("")
        ),
    }
}

pub fn format_record_lines(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            format!(
                "{:<13}  {:<7}  {}",
                short_id(&record.id),
                record.sync_status,
                record_summary(&record.data).trim_end()
            )
        })
        .collect()
}
