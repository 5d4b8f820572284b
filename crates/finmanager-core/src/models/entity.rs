//! Typed domain payloads and partial patches

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{CashSession, Collection, Payable, Purchase, Receivable, Sale, Supplier, User};
use crate::error::{Error, Result};

/// Keys owned by the store; a patch may never set them.
pub const RESERVED_FIELDS: [&str; 6] = [
    "id",
    "created_at",
    "updated_at",
    "sync_status",
    "owner_id",
    "is_deleted",
];

/// Domain payload of a record, one variant per collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "collection", content = "fields")]
pub enum EntityData {
    #[serde(rename = "users")]
    User(User),
    #[serde(rename = "suppliers")]
    Supplier(Supplier),
    #[serde(rename = "purchases")]
    Purchase(Purchase),
    #[serde(rename = "payables")]
    Payable(Payable),
    #[serde(rename = "receivables")]
    Receivable(Receivable),
    #[serde(rename = "cash_sessions")]
    CashSession(CashSession),
    #[serde(rename = "sales")]
    Sale(Sale),
}

impl EntityData {
    /// Collection the payload belongs to
    pub const fn collection(&self) -> Collection {
        match self {
            Self::User(_) => Collection::Users,
            Self::Supplier(_) => Collection::Suppliers,
            Self::Purchase(_) => Collection::Purchases,
            Self::Payable(_) => Collection::Payables,
            Self::Receivable(_) => Collection::Receivables,
            Self::CashSession(_) => Collection::CashSessions,
            Self::Sale(_) => Collection::Sales,
        }
    }

    /// Flatten the domain fields into a JSON object
    pub fn to_fields(&self) -> Result<Map<String, Value>> {
        let value = match self {
            Self::User(inner) => serde_json::to_value(inner)?,
            Self::Supplier(inner) => serde_json::to_value(inner)?,
            Self::Purchase(inner) => serde_json::to_value(inner)?,
            Self::Payable(inner) => serde_json::to_value(inner)?,
            Self::Receivable(inner) => serde_json::to_value(inner)?,
            Self::CashSession(inner) => serde_json::to_value(inner)?,
            Self::Sale(inner) => serde_json::to_value(inner)?,
        };

        match value {
            Value::Object(fields) => Ok(fields),
            other => Err(Error::InvalidInput(format!(
                "expected an object for {}, got {other}",
                self.collection()
            ))),
        }
    }

    /// Rebuild a typed payload for `collection` from a JSON object.
    ///
    /// Unknown fields and type mismatches are `InvalidInput` errors.
    pub fn from_fields(collection: Collection, fields: Map<String, Value>) -> Result<Self> {
        let value = Value::Object(fields);
        let data = match collection {
            Collection::Users => Self::User(decode(collection, value)?),
            Collection::Suppliers => Self::Supplier(decode(collection, value)?),
            Collection::Purchases => Self::Purchase(decode(collection, value)?),
            Collection::Payables => Self::Payable(decode(collection, value)?),
            Collection::Receivables => Self::Receivable(decode(collection, value)?),
            Collection::CashSessions => Self::CashSession(decode(collection, value)?),
            Collection::Sales => Self::Sale(decode(collection, value)?),
        };
        Ok(data)
    }

    /// Merge `patch` over the current fields, producing a new typed payload
    pub fn apply_patch(&self, patch: &FieldPatch) -> Result<Self> {
        patch.validate()?;
        let mut fields = self.to_fields()?;
        for (key, value) in patch.iter() {
            fields.insert(key.clone(), value.clone());
        }
        Self::from_fields(self.collection(), fields)
    }
}

fn decode<T: DeserializeOwned>(collection: Collection, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|error| Error::InvalidInput(format!("invalid {collection} fields: {error}")))
}

/// Partial field set carried by an UPDATE.
///
/// The remote side applies it as a patch, never as a full replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPatch(Map<String, Value>);

impl FieldPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one field, builder style
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Reject patches that try to overwrite store-owned metadata
    pub fn validate(&self) -> Result<()> {
        if let Some(key) = self.0.keys().find(|key| RESERVED_FIELDS.contains(&key.as_str())) {
            return Err(Error::InvalidInput(format!(
                "field '{key}' is managed by the store and cannot be patched"
            )));
        }
        Ok(())
    }

    /// Borrow the raw JSON object
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for FieldPatch {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

impl TryFrom<Value> for FieldPatch {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(Error::InvalidInput(format!(
                "a patch must be a JSON object, got {other}"
            ))),
        }
    }
}
