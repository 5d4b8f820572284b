//! Supplier and purchase models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::RecordId;

/// Whether a supplier is still being bought from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplierStatus {
    #[default]
    Active,
    Inactive,
}

impl From<SupplierStatus> for serde_json::Value {
    fn from(value: SupplierStatus) -> Self {
        match value {
            SupplierStatus::Active => "active".into(),
            SupplierStatus::Inactive => "inactive".into(),
        }
    }
}

/// A supplier the business buys from
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Supplier {
    pub name: String,
    #[serde(default)]
    pub representative: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub bank_details: String,
    #[serde(default)]
    pub status: SupplierStatus,
}

impl Supplier {
    /// Create an active supplier with only a name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Case-insensitive match on name or representative
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self.representative.to_lowercase().contains(&query)
    }
}

/// A purchase made from a supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Purchase {
    pub supplier_id: RecordId,
    #[serde(default)]
    pub description: String,
    pub total: f64,
    pub date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supplier_defaults_to_active() {
        let supplier = Supplier::new("Acme");
        assert_eq!(supplier.status, SupplierStatus::Active);
        assert!(supplier.representative.is_empty());
    }

    #[test]
    fn supplier_search_matches_representative() {
        let supplier = Supplier {
            representative: "Maria Souza".to_string(),
            ..Supplier::new("Distribuidora Central")
        };
        assert!(supplier.matches("central"));
        assert!(supplier.matches("SOUZA"));
        assert!(!supplier.matches("acme"));
    }

    #[test]
    fn supplier_rejects_unknown_fields() {
        let raw = r#"{"name": "Acme", "fax": "123"}"#;
        assert!(serde_json::from_str::<Supplier>(raw).is_err());
    }
}
