//! Accounts payable and receivable

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Settlement state of a payable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayableStatus {
    #[default]
    Pending,
    Paid,
}

impl From<PayableStatus> for serde_json::Value {
    fn from(value: PayableStatus) -> Self {
        match value {
            PayableStatus::Pending => "pending".into(),
            PayableStatus::Paid => "paid".into(),
        }
    }
}

/// Settlement state of a receivable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceivableStatus {
    #[default]
    Pending,
    Received,
}

impl From<ReceivableStatus> for serde_json::Value {
    fn from(value: ReceivableStatus) -> Self {
        match value {
            ReceivableStatus::Pending => "pending".into(),
            ReceivableStatus::Received => "received".into(),
        }
    }
}

/// Money owed to a supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Payable {
    pub supplier_name: String,
    #[serde(default)]
    pub description: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub status: PayableStatus,
    #[serde(default)]
    pub notes: String,
}

impl Payable {
    /// Unpaid and past its due date as of `today`
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == PayableStatus::Pending && self.due_date < today
    }
}

/// Money owed by a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Receivable {
    pub customer_name: String,
    #[serde(default)]
    pub description: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub status: ReceivableStatus,
    #[serde(default)]
    pub notes: String,
}

impl Receivable {
    /// Not yet received and past its due date as of `today`
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == ReceivableStatus::Pending && self.due_date < today
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    #[test]
    fn payable_overdue_only_while_pending() {
        let mut payable = Payable {
            supplier_name: "Acme".to_string(),
            description: "Rent".to_string(),
            amount: 1200.0,
            due_date: date("2024-05-10"),
            status: PayableStatus::Pending,
            notes: String::new(),
        };
        assert!(payable.is_overdue(date("2024-05-11")));
        assert!(!payable.is_overdue(date("2024-05-10")));

        payable.status = PayableStatus::Paid;
        assert!(!payable.is_overdue(date("2024-06-01")));
    }

    #[test]
    fn receivable_deserializes_with_defaults() {
        let raw = r#"{"customer_name": "Joana", "amount": 80.5, "due_date": "2024-07-01"}"#;
        let receivable: Receivable = serde_json::from_str(raw).unwrap();
        assert_eq!(receivable.status, ReceivableStatus::Pending);
        assert!(receivable.notes.is_empty());
    }
}
