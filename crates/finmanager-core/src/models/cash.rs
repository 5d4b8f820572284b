//! Cash register sessions and sales

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::RecordId;

/// Whether a cash session is still accepting movements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CashSessionStatus {
    #[default]
    Open,
    Closed,
}

impl From<CashSessionStatus> for serde_json::Value {
    fn from(value: CashSessionStatus) -> Self {
        match value {
            CashSessionStatus::Open => "open".into(),
            CashSessionStatus::Closed => "closed".into(),
        }
    }
}

/// One operator's cash register session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CashSession {
    pub operator_name: String,
    pub opening_balance: f64,
    #[serde(default)]
    pub status: CashSessionStatus,
    pub opening_time: DateTime<Utc>,
    #[serde(default)]
    pub closing_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closing_balance: Option<f64>,
    #[serde(default)]
    pub notes: String,
}

impl CashSession {
    /// Open a new session now
    #[must_use]
    pub fn open(operator_name: impl Into<String>, opening_balance: f64) -> Self {
        Self {
            operator_name: operator_name.into(),
            opening_balance,
            status: CashSessionStatus::Open,
            opening_time: crate::util::now(),
            closing_time: None,
            closing_balance: None,
            notes: String::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == CashSessionStatus::Open
    }
}

/// A completed sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Sale {
    pub total: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cash_session_id: Option<RecordId>,
}

/// Sum of sale totals
pub fn total_sales<'a>(sales: impl IntoIterator<Item = &'a Sale>) -> f64 {
    sales.into_iter().map(|sale| sale.total).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opened_session_is_open() {
        let session = CashSession::open("Ana", 150.0);
        assert!(session.is_open());
        assert!(session.closing_time.is_none());
    }

    #[test]
    fn total_sales_sums_totals() {
        let date: NaiveDate = "2024-05-01".parse().unwrap();
        let sales = [
            Sale {
                total: 10.5,
                date,
                description: None,
                cash_session_id: None,
            },
            Sale {
                total: 4.5,
                date,
                description: Some("coffee".to_string()),
                cash_session_id: None,
            },
        ];
        assert!((total_sales(&sales) - 15.0).abs() < f64::EPSILON);
    }
}
