//! Record collections

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One keyed collection of domain records.
///
/// Each variant maps to a local table and to the remote table of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Users,
    Suppliers,
    Purchases,
    Payables,
    Receivables,
    CashSessions,
    Sales,
}

impl Collection {
    /// Every collection, in schema order
    pub const ALL: [Self; 7] = [
        Self::Users,
        Self::Suppliers,
        Self::Purchases,
        Self::Payables,
        Self::Receivables,
        Self::CashSessions,
        Self::Sales,
    ];

    /// Table name, both locally and remotely
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Suppliers => "suppliers",
            Self::Purchases => "purchases",
            Self::Payables => "payables",
            Self::Receivables => "receivables",
            Self::CashSessions => "cash_sessions",
            Self::Sales => "sales",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|collection| collection.as_str() == normalized)
            .ok_or_else(|| format!("unknown collection '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_table_names_and_dashed_aliases() {
        assert_eq!("payables".parse::<Collection>(), Ok(Collection::Payables));
        assert_eq!(
            "cash-sessions".parse::<Collection>(),
            Ok(Collection::CashSessions)
        );
        assert_eq!(" Sales ".parse::<Collection>(), Ok(Collection::Sales));
        assert!("invoices".parse::<Collection>().is_err());
    }

    #[test]
    fn serde_uses_table_names() {
        let json = serde_json::to_string(&Collection::CashSessions).unwrap();
        assert_eq!(json, "\"cash_sessions\"");
    }
}
