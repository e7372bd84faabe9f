//! Aggregate counts over stored submissions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Summary of all stored submissions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStats {
    /// Number of stored submissions
    pub total: i64,
    /// Distinct non-empty target cities
    pub cities: i64,
    /// Count per status present in storage
    pub by_status: BTreeMap<String, i64>,
}

impl ApplicationStats {
    /// Build from per-status counts; `total` is their sum
    pub fn from_counts(by_status: impl IntoIterator<Item = (String, i64)>, cities: i64) -> Self {
        let by_status: BTreeMap<String, i64> = by_status.into_iter().collect();
        Self {
            total: by_status.values().sum(),
            cities,
            by_status,
        }
    }
}
