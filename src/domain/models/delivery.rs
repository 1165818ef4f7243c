use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Proof that a delivery id was already acted upon downstream.
///
/// Records expire with the cache TTL. An expired record says nothing about
/// whether the message was sent; the message store remains authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    pub delivery_id: String,
    pub sent_at: DateTime<Utc>,
}

/// Summary of one dispatch cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}
