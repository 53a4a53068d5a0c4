//! Data Transfer Objects - request/response types for the API.

use serde::{Deserialize, Serialize};

/// Optional filters for inventory listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryQuery {
    /// One of `out_of_stock`, `low_stock`, `normal`, `overstock`.
    pub status: Option<String>,
}

/// Counters of a completed sync pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSummaryResponse {
    pub account_id: String,
    pub pages: u32,
    pub processed: u32,
    pub created: u32,
    pub updated: u32,
    pub unchanged: u32,
    pub skipped: u32,
    pub alerts_raised: u32,
    pub alerts_resolved: u32,
    pub duration_ms: u64,
}

/// A locally synchronized inventory record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecordResponse {
    pub id: String,
    pub external_id: String,
    pub sku: String,
    pub quantity: u32,
    pub reorder_threshold: u32,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub updated_at: String,
}

/// A stock alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertResponse {
    pub id: String,
    pub record_id: String,
    pub kind: String,
    pub severity: String,
    pub state: String,
    pub message: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,
}

/// Optional filter for alert listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertQuery {
    /// `active` (default) or `resolved`.
    pub state: Option<String>,
}

/// Payload for creating or patching a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionRequest {
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// A stored session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub id: String,
    pub data: serde_json::Map<String, serde_json::Value>,
    /// Seconds until the session expires if left untouched.
    pub expires_in: u64,
}
