use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::alert::AlertKind;
use crate::error::DomainError;

/// Multiplier over the reorder threshold above which stock counts as excess.
const OVERSTOCK_FACTOR: u64 = 5;

/// Derived stock state of an inventory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Normal,
    LowStock,
    OutOfStock,
    Overstock,
}

impl StockStatus {
    /// Classify a quantity against its reorder threshold.
    ///
    /// Exactly `threshold * 5` units is still `Normal`; only strictly more is `Overstock`.
    pub fn classify(quantity: u32, reorder_threshold: u32) -> Self {
        if quantity == 0 {
            StockStatus::OutOfStock
        } else if quantity < reorder_threshold {
            StockStatus::LowStock
        } else if u64::from(quantity) > u64::from(reorder_threshold) * OVERSTOCK_FACTOR {
            StockStatus::Overstock
        } else {
            StockStatus::Normal
        }
    }

    /// The alert kind this status raises, if any.
    ///
    /// Overstock is classified but never alerted on.
    pub fn alert_kind(self) -> Option<AlertKind> {
        match self {
            StockStatus::LowStock => Some(AlertKind::LowStock),
            StockStatus::OutOfStock => Some(AlertKind::OutOfStock),
            StockStatus::Normal | StockStatus::Overstock => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::Normal => "normal",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
            StockStatus::Overstock => "overstock",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(StockStatus::Normal),
            "low_stock" => Ok(StockStatus::LowStock),
            "out_of_stock" => Ok(StockStatus::OutOfStock),
            "overstock" => Ok(StockStatus::Overstock),
            other => Err(DomainError::Validation(format!(
                "unknown stock status: {other}"
            ))),
        }
    }
}

/// Inventory record as delivered by the external source, before validation.
///
/// Missing fields deserialize as `None` and are rejected by [`validate`](Self::validate).
/// A field of the wrong JSON type fails deserialization of this record only;
/// sources decode records one at a time. Identifiers may arrive as numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalInventoryRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    pub sku: Option<String>,
    pub quantity: Option<i64>,
    pub reorder_threshold: Option<i64>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub location_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub product_id: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    }))
}

/// Why an external record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordValidationError {
    #[error("record has no external identifier")]
    MissingExternalId,

    #[error("record {0} has no SKU")]
    MissingSku(String),

    #[error("record {0} has no quantity")]
    MissingQuantity(String),

    #[error("record {external_id} has negative quantity {quantity}")]
    NegativeQuantity { external_id: String, quantity: i64 },

    #[error("record {external_id} has out-of-range quantity {quantity}")]
    QuantityOutOfRange { external_id: String, quantity: i64 },

    #[error("record {external_id} has invalid reorder threshold {threshold}")]
    InvalidThreshold { external_id: String, threshold: i64 },
}

/// An external record that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRecord {
    pub external_id: String,
    pub sku: String,
    pub quantity: u32,
    pub reorder_threshold: Option<u32>,
    pub location_id: Option<String>,
    pub product_id: Option<String>,
    pub external_updated_at: Option<DateTime<Utc>>,
}

impl ExternalInventoryRecord {
    /// Validate the raw record into its typed form.
    pub fn validate(self) -> Result<ValidatedRecord, RecordValidationError> {
        let external_id = self
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(RecordValidationError::MissingExternalId)?;

        let sku = match self.sku.map(|s| s.trim().to_string()) {
            Some(sku) if !sku.is_empty() => sku,
            _ => return Err(RecordValidationError::MissingSku(external_id)),
        };

        let quantity = match self.quantity {
            None => return Err(RecordValidationError::MissingQuantity(external_id)),
            Some(q) if q < 0 => {
                return Err(RecordValidationError::NegativeQuantity {
                    external_id,
                    quantity: q,
                });
            }
            Some(q) => u32::try_from(q).map_err(|_| RecordValidationError::QuantityOutOfRange {
                external_id: external_id.clone(),
                quantity: q,
            })?,
        };

        let reorder_threshold = match self.reorder_threshold {
            None => None,
            Some(t) => Some(u32::try_from(t).map_err(|_| {
                RecordValidationError::InvalidThreshold {
                    external_id: external_id.clone(),
                    threshold: t,
                }
            })?),
        };

        Ok(ValidatedRecord {
            external_id,
            sku,
            quantity,
            reorder_threshold,
            location_id: self.location_id,
            product_id: self.product_id,
            external_updated_at: self.updated_at,
        })
    }
}

/// Local, canonical copy of an external inventory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: Uuid,
    pub account_id: String,
    pub external_id: String,
    pub sku: String,
    pub quantity: u32,
    pub reorder_threshold: u32,
    pub status: StockStatus,
    pub location_id: Option<String>,
    pub product_id: Option<String>,
    pub external_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    /// Create a record from its first sighting in the external source.
    pub fn new(account_id: impl Into<String>, source: ValidatedRecord, reorder_threshold: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            account_id: account_id.into(),
            status: StockStatus::classify(source.quantity, reorder_threshold),
            external_id: source.external_id,
            sku: source.sku,
            quantity: source.quantity,
            reorder_threshold,
            location_id: source.location_id,
            product_id: source.product_id,
            external_updated_at: source.external_updated_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the mutable fields from a newer external sighting.
    ///
    /// Identity and `created_at` are kept. Returns whether anything changed;
    /// `updated_at` only moves when it did.
    pub fn apply(&mut self, source: ValidatedRecord, reorder_threshold: u32) -> bool {
        let status = StockStatus::classify(source.quantity, reorder_threshold);
        let changed = self.sku != source.sku
            || self.quantity != source.quantity
            || self.reorder_threshold != reorder_threshold
            || self.status != status
            || self.location_id != source.location_id
            || self.product_id != source.product_id
            || self.external_updated_at != source.external_updated_at;

        if changed {
            self.sku = source.sku;
            self.quantity = source.quantity;
            self.reorder_threshold = reorder_threshold;
            self.status = status;
            self.location_id = source.location_id;
            self.product_id = source.product_id;
            self.external_updated_at = source.external_updated_at;
            self.updated_at = Utc::now();
        }

        changed
    }
}
