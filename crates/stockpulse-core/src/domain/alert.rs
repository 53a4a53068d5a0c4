use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::inventory::InventoryRecord;
use crate::error::DomainError;

/// What an alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowStock,
    OutOfStock,
    Overstock,
}

impl AlertKind {
    /// Kinds that signal a shortage and are resolved once stock recovers.
    pub const SHORTAGES: [AlertKind; 2] = [AlertKind::LowStock, AlertKind::OutOfStock];

    pub fn severity(self) -> Severity {
        match self {
            AlertKind::OutOfStock => Severity::Critical,
            AlertKind::LowStock => Severity::Warning,
            AlertKind::Overstock => Severity::Info,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::LowStock => "low_stock",
            AlertKind::OutOfStock => "out_of_stock",
            AlertKind::Overstock => "overstock",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low_stock" => Ok(AlertKind::LowStock),
            "out_of_stock" => Ok(AlertKind::OutOfStock),
            "overstock" => Ok(AlertKind::Overstock),
            other => Err(DomainError::Validation(format!("unknown alert kind: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl FromStr for Severity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Severity::Critical),
            "warning" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            other => Err(DomainError::Validation(format!("unknown severity: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    Active,
    Resolved,
}

impl AlertState {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertState::Active => "active",
            AlertState::Resolved => "resolved",
        }
    }
}

impl FromStr for AlertState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AlertState::Active),
            "resolved" => Ok(AlertState::Resolved),
            other => Err(DomainError::Validation(format!("unknown alert state: {other}"))),
        }
    }
}

/// Stock alert entity - raised for a record, resolved when stock recovers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub record_id: Uuid,
    pub account_id: String,
    pub kind: AlertKind,
    pub severity: Severity,
    pub state: AlertState,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Create a new active alert of `kind` for `record`.
    pub fn new(record: &InventoryRecord, kind: AlertKind) -> Self {
        let message = match kind {
            AlertKind::OutOfStock => format!("{} is out of stock", record.sku),
            AlertKind::LowStock => format!(
                "{} is low on stock ({} left, reorder at {})",
                record.sku, record.quantity, record.reorder_threshold
            ),
            AlertKind::Overstock => format!(
                "{} is overstocked ({} on hand)",
                record.sku, record.quantity
            ),
        };

        Self {
            id: Uuid::new_v4(),
            record_id: record.id,
            account_id: record.account_id.clone(),
            kind,
            severity: kind.severity(),
            state: AlertState::Active,
            message,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == AlertState::Active
    }

    /// Mark the alert resolved at `at`. Resolving twice keeps the first timestamp.
    pub fn resolve(&mut self, at: DateTime<Utc>) {
        if self.is_active() {
            self.state = AlertState::Resolved;
            self.resolved_at = Some(at);
        }
    }
}
