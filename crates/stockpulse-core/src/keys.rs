//! Cache key layout shared by the sync engine and the read paths.
//!
//! Keys are relative to the cache namespace. Account ids are embedded verbatim,
//! including in invalidation patterns, so they are restricted to
//! `[A-Za-z0-9._-]` by [`validate_account_id`].

use crate::domain::StockStatus;
use crate::error::DomainError;

const MAX_ACCOUNT_ID_LEN: usize = 128;

/// Reject account ids that could not be used literally in keys, patterns or URLs.
pub fn validate_account_id(account_id: &str) -> Result<(), DomainError> {
    if account_id.is_empty() {
        return Err(DomainError::Validation("account id is empty".to_string()));
    }
    if account_id.len() > MAX_ACCOUNT_ID_LEN {
        return Err(DomainError::Validation(format!(
            "account id is longer than {MAX_ACCOUNT_ID_LEN} characters"
        )));
    }
    if let Some(c) = account_id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(DomainError::Validation(format!(
            "account id contains unsupported character {c:?}"
        )));
    }
    Ok(())
}

/// Every record of an account.
pub fn inventory_list(account_id: &str) -> String {
    format!("inventory:{account_id}:view:all")
}

/// Records of an account in one status.
pub fn inventory_by_status(account_id: &str, status: StockStatus) -> String {
    format!("inventory:{account_id}:view:status:{status}")
}

/// Aggregate inventory views of an account.
pub fn inventory_views_pattern(account_id: &str) -> String {
    format!("inventory:{account_id}:view:*")
}

/// A single record.
pub fn inventory_item(account_id: &str, external_id: &str) -> String {
    format!("inventory:{account_id}:item:{external_id}")
}

/// Active alerts of an account.
pub fn active_alerts(account_id: &str) -> String {
    format!("alerts:{account_id}:active")
}

/// Every alert view of an account.
pub fn alerts_pattern(account_id: &str) -> String {
    format!("alerts:{account_id}:*")
}

pub fn session(session_id: &str) -> String {
    format!("session:{session_id}")
}
