//! Sync trigger.

use actix_web::{HttpResponse, web};

use stockpulse_core::SyncSummary;
use stockpulse_shared::ApiResponse;
use stockpulse_shared::dto::SyncSummaryResponse;

use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /api/accounts/{account}/sync
///
/// Runs a full pass for the account and waits for it to finish. A pass already
/// running for the same account is waited for, not rejected.
pub async fn sync_account(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let account_id = path.into_inner();
    let summary = state.engine.sync_all(&account_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(summary_response(account_id, &summary))))
}

pub(crate) fn summary_response(account_id: String, summary: &SyncSummary) -> SyncSummaryResponse {
    SyncSummaryResponse {
        account_id,
        pages: summary.pages,
        processed: summary.processed,
        created: summary.created,
        updated: summary.updated,
        unchanged: summary.unchanged,
        skipped: summary.skipped,
        alerts_raised: summary.alerts_raised,
        alerts_resolved: summary.alerts_resolved,
        duration_ms: summary.duration_ms,
    }
}
