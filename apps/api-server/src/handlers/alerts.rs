//! Alert listings.

use actix_web::{HttpResponse, web};

use stockpulse_core::domain::{Alert, AlertState};
use stockpulse_core::keys;
use stockpulse_shared::ApiResponse;
use stockpulse_shared::dto::{AlertQuery, AlertResponse};

use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/accounts/{account}/alerts?state=resolved
///
/// Active alerts come from the read cache; resolved ones straight from the store.
pub async fn list_alerts(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<AlertQuery>,
) -> AppResult<HttpResponse> {
    let account_id = path.into_inner();
    keys::validate_account_id(&account_id)?;

    let wanted = match query.into_inner().state {
        Some(raw) => raw.parse::<AlertState>()?,
        None => AlertState::Active,
    };

    let alerts = match wanted {
        AlertState::Active => state.reader.active_alerts(&account_id).await?,
        AlertState::Resolved => {
            state
                .alerts
                .find_by_account(&account_id, Some(AlertState::Resolved))
                .await?
        }
    };

    let body: Vec<_> = alerts.iter().map(alert_response).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::ok(body)))
}

fn alert_response(alert: &Alert) -> AlertResponse {
    AlertResponse {
        id: alert.id.to_string(),
        record_id: alert.record_id.to_string(),
        kind: alert.kind.as_str().to_string(),
        severity: alert.severity.as_str().to_string(),
        state: alert.state.as_str().to_string(),
        message: alert.message.clone(),
        created_at: alert.created_at.to_rfc3339(),
        resolved_at: alert.resolved_at.map(|at| at.to_rfc3339()),
    }
}
