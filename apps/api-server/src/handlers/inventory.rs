//! Cached inventory reads.

use actix_web::{HttpResponse, web};

use stockpulse_core::domain::{InventoryRecord, StockStatus};
use stockpulse_core::keys;
use stockpulse_shared::ApiResponse;
use stockpulse_shared::dto::{InventoryQuery, InventoryRecordResponse};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /api/accounts/{account}/inventory?status=low_stock
pub async fn list_inventory(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<InventoryQuery>,
) -> AppResult<HttpResponse> {
    let account_id = path.into_inner();
    keys::validate_account_id(&account_id)?;

    let records = match query.into_inner().status {
        Some(raw) => {
            let status: StockStatus = raw.parse()?;
            state.reader.list_by_status(&account_id, status).await?
        }
        None => state.reader.list(&account_id).await?,
    };

    let body: Vec<_> = records.iter().map(record_response).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::ok(body)))
}

/// GET /api/accounts/{account}/inventory/{external_id}
pub async fn get_inventory_item(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> AppResult<HttpResponse> {
    let (account_id, external_id) = path.into_inner();
    keys::validate_account_id(&account_id)?;

    let record = state
        .reader
        .get(&account_id, &external_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("inventory item {external_id} not found")))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(record_response(&record))))
}

fn record_response(record: &InventoryRecord) -> InventoryRecordResponse {
    InventoryRecordResponse {
        id: record.id.to_string(),
        external_id: record.external_id.clone(),
        sku: record.sku.clone(),
        quantity: record.quantity,
        reorder_threshold: record.reorder_threshold,
        status: record.status.as_str().to_string(),
        location_id: record.location_id.clone(),
        product_id: record.product_id.clone(),
        updated_at: record.updated_at.to_rfc3339(),
    }
}
