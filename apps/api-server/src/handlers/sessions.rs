//! Session endpoints backed by the shared cache.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use stockpulse_core::services::SessionData;
use stockpulse_shared::ApiResponse;
use stockpulse_shared::dto::{SessionRequest, SessionResponse};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /api/sessions
pub async fn create_session(
    state: web::Data<AppState>,
    body: web::Json<SessionRequest>,
) -> AppResult<HttpResponse> {
    let id = Uuid::new_v4().to_string();
    let data = body.into_inner().data;

    if !state.sessions.create(&id, data.clone()).await {
        return Err(AppError::Unavailable("session store unavailable".to_string()));
    }

    Ok(HttpResponse::Created().json(ApiResponse::ok(session_response(&state, id, data))))
}

/// GET /api/sessions/{id}
pub async fn get_session(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let data = state.sessions.get(&id).await.ok_or_else(|| not_found(&id))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(session_response(&state, id, data))))
}

/// PATCH /api/sessions/{id} - merges the given keys into the stored data.
pub async fn update_session(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<SessionRequest>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();

    if !state.sessions.update(&id, body.into_inner().data).await {
        return Err(not_found(&id));
    }
    let data = state.sessions.get(&id).await.ok_or_else(|| not_found(&id))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(session_response(&state, id, data))))
}

/// DELETE /api/sessions/{id}
pub async fn delete_session(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();

    if state.sessions.delete(&id).await {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(not_found(&id))
    }
}

/// POST /api/sessions/{id}/extend
pub async fn extend_session(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();

    if state.sessions.extend(&id).await {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(not_found(&id))
    }
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("session {id} not found"))
}

fn session_response(state: &AppState, id: String, data: SessionData) -> SessionResponse {
    SessionResponse {
        id,
        data,
        expires_in: state.sessions.ttl().as_secs(),
    }
}
