use crate::errors::AppError;
use crate::handlers::AppState;
use crate::models::{Biller, FormData};
use crate::services::BillerApi;
use crate::wizard::{Wizard, WizardSnapshot};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Snapshot of a wizard session, as returned by every session endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub wizard: WizardSnapshot,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectIssuerRequest {
    pub biller_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentModeRequest {
    pub payment_mode: String,
}

async fn find_session(state: &AppState, id: Uuid) -> Result<Arc<Mutex<Wizard>>, AppError> {
    state
        .wizard_sessions
        .get(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Wizard session {} not found", id)))
}

/// Pages scanned when a biller has not been listed recently.
const LOOKUP_MAX_PAGES: u32 = 20;
const LOOKUP_PAGE_SIZE: u32 = 100;

/// Finds a biller by id: recent listings first, then the aggregator's
/// directory, page by page.
async fn resolve_biller(state: &AppState, biller_id: &str) -> Result<Biller, AppError> {
    if let Some(biller) = state.known_billers.get(biller_id).await {
        return Ok(biller);
    }

    let mut page = 1;
    loop {
        let result = state
            .bbps
            .list_billers(page, LOOKUP_PAGE_SIZE, &state.config.category_key)
            .await?;
        state.remember_billers(&result.billers).await;

        if let Some(found) = result
            .billers
            .into_iter()
            .find(|b| b.biller_id == biller_id)
        {
            return Ok(found);
        }
        if !result.meta.has_more() || page >= LOOKUP_MAX_PAGES {
            break;
        }
        page += 1;
    }

    Err(AppError::NotFound(format!("Biller {} not found", biller_id)))
}

/// 200 with the snapshot on success; 422 with the snapshot (banner set) when
/// the wizard refused the transition.
fn respond(id: Uuid, wizard: &Wizard, result: Result<(), AppError>) -> Response {
    let body = Json(SessionResponse {
        session_id: id,
        wizard: wizard.snapshot(),
    });
    match result {
        Ok(()) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            tracing::info!("Wizard {} transition rejected: {}", id, e);
            (StatusCode::UNPROCESSABLE_ENTITY, body).into_response()
        }
    }
}

/// POST /api/wizard/sessions
pub async fn create_session(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SessionResponse>) {
    let id = Uuid::new_v4();
    let wizard = Wizard::new();
    let snapshot = wizard.snapshot();
    state
        .wizard_sessions
        .insert(id, Arc::new(Mutex::new(wizard)))
        .await;
    tracing::info!("Wizard session {} created", id);

    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id: id,
            wizard: snapshot,
        }),
    )
}

/// GET /api/wizard/sessions/:id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let session = find_session(&state, id).await?;
    let wizard = session.lock().await;
    Ok(respond(id, &wizard, Ok(())))
}

/// DELETE /api/wizard/sessions/:id
///
/// Requests still running against the session finish on a wizard nobody can
/// reach any more.
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    find_session(&state, id).await?;
    state.wizard_sessions.invalidate(&id).await;
    tracing::info!("Wizard session {} closed", id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/wizard/sessions/:id/issuer
///
/// Only the `billerId` of the body is used; name and availability come from
/// the directory.
pub async fn select_issuer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<SelectIssuerRequest>,
) -> Result<Response, AppError> {
    let session = find_session(&state, id).await?;
    let biller = resolve_biller(&state, body.biller_id.trim()).await?;
    let mut wizard = session.lock().await;
    let result = wizard.select_issuer(&state.bbps, biller).await;
    Ok(respond(id, &wizard, result))
}

/// PUT /api/wizard/sessions/:id/fields
///
/// Applies every field in the body, or none of them when any is unknown.
pub async fn set_fields(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(fields): Json<FormData>,
) -> Result<Response, AppError> {
    let session = find_session(&state, id).await?;
    let mut wizard = session.lock().await;
    let result = wizard.set_fields(fields);
    Ok(respond(id, &wizard, result))
}

/// POST /api/wizard/sessions/:id/submit
pub async fn submit_details(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let session = find_session(&state, id).await?;
    let mut wizard = session.lock().await;
    let result = wizard.submit_details(&state.bbps).await;
    Ok(respond(id, &wizard, result))
}

/// POST /api/wizard/sessions/:id/payment-mode
pub async fn choose_payment_mode(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<PaymentModeRequest>,
) -> Result<Response, AppError> {
    let session = find_session(&state, id).await?;
    let mut wizard = session.lock().await;
    let result = wizard.choose_payment_mode(&body.payment_mode);
    Ok(respond(id, &wizard, result))
}

/// POST /api/wizard/sessions/:id/proceed
pub async fn proceed_to_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let session = find_session(&state, id).await?;
    let mut wizard = session.lock().await;
    let result = wizard.proceed_to_payment();
    Ok(respond(id, &wizard, result))
}

/// POST /api/wizard/sessions/:id/back
pub async fn back(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let session = find_session(&state, id).await?;
    let mut wizard = session.lock().await;
    let result = wizard.back();
    Ok(respond(id, &wizard, result))
}

/// POST /api/wizard/sessions/:id/dismiss-error
pub async fn dismiss_error(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let session = find_session(&state, id).await?;
    let mut wizard = session.lock().await;
    wizard.dismiss_error();
    Ok(respond(id, &wizard, Ok(())))
}
