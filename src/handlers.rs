use crate::classify::{ensure_enquiry_payload, extract_error_message, is_domain_error};
use crate::config::Config;
use crate::directory::{apply_view, DirectoryView, SortDirection};
use crate::errors::AppError;
use crate::models::*;
use crate::services::{BbpsService, BillerApi, BILLERS_PATH, BILLER_DETAILS_PATH, PRE_ENQUIRY_PATH};
use crate::wizard::Wizard;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use moka::future::Cache;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Client for the BBPS aggregator.
    pub bbps: BbpsService,
    /// Wizard sessions, evicted after a period of inactivity.
    pub wizard_sessions: Cache<Uuid, Arc<Mutex<Wizard>>>,
    /// Billers seen in recent listings, keyed by `billerId`.
    pub known_billers: Cache<String, Biller>,
}

/// How long a listed biller (and its availability) is trusted.
const KNOWN_BILLER_TTL: Duration = Duration::from_secs(300);

impl AppState {
    pub fn new(config: Config, bbps: BbpsService) -> Self {
        let wizard_sessions = Cache::builder()
            .time_to_idle(Duration::from_secs(config.wizard_session_ttl_secs))
            .max_capacity(config.wizard_max_sessions)
            .build();

        let known_billers = Cache::builder()
            .time_to_live(KNOWN_BILLER_TTL)
            .max_capacity(10_000)
            .build();

        Self {
            config,
            bbps,
            wizard_sessions,
            known_billers,
        }
    }

    /// Records listed billers so sessions can resolve them by id.
    pub async fn remember_billers(&self, billers: &[Biller]) {
        for biller in billers {
            self.known_billers
                .insert(biller.biller_id.clone(), biller.clone())
                .await;
        }
    }
}

/// Health check endpoint.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "fastag-bbps",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

// ============ Proxy endpoints ============

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BillersProxyBody {
    pub pagination: Option<PaginationInput>,
    pub filters: Option<FiltersInput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationInput {
    pub page_number: Option<u32>,
    pub records_per_page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FiltersInput {
    pub category_key: Option<String>,
}

/// POST /api/bbps/billers
///
/// Forwards a listing request, filling in page 1, the configured page size
/// and the configured category key where the caller left them out.
///
/// # Returns
///
/// * `Result<Json<Value>, AppError>` - The aggregator's body, untouched.
pub async fn proxy_billers(
    State(state): State<Arc<AppState>>,
    body: Option<Json<BillersProxyBody>>,
) -> Result<Json<Value>, AppError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let pagination = body.pagination.unwrap_or_default();
    let category_key = body
        .filters
        .and_then(|f| f.category_key)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| state.config.category_key.clone());

    let request = BillersRequest::new(
        pagination.page_number.unwrap_or(1).max(1),
        pagination
            .records_per_page
            .unwrap_or(state.config.page_size)
            .max(1),
        category_key,
    );
    tracing::info!(
        "POST /api/bbps/billers - page {} category {}",
        request.pagination.page_number,
        request.filters.category_key
    );

    let upstream = state
        .bbps
        .gateway()
        .post_json(BILLERS_PATH, &request)
        .await?;
    Ok(Json(upstream))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BillerDetailsProxyBody {
    pub biller_id: Option<String>,
}

/// POST /api/bbps/biller-details
pub async fn proxy_biller_details(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BillerDetailsProxyBody>,
) -> Result<Json<Value>, AppError> {
    let biller_id = body
        .biller_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("billerId is required".to_string()))?;

    tracing::info!("POST /api/bbps/biller-details - biller {}", biller_id);

    let upstream = state
        .bbps
        .gateway()
        .post_json(BILLER_DETAILS_PATH, &BillerDetailsRequest { biller_id })
        .await?;
    Ok(Json(upstream))
}

/// POST /api/bbps/pre-enquiry
///
/// Forwards the enquiry as received. A 2xx answer whose body carries a
/// business error is turned into a 400 with the extracted message; an empty
/// or non-object 2xx body is a 500.
pub async fn proxy_pre_enquiry(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let missing: Vec<&str> = ["billerId", "inputParameters", "externalRef"]
        .into_iter()
        .filter(|key| is_missing(body.get(*key)))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Missing required field(s): {}",
            missing.join(", ")
        )));
    }

    tracing::info!(
        "POST /api/bbps/pre-enquiry - biller {} ref {}",
        body["billerId"],
        body["externalRef"]
    );

    let upstream = state
        .bbps
        .gateway()
        .post_json(PRE_ENQUIRY_PATH, &body)
        .await?;
    ensure_enquiry_payload(&upstream)?;

    if is_domain_error(&upstream) {
        return Err(AppError::Domain(extract_error_message(&upstream)));
    }

    Ok(Json(upstream))
}

/// Absent or `null`. Blank strings also count; an empty object does not, since
/// a biller whose parameters are all optional is enquired with `{}`.
fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

// ============ Normalized directory ============

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectoryQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub sort: Option<SortDirection>,
    pub only_available: Option<bool>,
}

/// GET /api/billers
///
/// One page of normalized billers with search, sort and availability
/// filter applied.
pub async fn list_billers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DirectoryQuery>,
) -> Result<Json<BillerPage>, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(state.config.page_size).clamp(1, 100);

    let result = state
        .bbps
        .list_billers(page, page_size, &state.config.category_key)
        .await?;
    state.remember_billers(&result.billers).await;

    let view = DirectoryView {
        search: query.search.unwrap_or_default(),
        sort: query.sort.unwrap_or_default(),
        only_available: query.only_available.unwrap_or(false),
    };
    let billers = apply_view(&result.billers, &view)
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(BillerPage {
        billers,
        meta: result.meta,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_detection() {
        let body = json!({
            "billerId": "B1",
            "inputParameters": {},
            "externalRef": "  ",
            "transactionAmount": 0
        });
        assert!(!is_missing(body.get("billerId")));
        assert!(!is_missing(body.get("inputParameters")));
        assert!(is_missing(body.get("externalRef")));
        assert!(is_missing(body.get("absent")));
        assert!(!is_missing(body.get("transactionAmount")));
        assert!(is_missing(json!({"inputParameters": null}).get("inputParameters")));
    }
}
