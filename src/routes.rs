use crate::handlers::{self, AppState};
use crate::wizard_handler;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

/// Proxy, directory and wizard routes.
///
/// Security layers (body limit, rate limiting) and `/health` are added by the
/// binary so tests can drive these routes without a peer address.
///
/// # Returns
///
/// * `Router<Arc<AppState>>` - Routes still waiting for their state.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Aggregator proxy
        .route("/api/bbps/billers", post(handlers::proxy_billers))
        .route(
            "/api/bbps/biller-details",
            post(handlers::proxy_biller_details),
        )
        .route("/api/bbps/pre-enquiry", post(handlers::proxy_pre_enquiry))
        // Normalized directory
        .route("/api/billers", get(handlers::list_billers))
        // Recharge wizard sessions
        .route("/api/wizard/sessions", post(wizard_handler::create_session))
        .route(
            "/api/wizard/sessions/:id",
            get(wizard_handler::get_session).delete(wizard_handler::delete_session),
        )
        .route(
            "/api/wizard/sessions/:id/issuer",
            post(wizard_handler::select_issuer),
        )
        .route(
            "/api/wizard/sessions/:id/fields",
            put(wizard_handler::set_fields),
        )
        .route(
            "/api/wizard/sessions/:id/submit",
            post(wizard_handler::submit_details),
        )
        .route(
            "/api/wizard/sessions/:id/payment-mode",
            post(wizard_handler::choose_payment_mode),
        )
        .route(
            "/api/wizard/sessions/:id/proceed",
            post(wizard_handler::proceed_to_payment),
        )
        .route("/api/wizard/sessions/:id/back", post(wizard_handler::back))
        .route(
            "/api/wizard/sessions/:id/dismiss-error",
            post(wizard_handler::dismiss_error),
        )
}

/// The full application without rate limiting: `/health` plus [`api_routes`].
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(api_routes())
        .with_state(state)
}
