// ============================================================================
// Clinic API - Router
// File: crates/clinic-api/src/router.rs
// ============================================================================

use axum::{
    http::HeaderName,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers;
use crate::middleware::{require_active_subscription, require_admin, require_clinic_admin, require_session};
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn build_router(state: AppState) -> Router {
    // Public routes
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/clinic-register", post(handlers::registration::register_clinic))
        .route("/api/auth/subscription-signout", get(handlers::auth::subscription_signout));

    // Webhooks authenticate with shared secrets, not sessions
    let webhook_routes = Router::new()
        .route("/api/webhooks/subscription", post(handlers::webhooks::receive_subscription_event))
        .route("/api/webhooks/crm", post(handlers::webhooks::receive_subscription_event))
        .route("/api/webhooks/subscription/workflows", get(handlers::webhooks::list_workflows))
        .route("/api/webhooks/subscription/test", post(handlers::webhooks::dry_run));

    // Any signed-in user, whatever the subscription state
    let session_routes = Router::new()
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .route("/api/auth/check-subscription", get(handlers::auth::check_subscription));

    // Clinic admins manage billing even while inactive
    let billing_routes = Router::new()
        .route(
            "/api/subscription",
            get(handlers::subscription::get_subscription).post(handlers::subscription::change_subscription),
        )
        .route_layer(middleware::from_fn(require_clinic_admin));

    let workspace_routes = Router::new()
        .route("/api/clinic", get(handlers::clinic::get_workspace))
        .route_layer(middleware::from_fn(require_active_subscription));

    let admin_routes = Router::new()
        .route(
            "/api/admin/crm-migration",
            get(handlers::admin::list_migration_candidates).post(handlers::admin::run_migration),
        )
        .route("/api/admin/report/revenue", get(handlers::admin::revenue_report))
        .route_layer(middleware::from_fn(require_admin));

    let protected_routes = Router::new()
        .merge(session_routes)
        .merge(billing_routes)
        .merge(workspace_routes)
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .merge(public_routes)
        .merge(webhook_routes)
        .merge(protected_routes)
        .with_state(state)
        // CORS
        .layer(CorsLayer::permissive())
        // Tracing
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default().include_headers(false)))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}
