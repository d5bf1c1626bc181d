//! Route table: the upstream callback endpoint plus the control plane.

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{handlers, middleware as app_middleware, state::AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/callback",
            get(handlers::callback::verify_url).post(handlers::callback::receive_event),
        )
        .route("/api/sync/status", get(handlers::admin::sync_status))
        .route("/api/sync/trigger", post(handlers::admin::trigger_sync))
        .route("/api/sync/check", post(handlers::admin::trigger_check))
        .route("/api/sync/reset", post(handlers::admin::reset_cursor))
        .route("/api/sync/poller/start", post(handlers::admin::start_poller))
        .route("/api/sync/poller/stop", post(handlers::admin::stop_poller))
        .route(
            "/api/sync/checker/start",
            post(handlers::admin::start_checker),
        )
        .route(
            "/api/sync/checker/stop",
            post(handlers::admin::stop_checker),
        )
        .route("/api/sync/active", get(handlers::admin::list_active))
        .route("/api/leave", get(handlers::admin::leave_document))
        .route(
            "/api/docs/openapi.json",
            get(handlers::admin::openapi_document),
        )
        .layer(axum_middleware::from_fn(
            app_middleware::log_error_responses,
        ))
        .layer(axum_middleware::from_fn(app_middleware::request_id))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
