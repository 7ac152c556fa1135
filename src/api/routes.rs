/*
 * Responsibility
 * - URL table of the service
 * - Only /upload goes through the bearer auth gate (route_layer on its own sub-router)
 */
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::api::handlers::{
    status::{favicon, healthcheck, version},
    upload::upload,
};
use crate::middleware;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let max_upload_bytes = state.config.max_upload_bytes;

    let protected = Router::new().route(
        "/upload",
        post(upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
    );
    let protected = middleware::auth::access::apply(protected, state);

    Router::new()
        .route("/", get(version))
        .route("/favicon.ico", get(favicon))
        .route("/version", get(version))
        .route("/healthcheck", get(healthcheck))
        .merge(protected)
}
