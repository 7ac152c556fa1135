//! Bearer JWT verification → AuthCtx in request extensions.
//!
//! Only `/upload` sits behind this gate; every other route bypasses it.
//! A request that fails any step gets a bare 401 and never reaches a handler.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::api::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::auth::{bearer::BEARER_SCHEME, extract_bearer_token, redact_token};
use crate::state::AppState;

/// Placeholder some browser clients send when they have no token yet.
const UNDEFINED_TOKEN: &str = "undefined";

/// Put the auth gate in front of every route in `router`.
///
/// `route_layer` so unmatched paths still 404 instead of 401.
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let token = match extract_bearer_token(auth) {
        Ok(token) => token,
        Err(_) => {
            // InvalidHeader carries the raw header; log its shape only
            let bearer_scheme = auth.split_whitespace().next() == Some(BEARER_SCHEME);
            tracing::warn!(
                header_present = !auth.is_empty(),
                bearer_scheme,
                components = auth.split_whitespace().count(),
                "authentication failed: invalid Authorization header"
            );
            return Err(AppError::Unauthorized);
        }
    };

    if token == UNDEFINED_TOKEN {
        tracing::warn!("authentication failed; bearer token is undefined");
        return Err(AppError::Unauthorized);
    }

    tracing::debug!("validating JWT auth token");
    let claims = match state.auth.verify(token) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(
                token = %redact_token(token),
                error = %err,
                "JWT signature is invalid"
            );
            return Err(AppError::Unauthorized);
        }
    };

    tracing::info!(
        user_id = %claims.user_id,
        role = %claims.role,
        token = %redact_token(token),
        "bearer token accepted"
    );

    // middleware → extractor hand-off
    let auth_ctx = AuthCtx::new(token, claims);
    req.extensions_mut().insert(auth_ctx);

    Ok(next.run(req).await)
}
