/*
 * Responsibility
 * - POST /upload (behind the auth gate)
 * - Pick the first "file" part of the multipart body and stream it to the upload store
 * - Only the basename of the client filename is used: uploads never leave the upload dir
 * - Map multipart problems to 400 (413 over the size limit) and disk problems to 500
 */
use axum::{
    extract::{
        Multipart, State,
        multipart::{Field, MultipartError, MultipartRejection},
    },
    http::{HeaderMap, StatusCode, header},
};

use crate::{
    api::extractors::AuthCtxExtractor,
    error::AppError,
    services::storage::{StoreError, UploadStore},
    state::AppState,
};

pub const FILE_FIELD: &str = "file";

const REDACTED_HEADERS: [header::HeaderName; 3] = [
    header::AUTHORIZATION,
    header::COOKIE,
    header::PROXY_AUTHORIZATION,
];

pub async fn upload(
    State(state): State<AppState>,
    AuthCtxExtractor(auth): AuthCtxExtractor,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<String, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    tracing::info!(
        content_type = %content_type,
        user_id = %auth.claims.user_id,
        "received new upload request"
    );
    log_headers(&headers);

    let mut multipart = multipart.map_err(|rejection| {
        tracing::error!(
            error = %rejection.body_text(),
            "unable to get multipart form data from request"
        );
        AppError::malformed(rejection.body_text())
    })?;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!(error = %e, "unable to parse multipart form data");
        body_error(e)
    })? {
        // only the first "file" part is used; anything else is skipped
        if field.name() == Some(FILE_FIELD) {
            return save_file(&state, field).await;
        }
    }

    tracing::error!("multipart form contains no \"file\" field");
    Err(AppError::malformed("request contains no file"))
}

async fn save_file(state: &AppState, field: Field<'_>) -> Result<String, AppError> {
    let client_name = field.file_name().unwrap_or_default().to_string();
    let filename = UploadStore::basename(&client_name).ok_or_else(|| {
        tracing::error!(
            client_name = %client_name,
            "multipart field \"file\" has no usable filename"
        );
        AppError::malformed("request file has no filename")
    })?;

    let saved = state.store.save(&filename, field).await.map_err(|e| {
        tracing::error!(filename = %filename, error = %e, "unable to save upload");
        match e {
            StoreError::InvalidFilename(_) => AppError::malformed(e.to_string()),
            StoreError::Body(e) => body_error(e),
            StoreError::Io(_) => AppError::Storage(e.to_string()),
        }
    })?;

    tracing::info!(
        filename = %filename,
        client_name = %client_name,
        path = %saved.path.display(),
        bytes = saved.bytes,
        "upload saved"
    );

    Ok(format!("received {filename}"))
}

/// Body over the size limit → 413, anything else → 400.
fn body_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::malformed(e.body_text())
    }
}

fn log_headers(headers: &HeaderMap) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    for (name, value) in headers {
        let value = if REDACTED_HEADERS.contains(name) {
            "[redacted]"
        } else {
            value.to_str().unwrap_or("[non-ascii]")
        };
        tracing::debug!(header = %name, value = %value, "upload request header");
    }
}
