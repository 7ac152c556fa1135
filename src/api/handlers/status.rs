/*
 * Responsibility
 * - GET / and /version: service version + build tag
 * - GET /healthcheck: always healthy; logs upload directory diagnostics on the side
 * - GET /favicon.ico: empty 200 so browsers stop asking
 */
use std::collections::BTreeMap;
use std::path::Path;

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::services::build_info;
use crate::state::AppState;

pub const SERVICE_NAME: &str = "illiad-upload";

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub build: String,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub message: String,
}

pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: build_info::VERSION,
        build: build_info::build_tag(),
    })
}

pub async fn healthcheck(
    State(state): State<AppState>,
) -> Json<BTreeMap<&'static str, HealthStatus>> {
    // Reported health does not depend on the directory check.
    log_upload_dir(state.store.dir()).await;

    let mut checks = BTreeMap::new();
    checks.insert(
        SERVICE_NAME,
        HealthStatus {
            healthy: true,
            message: String::new(),
        },
    );
    Json(checks)
}

pub async fn favicon() -> StatusCode {
    StatusCode::OK
}

async fn log_upload_dir(dir: &Path) {
    let metadata = match tokio::fs::metadata(dir).await {
        Ok(metadata) => metadata,
        Err(e) => {
            tracing::error!(dir = %dir.display(), error = %e, "upload directory check failed");
            return;
        }
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::{MetadataExt, PermissionsExt};
        tracing::info!(
            dir = %dir.display(),
            permissions = %permission_bits(metadata.permissions().mode()),
            owner = %format!("{}:{}", metadata.uid(), metadata.gid()),
            current_user = %format!("{}:{}", nix::unistd::geteuid(), nix::unistd::getegid()),
            is_dir = metadata.is_dir(),
            "upload directory permissions"
        );
    }

    #[cfg(not(unix))]
    tracing::info!(
        dir = %dir.display(),
        readonly = metadata.permissions().readonly(),
        is_dir = metadata.is_dir(),
        "upload directory permissions"
    );
}

/// Permission bits of a unix mode in octal, without the file type bits.
#[cfg(unix)]
fn permission_bits(mode: u32) -> String {
    format!("{:o}", mode & 0o7777)
}
