/*
 * Responsibility
 * - tracing / panic hook setup
 * - Config → dependencies → Router (+ middleware: http, cors, security headers)
 * - axum::serve() until Ctrl-C / SIGTERM
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::error::AppError;
use crate::services::auth::build_auth_service;
use crate::state::AppState;
use crate::{api, middleware};

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,illiad_upload=debug,tower_http=debug cargo run -- --dir /tmp/up --jwtkey secret
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_ansi(false))
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // stderr can be hidden depending on how the process is launched
        tracing::error!(?info, "panic");

        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    tracing::info!("===> ILLiad upload WS is starting up <===");

    let config = Config::from_args()
        .map_err(AppError::from)
        .inspect_err(|e| tracing::error!(error = %e, "startup aborted"))?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!("[CONFIG] port          = [{}]", config.addr.port());
    tracing::info!("[CONFIG] dir           = [{}]", config.upload_dir.display());

    let state = build_state(config)?;
    let app = build_router(state.clone(), &state.config);

    let listener = tokio::net::TcpListener::bind(state.config.addr)
        .await
        .with_context(|| format!("unable to bind {}", state.config.addr))?;
    tracing::info!(
        "start service on port {} in {:?} mode with CORS support enabled",
        state.config.addr.port(),
        state.config.app_env
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

fn build_state(config: Config) -> Result<AppState, AppError> {
    let auth = build_auth_service(&config)?;
    Ok(AppState::new(Arc::new(config), auth))
}

pub(crate) fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .merge(api::routes(state.clone()))
        .with_state(state);

    let router = middleware::security_headers::apply(router);
    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router, config.max_upload_bytes)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "unable to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "unable to listen for SIGTERM");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::services::auth::access_jwt::test_support::{claims_expiring_in, mint};

    const KEY: &str = "test-signing-key";
    const BOUNDARY: &str = "X-ILLIAD-UPLOAD-BOUNDARY";

    fn test_app(dir: &Path) -> Router {
        test_app_with(dir, &[])
    }

    fn test_app_with(dir: &Path, extra_args: &[&str]) -> Router {
        let mut args = vec![
            "illiad-upload",
            "--dir",
            dir.to_str().unwrap(),
            "--jwtkey",
            KEY,
        ];
        args.extend_from_slice(extra_args);
        let config = Config::try_from_iter(args).unwrap();
        let state = build_state(config).unwrap();
        build_router(state.clone(), &state.config)
    }

    fn valid_token() -> String {
        mint(&claims_expiring_in(3600), KEY)
    }

    fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, filename, contents) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match filename {
                Some(filename) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(contents);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(authorization: Option<&str>, body: Vec<u8>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(authorization) = authorization {
            builder = builder.header(header::AUTHORIZATION, authorization);
        }
        builder.body(Body::from(body)).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_text(resp: axum::response::Response) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn upload_with_valid_token_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());
        let contents: &[u8] = b"\x00\x01binary\r\ncontents\xff";
        let auth = format!("Bearer {}", valid_token());

        let resp = app
            .oneshot(upload_request(
                Some(&auth),
                multipart_body(&[("file", Some("x.txt"), contents)]),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "received x.txt");
        assert_eq!(std::fs::read(dir.path().join("x.txt")).unwrap(), contents);
    }

    #[tokio::test]
    async fn upload_accepts_irregular_bearer_spacing() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());
        let auth = format!("Bearer   {}", valid_token());

        let resp = app
            .oneshot(upload_request(
                Some(&auth),
                multipart_body(&[("file", Some("y.pdf"), &b"pdf"[..])]),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(dir.path().join("y.pdf").exists());
    }

    #[tokio::test]
    async fn upload_uses_first_file_field_only() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());
        let auth = format!("Bearer {}", valid_token());

        let resp = app
            .oneshot(upload_request(
                Some(&auth),
                multipart_body(&[
                    ("note", None, &b"ignored"[..]),
                    ("file", Some("first.txt"), &b"one"[..]),
                    ("file", Some("second.txt"), &b"two"[..]),
                ]),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "received first.txt");
        assert_eq!(std::fs::read(dir.path().join("first.txt")).unwrap(), b"one");
        assert!(!dir.path().join("second.txt").exists());
    }

    #[tokio::test]
    async fn upload_with_parent_dir_filename_stays_in_upload_dir() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("up");
        std::fs::create_dir(&dir).unwrap();
        let app = test_app(&dir);
        let auth = format!("Bearer {}", valid_token());

        let resp = app
            .oneshot(upload_request(
                Some(&auth),
                multipart_body(&[("file", Some("../escaped.txt"), &b"data"[..])]),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "received escaped.txt");
        assert_eq!(std::fs::read(dir.join("escaped.txt")).unwrap(), b"data");
        assert!(!root.path().join("escaped.txt").exists());
    }

    #[tokio::test]
    async fn upload_with_directory_in_filename_uses_basename() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());
        let auth = format!("Bearer {}", valid_token());

        let resp = app
            .oneshot(upload_request(
                Some(&auth),
                multipart_body(&[("file", Some("C/docs/b.pdf"), &b"pdf"[..])]),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "received b.pdf");
        assert_eq!(std::fs::read(dir.path().join("b.pdf")).unwrap(), b"pdf");
        assert!(!dir.path().join("C").exists());
    }

    #[tokio::test]
    async fn upload_over_size_limit_is_payload_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app_with(dir.path(), &["--max-upload-bytes", "512"]);
        let auth = format!("Bearer {}", valid_token());
        let contents = vec![b'a'; 4096];

        let resp = app
            .oneshot(upload_request(
                Some(&auth),
                multipart_body(&[("file", Some("big.bin"), &contents[..])]),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(!dir.path().join("big.bin").exists());
    }

    #[tokio::test]
    async fn upload_without_authorization_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());

        let resp = app
            .oneshot(upload_request(
                None,
                multipart_body(&[("file", Some("x.txt"), &b"data"[..])]),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn upload_with_undefined_token_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());

        let resp = app
            .oneshot(upload_request(
                Some("Bearer undefined"),
                multipart_body(&[("file", Some("x.txt"), &b"data"[..])]),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn upload_with_bad_tokens_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let foreign = format!("Bearer {}", mint(&claims_expiring_in(3600), "other-key"));
        let expired = format!("Bearer {}", mint(&claims_expiring_in(-3600), KEY));
        let basic = format!("Basic {}", valid_token());
        let extra = format!("Bearer {} extra", valid_token());

        for auth in [foreign, expired, basic, extra, "Bearer".to_string()] {
            let resp = test_app(dir.path())
                .oneshot(upload_request(
                    Some(&auth),
                    multipart_body(&[("file", Some("x.txt"), &b"data"[..])]),
                ))
                .await
                .unwrap();

            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        }
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn upload_that_is_not_multipart_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());

        let req = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::AUTHORIZATION, format!("Bearer {}", valid_token()))
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("just text"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(!body_text(resp).await.is_empty());
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn upload_without_file_field_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());
        let auth = format!("Bearer {}", valid_token());

        let resp = app
            .oneshot(upload_request(
                Some(&auth),
                multipart_body(&[("comment", None, &b"no attachment"[..])]),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(resp).await, "request contains no file");
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn upload_into_missing_directory_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir.path().join("gone"));
        let auth = format!("Bearer {}", valid_token());

        let resp = app
            .oneshot(upload_request(
                Some(&auth),
                multipart_body(&[("file", Some("x.txt"), &b"data"[..])]),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body_text(resp).await.is_empty());
    }

    #[tokio::test]
    async fn version_reports_package_version() {
        let dir = tempfile::tempdir().unwrap();

        for uri in ["/", "/version"] {
            let resp = test_app(dir.path()).oneshot(get(uri)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);

            let json = body_json(resp).await;
            assert_eq!(json["version"], "1.0.0");
            assert!(json["build"].is_string());
        }
    }

    #[tokio::test]
    async fn healthcheck_is_healthy_even_without_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir.path().join("gone"));

        let resp = app.oneshot(get("/healthcheck")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["illiad-upload"]["healthy"], true);
    }

    #[tokio::test]
    async fn favicon_is_empty_ok() {
        let dir = tempfile::tempdir().unwrap();
        let resp = test_app(dir.path())
            .oneshot(get("/favicon.ico"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.is_empty());
    }

    #[tokio::test]
    async fn responses_carry_request_id_and_security_headers() {
        let dir = tempfile::tempdir().unwrap();
        let resp = test_app(dir.path()).oneshot(get("/version")).await.unwrap();

        assert!(resp.headers().contains_key("x-request-id"));
        assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
    }

    #[tokio::test]
    async fn unknown_path_is_not_found_without_auth() {
        let dir = tempfile::tempdir().unwrap();
        let resp = test_app(dir.path())
            .oneshot(get("/nope"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
