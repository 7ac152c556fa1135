pub mod access_jwt;
pub mod bearer;
pub mod factory;

pub use access_jwt::{AuthService, V4Claims};
pub use bearer::extract_bearer_token;
pub use factory::build_auth_service;

/// Log-safe form of a bearer token: a short prefix plus its length.
pub fn redact_token(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    format!("{prefix}…({} chars)", token.chars().count())
}
