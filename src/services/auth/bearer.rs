/*
 * Responsibility
 * - Parse an `Authorization` header value into a bearer token
 * - Pure string handling; JWT verification lives in access_jwt
 */
use thiserror::Error;

pub const BEARER_SCHEME: &str = "Bearer";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BearerError {
    /// Carries the header exactly as received.
    #[error("Invalid Authorization header: [{0}]")]
    InvalidHeader(String),
}

/// Whitespace runs collapse to a single separator; the result must be
/// exactly `Bearer <token>`.
pub fn extract_bearer_token(authorization: &str) -> Result<&str, BearerError> {
    let mut components = authorization.split_whitespace();

    match (components.next(), components.next(), components.next()) {
        (Some(BEARER_SCHEME), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(BearerError::InvalidHeader(authorization.to_string())),
    }
}
