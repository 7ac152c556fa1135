/*
 * Responsibility
 * - Type of the authenticated context visible to handlers
 * - The auth middleware verifies the token and stores this in request extensions;
 *   handlers only ever receive this type
 */
use std::fmt;

use crate::services::auth::{V4Claims, redact_token};

/// Context attached to a request that passed the auth gate.
///
/// - `token` is the raw signed JWT as presented by the client
/// - `claims` are the verified claims decoded from it
#[derive(Clone)]
pub struct AuthCtx {
    pub token: String,
    pub claims: V4Claims,
}

impl AuthCtx {
    pub fn new(token: impl Into<String>, claims: V4Claims) -> Self {
        Self {
            token: token.into(),
            claims,
        }
    }
}

impl fmt::Debug for AuthCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCtx")
            .field("token", &redact_token(&self.token))
            .field("claims", &self.claims)
            .finish()
    }
}
