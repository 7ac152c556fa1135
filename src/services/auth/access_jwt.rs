use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::{error::Error as StdError, fmt};

// Errors returned by access-token verification.
#[derive(Debug)]
pub enum AccessJwtError {
    Jwt(jsonwebtoken::errors::Error),
    EmptyKey,
}

impl fmt::Display for AccessJwtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jwt(e) => write!(f, "jwt verification failed: {}", e),
            Self::EmptyKey => write!(f, "jwt signing key is empty"),
        }
    }
}

impl StdError for AccessJwtError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Jwt(e) => Some(e),
            _ => None,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AccessJwtError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Self::Jwt(e)
    }
}

/// Virgo4 access token claims.
///
/// NOTE:
/// - Nothing here is used for authorization decisions; a verified token is enough.
/// - Every field except `exp` is optional so older tokens still decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct V4Claims {
    pub user_id: String,
    pub barcode: String,
    pub is_uva: bool,
    pub home_library: String,
    pub profile: String,
    pub can_purchase: bool,
    #[serde(rename = "canLEO")]
    pub can_leo: bool,
    #[serde(rename = "canLEOPlus")]
    pub can_leo_plus: bool,
    pub can_place_reserve: bool,
    #[serde(rename = "useSIS")]
    pub use_sis: bool,
    pub role: String,
    pub auth_method: String,
    pub exp: u64,
}

/// HS256 access-token verifier.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct AuthService {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("AuthService")
            .field("validation", &self.validation)
            .finish()
    }
}

impl AuthService {
    pub fn new(signing_key: &str) -> Result<Self, AccessJwtError> {
        if signing_key.is_empty() {
            return Err(AccessJwtError::EmptyKey);
        }

        let decoding_key = DecodingKey::from_secret(signing_key.as_bytes());

        // signature + exp with no grace period; v4 tokens carry no aud/iss
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        validation.leeway = 0;

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    // Verify the signature and expiry of a JWT and decode its claims.
    pub fn verify(&self, token: &str) -> Result<V4Claims, AccessJwtError> {
        let data = jsonwebtoken::decode::<V4Claims>(token, &self.decoding_key, &self.validation)?;

        Ok(data.claims)
    }
}
