//! Bearer tokens.
//!
//! HS256 JWTs that expire [`SESSION_TTL_HOURS`] after issue, the same
//! horizon at which their session goes stale. Checking a token is stateless: it stays
//! usable until `exp` even after its session has been evicted.

use chrono::{Duration, Utc};
use estate_core::session::SESSION_TTL_HOURS;
use estate_core::types::DbId;
use jsonwebtoken::errors::Error as TokenError;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: DbId,
    pub role: String,
    /// Display name; stamped on ledger entries as `recorded_by`.
    pub name: String,
    pub exp: i64,
    pub iat: i64,
    /// Random per token, so two logins within one second still differ.
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
}

impl JwtConfig {
    /// `JWT_SECRET` (required, non-empty).
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_default();
        assert!(!secret.trim().is_empty(), "JWT_SECRET must be set and non-empty");

        Self { secret }
    }
}

pub fn generate_access_token(
    user_id: DbId,
    role: &str,
    name: &str,
    config: &JwtConfig,
) -> Result<String, TokenError> {
    let issued = Utc::now();
    let claims = Claims {
        sub: user_id,
        role: role.to_owned(),
        name: name.to_owned(),
        exp: (issued + Duration::hours(SESSION_TTL_HOURS)).timestamp(),
        iat: issued.timestamp(),
        jti: Uuid::new_v4().simple().to_string(),
    };
    let key = EncodingKey::from_secret(config.secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), &claims, &key)
}

/// Signature and expiry check only.
pub fn validate_token(token: &str, config: &JwtConfig) -> Result<Claims, TokenError> {
    let key = DecodingKey::from_secret(config.secret.as_bytes());
    decode::<Claims>(token, &key, &Validation::new(Algorithm::HS256)).map(|data| data.claims)
}
