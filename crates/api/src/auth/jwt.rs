//! Access and refresh tokens.
//!
//! Access tokens are HS256 JWTs carrying [`Claims`]. Refresh tokens are
//! random UUID strings handed to the client once; the server keeps only their
//! SHA-256 digest in `user_sessions`.

use backoffice_core::types::DbId;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id.
    pub sub: DbId,
    /// Role name, one of `backoffice_core::roles::ALL_ROLES`.
    pub role: String,
    /// Restaurant the user belongs to, for owners and their staff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<DbId>,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry_mins: i64,
    pub refresh_token_expiry_days: i64,
}

const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 7;

impl JwtConfig {
    /// Load from `JWT_SECRET` (required), `JWT_ACCESS_EXPIRY_MINS` (default
    /// 15) and `JWT_REFRESH_EXPIRY_DAYS` (default 7).
    ///
    /// # Panics
    ///
    /// Panics when `JWT_SECRET` is missing or empty, or a number fails to parse.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let access_token_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");

        let refresh_token_expiry_days: i64 = std::env::var("JWT_REFRESH_EXPIRY_DAYS")
            .unwrap_or_else(|_| DEFAULT_REFRESH_EXPIRY_DAYS.to_string())
            .parse()
            .expect("JWT_REFRESH_EXPIRY_DAYS must be a valid i64");

        Self {
            secret,
            access_token_expiry_mins,
            refresh_token_expiry_days,
        }
    }

    /// Access token lifetime in seconds, as reported to clients.
    pub fn access_expiry_secs(&self) -> i64 {
        self.access_token_expiry_mins * 60
    }
}

/// Sign an access token for a user.
pub fn generate_access_token(
    user_id: DbId,
    role: &str,
    business_id: Option<DbId>,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        business_id,
        exp: now + config.access_expiry_secs(),
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Check signature and expiry, returning the claims.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

/// A new refresh token as `(plaintext, sha256_hex)`.
pub fn generate_refresh_token() -> (String, String) {
    let plaintext = Uuid::new_v4().to_string();
    let hash = hash_refresh_token(&plaintext);
    (plaintext, hash)
}

pub fn hash_refresh_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use jsonwebtoken::errors::ErrorKind;

    use super::*;

    fn config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        }
    }

    #[test]
    fn access_token_carries_user_role_and_business() {
        let cfg = config("unit-test-secret");
        let token = generate_access_token(7, "business_owner", Some(3), &cfg).unwrap();
        let claims = validate_token(&token, &cfg).unwrap();

        assert_eq!(claims.sub, 7);
        assert_eq!(claims.role, "business_owner");
        assert_eq!(claims.business_id, Some(3));
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn expired_token_is_rejected() {
        let cfg = config("unit-test-secret");
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            role: "student".to_string(),
            business_id: None,
            exp: now - 600,
            iat: now - 1200,
            jti: "x".to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(cfg.secret.as_bytes()),
        )
        .unwrap();

        let err = validate_token(&token, &cfg).unwrap_err();
        assert_matches!(err.kind(), ErrorKind::ExpiredSignature);
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let token = generate_access_token(1, "admin", None, &config("one")).unwrap();
        let err = validate_token(&token, &config("two")).unwrap_err();
        assert_matches!(err.kind(), ErrorKind::InvalidSignature);
    }

    #[test]
    fn refresh_tokens_are_unique_and_hash_stably() {
        let (a, hash_a) = generate_refresh_token();
        let (b, _) = generate_refresh_token();

        assert_ne!(a, b);
        assert_eq!(hash_refresh_token(&a), hash_a);
        assert_eq!(hash_a.len(), 64);
    }
}
