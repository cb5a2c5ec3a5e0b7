//! HS256 identity tokens.
//!
//! Tokens are issued by the identity provider; this service only verifies
//! them. [`generate_token`] exists for operators and tests.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Default lifetime of tokens minted by [`generate_token`].
const DEFAULT_TOKEN_EXPIRY_MINS: i64 = 60;

/// Claims carried by every identity token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the caller's user id.
    pub sub: String,
    /// Optional role name (`"admin"` unlocks cross-user point grants).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
}

#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to verify tokens.
    pub secret: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig").field("secret", &"<redacted>").finish()
    }
}

/// Mint an HS256 token for `user_id`.
pub fn generate_token(
    user_id: &str,
    role: Option<&str>,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.map(str::to_string),
        exp: now + DEFAULT_TOKEN_EXPIRY_MINS * 60,
        iat: now,
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Validate signature and expiry, returning the embedded [`Claims`].
pub fn validate_token(token: &str, config: &JwtConfig) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
        }
    }

    #[test]
    fn round_trips_subject_and_role() {
        let token = generate_token("u1", Some("admin"), &config("s3cret")).unwrap();
        let claims = validate_token(&token, &config("s3cret")).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.role.as_deref(), Some("admin"));
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = generate_token("u1", None, &config("one")).unwrap();
        assert!(validate_token(&token, &config("two")).is_err());
    }

    #[test]
    fn debug_hides_secret() {
        assert!(!format!("{:?}", config("hunter2")).contains("hunter2"));
    }
}
