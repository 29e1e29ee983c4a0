//! Shared JWT issuing and validation for reel services
//!
//! Tokens are HS256-signed with a single shared secret. The subject claim
//! carries the caller's identity (their email address).
//!
//! ## Usage
//!
//! ```rust
//! use chrono::Duration;
//! use crypto_core::jwt::JwtKeys;
//!
//! let keys = JwtKeys::from_secret("a-very-long-shared-secret", Duration::hours(1)).unwrap();
//! let token = keys.generate_access_token("ana@example.com").unwrap();
//! let claims = keys.validate_token(&token).unwrap().claims;
//! assert_eq!(claims.sub, "ana@example.com");
//! ```
use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// JWT algorithm - HS256 with the shared secret
const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Shortest secret accepted by [`JwtKeys::from_secret`]
pub const MIN_SECRET_LEN: usize = 16;

const ACCESS_TOKEN_TYPE: &str = "access";

// ============================================================================
// Data Structures
// ============================================================================

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (caller identity)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token type, always "access" for tokens issued here
    pub token_type: String,
}

/// Signing and verification keys plus the access token lifetime.
///
/// Built once at startup and shared behind an `Arc`.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("algorithm", &JWT_ALGORITHM)
            .field("access_ttl_secs", &self.access_ttl.num_seconds())
            .finish_non_exhaustive()
    }
}

impl JwtKeys {
    /// Build keys from the shared secret.
    ///
    /// ## Errors
    ///
    /// Returns error if the secret is shorter than [`MIN_SECRET_LEN`] bytes
    /// or the lifetime is not positive.
    pub fn from_secret(secret: &str, access_ttl: Duration) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            bail!("JWT secret must be at least {MIN_SECRET_LEN} bytes");
        }
        if access_ttl <= Duration::zero() {
            bail!("JWT access token lifetime must be positive");
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    // ========================================================================
    // Token Generation
    // ========================================================================

    /// Generate an access token for `subject`, issued now
    pub fn generate_access_token(&self, subject: &str) -> Result<String> {
        self.generate_access_token_at(subject, Utc::now())
    }

    /// Generate an access token with an explicit issue time
    pub fn generate_access_token_at(
        &self,
        subject: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String> {
        let expiry = issued_at + self.access_ttl;

        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expiry.timestamp(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
        };

        encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding)
            .map_err(|e| anyhow!("Failed to generate access token: {e}"))
    }

    // ========================================================================
    // Token Validation
    // ========================================================================

    /// Validate and decode a token.
    ///
    /// ## Errors
    ///
    /// Returns error if:
    /// - Token signature is invalid
    /// - Token is expired
    /// - Token format is malformed
    /// - Token is not an access token
    /// - Subject is empty
    pub fn validate_token(&self, token: &str) -> Result<TokenData<Claims>> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| anyhow!("Token validation failed: {e}"))?;

        if token_data.claims.token_type != ACCESS_TOKEN_TYPE {
            bail!("Token validation failed: unexpected token type");
        }
        if token_data.claims.sub.trim().is_empty() {
            bail!("Token validation failed: empty subject");
        }

        Ok(token_data)
    }

    /// Validate a token and return its subject
    pub fn subject_of(&self, token: &str) -> Result<String> {
        Ok(self.validate_token(token)?.claims.sub)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test-secret-for-unit-tests-only";

    fn keys() -> JwtKeys {
        JwtKeys::from_secret(TEST_SECRET, Duration::hours(1)).unwrap()
    }

    #[test]
    fn test_generate_and_validate() {
        let keys = keys();
        let token = keys.generate_access_token("ana@example.com").unwrap();
        assert_eq!(token.matches('.').count(), 2);

        let data = keys.validate_token(&token).unwrap();
        assert_eq!(data.claims.sub, "ana@example.com");
        assert_eq!(data.claims.token_type, "access");
        assert_eq!(data.claims.exp - data.claims.iat, 3600);
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(JwtKeys::from_secret("short", Duration::hours(1)).is_err());
    }

    #[test]
    fn test_non_positive_ttl_rejected() {
        assert!(JwtKeys::from_secret(TEST_SECRET, Duration::zero()).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = keys();
        let issued = Utc::now() - Duration::hours(3);
        let token = keys.generate_access_token_at("ana@example.com", issued).unwrap();
        assert!(keys.validate_token(&token).is_err());
    }

    #[test]
    fn test_debug_redacts_keys() {
        let rendered = format!("{:?}", keys());
        assert!(!rendered.contains(TEST_SECRET));
        assert!(rendered.contains("access_ttl_secs"));
    }
}
