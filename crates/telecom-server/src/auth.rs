use crate::config::AuthConfig;
use anyhow::{Context, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use telecom_common::models::auth::Claims;
use telecom_db::UserRow;
use thiserror::Error;

/// Hash a password using argon2id
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Why a bearer token was rejected. All kinds end up as a 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                TokenError::InvalidSignature
            }
            _ => TokenError::Malformed,
        }
    }
}

/// A freshly signed token together with what the server needs to track it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and checks HS256 access tokens.
///
/// Holds the signing key, the token lifetime and the window after expiry
/// during which a token may still be exchanged for a new one.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
    refresh_grace_secs: i64,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl_secs: i64::try_from(config.token_ttl_secs).unwrap_or(i64::MAX),
            refresh_grace_secs: i64::try_from(config.refresh_grace_secs).unwrap_or(i64::MAX),
        }
    }

    /// Lifetime of a minted token, reported to clients as `expires_in`.
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub fn refresh_grace_secs(&self) -> i64 {
        self.refresh_grace_secs
    }

    /// Issue a token for `user` valid for the configured TTL.
    pub fn mint(&self, user: &UserRow) -> Result<IssuedToken> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role()?,
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
        };
        let token = self.sign(&claims)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .context("Token expiry is out of range")?;
        Ok(IssuedToken {
            token,
            jti: claims.jti,
            expires_at,
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .context("Failed to create access token")
    }

    fn validation(validate_exp: bool) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = validate_exp;
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation
    }

    fn decode(&self, token: &str, validate_exp: bool) -> Result<Claims, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(
            token,
            &self.decoding,
            &Self::validation(validate_exp),
        )?;
        if data.claims.user_id().is_none() {
            return Err(TokenError::Malformed);
        }
        Ok(data.claims)
    }

    /// Check signature and expiry and return the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode(token, true)
    }

    /// Like [`verify`](Self::verify) but also accepts a token that expired
    /// less than the refresh grace window ago.
    pub fn verify_for_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.decode(token, false)?;
        let deadline = claims.exp.saturating_add(self.refresh_grace_secs);
        if Utc::now().timestamp() > deadline {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
