//! Access token codec, refresh tokens and the revocation list
//!
//! Access tokens are HS256 JWTs carrying identity and tenant claims.
//! Refresh tokens are opaque random strings kept server-side and redeemed once.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::TtlCache;
use crate::error::{AppError, AppResult};

const REFRESH_PREFIX: &str = "refresh_token:";
const BLACKLIST_PREFIX: &str = "blacklist_token:";

/// Claims embedded in an access token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: i64,
    pub tenant_id: i64,
    pub tenant_code: String,
    pub username: String,
    pub role_id: i64,
    pub role_key: String,
    pub dept_id: i64,
    pub app: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies access tokens
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: i64,
}

impl TokenCodec {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: ttl_secs,
        }
    }

    /// Access token lifetime in seconds
    pub fn ttl(&self) -> i64 {
        self.ttl
    }

    pub fn issue(&self, claims: Claims) -> AppResult<(String, Claims)> {
        self.issue_at(claims, chrono::Utc::now().timestamp())
    }

    /// Sign `claims` as of `now`. `exp` is filled in only when it is unset.
    pub fn issue_at(&self, mut claims: Claims, now: i64) -> AppResult<(String, Claims)> {
        claims.iat = now;
        if claims.exp == 0 {
            claims.exp = now + self.ttl;
        }
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("failed to sign token: {}", e)))?;
        Ok((token, claims))
    }

    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        if token.split('.').count() != 3 {
            return Err(AppError::MalformedToken);
        }
        // Header problems are structural, keep them apart from payload problems
        decode_header(token).map_err(|_| AppError::MalformedToken)?;

        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AppError::BadSignature,
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                ErrorKind::InvalidToken | ErrorKind::InvalidAlgorithm => AppError::MalformedToken,
                ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_)
                | ErrorKind::MissingRequiredClaim(_) => AppError::MalformedPayload,
                _ => AppError::TokenInvalid,
            })
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value
pub fn extract_bearer(header: &str) -> AppResult<&str> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AppError::TokenInvalid),
    }
}

/// Server-side store of one-shot refresh tokens
#[derive(Clone)]
pub struct RefreshTokens {
    cache: Arc<TtlCache>,
    ttl: Duration,
}

impl RefreshTokens {
    pub fn new(cache: Arc<TtlCache>, ttl_secs: i64) -> Self {
        Self {
            cache,
            ttl: Duration::from_secs(ttl_secs.max(0) as u64),
        }
    }

    /// Create a 256-bit refresh token bound to `user_id`
    pub fn issue(&self, user_id: i64) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);
        self.cache
            .set(format!("{}{}", REFRESH_PREFIX, token), user_id.to_string(), self.ttl);
        token
    }

    /// Consume a refresh token and return the user it was issued to
    pub fn redeem(&self, token: &str) -> AppResult<i64> {
        self.cache
            .take(&format!("{}{}", REFRESH_PREFIX, token))
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or(AppError::TokenInvalid)
    }
}

/// Access tokens revoked before their natural expiry
#[derive(Clone)]
pub struct TokenBlacklist {
    cache: Arc<TtlCache>,
}

impl TokenBlacklist {
    pub fn new(cache: Arc<TtlCache>) -> Self {
        Self { cache }
    }

    /// Revoke `token` until `exp`. Already expired tokens need no entry.
    pub fn revoke(&self, token: &str, exp: i64) {
        let remaining = exp - chrono::Utc::now().timestamp();
        if remaining > 0 {
            self.cache.set(
                format!("{}{}", BLACKLIST_PREFIX, token),
                "1",
                Duration::from_secs(remaining as u64),
            );
        }
    }

    pub fn is_revoked(&self, token: &str) -> bool {
        self.cache.contains(&format!("{}{}", BLACKLIST_PREFIX, token))
    }
}
