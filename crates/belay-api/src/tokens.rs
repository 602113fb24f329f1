use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::warn;

use belay_types::BelayError;
use belay_types::api::Claims;
use belay_types::models::UserId;

/// Mints and checks HS256 bearer tokens. Built once at startup from the
/// configured secret and shared by every request.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is a hard edge.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: UserId, username: &str) -> anyhow::Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(token)
    }

    /// Verify signature and expiry, returning the claims the token carries.
    pub fn authenticate(&self, token: &str) -> Result<Claims, BelayError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            warn!("Rejected bearer token: {}", e);
            BelayError::Unauthenticated
        })?;

        // A token whose subject is not a user id is useless.
        subject(&data.claims)?;

        Ok(data.claims)
    }
}

/// Subject of an already-authenticated token.
pub fn subject(claims: &Claims) -> Result<UserId, BelayError> {
    claims
        .sub
        .parse::<i64>()
        .map(UserId)
        .map_err(|_| BelayError::Unauthenticated)
}
