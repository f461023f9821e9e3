use super::{Clock, Identity, TokenError};
use crate::config::{GatewayConfig, JwtAlgorithm};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    id: String,
    username: String,
    email: String,
    admin: bool,
    exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub identity: Identity,
    pub expires_at: DateTime<Utc>,
}

/// Signs identities into time-boxed HMAC tokens and verifies them back.
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: Option<EncodingKey>,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(secret: &str, algorithm: JwtAlgorithm, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let algorithm = match algorithm {
            JwtAlgorithm::HS256 => Algorithm::HS256,
            JwtAlgorithm::HS384 => Algorithm::HS384,
            JwtAlgorithm::HS512 => Algorithm::HS512,
        };

        let encoding_key = if secret.is_empty() {
            None
        } else {
            Some(EncodingKey::from_secret(secret.as_bytes()))
        };

        // Expiry is checked against our own clock in `verify`.
        let mut validation = Validation::new(algorithm);
        validation.algorithms = vec![algorithm];
        validation.validate_exp = false;

        Self {
            algorithm,
            encoding_key,
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
            clock,
        }
    }

    pub fn from_config(config: &GatewayConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            &config.secret_key,
            config.jwt_algorithm,
            config.token_ttl(),
            clock,
        )
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, TokenError> {
        let encoding_key = self
            .encoding_key
            .as_ref()
            .ok_or_else(|| TokenError::Signing("signing secret is not configured".to_string()))?;

        // `exp` has whole-second resolution; the cache must not outlive it.
        let exp = (self.clock.now() + self.ttl).timestamp();
        let expires_at = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| TokenError::Signing(format!("exp {} out of range", exp)))?;
        let claims = Claims {
            id: identity.id.clone(),
            username: identity.username.clone(),
            email: identity.email.clone(),
            admin: identity.admin,
            exp,
        };

        let token = encode(&Header::new(self.algorithm), &claims, encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        debug!(user_id = %identity.id, exp = claims.exp, "Issued token");

        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;

        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| TokenError::Malformed(format!("exp {} out of range", claims.exp)))?;

        if self.clock.now() >= expires_at {
            return Err(TokenError::Expired);
        }

        Ok(VerifiedToken {
            identity: Identity {
                id: claims.id,
                username: claims.username,
                email: claims.email,
                admin: claims.admin,
            },
            expires_at,
        })
    }
}
