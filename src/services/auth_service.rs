//! Bearer token issuing and verification. The service owns its key material
//! and is handed to whoever needs it; there is no process-wide instance.

use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Owner id.
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token creation failed: {0}")]
    Creation(jsonwebtoken::errors::Error),
    #[error("Invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),
    #[error("Token has no subject")]
    MissingSubject,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService").finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn issue_token(&self, owner_id: &str, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: owner_id.to_string(),
            iat: now.timestamp().max(0) as usize,
            exp: (now + ttl).timestamp().max(0) as usize,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Creation)
    }

    /// Returns the owner id carried by a valid, unexpired token.
    pub fn verify_token(&self, token: &str) -> Result<String, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(TokenError::Invalid)?;
        if data.claims.sub.is_empty() {
            return Err(TokenError::MissingSubject);
        }
        Ok(data.claims.sub)
    }
}
