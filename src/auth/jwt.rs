//! JWT Token Handler
//! HS256 tokens whose `sub` claim carries the username.

use crate::auth::models::Claims;
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

/// JWT Handler for token operations
pub struct JwtHandler {
    secret: String,
    expiration: Duration,
}

impl JwtHandler {
    pub fn new(secret: String, expiration: Duration) -> Self {
        Self { secret, expiration }
    }

    /// Generate a signed token for `username`
    pub fn generate_token(&self, username: &str) -> Result<String> {
        let expiration = Utc::now()
            .checked_add_signed(self.expiration)
            .context("Invalid timestamp")?
            .timestamp()
            .max(0) as usize;

        let claims = Claims {
            sub: username.to_string(),
            exp: expiration,
        };

        debug!(
            "Generating JWT for {}, expires in {}m",
            username,
            self.expiration.num_minutes()
        );

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to generate JWT")
    }

    /// Validate a token and extract its claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .context("Invalid or expired token")?;

        Ok(decoded.claims)
    }
}
