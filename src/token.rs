//! Manage json web tokens.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::customer::CustomerId;

const DEFAULT_AUDIENCE: &str = "shopcart";
pub const EXPIRATION_TIME: u64 = 60 * 60; // 1 hour.

/// Errors related to token creation and validation.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token secret must not be empty")]
    MissingSecret,
    #[error("invalid token: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("subject is not a customer id")]
    Subject,
    #[error("system time is before unix epoch")]
    Time(#[from] std::time::SystemTimeError),
}

/// Pieces of information asserted on a JWT.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Claims {
    /// Recipients that the JWT is intended for.
    pub aud: String,
    /// Identifies the expiration time on or after which the JWT must not be
    /// accepted for processing. Seconds since epoch.
    pub exp: u64,
    /// Identifies the time at which the JWT was issued.
    pub iat: u64,
    /// Identifies the organization that issued the JWT.
    pub iss: String,
    /// Customer ID.
    pub sub: String,
}

impl Claims {
    /// Customer the token was issued to.
    pub fn customer_id(&self) -> Result<CustomerId, TokenError> {
        self.sub.parse().map_err(|_| TokenError::Subject)
    }
}

/// Manage JWT tokens.
#[derive(Clone)]
pub struct TokenManager {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    name: String,
    audience: String,
    expires_in: u64,
}

impl TokenManager {
    /// Create a new [`TokenManager`] instance signing with HMAC-SHA256.
    pub fn new(name: &str, secret: &str) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        let secret = Zeroizing::new(secret.as_bytes().to_vec());

        Ok(Self {
            algorithm: Algorithm::HS256,
            encoding_key: EncodingKey::from_secret(&secret),
            decoding_key: DecodingKey::from_secret(&secret),
            name: name.to_owned(),
            audience: DEFAULT_AUDIENCE.to_string(),
            expires_in: EXPIRATION_TIME,
        })
    }

    /// Set `audience` field on JWT.
    pub fn audience(&mut self, audience: &str) {
        self.audience = audience.to_owned();
    }

    /// Set token lifetime, in seconds.
    pub fn expires_in(&mut self, seconds: u64) {
        self.expires_in = seconds;
    }

    /// Lifetime of newly created tokens, in seconds.
    pub fn lifetime(&self) -> u64 {
        self.expires_in
    }

    /// Create a new [`jsonwebtoken`].
    pub fn create(&self, customer_id: CustomerId) -> Result<String, TokenError> {
        let time = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let header = Header::new(self.algorithm);
        let claims = Claims {
            aud: self.audience.clone(),
            exp: time.saturating_add(self.expires_in),
            iat: time,
            iss: self.name.clone(),
            sub: customer_id.to_string(),
        };

        Ok(encode(&header, &claims, &self.encoding_key)?)
    }

    /// Decode and check a token.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.name]);

        Ok(decode::<Claims>(token, &self.decoding_key, &validation)?.claims)
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("algorithm", &self.algorithm)
            .field("name", &self.name)
            .field("audience", &self.audience)
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUER: &str = "https://shop.example.com/";

    #[test]
    fn test_round_trip() {
        let manager = TokenManager::new(ISSUER, "secret").unwrap();
        let token = manager.create(CustomerId(7)).unwrap();

        let claims = manager.decode(&token).unwrap();
        assert_eq!(claims.customer_id().unwrap(), CustomerId(7));
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.aud, DEFAULT_AUDIENCE);
        assert_eq!(claims.exp - claims.iat, EXPIRATION_TIME);
    }

    #[test]
    fn test_wrong_secret() {
        let manager = TokenManager::new(ISSUER, "secret").unwrap();
        let other = TokenManager::new(ISSUER, "other").unwrap();
        let token = other.create(CustomerId(1)).unwrap();

        assert!(manager.decode(&token).is_err());
        assert!(manager.decode("not.a.token").is_err());
    }

    #[test]
    fn test_wrong_audience() {
        let manager = TokenManager::new(ISSUER, "secret").unwrap();
        let mut other = TokenManager::new(ISSUER, "secret").unwrap();
        other.audience("elsewhere");

        let token = other.create(CustomerId(1)).unwrap();
        assert!(manager.decode(&token).is_err());
    }

    #[test]
    fn test_expired() {
        let mut manager = TokenManager::new(ISSUER, "secret").unwrap();
        let time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let claims = Claims {
            aud: DEFAULT_AUDIENCE.into(),
            exp: time - 3600,
            iat: time - 7200,
            iss: ISSUER.into(),
            sub: "1".into(),
        };
        let token =
            encode(&Header::new(Algorithm::HS256), &claims, &manager.encoding_key)
                .unwrap();

        assert!(manager.decode(&token).is_err());

        manager.expires_in(10);
        assert_eq!(manager.lifetime(), 10);
    }

    #[test]
    fn test_empty_secret() {
        assert!(matches!(
            TokenManager::new(ISSUER, ""),
            Err(TokenError::MissingSecret)
        ));
    }

    #[test]
    fn test_huge_lifetime_saturates() {
        let mut manager = TokenManager::new(ISSUER, "secret").unwrap();
        manager.expires_in(u64::MAX);

        let token = manager.create(CustomerId(1)).unwrap();
        let claims = manager.decode(&token).unwrap();
        assert_eq!(claims.exp, u64::MAX);
    }
}
