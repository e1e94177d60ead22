//! Password encoding.

use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::config::Argon2 as ArgonConfig;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("argon2 error: {0}")]
    Argon2(String),
}

/// Capability to hash plaintext passwords and check a plaintext against a
/// stored hash.
pub trait PasswordEncoder: Send + Sync {
    /// Hash `plaintext` into a self-describing string.
    fn encode(&self, plaintext: &str) -> Result<String, CryptoError>;

    /// Whether `plaintext` is the password behind `hash`.
    fn matches(&self, plaintext: &str, hash: &str) -> bool;
}

/// Password encoder that uses Argon2id and PHC string format for hashing and
/// verification.
pub struct Argon2Encoder {
    params: Params,
}

impl Argon2Encoder {
    /// Create a new [`Argon2Encoder`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self, CryptoError> {
        let config = config.unwrap_or_default();

        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(config.hash_length),
        )
        .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'_> {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
    }
}

impl PasswordEncoder for Argon2Encoder {
    fn encode(&self, plaintext: &str) -> Result<String, CryptoError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| CryptoError::Argon2(e.to_string()))?;

        Ok(hash.to_string())
    }

    fn matches(&self, plaintext: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };

        self.argon2()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Cheap Argon2 parameters, tests do not need a hardened hash.
#[cfg(test)]
pub(crate) fn fast_encoder() -> Argon2Encoder {
    Argon2Encoder::new(Some(ArgonConfig {
        memory_cost: 1024,
        iterations: 1,
        parallelism: 1,
        hash_length: 32,
    }))
    .expect("valid argon2 parameters")
}
