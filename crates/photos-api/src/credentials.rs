use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{SaltString, rand_core::OsRng},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct CredentialError(String);

/// Checks submitted passwords against stored Argon2id hashes.
///
/// The candidate is the password with the server-wide secret appended, so
/// a leaked `users` table alone is not enough to mount an offline attack.
/// Work factor is fixed when the verifier is built.
#[derive(Clone)]
pub struct CredentialVerifier {
    secret: String,
    argon2: Argon2<'static>,
    // Verified against when the username is unknown so both paths cost the same.
    decoy_hash: String,
}

impl CredentialVerifier {
    pub fn new(secret: impl Into<String>) -> Result<Self, CredentialError> {
        Self::with_params(secret, Params::DEFAULT)
    }

    pub fn with_params(secret: impl Into<String>, params: Params) -> Result<Self, CredentialError> {
        let mut verifier = Self {
            secret: secret.into(),
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            decoy_hash: String::new(),
        };
        verifier.decoy_hash = verifier.hash("decoy-password")?;
        Ok(verifier)
    }

    /// Produce a PHC-format hash suitable for the `users.password_hash` column.
    pub fn hash(&self, password: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(self.salted(password).as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| CredentialError(e.to_string()))
    }

    /// `stored` is `None` when the username did not match any account. The
    /// result does not reveal which case applied.
    pub fn verify(&self, password: &str, stored: Option<&str>) -> bool {
        let (hash, known) = match stored {
            Some(hash) => (hash, true),
            None => (self.decoy_hash.as_str(), false),
        };
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        let matched = self
            .argon2
            .verify_password(self.salted(password).as_bytes(), &parsed)
            .is_ok();
        matched && known
    }

    fn salted(&self, password: &str) -> String {
        format!("{password}{}", self.secret)
    }
}
