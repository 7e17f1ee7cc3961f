//! Argon2id hashing for account passwords.

use std::fmt;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// A plaintext password. Debug output is redacted so request types that
/// carry one can derive Debug without leaking the secret into logs.
#[derive(Clone)]
pub struct RawPassword(String);

impl fmt::Debug for RawPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawPassword(<redacted>)")
    }
}

impl RawPassword {
    pub fn new(secret: String) -> Self {
        Self(secret)
    }

    /// Derive an Argon2id hash with a fresh random salt, encoded as a PHC
    /// string that embeds the salt and parameters.
    pub fn hash(&self) -> Result<HashedPassword, anyhow::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let encoded = Argon2::default()
            .hash_password(self.0.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();
        Ok(HashedPassword(encoded))
    }
}

/// An Argon2 PHC string as stored in `users.password_hash`.
#[derive(Debug, Clone)]
pub struct HashedPassword(String);

impl HashedPassword {
    pub fn from_stored(encoded: String) -> Self {
        Self(encoded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Check a candidate password against this hash. A malformed stored
    /// hash fails verification the same way a wrong password does.
    pub fn verify(&self, candidate: &RawPassword) -> Result<(), anyhow::Error> {
        let parsed = PasswordHash::new(&self.0)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;
        Argon2::default()
            .verify_password(candidate.0.as_bytes(), &parsed)
            .map_err(|_| anyhow::anyhow!("Password verification failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_emits_an_argon2_phc_string() {
        let hash = RawPassword::new("correct horse battery".into())
            .hash()
            .expect("Failed to hash password");
        assert!(hash.as_str().starts_with("$argon2"));
    }

    #[test]
    fn the_right_password_verifies_and_the_wrong_one_does_not() {
        let password = RawPassword::new("correct horse battery".into());
        let hash = password.hash().expect("Failed to hash password");

        assert!(hash.verify(&password).is_ok());
        assert!(hash
            .verify(&RawPassword::new("incorrect horse".into()))
            .is_err());
    }

    #[test]
    fn repeated_hashing_salts_differently_but_both_verify() {
        let password = RawPassword::new("correct horse battery".into());
        let first = password.hash().expect("Failed to hash password");
        let second = password.hash().expect("Failed to hash password");

        assert_ne!(first.as_str(), second.as_str());
        assert!(first.verify(&password).is_ok());
        assert!(second.verify(&password).is_ok());
    }

    #[test]
    fn a_malformed_stored_hash_fails_verification() {
        let stored = HashedPassword::from_stored("not-a-phc-string".into());
        assert!(stored
            .verify(&RawPassword::new("anything".into()))
            .is_err());
    }

    #[test]
    fn debug_output_never_contains_the_secret() {
        let password = RawPassword::new("correct horse battery".into());
        let rendered = format!("{:?}", password);
        assert!(!rendered.contains("correct horse"));
    }
}
