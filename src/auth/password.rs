use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::error;

/// Hash a plaintext password into a self-describing PHC string. The salt is
/// fresh per call and the work factor is the crate default, so the stored
/// string carries everything later verification needs.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "password hashing failed");
            anyhow::anyhow!("password hashing failed: {e}")
        })?;
    Ok(hash.to_string())
}

/// Check a plaintext candidate against a stored PHC string. A mismatch is
/// `Ok(false)`; a hash that cannot be parsed is an error, since that means
/// the stored record is corrupt rather than the caller being wrong.
pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| {
        error!(error = %e, "stored password hash is not a valid PHC string");
        anyhow::anyhow!("malformed stored password hash: {e}")
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_the_hashed_password() {
        let hash = hash_password("hunter2hunter2").expect("hash");
        assert!(verify_password("hunter2hunter2", &hash).expect("verify"));
    }

    #[test]
    fn verify_rejects_a_different_password() {
        let hash = hash_password("first-secret").expect("hash");
        assert!(!verify_password("second-secret", &hash).expect("verify"));
    }

    #[test]
    fn two_hashes_of_the_same_password_differ() {
        let a = hash_password("same-input").expect("hash");
        let b = hash_password("same-input").expect("hash");
        assert_ne!(a, b);
        assert!(verify_password("same-input", &a).unwrap());
        assert!(verify_password("same-input", &b).unwrap());
    }

    #[test]
    fn verify_errors_on_garbage_hash() {
        assert!(verify_password("anything", "$garbage$").is_err());
    }
}
