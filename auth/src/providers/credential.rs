//! Credential hashing trait.

use crate::error::Result;

/// Password hashing and verification.
///
/// Implementations are synchronous and CPU bound; callers on the async path
/// run them on the blocking pool.
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext password into a self-describing string.
    ///
    /// # Errors
    ///
    /// Returns error if hashing fails.
    fn hash(&self, password: &str) -> Result<String>;

    /// Check `password` against a stored hash.
    ///
    /// Returns `Ok(false)` on mismatch.
    ///
    /// # Errors
    ///
    /// Returns error if the stored hash is malformed.
    fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}
