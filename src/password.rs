//! Password hashing with bcrypt

use crate::error::AppResult;

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, plain: &str) -> AppResult<String> {
        Ok(bcrypt::hash(plain, self.cost)?)
    }

    /// Malformed stored hashes count as a mismatch
    pub fn verify(&self, plain: &str, hashed: &str) -> bool {
        bcrypt::verify(plain, hashed).unwrap_or(false)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = PasswordHasher::new(4);
        let hashed = hasher.hash("secret123").unwrap();
        assert_ne!(hashed, "secret123");
        assert!(hasher.verify("secret123", &hashed));
        assert!(!hasher.verify("secret124", &hashed));
        assert!(!hasher.verify("secret123", "not-a-hash"));
    }
}
