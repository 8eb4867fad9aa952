//! Salt generation and bcrypt hashing of salted passwords.

use rand::{rngs::OsRng, Rng};

use super::error::{Error, Result};

pub const SALT_CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const SALT_LENGTH: usize = 8;

/// Random salt of `length` characters from [`SALT_CHARSET`].
#[must_use]
pub fn generate_salt(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| char::from(SALT_CHARSET[rng.gen_range(0..SALT_CHARSET.len())]))
        .collect()
}

/// `password:salt`, the input fed to bcrypt.
#[must_use]
pub fn salt_password(password: &str, salt: &str) -> Vec<u8> {
    format!("{password}:{salt}").into_bytes()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// # Errors
    /// Returns `Error::InvalidCost` if `cost` is outside bcrypt's `4..=31`.
    pub fn new(cost: u32) -> Result<Self> {
        if (4..=31).contains(&cost) {
            Ok(Self { cost })
        } else {
            Err(Error::InvalidCost(cost))
        }
    }

    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a salted password. The result embeds the cost and bcrypt's own salt.
    ///
    /// # Errors
    /// Returns `Error::Hash` if bcrypt fails.
    pub fn hash(&self, combined: &[u8]) -> Result<String> {
        Ok(bcrypt::hash(combined, self.cost)?)
    }

    /// Constant-time check of `combined` against a stored hash. Malformed hashes
    /// never match.
    #[must_use]
    pub fn verify(hash: &str, combined: &[u8]) -> bool {
        bcrypt::verify(combined, hash).unwrap_or(false)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}
