//! Password hashing via bcrypt.

use bcrypt::BcryptError;

use super::AuthError;

/// Default bcrypt cost factor.
pub const DEFAULT_COST: u32 = 10;

/// Cost bounds accepted by bcrypt.
const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

/// Longest password bcrypt reads in full: 72 bytes of input, one of which is
/// the NUL terminator. Longer passwords are refused instead of truncated.
pub const MAX_PASSWORD_BYTES: usize = 71;

/// Salted, adaptive password hasher with a tunable cost.
#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    cost: u32,
}

impl CredentialHasher {
    /// Create a hasher with the given bcrypt cost (4..=31).
    pub fn new(cost: u32) -> Result<Self, AuthError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(AuthError::InvalidInput(format!(
                "bcrypt cost must be between {MIN_COST} and {MAX_COST}"
            )));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password. The result embeds its own salt and cost.
    ///
    /// Passwords longer than [`MAX_PASSWORD_BYTES`] fail with `InvalidInput`.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        bcrypt::non_truncating_hash(password, self.cost).map_err(|e| match e {
            BcryptError::Truncation(_) => AuthError::InvalidInput(format!(
                "password must be at most {MAX_PASSWORD_BYTES} bytes"
            )),
            e => AuthError::Hashing(format!("bcrypt hash: {e}")),
        })
    }

    /// Verify a password against a bcrypt hash.
    ///
    /// Only a malformed hash produces an error; a wrong password is `Ok(false)`.
    /// An over-long password can never have been hashed, so it is `Ok(false)`
    /// too. The digest comparison inside bcrypt is constant-time.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        match bcrypt::non_truncating_verify(password, hash) {
            Ok(matches) => Ok(matches),
            Err(BcryptError::Truncation(_)) => Ok(false),
            Err(e) => Err(AuthError::Hashing(format!("bcrypt verify: {e}"))),
        }
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}
