use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use password_hash::SaltString;
use rand_core::OsRng;

use super::Password;

/// The argon2 hash of a user's password. This is the only credential form
/// that is ever persisted.
#[derive(Clone, Debug)]
pub struct Hash(String);

impl Hash {
    /// Hash a user's password with a freshly generated salt.
    pub fn new(password: &Password) -> Result<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2
            .hash_password(password.as_bytes(), salt.as_ref())?
            .to_string();

        Ok(Self(password_hash))
    }

    /// Construct a hash from its string representation, e.g. a value read
    /// back from the account store.
    ///
    /// # Arguments
    ///
    /// * `hash` - The string representation of the hash.
    ///
    /// # Returns
    ///
    /// A [`Result`] containing the parsed hash. This will contain an [`Err`]
    /// variant if the provided string is not a valid PHC-format hash.
    pub fn from_hash_str(hash: &str) -> Result<Self> {
        Ok(Self(PasswordHash::new(hash)?.to_string()))
    }

    /// Determine if the hash value matches a raw password.
    ///
    /// # Arguments
    ///
    /// * `raw_password` - The password to compare the hash to.
    ///
    /// # Returns
    ///
    /// A [`Result`] containing a [`bool`] that indicates if the password
    /// matches the hash.
    pub fn matches_raw_password(&self, raw_password: &str) -> Result<bool> {
        // This should be valid due to a `Hash` only being creatable from valid
        // data.
        let parsed_hash = PasswordHash::new(&self.0)?;

        match Argon2::default().verify_password(raw_password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(other) => Err(other.into()),
        }
    }

    /// Retrieve the hash's string representation.
    pub fn value(&self) -> &str {
        &self.0
    }
}
