//! Password Hashing
//!
//! Salted Argon2id key derivation and constant-time verification.
//!
//! Credentials are stored as `"<hex hash>.<hex salt>"`.

use crate::error::AuthError;

use argon2::{Algorithm, Argon2, Params, Version};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;

/// Derived key length in bytes
pub const KEY_LEN: usize = 32;

/// Random salt length in bytes
pub const SALT_LEN: usize = 8;

/// Argon2 memory cost in KiB
const MEMORY_COST: u32 = 19_456;

/// Argon2 iterations
const TIME_COST: u32 = 2;

/// Argon2 lanes
const PARALLELISM: u32 = 1;

const DELIMITER: char = '.';

// ============================================
// Password Record
// ============================================

/// Salted, hashed form of a password
///
/// Always holds exactly two non-empty hex segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PasswordRecord {
    hash: String,
    salt: String,
}

impl PasswordRecord {
    /// Build a record from its hex segments
    pub fn new(hash: impl Into<String>, salt: impl Into<String>) -> Result<Self, AuthError> {
        let hash = hash.into();
        let salt = salt.into();

        for (name, segment) in [("hash", &hash), ("salt", &salt)] {
            if segment.is_empty() {
                return Err(AuthError::Validation(format!(
                    "credential {name} segment is empty"
                )));
            }
            if hex::decode(segment).is_err() {
                return Err(AuthError::Validation(format!(
                    "credential {name} segment is not hex"
                )));
            }
        }

        Ok(Self { hash, salt })
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }
}

impl fmt::Display for PasswordRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.hash, DELIMITER, self.salt)
    }
}

impl FromStr for PasswordRecord {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hash, salt) = s.split_once(DELIMITER).ok_or_else(|| {
            AuthError::Validation("credential is missing its salt segment".to_string())
        })?;

        if salt.contains(DELIMITER) {
            return Err(AuthError::Validation(
                "credential has more than two segments".to_string(),
            ));
        }

        Self::new(hash, salt)
    }
}

impl TryFrom<String> for PasswordRecord {
    type Error = AuthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PasswordRecord> for String {
    fn from(record: PasswordRecord) -> Self {
        record.to_string()
    }
}

// ============================================
// Password Hasher
// ============================================

/// Derives and verifies salted password hashes
///
/// The KDF runs on tokio's blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    pub fn new() -> Self {
        Self
    }

    /// Hash a password with a fresh random salt
    pub async fn hash(&self, password: &str) -> Result<PasswordRecord, AuthError> {
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hash_blocking(password.as_bytes())).await?
    }

    /// Check a password against a stored record
    pub async fn verify(&self, password: &str, record: &PasswordRecord) -> Result<bool, AuthError> {
        let password = password.to_owned();
        let record = record.clone();
        tokio::task::spawn_blocking(move || verify_blocking(password.as_bytes(), &record)).await?
    }

    /// Run one derivation against a throwaway salt
    ///
    /// Used when there is no record to check so the miss costs as much as a mismatch.
    pub async fn burn(&self, password: &str) -> Result<(), AuthError> {
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || {
            derive_key(password.as_bytes(), &[0u8; SALT_LEN]).map(|_| ())
        })
        .await?
    }
}

fn kdf() -> Result<Argon2<'static>, AuthError> {
    let params = Params::new(MEMORY_COST, TIME_COST, PARALLELISM, Some(KEY_LEN))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

fn derive_key(password: &[u8], salt: &[u8]) -> Result<[u8; KEY_LEN], AuthError> {
    let mut key = [0u8; KEY_LEN];
    kdf()?.hash_password_into(password, salt, &mut key)?;
    Ok(key)
}

fn hash_blocking(password: &[u8]) -> Result<PasswordRecord, AuthError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.try_fill_bytes(&mut salt).map_err(|e| {
        tracing::error!("Entropy source failed: {:?}", e);
        AuthError::Internal
    })?;

    let key = derive_key(password, &salt)?;

    Ok(PasswordRecord {
        hash: hex::encode(key),
        salt: hex::encode(salt),
    })
}

fn verify_blocking(password: &[u8], record: &PasswordRecord) -> Result<bool, AuthError> {
    // Segments were validated as hex when the record was built.
    let salt = hex::decode(&record.salt).map_err(|_| AuthError::Internal)?;
    let expected = hex::decode(&record.hash).map_err(|_| AuthError::Internal)?;

    let key = derive_key(password, &salt)?;

    Ok(key.as_slice().ct_eq(expected.as_slice()).into())
}
