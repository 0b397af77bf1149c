//! Admin login credentials: a single salted-SHA-512 username/password pair, hex
//! encoded, stored as the first line of `data.txt` via [`crate::config::Config`].
//!
//! A random 16-byte salt and `SHA512(salt || password)` digest, both hex-encoded.
//! Verification compares hash bytes in constant time; username comparison is not
//! (usernames aren't secret).

use derive_more::{Display, Error, From};
use rand::RngCore;
use sha2::{Digest, Sha512};

use crate::config::Credentials;

pub const SALT_SIZE: usize = 16;
pub const HASH_SIZE: usize = 64;

#[derive(Debug, Display, From, Error)]
pub enum CredentialError {
    #[display(fmt = "no credentials configured")]
    NotConfigured,
    #[display(fmt = "username or password incorrect")]
    Mismatch,
    #[display(fmt = "stored credential hex is malformed")]
    BadEncoding,
}

pub type Result<T> = std::result::Result<T, CredentialError>;

/// Hashes `password` with a freshly generated random salt, producing the pair
/// that gets written to `data.txt`.
pub fn hash_new_password(username: &str, password: &str) -> Credentials {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    let hash = hash_with_salt(password, &salt);

    Credentials {
        username: username.to_string(),
        salt_hex: hex::encode(salt),
        hash_hex: hex::encode(hash),
    }
}

fn hash_with_salt(password: &str, salt: &[u8]) -> [u8; HASH_SIZE] {
    let mut hasher = Sha512::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; HASH_SIZE];
    out.copy_from_slice(&digest);
    out
}

/// Verifies `username`/`password` against the stored [`Credentials`]. Constant
/// time in the hash comparison; username comparison is not (usernames aren't
/// secret).
pub fn verify(stored: Option<&Credentials>, username: &str, password: &str) -> Result<()> {
    let stored = stored.ok_or(CredentialError::NotConfigured)?;
    if stored.username != username {
        return Err(CredentialError::Mismatch);
    }

    let salt = hex::decode(&stored.salt_hex).map_err(|_| CredentialError::BadEncoding)?;
    let expected = hex::decode(&stored.hash_hex).map_err(|_| CredentialError::BadEncoding)?;
    if expected.len() != HASH_SIZE {
        return Err(CredentialError::BadEncoding);
    }

    let computed = hash_with_salt(password, &salt);
    if constant_time_eq(&computed, &expected) {
        Ok(())
    } else {
        Err(CredentialError::Mismatch)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
