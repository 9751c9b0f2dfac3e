//! Credential derivation for an accepted password.
//!
//! The password is pre-hashed with SHA-256, then hashed with Argon2id under a
//! per-user salt. An existing salt is reused on password changes; a new one is
//! generated otherwise. Every derivation issues a fresh login key, which
//! invalidates sessions bound to the previous one.

use anyhow::{Result, anyhow};
use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD as B64};
use rand::RngCore;
use sha2::{Digest, Sha256};

use agora_types::SecretDigest;

/// Random bytes behind a login key.
const LOGIN_KEY_BYTES: usize = 32;

pub fn derive(password: &str, existing_salt: Option<&str>) -> Result<SecretDigest> {
    let salt = match existing_salt.and_then(|s| SaltString::from_b64(s).ok()) {
        Some(salt) => salt,
        None => SaltString::generate(&mut OsRng),
    };

    let hash = Argon2::default()
        .hash_password(prehash(password).as_bytes(), &salt)
        .map_err(|e| anyhow!("Password hashing failed: {}", e))?
        .to_string();

    Ok(SecretDigest {
        hash,
        salt: salt.as_str().to_string(),
        login_key: generate_login_key(),
    })
}

/// Hex SHA-256 of the password; the input to the salted hash.
pub fn prehash(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

pub fn generate_login_key() -> String {
    let mut key = [0u8; LOGIN_KEY_BYTES];
    rand::rng().fill_bytes(&mut key);
    B64.encode(key)
}
