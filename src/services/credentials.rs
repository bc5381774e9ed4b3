// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password hashing and API key handling.
//!
//! Password hashes are stored as
//! `$pbkdf2-sha256$<iterations>$<salt hex>$<hash hex>`.

use std::num::NonZeroU32;

use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use subtle::ConstantTimeEq;

const HASH_SCHEME: &str = "pbkdf2-sha256";
const PBKDF2_ITERATIONS: u32 = 200_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;
const API_KEY_BYTES: usize = 24;

/// Credential handling errors
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("system random number generator failed")]
    Random,

    #[error("malformed password hash")]
    MalformedHash,
}

/// Fill a buffer from the system CSPRNG.
pub fn random_bytes(len: usize) -> Result<Vec<u8>, CredentialError> {
    let mut buf = vec![0u8; len];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| CredentialError::Random)?;
    Ok(buf)
}

/// New random API key for the upload endpoint (hex encoded).
pub fn generate_api_key() -> Result<String, CredentialError> {
    Ok(hex::encode(random_bytes(API_KEY_BYTES)?))
}

/// Hash a password with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = random_bytes(SALT_LEN)?;
    let iterations = NonZeroU32::new(PBKDF2_ITERATIONS).ok_or(CredentialError::MalformedHash)?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &mut hash,
    );

    Ok(format!(
        "${}${}${}${}",
        HASH_SCHEME,
        PBKDF2_ITERATIONS,
        hex::encode(salt),
        hex::encode(hash)
    ))
}

/// Check a password against a stored hash.
///
/// Returns an error only when the stored hash can not be parsed.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, CredentialError> {
    let mut parts = stored.split('$');
    if parts.next() != Some("") || parts.next() != Some(HASH_SCHEME) {
        return Err(CredentialError::MalformedHash);
    }

    let iterations = parts
        .next()
        .and_then(|raw| raw.parse::<u32>().ok())
        .and_then(NonZeroU32::new)
        .ok_or(CredentialError::MalformedHash)?;
    let salt = parts
        .next()
        .and_then(|raw| hex::decode(raw).ok())
        .ok_or(CredentialError::MalformedHash)?;
    let hash = parts
        .next()
        .and_then(|raw| hex::decode(raw).ok())
        .ok_or(CredentialError::MalformedHash)?;
    if parts.next().is_some() {
        return Err(CredentialError::MalformedHash);
    }

    Ok(pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &hash,
    )
    .is_ok())
}

/// Constant-time check of a presented API key against every accepted key.
///
/// All keys are compared even after a match.
pub fn api_key_matches(presented: &str, accepted: &[String]) -> bool {
    let mut matched = subtle::Choice::from(0u8);
    for key in accepted {
        matched |= presented.as_bytes().ct_eq(key.as_bytes());
    }
    bool::from(matched)
}
