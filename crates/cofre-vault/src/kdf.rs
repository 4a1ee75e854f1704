// SPDX-FileCopyrightText: 2026 Cofre Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PBKDF2-HMAC-SHA256 key derivation from a passphrase.
//!
//! The iteration count is pinned at 310,000. It is part of the container
//! wire contract shared with the desktop implementation, not a tunable
//! default; changing it breaks cross-device import.
//!
//! Derivation is deterministic and cannot fail for well-formed input. A
//! wrong passphrase is only ever observable through a later AEAD
//! authentication failure, never from this module.

use std::num::NonZeroU32;

use cofre_core::CofreError;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

/// Derived key length in bytes (256 bits).
pub const DERIVED_KEY_LEN: usize = 32;

/// KDF salt length in bytes.
pub const SALT_LEN: usize = 32;

/// PBKDF2 iteration count fixed by the container wire contract.
pub const PBKDF2_ITERATIONS: NonZeroU32 = NonZeroU32::new(310_000).unwrap();

/// Derive a 32-byte key-encryption key from a passphrase and salt.
///
/// Blocking: several hundred milliseconds at the wire iteration count.
/// Callers dispatch this off latency-sensitive threads. The returned key is
/// wrapped in [`Zeroizing`] so it is erased on drop.
pub fn derive_key(
    passphrase: &[u8],
    salt: &[u8],
    iterations: NonZeroU32,
) -> Zeroizing<[u8; DERIVED_KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; DERIVED_KEY_LEN]);
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        salt,
        passphrase,
        key.as_mut(),
    );
    key
}

/// Generate a random 32-byte salt, fresh per derivation.
///
/// Salts are never reused across independent derivations; each one is
/// persisted alongside the ciphertext it belongs to.
pub fn generate_salt() -> Result<[u8; SALT_LEN], CofreError> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| CofreError::KeyGeneration("failed to generate random salt".to_string()))?;
    Ok(salt)
}

/// Re-derive from the passphrase and compare against an expected key in
/// constant time.
///
/// `ring::pbkdf2::verify` performs the comparison without an early exit, so
/// the position of the first differing byte does not leak through timing.
pub fn verify_passphrase(
    passphrase: &[u8],
    salt: &[u8],
    iterations: NonZeroU32,
    expected_key: &[u8],
) -> bool {
    pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        salt,
        passphrase,
        expected_key,
    )
    .is_ok()
}
