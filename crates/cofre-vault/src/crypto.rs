// SPDX-FileCopyrightText: 2026 Cofre Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Low-level AES-256-GCM seal/open operations.
//!
//! [`encrypt`] generates a fresh random 96-bit nonce via the system CSPRNG
//! and prepends it to the output, so the result is self-contained:
//! `nonce || ciphertext || tag`. The `*_with_nonce` variants leave the nonce
//! out of the payload for the container codec, which stores it in its own
//! envelope header; their callers guarantee nonce uniqueness. Nonce reuse
//! would be catastrophic for GCM security.
//!
//! The service retains no key material between calls. Callers own their
//! keys and are responsible for zeroing them after use.

use cofre_core::CofreError;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes (128 bits).
pub const TAG_LEN: usize = 16;

/// Generate a random 32-byte key suitable for AES-256-GCM.
pub fn generate_key() -> Result<Zeroizing<[u8; KEY_LEN]>, CofreError> {
    let rng = SystemRandom::new();
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    rng.fill(key.as_mut())
        .map_err(|_| CofreError::KeyGeneration("system CSPRNG failed".to_string()))?;
    Ok(key)
}

/// Generate a fresh random 96-bit nonce.
pub(crate) fn generate_nonce() -> Result<[u8; NONCE_LEN], CofreError> {
    let rng = SystemRandom::new();
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill(&mut nonce).map_err(|_| CofreError::EncryptionFailed)?;
    Ok(nonce)
}

/// Encrypt plaintext with AES-256-GCM under a fresh random nonce.
///
/// The nonce is prepended to the output: `nonce || ciphertext || tag`.
pub fn encrypt(plaintext: &[u8], key: &[u8; KEY_LEN]) -> Result<Vec<u8>, CofreError> {
    let nonce = generate_nonce()?;
    let sealed = encrypt_with_nonce(plaintext, key, &nonce)?;

    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Decrypt the `nonce || ciphertext || tag` framing produced by [`encrypt`].
///
/// Tampering, a wrong key, and truncated input all fail authentication-tag
/// verification and surface uniformly as [`CofreError::DecryptionFailed`].
/// The caller learns nothing about which of the three it was.
pub fn decrypt(data: &[u8], key: &[u8; KEY_LEN]) -> Result<Vec<u8>, CofreError> {
    if data.len() < NONCE_LEN + TAG_LEN {
        return Err(CofreError::DecryptionFailed);
    }
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&data[..NONCE_LEN]);
    decrypt_with_nonce(&data[NONCE_LEN..], key, &nonce)
}

/// Encrypt with a caller-supplied nonce; the output is `ciphertext || tag`
/// with no framing.
///
/// The caller guarantees the nonce is unique for this key. Exists for the
/// container codec, which carries the nonce in its envelope header.
pub fn encrypt_with_nonce(
    plaintext: &[u8],
    key: &[u8; KEY_LEN],
    nonce_bytes: &[u8; NONCE_LEN],
) -> Result<Vec<u8>, CofreError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key).map_err(|_| CofreError::EncryptionFailed)?;
    let less_safe = LessSafeKey::new(unbound);
    let nonce = Nonce::assume_unique_for_key(*nonce_bytes);

    // Seal in place: the plaintext buffer is extended with the tag.
    let mut in_out = plaintext.to_vec();
    less_safe
        .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| CofreError::EncryptionFailed)?;

    Ok(in_out)
}

/// Decrypt `ciphertext || tag` with a caller-supplied nonce.
pub fn decrypt_with_nonce(
    ciphertext: &[u8],
    key: &[u8; KEY_LEN],
    nonce_bytes: &[u8; NONCE_LEN],
) -> Result<Vec<u8>, CofreError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key).map_err(|_| CofreError::DecryptionFailed)?;
    let less_safe = LessSafeKey::new(unbound);
    let nonce = Nonce::assume_unique_for_key(*nonce_bytes);

    let mut in_out = ciphertext.to_vec();
    let plaintext = less_safe
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| CofreError::DecryptionFailed)?;

    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = generate_key().unwrap();
        let plaintext = b"credential field value";

        let sealed = encrypt(plaintext, &key).unwrap();
        let opened = decrypt(&sealed, &key).unwrap();

        assert_eq!(opened, plaintext);
    }

    #[test]
    fn output_is_nonce_then_ciphertext_then_tag() {
        let key = generate_key().unwrap();
        let plaintext = b"hello";

        let sealed = encrypt(plaintext, &key).unwrap();

        assert_eq!(sealed.len(), NONCE_LEN + plaintext.len() + TAG_LEN);
        // The trailing part must open under the leading 12 bytes.
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&sealed[..NONCE_LEN]);
        let opened = decrypt_with_nonce(&sealed[NONCE_LEN..], &key, &nonce).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn encrypt_produces_different_ciphertext_for_same_plaintext() {
        let key = generate_key().unwrap();
        let plaintext = b"same input twice";

        let a = encrypt(plaintext, &key).unwrap();
        let b = encrypt(plaintext, &key).unwrap();

        // Random nonces should differ, and with them the ciphertext.
        assert_ne!(a[..NONCE_LEN], b[..NONCE_LEN]);
        assert_ne!(a, b);
    }

    #[test]
    fn decrypt_with_wrong_key_fails() {
        let key1 = generate_key().unwrap();
        let key2 = generate_key().unwrap();

        let sealed = encrypt(b"secret data", &key1).unwrap();
        let result = decrypt(&sealed, &key2);

        assert!(matches!(result, Err(CofreError::DecryptionFailed)));
    }

    #[test]
    fn every_flipped_byte_is_detected() {
        let key = generate_key().unwrap();
        let sealed = encrypt(b"do not tamper", &key).unwrap();

        for i in 0..sealed.len() {
            let mut tampered = sealed.clone();
            tampered[i] ^= 0x01;
            assert!(
                matches!(decrypt(&tampered, &key), Err(CofreError::DecryptionFailed)),
                "flipping byte {i} went undetected"
            );
        }
    }

    #[test]
    fn truncated_input_fails_like_tampering() {
        let key = generate_key().unwrap();
        let sealed = encrypt(b"short-lived", &key).unwrap();

        // Shorter than nonce + tag: rejected before touching the cipher.
        let result = decrypt(&sealed[..NONCE_LEN + TAG_LEN - 1], &key);
        assert!(matches!(result, Err(CofreError::DecryptionFailed)));

        // Long enough to parse, but the tag no longer verifies.
        let result = decrypt(&sealed[..sealed.len() - 1], &key);
        assert!(matches!(result, Err(CofreError::DecryptionFailed)));
    }

    #[test]
    fn empty_plaintext_roundtrips() {
        let key = generate_key().unwrap();
        let sealed = encrypt(b"", &key).unwrap();
        assert_eq!(sealed.len(), NONCE_LEN + TAG_LEN);
        assert_eq!(decrypt(&sealed, &key).unwrap(), b"");
    }

    #[test]
    fn generated_keys_differ() {
        let key1 = generate_key().unwrap();
        let key2 = generate_key().unwrap();
        assert_ne!(*key1, *key2);
    }

    proptest! {
        #[test]
        fn roundtrip_holds_for_arbitrary_payloads(
            payload in proptest::collection::vec(any::<u8>(), 0..2048)
        ) {
            let key = generate_key().unwrap();
            let sealed = encrypt(&payload, &key).unwrap();
            prop_assert_eq!(decrypt(&sealed, &key).unwrap(), payload);
        }
    }
}
