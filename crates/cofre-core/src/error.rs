// SPDX-FileCopyrightText: 2026 Cofre Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Cofre vault core.

use thiserror::Error;

/// The primary error type used across all Cofre key-custody and container
/// operations.
///
/// Every expected failure is a value of this type; none of these conditions
/// abort the process. `DecryptionFailed` deliberately covers both a wrong
/// key and corrupted or tampered data: distinguishing them would hand an
/// attacker an oracle for confirming passphrase guesses.
#[derive(Debug, Error)]
pub enum CofreError {
    /// AEAD encryption failed in the underlying primitive.
    #[error("encryption failed")]
    EncryptionFailed,

    /// AEAD authentication failed: wrong key or corrupted data.
    #[error("decryption failed: wrong key or corrupted data")]
    DecryptionFailed,

    /// The system CSPRNG could not produce key material.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// The device keystore capability is not usable right now.
    #[error("device keystore unavailable: {0}")]
    KeystoreUnavailable(String),

    /// The device keystore has no wrapped key blob, or cannot open it.
    #[error("wrapped key not found in device keystore")]
    KeyNotFound,

    /// The container does not start with the expected magic bytes.
    #[error("not a vault container (bad magic bytes)")]
    InvalidContainerFormat,

    /// The container carries a format version this build does not support.
    /// Never coerced; newer containers are rejected outright.
    #[error("unsupported container version {0}")]
    UnsupportedVersion(u8),

    /// The container carries a key-derivation tag this build does not
    /// support (the Argon2id tag is reserved but unimplemented).
    #[error("unsupported key derivation tag {0}")]
    UnsupportedKdf(u8),

    /// A structural field of the container is inconsistent with the data.
    #[error("corrupted container data: {0}")]
    CorruptedData(String),

    /// The unlock gate is locked out after repeated failed attempts.
    #[error("too many failed attempts; locked out for {remaining_ms} ms")]
    TooManyAttempts { remaining_ms: u64 },

    /// Lockout persistence errors (load/save through the durable store).
    #[error("lockout store error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
