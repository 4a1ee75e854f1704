// SPDX-FileCopyrightText: 2026 Cofre Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Cofre password-vault workspace.
//!
//! This crate provides the shared error type used throughout the Cofre
//! workspace. The cryptographic components live in `cofre-vault`.

pub mod error;

// Re-export at crate root for ergonomic imports.
pub use error::CofreError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cofre_error_has_all_variants() {
        // Verify all 11 error variants exist and can be constructed.
        let _encryption = CofreError::EncryptionFailed;
        let _decryption = CofreError::DecryptionFailed;
        let _keygen = CofreError::KeyGeneration("test".into());
        let _keystore = CofreError::KeystoreUnavailable("test".into());
        let _not_found = CofreError::KeyNotFound;
        let _magic = CofreError::InvalidContainerFormat;
        let _version = CofreError::UnsupportedVersion(9);
        let _kdf = CofreError::UnsupportedKdf(2);
        let _corrupted = CofreError::CorruptedData("test".into());
        let _locked = CofreError::TooManyAttempts { remaining_ms: 1000 };
        let _storage = CofreError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
    }

    #[test]
    fn decryption_failure_message_does_not_single_out_a_cause() {
        // Wrong key and corrupted data share one message by design.
        let msg = CofreError::DecryptionFailed.to_string();
        assert!(msg.contains("wrong key or corrupted data"), "got: {msg}");
    }

    #[test]
    fn lockout_error_carries_the_countdown() {
        let msg = CofreError::TooManyAttempts { remaining_ms: 42 }.to_string();
        assert!(msg.contains("42"), "got: {msg}");
    }
}
