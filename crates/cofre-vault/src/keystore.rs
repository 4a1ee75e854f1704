// SPDX-FileCopyrightText: 2026 Cofre Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device-bound key wrapping capability.
//!
//! The platform keystore (Android Keystore, Secure Enclave, TPM) is an
//! external collaborator. The core consumes it as an opaque wrap/unwrap
//! pair and knows nothing about the underlying hardware API.
//! [`SoftwareKeystore`] is the software-backed fallback for tests and for
//! platforms without secure hardware.

use cofre_core::CofreError;
use zeroize::Zeroizing;

use crate::crypto;

/// Opaque wrap/unwrap capability backed by a device-bound KEK.
///
/// Implementations never expose the device KEK itself. Failures map to
/// [`CofreError::KeystoreUnavailable`] when the capability is unusable and
/// [`CofreError::KeyNotFound`] when there is no blob or it cannot be opened.
pub trait DeviceKeystore: Send + Sync {
    /// Wrap key material under the device KEK, returning an opaque blob.
    fn wrap_key(&self, key: &[u8]) -> Result<Vec<u8>, CofreError>;

    /// Unwrap a previously wrapped blob back into key material.
    fn unwrap_key(&self, blob: &[u8]) -> Result<Zeroizing<Vec<u8>>, CofreError>;
}

/// Software-backed keystore: a random in-process KEK and the standard AEAD
/// framing.
///
/// Not device-bound; the KEK lives only as long as this value. Suitable for
/// tests and as a fallback when no platform keystore is available.
pub struct SoftwareKeystore {
    kek: Zeroizing<[u8; crypto::KEY_LEN]>,
}

impl SoftwareKeystore {
    /// Create a keystore with a fresh random KEK.
    pub fn new() -> Result<Self, CofreError> {
        Ok(Self {
            kek: crypto::generate_key()?,
        })
    }
}

impl DeviceKeystore for SoftwareKeystore {
    fn wrap_key(&self, key: &[u8]) -> Result<Vec<u8>, CofreError> {
        crypto::encrypt(key, &self.kek)
    }

    fn unwrap_key(&self, blob: &[u8]) -> Result<Zeroizing<Vec<u8>>, CofreError> {
        crypto::decrypt(blob, &self.kek)
            .map(Zeroizing::new)
            .map_err(|_| CofreError::KeyNotFound)
    }
}

impl std::fmt::Debug for SoftwareKeystore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareKeystore")
            .field("kek", &"[REDACTED]")
            .finish()
    }
}
