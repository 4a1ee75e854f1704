// SPDX-FileCopyrightText: 2026 Cofre Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master-key custody: the single in-memory key slot.
//!
//! The vault uses a key-wrapping pattern:
//! - A random 256-bit master key encrypts every sensitive field. It is
//!   generated exactly once per vault and never derived from a passphrase.
//! - At rest the master key exists only wrapped: under the device keystore
//!   KEK for daily unlock, or under a passphrase-derived KEK inside an
//!   exported container.
//! - While unlocked, the unwrapped key lives in exactly one mutex-guarded
//!   slot owned by [`KeyManager`]. The session controller decides when to
//!   populate and clear it; this module only provides the primitives.
//!
//! Debug output intentionally omits key material.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cofre_core::CofreError;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::crypto;
use crate::keystore::DeviceKeystore;

/// Master key length in bytes.
pub const MASTER_KEY_LEN: usize = crypto::KEY_LEN;

/// Owns the unwrapped master key while the vault is unlocked.
///
/// Every slot operation serializes through one mutex, so a concurrent lock
/// transition can never leave a field encryption holding a half-cleared
/// key. Once [`clear_master_key`](Self::clear_master_key) returns, no later
/// [`master_key`](Self::master_key) call observes the pre-clear value.
pub struct KeyManager {
    slot: Mutex<Option<Zeroizing<[u8; MASTER_KEY_LEN]>>>,
    keystore: Arc<dyn DeviceKeystore>,
}

impl KeyManager {
    /// Create a manager with an empty (locked) key slot.
    pub fn new(keystore: Arc<dyn DeviceKeystore>) -> Self {
        Self {
            slot: Mutex::new(None),
            keystore,
        }
    }

    /// Generate a fresh random 256-bit master key.
    ///
    /// Called once per vault, at creation time.
    pub fn generate_master_key() -> Result<Zeroizing<[u8; MASTER_KEY_LEN]>, CofreError> {
        let key = crypto::generate_key()?;
        info!("master key generated");
        Ok(key)
    }

    /// Adopt ownership of an unwrapped master key.
    ///
    /// Any previously resident key is zeroed before release.
    pub fn set_master_key(&self, key: Zeroizing<[u8; MASTER_KEY_LEN]>) {
        let mut slot = self.lock_slot();
        // The replaced value zeroes itself on drop.
        *slot = Some(key);
        debug!("master key slot populated");
    }

    /// A defensive copy of the resident master key, or `None` while locked.
    ///
    /// Callers let the returned buffer drop (it zeroes itself) as soon as
    /// their operation completes.
    pub fn master_key(&self) -> Option<Zeroizing<[u8; MASTER_KEY_LEN]>> {
        self.lock_slot().as_ref().map(|key| Zeroizing::new(**key))
    }

    /// Whether a master key is currently resident.
    pub fn is_unlocked(&self) -> bool {
        self.lock_slot().is_some()
    }

    /// Zero and empty the slot.
    ///
    /// Idempotent: the session controller may call this on both the
    /// "locking" and "locked" transitions without harm.
    pub fn clear_master_key(&self) {
        let mut slot = self.lock_slot();
        if slot.take().is_some() {
            debug!("master key slot cleared");
        }
    }

    /// Wrap a master key under the device KEK for at-rest storage.
    pub fn wrap_for_device(&self, key: &[u8; MASTER_KEY_LEN]) -> Result<Vec<u8>, CofreError> {
        self.keystore.wrap_key(key)
    }

    /// Unwrap the device-wrapped master key blob.
    pub fn unwrap_from_device(
        &self,
        blob: &[u8],
    ) -> Result<Zeroizing<[u8; MASTER_KEY_LEN]>, CofreError> {
        let bytes = self.keystore.unwrap_key(blob)?;
        to_master_key(&bytes)
    }

    /// Wrap a master key under a passphrase-derived KEK for export.
    ///
    /// Uses the self-contained `nonce || ciphertext || tag` framing; the
    /// caller owns and zeroes the KEK.
    pub fn wrap_for_export(
        &self,
        key: &[u8; MASTER_KEY_LEN],
        kek: &[u8; crypto::KEY_LEN],
    ) -> Result<Vec<u8>, CofreError> {
        crypto::encrypt(key, kek)
    }

    /// Unwrap an exported or imported master key with a passphrase-derived
    /// KEK. A wrong passphrase surfaces as [`CofreError::DecryptionFailed`].
    pub fn unwrap_from_export(
        &self,
        wrapped: &[u8],
        kek: &[u8; crypto::KEY_LEN],
    ) -> Result<Zeroizing<[u8; MASTER_KEY_LEN]>, CofreError> {
        let bytes = Zeroizing::new(crypto::decrypt(wrapped, kek)?);
        to_master_key(&bytes)
    }

    /// Encrypt a sensitive field with the resident master key.
    ///
    /// Returns `Ok(None)` while locked. The local key copy is taken under
    /// the slot lock and zeroed on every exit path, success or error.
    pub fn encrypt_field(&self, plaintext: &[u8]) -> Result<Option<Vec<u8>>, CofreError> {
        match self.master_key() {
            Some(key) => crypto::encrypt(plaintext, &key).map(Some),
            None => Ok(None),
        }
    }

    /// Decrypt a sensitive field with the resident master key.
    ///
    /// Returns `Ok(None)` while locked.
    pub fn decrypt_field(&self, ciphertext: &[u8]) -> Result<Option<Vec<u8>>, CofreError> {
        match self.master_key() {
            Some(key) => crypto::decrypt(ciphertext, &key).map(Some),
            None => Ok(None),
        }
    }

    /// Recover the guard even if a previous holder panicked. A poisoned
    /// lock must never prevent clearing the slot.
    fn lock_slot(&self) -> MutexGuard<'_, Option<Zeroizing<[u8; MASTER_KEY_LEN]>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("slot", &if self.is_unlocked() { "[REDACTED]" } else { "<empty>" })
            .finish()
    }
}

fn to_master_key(bytes: &[u8]) -> Result<Zeroizing<[u8; MASTER_KEY_LEN]>, CofreError> {
    if bytes.len() != MASTER_KEY_LEN {
        return Err(CofreError::CorruptedData(format!(
            "unwrapped master key is {} bytes (expected {MASTER_KEY_LEN})",
            bytes.len()
        )));
    }
    let mut key = Zeroizing::new([0u8; MASTER_KEY_LEN]);
    key.copy_from_slice(bytes);
    Ok(key)
}
