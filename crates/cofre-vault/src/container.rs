// SPDX-FileCopyrightText: 2026 Cofre Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The portable `VLT1` encrypted container.
//!
//! # File layout
//!
//! ```text
//! Magic "VLT1" (4) | Version (1) | KDF tag (1) | Salt (32) | Nonce (12) | Ciphertext len u32 BE (4) | Ciphertext + tag
//! ```
//!
//! All fields sit at fixed offsets. The layout must stay byte-for-byte
//! compatible with the desktop implementation: the big-endian length field
//! and the PBKDF2 parameters are wire requirements, not implementation
//! choices.
//!
//! A container is immutable once written and never partially trusted: any
//! structural mismatch invalidates the whole read. Reading and writing are
//! blocking (one KDF pass plus payload-sized AEAD work); callers dispatch
//! them off latency-sensitive threads.

use cofre_core::CofreError;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto;
use crate::kdf;

/// Magic bytes identifying a vault container.
pub const MAGIC: &[u8; 4] = b"VLT1";

/// The single supported format version.
pub const FORMAT_VERSION: u8 = 1;

/// KDF tag: PBKDF2-HMAC-SHA256 at the wire iteration count.
pub const KDF_PBKDF2_HMAC_SHA256: u8 = 1;

/// KDF tag reserved for Argon2id. Unimplemented: containers carrying it
/// are rejected, never guessed at.
pub const KDF_ARGON2ID_RESERVED: u8 = 2;

/// Upper sanity bound on the claimed ciphertext length (100 MB). Larger
/// claims are rejected before any allocation happens.
pub const MAX_CIPHERTEXT_LEN: usize = 100 * 1024 * 1024;

const MAGIC_LEN: usize = 4;
const VERSION_OFFSET: usize = MAGIC_LEN;
const KDF_OFFSET: usize = VERSION_OFFSET + 1;
const SALT_OFFSET: usize = KDF_OFFSET + 1;
const NONCE_OFFSET: usize = SALT_OFFSET + kdf::SALT_LEN;
const LEN_OFFSET: usize = NONCE_OFFSET + crypto::NONCE_LEN;
const HEADER_LEN: usize = LEN_OFFSET + 4;

/// The header fields a preview needs: everything up to and including the
/// salt.
const PREVIEW_LEN: usize = NONCE_OFFSET;

/// Unencrypted container metadata, readable without a passphrase.
///
/// Returned by [`parse_header`] so the application can check compatibility
/// before prompting for a passphrase. Serializes with the camelCase
/// convention of the app-layer DTOs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerHeader {
    /// Container format version.
    pub version: u8,
    /// KDF tag byte (see [`KDF_PBKDF2_HMAC_SHA256`]).
    pub kdf_type: u8,
    /// The stored KDF salt.
    pub salt: [u8; kdf::SALT_LEN],
}

impl ContainerHeader {
    /// Whether this build can derive the container's key-encryption key.
    #[must_use]
    pub const fn kdf_supported(&self) -> bool {
        self.kdf_type == KDF_PBKDF2_HMAC_SHA256
    }
}

/// Produce a portable encrypted container for `payload`.
///
/// Generates a fresh salt and nonce, derives the KEK at the wire iteration
/// count, and emits the full envelope. The KEK is zeroed when this function
/// returns, on success and on failure; any step failure aborts the whole
/// write.
pub fn write_container(payload: &[u8], passphrase: &SecretString) -> Result<Vec<u8>, CofreError> {
    let salt = kdf::generate_salt()?;
    let kek = kdf::derive_key(
        passphrase.expose_secret().as_bytes(),
        &salt,
        kdf::PBKDF2_ITERATIONS,
    );

    let nonce = crypto::generate_nonce()?;
    let ciphertext = crypto::encrypt_with_nonce(payload, &kek, &nonce)?;

    if ciphertext.len() > MAX_CIPHERTEXT_LEN {
        return Err(CofreError::CorruptedData(format!(
            "payload of {} bytes exceeds the container bound",
            payload.len()
        )));
    }
    let ciphertext_len = u32::try_from(ciphertext.len())
        .map_err(|_| CofreError::CorruptedData("payload too large for container".to_string()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    out.extend_from_slice(MAGIC);
    out.push(FORMAT_VERSION);
    out.push(KDF_PBKDF2_HMAC_SHA256);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext_len.to_be_bytes());
    out.extend_from_slice(&ciphertext);

    debug!(bytes = out.len(), "container written");
    Ok(out)
}

/// Decrypt a container produced by [`write_container`] (or any compatible
/// implementation).
///
/// Structural checks run in order: magic, version, KDF tag, length sanity.
/// Only then is the KEK derived and the payload opened. A wrong passphrase
/// and a corrupted payload both surface as
/// [`CofreError::DecryptionFailed`]; the distinction is deliberately not
/// observable. The KEK is zeroed on every path.
pub fn read_container(
    data: &[u8],
    passphrase: &SecretString,
) -> Result<Zeroizing<Vec<u8>>, CofreError> {
    let header = parse_header(data)?;
    if !header.kdf_supported() {
        return Err(CofreError::UnsupportedKdf(header.kdf_type));
    }
    if data.len() < HEADER_LEN {
        return Err(CofreError::CorruptedData(
            "truncated container header".to_string(),
        ));
    }

    let mut nonce = [0u8; crypto::NONCE_LEN];
    nonce.copy_from_slice(&data[NONCE_OFFSET..LEN_OFFSET]);

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&data[LEN_OFFSET..HEADER_LEN]);
    let claimed_len = u32::from_be_bytes(len_bytes) as usize;

    if claimed_len > MAX_CIPHERTEXT_LEN {
        return Err(CofreError::CorruptedData(format!(
            "claimed ciphertext length {claimed_len} exceeds the {MAX_CIPHERTEXT_LEN} byte bound"
        )));
    }
    let ciphertext = &data[HEADER_LEN..];
    if ciphertext.len() != claimed_len {
        return Err(CofreError::CorruptedData(format!(
            "ciphertext length mismatch: header claims {claimed_len}, found {}",
            ciphertext.len()
        )));
    }

    let kek = kdf::derive_key(
        passphrase.expose_secret().as_bytes(),
        &header.salt,
        kdf::PBKDF2_ITERATIONS,
    );
    let payload = crypto::decrypt_with_nonce(ciphertext, &kek, &nonce).map(Zeroizing::new)?;

    debug!(bytes = payload.len(), "container read");
    Ok(payload)
}

/// Parse the unencrypted header fields, stopping after the salt.
///
/// No key derivation or decryption is attempted; the application uses this
/// to preview compatibility before asking the user for a passphrase. An
/// unknown KDF tag is returned as-is (see
/// [`ContainerHeader::kdf_supported`]) so the preview can name the missing
/// capability; [`read_container`] rejects it.
pub fn parse_header(data: &[u8]) -> Result<ContainerHeader, CofreError> {
    if data.len() < MAGIC_LEN || &data[..MAGIC_LEN] != MAGIC {
        return Err(CofreError::InvalidContainerFormat);
    }
    if data.len() < PREVIEW_LEN {
        return Err(CofreError::CorruptedData(
            "truncated container header".to_string(),
        ));
    }

    let version = data[VERSION_OFFSET];
    if version != FORMAT_VERSION {
        return Err(CofreError::UnsupportedVersion(version));
    }

    let kdf_type = data[KDF_OFFSET];
    let mut salt = [0u8; kdf::SALT_LEN];
    salt.copy_from_slice(&data[SALT_OFFSET..NONCE_OFFSET]);

    Ok(ContainerHeader {
        version,
        kdf_type,
        salt,
    })
}
