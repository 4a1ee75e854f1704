// SPDX-FileCopyrightText: 2026 Cofre Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cryptographic core of the Cofre offline password vault.
//!
//! Key hierarchy:
//! - A random 256-bit master key encrypts every sensitive field; it never
//!   touches disk unwrapped.
//! - For daily unlock the master key is wrapped under the device keystore
//!   KEK; for portable backups it travels inside a passphrase-protected
//!   `VLT1` container.
//! - Passphrase KEKs come from PBKDF2-HMAC-SHA256 at the fixed wire
//!   iteration count; each container carries its own salt and nonce.
//!
//! Key derivation and container read/write are blocking; callers dispatch
//! them off latency-sensitive threads. Nothing here spawns threads or owns
//! timers: the session controller decides when to lock, this crate only
//! provides the primitives it invokes.

pub mod container;
pub mod crypto;
pub mod kdf;
pub mod keys;
pub mod keystore;
pub mod lockout;
pub mod mnemonic;

// Re-export the main entry points at crate root.
pub use container::{ContainerHeader, parse_header, read_container, write_container};
pub use keys::KeyManager;
pub use keystore::{DeviceKeystore, SoftwareKeystore};
pub use lockout::{
    AttemptOutcome, FileLockoutStore, LockoutPolicy, LockoutState, LockoutStore,
    MemoryLockoutStore,
};
pub use mnemonic::PhraseLength;
