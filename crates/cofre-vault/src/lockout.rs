// SPDX-FileCopyrightText: 2026 Cofre Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Brute-force lockout for the local unlock gate.
//!
//! Counting and timing live here; durability is delegated to a small store
//! supplied by the embedding application. The state must survive process
//! death and reboot, but it contains no key material, so it is persisted in
//! the clear.
//!
//! Callers consult [`LockoutPolicy::ensure_can_attempt`] before any
//! passphrase or PIN check and record the result of each attempt
//! afterwards. Expiry is implicit: once the countdown reaches zero the gate
//! is open again without an explicit transition.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use cofre_core::CofreError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Failed attempts that trigger a lockout.
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

/// Attempt count at which callers surface a remaining-attempts warning.
pub const WARNING_THRESHOLD: u32 = 3;

/// Duration of a triggered lockout.
pub const LOCKOUT_DURATION: Duration = Duration::from_secs(15 * 60);

/// Persisted lockout counters.
///
/// Timestamps are Unix epoch milliseconds; zero means unset. Mutated only
/// by [`LockoutPolicy`]; reset to all-zero on successful authentication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockoutState {
    /// Consecutive failed unlock attempts since the last success.
    pub failed_attempts: u32,
    /// When the current lockout ends, or zero when none was triggered.
    pub lockout_end_ms: u64,
    /// When the last failed attempt was recorded.
    pub last_attempt_ms: u64,
}

/// Outcome of recording a failed unlock attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Below the warning threshold; nothing to surface yet.
    Counted {
        /// The updated consecutive-failure count.
        failed_attempts: u32,
    },
    /// At or above the warning threshold; surface "N attempts remaining".
    Warning {
        /// Attempts left before the gate locks.
        attempts_remaining: u32,
    },
    /// The threshold was reached; the gate is locked.
    LockedOut {
        /// Milliseconds until the lockout expires.
        remaining_ms: u64,
    },
}

/// Durable storage for [`LockoutState`].
///
/// The embedding application supplies the real store. State is written as a
/// whole so a crash can never tear the three fields apart.
pub trait LockoutStore: Send + Sync {
    /// Load the persisted state; an absent record is the zero state.
    fn load(&self) -> Result<LockoutState, CofreError>;

    /// Persist the state, replacing any previous record.
    fn save(&self, state: LockoutState) -> Result<(), CofreError>;

    /// Remove the persisted record entirely.
    fn clear(&self) -> Result<(), CofreError>;
}

/// In-memory store for tests and session-scoped fallbacks.
#[derive(Debug, Default)]
pub struct MemoryLockoutStore {
    state: Mutex<LockoutState>,
}

impl LockoutStore for MemoryLockoutStore {
    fn load(&self) -> Result<LockoutState, CofreError> {
        Ok(*self.lock())
    }

    fn save(&self, state: LockoutState) -> Result<(), CofreError> {
        *self.lock() = state;
        Ok(())
    }

    fn clear(&self) -> Result<(), CofreError> {
        *self.lock() = LockoutState::default();
        Ok(())
    }
}

impl MemoryLockoutStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, LockoutState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// File-backed store: JSON on disk, replaced atomically.
///
/// Writes go to a temp file in the same directory followed by a rename, so
/// a crash mid-write leaves either the old record or the new one, never a
/// torn file.
#[derive(Debug)]
pub struct FileLockoutStore {
    path: PathBuf,
}

impl FileLockoutStore {
    /// Create a store persisting to `path`. The file may not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LockoutStore for FileLockoutStore {
    fn load(&self) -> Result<LockoutState, CofreError> {
        if !self.path.exists() {
            return Ok(LockoutState::default());
        }
        let data = std::fs::read(&self.path).map_err(storage_err)?;
        serde_json::from_slice(&data).map_err(storage_err)
    }

    fn save(&self, state: LockoutState) -> Result<(), CofreError> {
        let parent = self.path.parent().ok_or_else(|| CofreError::Storage {
            source: "lockout state path has no parent directory".into(),
        })?;
        let tmp = parent.join(".lockout-state.tmp");

        let data = serde_json::to_vec(&state).map_err(storage_err)?;
        std::fs::write(&tmp, &data).map_err(storage_err)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(storage_err(e));
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), CofreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_err(e)),
        }
    }
}

fn storage_err(e: impl std::error::Error + Send + Sync + 'static) -> CofreError {
    CofreError::Storage {
        source: Box::new(e),
    }
}

/// The lockout state machine. All mutation of [`LockoutState`] goes through
/// this type.
pub struct LockoutPolicy {
    store: Arc<dyn LockoutStore>,
}

impl LockoutPolicy {
    /// Create a policy over the given durable store.
    pub fn new(store: Arc<dyn LockoutStore>) -> Self {
        Self { store }
    }

    /// Record a failed unlock attempt.
    ///
    /// Increments the counter and stamps the attempt time. Reaching
    /// [`MAX_FAILED_ATTEMPTS`] starts a [`LOCKOUT_DURATION`] lockout; a
    /// failure after an expired lockout re-triggers a full window, since
    /// only a successful authentication clears the counter.
    pub fn record_failed_attempt(&self) -> Result<AttemptOutcome, CofreError> {
        self.record_failed_attempt_at(now_ms())
    }

    fn record_failed_attempt_at(&self, now_ms: u64) -> Result<AttemptOutcome, CofreError> {
        let mut state = self.store.load()?;
        state.failed_attempts = state.failed_attempts.saturating_add(1);
        state.last_attempt_ms = now_ms;

        let lockout_ms = LOCKOUT_DURATION.as_millis() as u64;
        let outcome = if state.failed_attempts >= MAX_FAILED_ATTEMPTS {
            state.lockout_end_ms = now_ms.saturating_add(lockout_ms);
            warn!(
                failed_attempts = state.failed_attempts,
                "unlock lockout triggered"
            );
            AttemptOutcome::LockedOut {
                remaining_ms: lockout_ms,
            }
        } else if state.failed_attempts >= WARNING_THRESHOLD {
            AttemptOutcome::Warning {
                attempts_remaining: MAX_FAILED_ATTEMPTS - state.failed_attempts,
            }
        } else {
            AttemptOutcome::Counted {
                failed_attempts: state.failed_attempts,
            }
        };

        self.store.save(state)?;
        Ok(outcome)
    }

    /// Zero all counters. Called only after a successful authentication.
    pub fn reset(&self) -> Result<(), CofreError> {
        self.store.clear()?;
        debug!("lockout counters reset");
        Ok(())
    }

    /// Whether a lockout is currently active.
    pub fn is_locked_out(&self) -> Result<bool, CofreError> {
        self.is_locked_out_at(now_ms())
    }

    fn is_locked_out_at(&self, now_ms: u64) -> Result<bool, CofreError> {
        let state = self.store.load()?;
        Ok(state.lockout_end_ms != 0 && now_ms < state.lockout_end_ms)
    }

    /// Milliseconds until the current lockout expires, zero when the gate
    /// is open.
    pub fn remaining_lockout_millis(&self) -> Result<u64, CofreError> {
        self.remaining_lockout_millis_at(now_ms())
    }

    fn remaining_lockout_millis_at(&self, now_ms: u64) -> Result<u64, CofreError> {
        let state = self.store.load()?;
        Ok(state.lockout_end_ms.saturating_sub(now_ms))
    }

    /// Gate helper: errors with the remaining countdown while locked.
    ///
    /// Consulted before any passphrase or PIN check is attempted.
    pub fn ensure_can_attempt(&self) -> Result<(), CofreError> {
        self.ensure_can_attempt_at(now_ms())
    }

    fn ensure_can_attempt_at(&self, now_ms: u64) -> Result<(), CofreError> {
        let remaining_ms = self.remaining_lockout_millis_at(now_ms)?;
        if remaining_ms > 0 {
            return Err(CofreError::TooManyAttempts { remaining_ms });
        }
        Ok(())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCKOUT_MS: u64 = 15 * 60 * 1000;

    fn policy() -> LockoutPolicy {
        LockoutPolicy::new(Arc::new(MemoryLockoutStore::default()))
    }

    #[test]
    fn attempts_below_warning_are_just_counted() {
        let policy = policy();
        assert_eq!(
            policy.record_failed_attempt_at(10).unwrap(),
            AttemptOutcome::Counted { failed_attempts: 1 }
        );
        assert_eq!(
            policy.record_failed_attempt_at(20).unwrap(),
            AttemptOutcome::Counted { failed_attempts: 2 }
        );
        assert!(!policy.is_locked_out_at(30).unwrap());
    }

    #[test]
    fn warning_starts_at_the_third_attempt() {
        let policy = policy();
        policy.record_failed_attempt_at(10).unwrap();
        policy.record_failed_attempt_at(20).unwrap();

        assert_eq!(
            policy.record_failed_attempt_at(30).unwrap(),
            AttemptOutcome::Warning {
                attempts_remaining: 2
            }
        );
        assert_eq!(
            policy.record_failed_attempt_at(40).unwrap(),
            AttemptOutcome::Warning {
                attempts_remaining: 1
            }
        );
    }

    #[test]
    fn five_failures_trigger_the_lockout() {
        let policy = policy();
        for t in 1..5 {
            policy.record_failed_attempt_at(t).unwrap();
        }

        let outcome = policy.record_failed_attempt_at(100).unwrap();
        assert_eq!(
            outcome,
            AttemptOutcome::LockedOut {
                remaining_ms: LOCKOUT_MS
            }
        );
        assert!(policy.is_locked_out_at(101).unwrap());
        assert_eq!(
            policy.remaining_lockout_millis_at(100 + LOCKOUT_MS / 2).unwrap(),
            LOCKOUT_MS / 2
        );
    }

    #[test]
    fn a_sixth_attempt_keeps_the_gate_locked() {
        let policy = policy();
        for t in 1..=5 {
            policy.record_failed_attempt_at(t).unwrap();
        }

        let outcome = policy.record_failed_attempt_at(1000).unwrap();
        assert!(matches!(outcome, AttemptOutcome::LockedOut { .. }));
        assert!(policy.is_locked_out_at(1001).unwrap());
    }

    #[test]
    fn lockout_expires_implicitly() {
        let policy = policy();
        for t in 1..=5 {
            policy.record_failed_attempt_at(t).unwrap();
        }

        assert!(policy.is_locked_out_at(5 + LOCKOUT_MS - 1).unwrap());
        assert!(!policy.is_locked_out_at(5 + LOCKOUT_MS).unwrap());
        assert_eq!(
            policy.remaining_lockout_millis_at(5 + LOCKOUT_MS).unwrap(),
            0
        );
        assert!(policy.ensure_can_attempt_at(5 + LOCKOUT_MS).is_ok());
    }

    #[test]
    fn failure_after_expiry_relocks_until_a_success_resets() {
        let policy = policy();
        for t in 1..=5 {
            policy.record_failed_attempt_at(t).unwrap();
        }
        let after_expiry = 5 + LOCKOUT_MS + 1;

        let outcome = policy.record_failed_attempt_at(after_expiry).unwrap();
        assert!(matches!(outcome, AttemptOutcome::LockedOut { .. }));
        assert!(policy.is_locked_out_at(after_expiry + 1).unwrap());
    }

    #[test]
    fn gate_helper_reports_the_countdown() {
        let policy = policy();
        for t in 1..=5 {
            policy.record_failed_attempt_at(t).unwrap();
        }

        let result = policy.ensure_can_attempt_at(5 + 1000);
        match result {
            Err(CofreError::TooManyAttempts { remaining_ms }) => {
                assert_eq!(remaining_ms, LOCKOUT_MS - 1000);
            }
            other => panic!("expected TooManyAttempts, got {other:?}"),
        }
    }

    #[test]
    fn reset_zeroes_all_three_fields() {
        let policy = policy();
        for t in 1..=5 {
            policy.record_failed_attempt_at(t).unwrap();
        }

        policy.reset().unwrap();

        assert!(!policy.is_locked_out_at(6).unwrap());
        assert_eq!(policy.remaining_lockout_millis_at(6).unwrap(), 0);
        // The next failure counts from one again.
        assert_eq!(
            policy.record_failed_attempt_at(7).unwrap(),
            AttemptOutcome::Counted { failed_attempts: 1 }
        );
    }

    #[test]
    fn state_is_shared_through_the_store() {
        let store: Arc<dyn LockoutStore> = Arc::new(MemoryLockoutStore::default());
        let first = LockoutPolicy::new(Arc::clone(&store));
        for t in 1..=5 {
            first.record_failed_attempt_at(t).unwrap();
        }

        // A fresh policy over the same store sees the lockout.
        let second = LockoutPolicy::new(store);
        assert!(second.is_locked_out_at(10).unwrap());
    }

    #[test]
    fn file_store_survives_a_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lockout.json");

        let first = LockoutPolicy::new(Arc::new(FileLockoutStore::new(&path)));
        for t in 1..=5 {
            first.record_failed_attempt_at(t).unwrap();
        }

        // Simulates a process restart.
        let second = LockoutPolicy::new(Arc::new(FileLockoutStore::new(&path)));
        assert!(second.is_locked_out_at(10).unwrap());

        second.reset().unwrap();
        assert!(!path.exists());
        assert!(!second.is_locked_out_at(11).unwrap());
    }

    #[test]
    fn file_store_defaults_when_no_record_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLockoutStore::new(dir.path().join("missing.json"));
        assert_eq!(store.load().unwrap(), LockoutState::default());
        // Clearing an absent record is fine.
        store.clear().unwrap();
    }

    #[test]
    fn file_store_persists_camel_case_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lockout.json");
        let store = FileLockoutStore::new(&path);

        store
            .save(LockoutState {
                failed_attempts: 2,
                lockout_end_ms: 0,
                last_attempt_ms: 123,
            })
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("failedAttempts"), "got: {raw}");
        assert!(raw.contains("lastAttemptMs"), "got: {raw}");
    }
}
