//! Brute-force throttling for unlock attempts
//!
//! One JSON state file per installation (not per container):
//! ```json
//! { "failed_attempts": 2, "locked_until": 0 }
//! ```
//! `Unlocked → (failure)* → Locked(until) → (until elapsed) → Unlocked`.
//!
//! Every read-modify-write runs under an in-process mutex plus an exclusive
//! advisory lock on `<state>.lock`, and the state file is replaced via
//! temp + rename. [`BruteForceGuard::attempt`] holds both locks for the whole
//! check → decrypt → record sequence, so concurrent unlocks queue up and at
//! most `max_attempts` of them run before the lockout applies.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{VaultError, VaultResult};
use crate::output::write_atomic;

/// Source of the current Unix time in seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

impl<F> Clock for F
where
    F: Fn() -> u64 + Send + Sync,
{
    fn now(&self) -> u64 {
        self()
    }
}

/// Lockout thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardPolicy {
    /// Consecutive failures that trigger a lockout
    pub max_attempts: u32,
    /// Lockout duration in seconds
    pub lockout_secs: u64,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_secs: 300,
        }
    }
}

/// Persisted guard state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardState {
    #[serde(default, alias = "login_attempts")]
    pub failed_attempts: u32,
    /// Unix seconds; 0 when not locked
    #[serde(default)]
    pub locked_until: u64,
}

impl GuardState {
    pub fn is_locked_at(&self, now: u64) -> bool {
        self.locked_until > now
    }
}

pub struct BruteForceGuard {
    path: PathBuf,
    lock_path: PathBuf,
    policy: GuardPolicy,
    clock: Box<dyn Clock>,
    in_process: Mutex<()>,
}

impl std::fmt::Debug for BruteForceGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BruteForceGuard")
            .field("path", &self.path)
            .field("policy", &self.policy)
            .finish()
    }
}

impl BruteForceGuard {
    /// Open (or start) the guard state stored at `path`, using the wall clock.
    pub fn open(path: &Path, policy: GuardPolicy) -> VaultResult<Self> {
        Self::with_clock(path, policy, SystemClock)
    }

    /// Open the guard with an injected clock.
    pub fn with_clock(
        path: &Path,
        policy: GuardPolicy,
        clock: impl Clock + 'static,
    ) -> VaultResult<Self> {
        if policy.max_attempts == 0 {
            return Err(VaultError::GuardState(
                "max_attempts must be at least 1".into(),
            ));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| VaultError::io(format!("creating {}", parent.display()), e))?;
        }

        let mut lock_name = path.as_os_str().to_os_string();
        lock_name.push(".lock");

        Ok(Self {
            path: path.to_path_buf(),
            lock_path: PathBuf::from(lock_name),
            policy,
            clock: Box::new(clock),
            in_process: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> GuardPolicy {
        self.policy
    }

    /// Current persisted state, after clearing an expired lockout.
    pub fn state(&self) -> VaultResult<GuardState> {
        self.update(|state, now| {
            let changed = heal_expired(state, now);
            (*state, changed)
        })
    }

    /// True while a lockout is in force. An expired lockout is cleared (and the
    /// failure count reset) as a side effect.
    pub fn is_locked(&self) -> VaultResult<bool> {
        self.update(|state, now| {
            let changed = heal_expired(state, now);
            (state.is_locked_at(now), changed)
        })
    }

    /// Seconds until the current lockout ends, if one is in force.
    pub fn remaining_lockout(&self) -> VaultResult<Option<u64>> {
        self.update(remaining_step)
    }

    /// Fail with [`VaultError::Locked`] while a lockout is in force.
    pub fn check(&self) -> VaultResult<()> {
        match self.remaining_lockout()? {
            Some(remaining_secs) => Err(VaultError::Locked { remaining_secs }),
            None => Ok(()),
        }
    }

    /// Count a failed unlock; starts a lockout once the threshold is reached.
    pub fn record_failure(&self) -> VaultResult<GuardState> {
        let state = self.update(failure_step(self.policy))?;
        log_failure(&state);
        Ok(state)
    }

    /// Clear the failure count and any lockout.
    pub fn record_success(&self) -> VaultResult<()> {
        self.update(success_step)
    }

    /// Administrative reset; same effect as a successful unlock.
    pub fn reset(&self) -> VaultResult<()> {
        self.record_success()?;
        info!(path = %self.path.display(), "guard state reset");
        Ok(())
    }

    /// Run one unlock attempt under the guard.
    ///
    /// Rejected outright with [`VaultError::Locked`] while locked, without
    /// running `op`. An [`VaultError::InvalidPasswordOrCorrupt`] result counts
    /// as a failure, success clears the count, and any other error (format,
    /// I/O, cancellation) leaves the state untouched.
    ///
    /// The state lock is held while `op` runs; `op` must not call back into a
    /// guard on the same state file.
    pub fn attempt<T>(&self, op: impl FnOnce() -> VaultResult<T>) -> VaultResult<T> {
        self.with_locks(|| {
            if let Some(remaining_secs) = self.modify(remaining_step)? {
                return Err(VaultError::Locked { remaining_secs });
            }
            match op() {
                Ok(value) => {
                    self.modify(success_step)?;
                    Ok(value)
                }
                Err(e) if e.is_authentication_failure() => {
                    let state = self.modify(failure_step(self.policy))?;
                    log_failure(&state);
                    Err(e)
                }
                Err(e) => Err(e),
            }
        })
    }

    /// Read-modify-write the state under both locks.
    fn update<R>(&self, f: impl FnOnce(&mut GuardState, u64) -> (R, bool)) -> VaultResult<R> {
        self.with_locks(|| self.modify(f))
    }

    /// Run `f` holding the in-process mutex and the exclusive file lock.
    fn with_locks<R>(&self, f: impl FnOnce() -> VaultResult<R>) -> VaultResult<R> {
        let _in_process = self
            .in_process
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let lock_file = self.acquire_file_lock()?;

        let result = f();

        if let Err(e) = FileExt::unlock(&lock_file) {
            debug!(error = %e, "releasing guard lock");
        }
        result
    }

    /// Load, apply `f`, and persist if it reports a change. Callers hold the locks.
    fn modify<R>(&self, f: impl FnOnce(&mut GuardState, u64) -> (R, bool)) -> VaultResult<R> {
        let mut state = self.load()?;
        let (result, changed) = f(&mut state, self.clock.now());
        if changed {
            self.persist(&state)?;
        }
        Ok(result)
    }

    fn acquire_file_lock(&self) -> VaultResult<File> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| VaultError::io(format!("opening {}", self.lock_path.display()), e))?;
        file.lock_exclusive()
            .map_err(|e| VaultError::GuardState(format!("acquiring lock: {e}")))?;
        Ok(file)
    }

    fn load(&self) -> VaultResult<GuardState> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(GuardState::default())
            }
            Err(e) => return Err(VaultError::io(format!("reading {}", self.path.display()), e)),
        };

        match serde_json::from_slice(&content) {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable guard state, starting fresh");
                Ok(GuardState::default())
            }
        }
    }

    fn persist(&self, state: &GuardState) -> VaultResult<()> {
        let json = serde_json::to_vec_pretty(state)
            .map_err(|e| VaultError::GuardState(format!("serializing: {e}")))?;
        write_atomic(&self.path, &json)
    }
}

fn remaining_step(state: &mut GuardState, now: u64) -> (Option<u64>, bool) {
    let changed = heal_expired(state, now);
    let remaining = state
        .is_locked_at(now)
        .then(|| state.locked_until - now);
    (remaining, changed)
}

fn success_step(state: &mut GuardState, _now: u64) -> ((), bool) {
    let changed = *state != GuardState::default();
    *state = GuardState::default();
    ((), changed)
}

fn failure_step(policy: GuardPolicy) -> impl FnOnce(&mut GuardState, u64) -> (GuardState, bool) {
    move |state, now| {
        heal_expired(state, now);
        state.failed_attempts = state.failed_attempts.saturating_add(1);
        if state.failed_attempts >= policy.max_attempts {
            state.locked_until = now.saturating_add(policy.lockout_secs);
        }
        (*state, true)
    }
}

fn log_failure(state: &GuardState) {
    if state.locked_until > 0 {
        warn!(
            attempts = state.failed_attempts,
            locked_until = state.locked_until,
            "too many failed unlock attempts, locking"
        );
    } else {
        debug!(attempts = state.failed_attempts, "failed unlock recorded");
    }
}

/// Clear a lockout whose deadline has passed. Returns whether anything changed.
fn heal_expired(state: &mut GuardState, now: u64) -> bool {
    if state.locked_until > 0 && state.locked_until <= now {
        *state = GuardState::default();
        return true;
    }
    false
}
