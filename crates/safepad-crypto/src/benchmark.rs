//! KDF calibration: find Argon2id parameters that take about `target` here
//!
//! Memory phase doubles `m` (t = 1) from 64 MiB until a trial exceeds the
//! target or the primitive rejects the size, then settles on half. Time phase
//! raises `t` on that memory until a trial exceeds the target, stepping back
//! one. Parallelism is the number of available CPU threads.

use std::time::{Duration, Instant};

use secrecy::SecretString;
use tracing::{debug, info};

use crate::error::{VaultError, VaultResult};
use crate::kdf::{derive_key, CostParams};
use crate::progress::Observer;
use crate::vault::generate_salt;

/// Calibration bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationConfig {
    /// Wall time one key derivation should take
    pub target: Duration,
    pub parallelism: u32,
    /// First memory size tried, in KiB
    pub start_mem_kib: u32,
    /// Largest memory size tried, in KiB
    pub max_mem_kib: u32,
    pub max_time_cost: u32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(|n| u32::try_from(n.get()).unwrap_or(u32::MAX))
            .unwrap_or(1);
        Self {
            target: Duration::from_secs(2),
            parallelism,
            start_mem_kib: 64 * 1024,
            max_mem_kib: 8 * 1024 * 1024,
            max_time_cost: 20,
        }
    }
}

impl CalibrationConfig {
    pub fn with_target(mut self, target: Duration) -> Self {
        self.target = target;
        self
    }
}

/// Calibrate against real Argon2id runs on this machine.
pub fn calibrate(config: &CalibrationConfig, observer: Observer<'_>) -> VaultResult<CostParams> {
    let password = SecretString::from("benchmark-password");
    let salt = generate_salt();

    calibrate_with(config, observer, |cost| {
        let start = Instant::now();
        derive_key(&password, &salt, cost)?;
        Ok(start.elapsed())
    })
}

/// Calibrate with a caller-supplied trial that returns how long one
/// derivation under `cost` took.
///
/// Cancellation is checked before every trial; a running trial is never
/// interrupted.
pub fn calibrate_with<F>(
    config: &CalibrationConfig,
    observer: Observer<'_>,
    mut trial: F,
) -> VaultResult<CostParams>
where
    F: FnMut(&CostParams) -> VaultResult<Duration>,
{
    let parallelism = config.parallelism.max(1);
    let min_mem = 8 * parallelism;

    observer.status("Testing memory cost...");
    let mut mem = config.start_mem_kib.max(min_mem);
    let mut step: u32 = 0;
    let best_mem = loop {
        observer.checkpoint()?;
        step += 1;
        observer.status(&format!("Testing {} MiB of memory...", mem / 1024));
        observer.progress(step.saturating_mul(5).min(50) as u8);

        match trial(&CostParams::new(mem, 1, parallelism)) {
            Ok(elapsed) if elapsed > config.target => break mem / 2,
            Ok(_) if mem >= config.max_mem_kib => break mem,
            Ok(elapsed) => {
                debug!(mem_kib = mem, ?elapsed, "memory trial under target");
                mem = mem.saturating_mul(2).min(config.max_mem_kib);
            }
            Err(VaultError::KeyDerivation(reason)) => {
                debug!(mem_kib = mem, %reason, "memory size rejected");
                break mem / 2;
            }
            Err(e) => return Err(e),
        }
    }
    .max(min_mem);

    observer.status("Tuning time cost...");
    observer.progress(50);
    let mut time_cost: u32 = 1;
    loop {
        observer.checkpoint()?;
        observer.status(&format!("Testing {time_cost} iterations..."));
        observer.progress(50u32.saturating_add(time_cost * 5).min(99) as u8);

        let elapsed = trial(&CostParams::new(best_mem, time_cost, parallelism))?;
        if elapsed > config.target {
            time_cost = time_cost.saturating_sub(1).max(1);
            break;
        }
        if time_cost >= config.max_time_cost {
            break;
        }
        time_cost += 1;
    }

    observer.progress(100);
    let params = CostParams::new(best_mem, time_cost, parallelism);
    info!(%params, target = ?config.target, "calibration finished");
    Ok(params)
}
