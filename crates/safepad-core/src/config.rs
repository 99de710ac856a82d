use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{SafepadError, SafepadResult};
use crate::policy::PasswordPolicy;

/// Default config location
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/safepad/config.toml";

/// Top-level application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafepadConfig {
    pub log: LogConfig,
    pub crypto: CryptoConfig,
    pub password: PasswordPolicy,
    pub guard: GuardConfig,
    pub migration: MigrationConfig,
    pub benchmark: BenchmarkConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

/// Argon2id cost of one preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2Cost {
    /// Memory cost in KiB
    pub mem_cost_kib: u32,
    /// Time cost (iterations)
    pub time_cost: u32,
    /// Parallelism (lanes)
    pub parallelism: u32,
}

impl Argon2Cost {
    pub const fn new(mem_cost_kib: u32, time_cost: u32, parallelism: u32) -> Self {
        Self {
            mem_cost_kib,
            time_cost,
            parallelism,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Presets {
    pub low: Argon2Cost,
    pub normal: Argon2Cost,
    pub high: Argon2Cost,
}

/// Encryption cost settings.
///
/// Containers do not record their cost parameters, so changing `level` or a
/// preset after sealing makes older files unreadable with the new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Active preset: "low", "normal", or "high" (default: normal)
    pub level: String,
    pub presets: Presets,
}

impl CryptoConfig {
    /// Parameters of the named preset.
    pub fn preset(&self, level: &str) -> SafepadResult<Argon2Cost> {
        match level.to_ascii_lowercase().as_str() {
            "low" => Ok(self.presets.low),
            "normal" => Ok(self.presets.normal),
            "high" => Ok(self.presets.high),
            other => Err(SafepadError::Config(format!(
                "unknown encryption level '{other}' (expected low, normal, or high)"
            ))),
        }
    }

    /// Parameters of the active preset.
    pub fn active(&self) -> SafepadResult<Argon2Cost> {
        self.preset(&self.level)
    }

    /// Replace the named preset, e.g. with benchmark results.
    pub fn set_preset(&mut self, level: &str, cost: Argon2Cost) -> SafepadResult<()> {
        let slot = match level.to_ascii_lowercase().as_str() {
            "low" => &mut self.presets.low,
            "normal" => &mut self.presets.normal,
            "high" => &mut self.presets.high,
            other => {
                return Err(SafepadError::Config(format!(
                    "unknown encryption level '{other}'"
                )))
            }
        };
        *slot = cost;
        Ok(())
    }
}

/// Brute-force guard settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Per-installation state file (default: ~/.local/share/safepad/guard.json)
    pub state_file: PathBuf,
    /// Failed unlocks before lockout (default: 5)
    pub max_attempts: u32,
    /// Lockout duration in seconds (default: 300)
    pub lockout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Keep originals as *.old.bak
    pub backup: bool,
    /// Container extension to look for
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Seconds one key derivation should take
    pub target_secs: f64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl Default for Presets {
    fn default() -> Self {
        Self {
            low: Argon2Cost::new(16 * 1024, 2, 1),
            normal: Argon2Cost::new(64 * 1024, 3, 2),
            high: Argon2Cost::new(512 * 1024, 4, 4),
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            level: "normal".into(),
            presets: Presets::default(),
        }
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("~/.local/share/safepad/guard.json"),
            max_attempts: 5,
            lockout_secs: 300,
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            backup: true,
            extension: "sscr".into(),
        }
    }
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self { target_secs: 2.0 }
    }
}

impl SafepadConfig {
    /// Load from `path`, or return defaults when the file does not exist.
    pub fn load(path: &Path) -> SafepadResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| SafepadError::Config(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Write as pretty TOML via temp file + rename.
    pub fn save(&self, path: &Path) -> SafepadResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SafepadError::Config(format!("serializing config: {e}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("toml.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Reject values no operation could use.
    pub fn validate(&self) -> SafepadResult<()> {
        self.crypto.active()?;
        if !matches!(self.log.format.as_str(), "text" | "json") {
            return Err(SafepadError::Config(format!(
                "log.format must be \"text\" or \"json\", got '{}'",
                self.log.format
            )));
        }
        if self.guard.max_attempts == 0 {
            return Err(SafepadError::Config("guard.max_attempts must be at least 1".into()));
        }
        if !(self.benchmark.target_secs > 0.0) {
            return Err(SafepadError::Config("benchmark.target_secs must be positive".into()));
        }
        Ok(())
    }
}

/// Expand a leading `~/` using `HOME`.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(home).join(rest)
        }
        None => path.to_path_buf(),
    }
}
