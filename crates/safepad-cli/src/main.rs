//! safepad: encrypted notes and folders from the command line
//!
//! Document commands:
//!   seal <file>                  - encrypt a document into a .sscr container
//!   open <container>             - decrypt a container to stdout or a file
//!   passwd <container>           - change a container's password
//!
//! Folder commands:
//!   seal-dir <dir>               - archive and encrypt a directory tree
//!   open-dir <container> <dest>  - decrypt and extract a folder container
//!
//! Maintenance:
//!   migrate <dir>                - convert legacy containers to the V2.0 format
//!   benchmark [--save]           - calibrate Argon2id cost for this machine
//!   guard status|reset           - inspect or clear the unlock lockout
//!   config show                  - display current configuration
//!
//! Passwords are read from SAFEPAD_PASSWORD (and SAFEPAD_NEW_PASSWORD for
//! `passwd`) when set, otherwise prompted for on the terminal.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::{ExposeSecret, SecretString};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

use safepad_core::config::{expand_tilde, Argon2Cost, SafepadConfig, DEFAULT_CONFIG_PATH};
use safepad_core::policy::PasswordPolicy;
use safepad_core::types::Document;
use safepad_crypto::{
    calibrate, change_password_at, migrate_directory, open_directory, open_path,
    seal_directory_to_path, seal_to_path, BruteForceGuard, CalibrationConfig, CancelToken,
    CostParams, GuardPolicy, MigrationOptions, Observer, ProgressFn, StatusFn, VaultError,
    CONTAINER_EXTENSION,
};

const PASSWORD_ENV: &str = "SAFEPAD_PASSWORD";
const NEW_PASSWORD_ENV: &str = "SAFEPAD_NEW_PASSWORD";

/// Interactive attempts at choosing an acceptable new password
const NEW_PASSWORD_TRIES: usize = 3;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "safepad",
    version,
    about = "SafePad encrypted notes and folders",
    long_about = "safepad: seal documents and folders into password-protected V2.0 containers \
                  (Argon2id + AES-256-GCM), and migrate older files"
)]
struct Cli {
    /// Path to config.toml
    #[arg(long, short = 'c', env = "SAFEPAD_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Encryption level for this run: low, normal, high (overrides crypto.level)
    #[arg(long, short = 'l', global = true)]
    level: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SAFEPAD_LOG", global = true)]
    log: Option<String>,

    /// Log format (json, text)
    #[arg(long, env = "SAFEPAD_LOG_FORMAT", global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a document into a container
    ///
    /// Plain text and editor JSON payloads are both accepted; use --raw to
    /// seal arbitrary bytes unchanged.
    Seal {
        /// File to encrypt
        input: PathBuf,
        /// Output container (default: <input>.sscr)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Seal the file bytes as-is instead of as a document
        #[arg(long)]
        raw: bool,
        /// Overwrite an existing output file
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Decrypt a container
    Open {
        /// Container to decrypt
        container: PathBuf,
        /// Write the result here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Emit the payload bytes unchanged instead of rendering text
        #[arg(long)]
        raw: bool,
        /// Overwrite an existing output file
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Change the password of a container in place
    Passwd {
        container: PathBuf,
    },

    /// Archive and encrypt a directory (hidden files are skipped)
    #[command(name = "seal-dir")]
    SealDir {
        /// Directory to encrypt
        source: PathBuf,
        /// Output container (default: <dir>.sscr next to the directory)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Overwrite an existing output file
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Decrypt a folder container and extract it
    #[command(name = "open-dir")]
    OpenDir {
        container: PathBuf,
        /// Destination directory (created if missing)
        destination: PathBuf,
    },

    /// Convert legacy (pre-V2.0) containers under a directory
    Migrate {
        /// Directory searched recursively
        dir: PathBuf,
        /// Replace files in place without keeping *.old.bak copies
        #[arg(long)]
        no_backup: bool,
    },

    /// Calibrate Argon2id parameters for this machine
    Benchmark {
        /// Seconds one key derivation should take (default: benchmark.target_secs)
        #[arg(long)]
        target: Option<f64>,
        /// Store the result as the active level's preset
        #[arg(long)]
        save: bool,
    },

    /// Brute-force guard management
    Guard {
        #[command(subcommand)]
        action: GuardAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum GuardAction {
    /// Show failed attempts and any active lockout
    Status,
    /// Clear failed attempts and any lockout
    Reset,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

/// Resolved settings shared by all commands
struct Ctx {
    config: SafepadConfig,
    config_path: PathBuf,
    level: String,
}

impl Ctx {
    fn cost(&self) -> Result<CostParams> {
        let cost = self.config.crypto.preset(&self.level)?;
        Ok(cost_params(cost))
    }

    fn guard(&self) -> Result<BruteForceGuard> {
        let path = expand_tilde(&self.config.guard.state_file);
        let policy = GuardPolicy {
            max_attempts: self.config.guard.max_attempts,
            lockout_secs: self.config.guard.lockout_secs,
        };
        BruteForceGuard::open(&path, policy)
            .with_context(|| format!("opening guard state: {}", path.display()))
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = load_config(&config_path)?;

    let log_level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let log_format = cli.log_format.clone().unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&log_level, &log_format);

    debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "safepad starting"
    );

    let level = cli.level.clone().unwrap_or_else(|| config.crypto.level.clone());
    let ctx = Ctx {
        config,
        config_path,
        level,
    };

    match cli.command {
        Commands::Seal { input, output, raw, force } => {
            cmd_seal(&ctx, &input, output.as_deref(), raw, force).await
        }
        Commands::Open { container, output, raw, force } => {
            cmd_open(&ctx, &container, output.as_deref(), raw, force).await
        }
        Commands::Passwd { container } => cmd_passwd(&ctx, &container).await,
        Commands::SealDir { source, output, force } => {
            cmd_seal_dir(&ctx, &source, output.as_deref(), force).await
        }
        Commands::OpenDir { container, destination } => {
            cmd_open_dir(&ctx, &container, &destination).await
        }
        Commands::Migrate { dir, no_backup } => cmd_migrate(&ctx, &dir, no_backup).await,
        Commands::Benchmark { target, save } => cmd_benchmark(ctx, target, save).await,
        Commands::Guard { action: GuardAction::Status } => cmd_guard_status(&ctx),
        Commands::Guard { action: GuardAction::Reset } => cmd_guard_reset(&ctx),
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&ctx),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so `open` can stream plaintext on stdout.
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn load_config(path: &Path) -> Result<SafepadConfig> {
    SafepadConfig::load(path).with_context(|| format!("loading config: {}", path.display()))
}

fn cost_params(cost: Argon2Cost) -> CostParams {
    CostParams::new(cost.mem_cost_kib, cost.time_cost, cost.parallelism)
}

// ── Blocking work, cancellation, passwords ────────────────────────────────────

/// Run CPU/memory-heavy crypto off the async reactor.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("crypto worker failed")
}

/// Cancel `token` on Ctrl-C until the returned task is aborted.
fn cancel_on_ctrl_c() -> (CancelToken, tokio::task::JoinHandle<()>) {
    let token = CancelToken::new();
    let watcher = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\ncancelling after the current step...");
                token.cancel();
            }
        })
    };
    (token, watcher)
}

fn read_password(prompt: &str) -> Result<SecretString> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(password));
    }
    let password = rpassword::prompt_password(prompt).context("reading password")?;
    Ok(SecretString::from(password))
}

/// Read a password that will protect new data: policy-checked and confirmed.
fn read_new_password(policy: &PasswordPolicy, env_var: &str) -> Result<SecretString> {
    if let Ok(password) = std::env::var(env_var) {
        policy
            .validate(&password)
            .with_context(|| format!("{env_var} does not meet the password policy"))?;
        return Ok(SecretString::from(password));
    }

    eprintln!("New password needs {}.", policy.describe());
    for _ in 0..NEW_PASSWORD_TRIES {
        let password = SecretString::from(
            rpassword::prompt_password("New password: ").context("reading password")?,
        );
        if let Err(violation) = policy.validate(password.expose_secret()) {
            eprintln!("{violation}");
            continue;
        }
        let confirm = rpassword::prompt_password("Confirm password: ")
            .context("reading password")?;
        if confirm == password.expose_secret() {
            return Ok(password);
        }
        eprintln!("Passwords do not match.");
    }
    anyhow::bail!("no acceptable password entered")
}

fn ensure_writable(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    Ok(())
}

fn default_container_path(input: &Path) -> PathBuf {
    input.with_extension(CONTAINER_EXTENSION)
}

// ── Progress bar helpers ──────────────────────────────────────────────────────

fn make_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}% {msg}")
        .map(|s| s.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Progress and status callbacks that drive `pb`.
fn bar_callbacks(pb: &ProgressBar) -> (ProgressFn, StatusFn) {
    let on_progress = pb.clone();
    let on_status = pb.clone();
    (
        Box::new(move |pct| on_progress.set_position(u64::from(pct))),
        Box::new(move |msg| on_status.set_message(msg.to_string())),
    )
}

fn finish_bar<T>(pb: &ProgressBar, result: &Result<T, VaultError>) {
    match result {
        Ok(_) => pb.finish_with_message("done"),
        Err(VaultError::Cancelled) => pb.abandon_with_message("cancelled"),
        Err(_) => pb.abandon_with_message("failed"),
    }
}

// ── `safepad seal` ────────────────────────────────────────────────────────────

async fn cmd_seal(
    ctx: &Ctx,
    input: &Path,
    output: Option<&Path>,
    raw: bool,
    force: bool,
) -> Result<()> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_container_path(input));
    ensure_writable(&output, force)?;

    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;
    let payload = if raw {
        bytes
    } else {
        Document::payload_for(&bytes)?
    };

    let cost = ctx.cost()?;
    let password = read_new_password(&ctx.config.password, PASSWORD_ENV)?;

    let pb = make_spinner("seal");
    pb.set_message(format!("deriving key ({cost})"));
    let start = Instant::now();
    let out = output.clone();
    let len = payload.len() as u64;
    run_blocking(move || seal_to_path(&out, &payload, &password, &cost))
        .await?
        .with_context(|| format!("sealing {}", input.display()))?;
    pb.finish_and_clear();

    println!(
        "Sealed {} → {} ({}, {:.2}s, level {})",
        input.display(),
        output.display(),
        fmt_bytes(len),
        start.elapsed().as_secs_f64(),
        ctx.level,
    );
    Ok(())
}

// ── `safepad open` ────────────────────────────────────────────────────────────

async fn cmd_open(
    ctx: &Ctx,
    container: &Path,
    output: Option<&Path>,
    raw: bool,
    force: bool,
) -> Result<()> {
    if let Some(out) = output {
        ensure_writable(out, force)?;
    }
    let cost = ctx.cost()?;
    let guard = ctx.guard()?;
    guard.check()?;
    let password = read_password("Password: ")?;

    let pb = make_spinner("open");
    pb.set_message("deriving key...");
    let path = container.to_path_buf();
    let result = run_blocking(move || guard.attempt(|| open_path(&path, &password, &cost))).await?;
    pb.finish_and_clear();
    let plaintext = result.with_context(|| format!("opening {}", container.display()))?;

    let rendered = if raw {
        plaintext.to_vec()
    } else {
        Document::from_bytes(&plaintext).plain_text().into_bytes()
    };

    match output {
        Some(out) => {
            tokio::fs::write(out, &rendered)
                .await
                .with_context(|| format!("writing {}", out.display()))?;
            println!(
                "Opened {} → {} ({})",
                container.display(),
                out.display(),
                fmt_bytes(rendered.len() as u64)
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&rendered).context("writing to stdout")?;
            stdout.flush().context("writing to stdout")?;
        }
    }
    Ok(())
}

// ── `safepad passwd` ──────────────────────────────────────────────────────────

async fn cmd_passwd(ctx: &Ctx, container: &Path) -> Result<()> {
    let cost = ctx.cost()?;
    let guard = ctx.guard()?;
    guard.check()?;
    let old = read_password("Current password: ")?;
    let new = read_new_password(&ctx.config.password, NEW_PASSWORD_ENV)?;

    let pb = make_spinner("passwd");
    pb.set_message("re-encrypting...");
    let path = container.to_path_buf();
    let result =
        run_blocking(move || guard.attempt(|| change_password_at(&path, &old, &new, &cost)))
            .await?;
    pb.finish_and_clear();
    result.with_context(|| format!("changing password of {}", container.display()))?;

    println!("Password changed: {}", container.display());
    Ok(())
}

// ── `safepad seal-dir` ────────────────────────────────────────────────────────

async fn cmd_seal_dir(
    ctx: &Ctx,
    source: &Path,
    output: Option<&Path>,
    force: bool,
) -> Result<()> {
    let source = std::fs::canonicalize(source)
        .with_context(|| format!("resolving {}", source.display()))?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_container_path(&source));
    ensure_writable(&output, force)?;

    let cost = ctx.cost()?;
    let password = read_new_password(&ctx.config.password, PASSWORD_ENV)?;

    let pb = make_progress_bar(100, "seal-dir");
    let (progress, status) = bar_callbacks(&pb);
    let (cancel, watcher) = cancel_on_ctrl_c();
    let start = Instant::now();

    let (src, out) = (source.clone(), output.clone());
    let result = run_blocking(move || {
        let observer = Observer::new()
            .with_progress(&progress)
            .with_status(&status)
            .with_cancel(&cancel);
        seal_directory_to_path(&src, &out, &password, &cost, observer)
    })
    .await?;
    watcher.abort();
    finish_bar(&pb, &result);
    result.with_context(|| format!("sealing {}", source.display()))?;

    let size = std::fs::metadata(&output).map(|m| m.len()).unwrap_or(0);
    println!(
        "Sealed folder {} → {} ({}, {:.2}s)",
        source.display(),
        output.display(),
        fmt_bytes(size),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

// ── `safepad open-dir` ────────────────────────────────────────────────────────

async fn cmd_open_dir(ctx: &Ctx, container: &Path, destination: &Path) -> Result<()> {
    let cost = ctx.cost()?;
    let guard = ctx.guard()?;
    guard.check()?;
    let bytes = tokio::fs::read(container)
        .await
        .with_context(|| format!("reading {}", container.display()))?;
    let password = read_password("Password: ")?;

    let pb = make_progress_bar(100, "open-dir");
    let (progress, status) = bar_callbacks(&pb);
    let (cancel, watcher) = cancel_on_ctrl_c();

    let dest = destination.to_path_buf();
    let result = run_blocking(move || {
        let observer = Observer::new()
            .with_progress(&progress)
            .with_status(&status)
            .with_cancel(&cancel);
        guard.attempt(|| open_directory(&bytes, &password, &cost, &dest, observer))
    })
    .await?;
    watcher.abort();
    finish_bar(&pb, &result);
    let summary = result.with_context(|| format!("opening {}", container.display()))?;

    println!(
        "Extracted {} files into {}",
        summary.extracted.len(),
        destination.display()
    );
    if !summary.skipped.is_empty() {
        println!("Skipped {} unsafe entries:", summary.skipped.len());
        for name in &summary.skipped {
            println!("  {name}");
        }
    }
    Ok(())
}

// ── `safepad migrate` ─────────────────────────────────────────────────────────

async fn cmd_migrate(ctx: &Ctx, dir: &Path, no_backup: bool) -> Result<()> {
    let cost = ctx.cost()?;
    ctx.guard()?.check()?;
    let password = read_password("Password for legacy files: ")?;
    let options = MigrationOptions {
        backup: ctx.config.migration.backup && !no_backup,
        extension: ctx.config.migration.extension.clone(),
    };

    let pb = make_progress_bar(100, "migrate");
    let (progress, status) = bar_callbacks(&pb);
    let (cancel, watcher) = cancel_on_ctrl_c();

    let root = dir.to_path_buf();
    let result = run_blocking(move || {
        let observer = Observer::new()
            .with_progress(&progress)
            .with_status(&status)
            .with_cancel(&cancel);
        migrate_directory(&root, &password, &cost, &options, observer)
    })
    .await?;
    watcher.abort();
    finish_bar(&pb, &result);
    let report = result.with_context(|| format!("migrating {}", dir.display()))?;

    println!();
    println!("Migration complete:");
    println!("  migrated: {}", report.migrated.len());
    println!("  skipped:  {} (already V2.0)", report.skipped.len());
    println!("  failed:   {}", report.failed.len());
    for (path, err) in &report.failed {
        println!("    {}: {err}", path.display());
    }

    if !report.is_clean() {
        anyhow::bail!("{} file(s) could not be migrated", report.failed.len());
    }
    Ok(())
}

// ── `safepad benchmark` ───────────────────────────────────────────────────────

async fn cmd_benchmark(mut ctx: Ctx, target: Option<f64>, save: bool) -> Result<()> {
    let target_secs = target.unwrap_or(ctx.config.benchmark.target_secs);
    let target = Duration::try_from_secs_f64(target_secs)
        .ok()
        .filter(|d| !d.is_zero())
        .with_context(|| format!("invalid benchmark target: {target_secs}"))?;
    let calibration = CalibrationConfig::default().with_target(target);

    println!(
        "Calibrating Argon2id for ~{:.1}s per key ({} threads)...",
        target.as_secs_f64(),
        calibration.parallelism
    );

    let pb = make_progress_bar(100, "benchmark");
    let (progress, status) = bar_callbacks(&pb);
    let (cancel, watcher) = cancel_on_ctrl_c();

    let result = run_blocking(move || {
        let observer = Observer::new()
            .with_progress(&progress)
            .with_status(&status)
            .with_cancel(&cancel);
        calibrate(&calibration, observer)
    })
    .await?;
    watcher.abort();
    finish_bar(&pb, &result);
    let params = result.context("running benchmark")?;

    println!();
    println!("Recommended parameters:");
    println!("  memory:      {} MiB", params.mem_cost_kib / 1024);
    println!("  iterations:  {}", params.time_cost);
    println!("  parallelism: {}", params.parallelism);

    if save {
        let level = ctx.level.clone();
        ctx.config.crypto.set_preset(
            &level,
            Argon2Cost::new(params.mem_cost_kib, params.time_cost, params.parallelism),
        )?;
        ctx.config
            .save(&ctx.config_path)
            .with_context(|| format!("saving config: {}", ctx.config_path.display()))?;
        println!();
        println!(
            "Saved as the '{level}' preset in {}.",
            ctx.config_path.display()
        );
        println!("Containers sealed with the previous '{level}' parameters need them to open.");
    }
    Ok(())
}

// ── `safepad guard` ───────────────────────────────────────────────────────────

fn cmd_guard_status(ctx: &Ctx) -> Result<()> {
    let guard = ctx.guard()?;
    let state = guard.state()?;
    let policy = guard.policy();

    println!("Guard state: {}", guard.path().display());
    println!(
        "  failed attempts: {}/{}",
        state.failed_attempts, policy.max_attempts
    );
    match guard.remaining_lockout()? {
        Some(secs) => println!("  locked:          yes ({}m {}s remaining)", secs / 60, secs % 60),
        None => println!("  locked:          no"),
    }
    Ok(())
}

fn cmd_guard_reset(ctx: &Ctx) -> Result<()> {
    ctx.guard()?.reset()?;
    println!("Guard state cleared.");
    Ok(())
}

// ── `safepad config show` ─────────────────────────────────────────────────────

fn cmd_config_show(ctx: &Ctx) -> Result<()> {
    if ctx.config_path.exists() {
        println!("# Configuration from: {}", ctx.config_path.display());
    } else {
        println!(
            "# Configuration: defaults (no file at {})",
            ctx.config_path.display()
        );
    }
    println!();
    let rendered = toml::to_string_pretty(&ctx.config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_seal_dir() {
        let cli = Cli::try_parse_from([
            "safepad", "--level", "high", "seal-dir", "notes", "-o", "out.sscr", "--force",
        ])
        .unwrap();
        assert_eq!(cli.level.as_deref(), Some("high"));
        match cli.command {
            Commands::SealDir { source, output, force } => {
                assert_eq!(source, PathBuf::from("notes"));
                assert_eq!(output, Some(PathBuf::from("out.sscr")));
                assert!(force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_default_container_path() {
        assert_eq!(
            default_container_path(Path::new("/tmp/diary.txt")),
            PathBuf::from("/tmp/diary.sscr")
        );
        assert_eq!(
            default_container_path(Path::new("/home/me/photos")),
            PathBuf::from("/home/me/photos.sscr")
        );
    }

    #[test]
    fn test_ensure_writable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exists.sscr");
        std::fs::write(&path, b"x").unwrap();

        assert!(ensure_writable(&path, false).is_err());
        assert!(ensure_writable(&path, true).is_ok());
        assert!(ensure_writable(&dir.path().join("new.sscr"), false).is_ok());
    }

    #[test]
    fn test_cost_params_from_preset() {
        let ctx = Ctx {
            config: SafepadConfig::default(),
            config_path: PathBuf::from("config.toml"),
            level: "low".into(),
        };
        assert_eq!(ctx.cost().unwrap(), CostParams::new(16384, 2, 1));

        let bad = Ctx {
            level: "ultra".into(),
            ..ctx
        };
        assert!(bad.cost().is_err());
    }

    #[test]
    fn test_fmt_bytes() {
        assert_eq!(fmt_bytes(512), "512 B");
        assert_eq!(fmt_bytes(2048), "2.0 KB");
        assert_eq!(fmt_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
