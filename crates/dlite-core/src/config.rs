use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::endpoints::ClientOptions;
use crate::retry::BackoffSettings;
use crate::transport::TransportOptions;

/// Environment variable that overrides the configured token.
pub const TOKEN_ENV: &str = "DLITE_TOKEN";

/// Backoff parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackoffConfig {
    /// First wait in milliseconds.
    pub initial_interval_ms: u64,
    /// Growth factor between waits.
    pub multiplier: f64,
    /// Upper bound on a single wait in seconds.
    pub max_interval_secs: u64,
    /// Jitter: each wait is drawn from interval * (1 ± factor).
    pub randomization_factor: f64,
    /// Give up retrying register after this many seconds.
    pub register_max_elapsed_secs: u64,
    /// Give up retrying send-status after this many seconds.
    pub status_max_elapsed_secs: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: 500,
            multiplier: 1.5,
            max_interval_secs: 60,
            randomization_factor: 0.5,
            register_max_elapsed_secs: 30,
            status_max_elapsed_secs: 60,
        }
    }
}

/// Configuration loaded from `~/.config/dlite/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DliteConfig {
    /// Manager base URL, e.g. `https://manager.example.com`.
    pub endpoint: String,
    pub account_id: String,
    /// Delegate token. Prefer `DLITE_TOKEN` over storing it here.
    #[serde(default)]
    pub token: Option<String>,
    /// Disable TLS certificate verification. Only for managers with
    /// self-signed certificates on a trusted network.
    #[serde(default)]
    pub skip_verify: bool,
    pub connect_timeout_secs: u64,
    /// Whole-request timeout; 0 disables it.
    pub request_timeout_secs: u64,
    /// Response bytes kept per request.
    pub max_body_bytes: usize,
    /// Fail instead of sending an empty body when a payload cannot be encoded.
    #[serde(default)]
    pub strict_encode: bool,
    /// Optional backoff tuning; built-in defaults when missing.
    #[serde(default)]
    pub backoff: Option<BackoffConfig>,
}

impl Default for DliteConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3457".to_string(),
            account_id: String::new(),
            token: None,
            skip_verify: false,
            connect_timeout_secs: 15,
            request_timeout_secs: 60,
            max_body_bytes: 4 * 1024 * 1024,
            strict_encode: false,
            backoff: None,
        }
    }
}

impl DliteConfig {
    /// Check values that would otherwise only fail at request time.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.endpoint)
            .with_context(|| format!("invalid manager endpoint {:?}", self.endpoint))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!("manager endpoint must be http or https, got {}", url.scheme());
        }
        if self.account_id.trim().is_empty() {
            anyhow::bail!("account_id is not set");
        }
        if self.max_body_bytes == 0 {
            anyhow::bail!("max_body_bytes must be greater than 0");
        }
        if let Some(b) = &self.backoff {
            if b.initial_interval_ms == 0 {
                anyhow::bail!("backoff.initial_interval_ms must be greater than 0");
            }
            if !(b.multiplier >= 1.0) {
                anyhow::bail!("backoff.multiplier must be at least 1.0");
            }
            if !(0.0..1.0).contains(&b.randomization_factor) {
                anyhow::bail!("backoff.randomization_factor must be in [0, 1)");
            }
        }
        Ok(())
    }

    /// Token from `DLITE_TOKEN`, falling back to the config file.
    pub fn resolve_token(&self) -> Option<String> {
        self.resolve_token_with(None)
    }

    /// Like [`resolve_token`](Self::resolve_token), but an explicit token
    /// (e.g. `--token`) beats both.
    pub fn resolve_token_with(&self, explicit: Option<&str>) -> Option<String> {
        let env = std::env::var(TOKEN_ENV).ok();
        pick_token(explicit, env.as_deref(), self.token.as_deref())
    }

    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            skip_verify: self.skip_verify,
            max_body_bytes: self.max_body_bytes,
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        let b = self.backoff.clone().unwrap_or_default();
        ClientOptions {
            backoff: BackoffSettings {
                initial_interval: Duration::from_millis(b.initial_interval_ms),
                multiplier: b.multiplier,
                max_interval: Duration::from_secs(b.max_interval_secs),
                randomization_factor: b.randomization_factor,
            },
            register_max_elapsed: Duration::from_secs(b.register_max_elapsed_secs),
            status_max_elapsed: Duration::from_secs(b.status_max_elapsed_secs),
            strict_encode: self.strict_encode,
        }
    }
}

/// First non-empty of explicit, environment, file.
fn pick_token(explicit: Option<&str>, env: Option<&str>, file: Option<&str>) -> Option<String> {
    [explicit, env, file]
        .into_iter()
        .flatten()
        .find(|t| !t.is_empty())
        .map(str::to_string)
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dlite")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DliteConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DliteConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Result<DliteConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: DliteConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}
