//! Load config from file and environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ice_core::{Credentials, StreamDescriptor, DEFAULT_MOUNT};
use serde::Deserialize;

use crate::session::{ServerConfig, LOGIN_TIMEOUT};

/// Client configuration. File: ~/.config/ice-source/config.toml or
/// /etc/ice-source/config.toml.
/// Env overrides: ICECAST_HOST, ICECAST_PORT, ICECAST_USER, ICECAST_PASSWORD, ICECAST_MOUNT.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server host (default localhost).
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port (default 8000).
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Mountpoint to source (default /stream).
    #[serde(default = "default_mount")]
    pub mount: String,
    #[serde(default = "default_login_timeout_ms")]
    pub login_timeout_ms: u64,
    #[serde(default)]
    pub stream: StreamDescriptor,
}

fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_mount() -> String {
    DEFAULT_MOUNT.to_string()
}
fn default_login_timeout_ms() -> u64 {
    LOGIN_TIMEOUT.as_millis() as u64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: None,
            password: None,
            mount: default_mount(),
            login_timeout_ms: default_login_timeout_ms(),
            stream: StreamDescriptor::default(),
        }
    }
}

impl Config {
    pub fn server(&self) -> ServerConfig {
        let mut server =
            ServerConfig::new(self.host.clone(), self.port).with_mount(self.mount.clone());
        server.credentials = Credentials::from_parts(self.user.clone(), self.password.clone());
        server
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_millis(self.login_timeout_ms)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Load config: merge default, then the first config file found, then env vars.
pub fn load() -> Config {
    let c = load_file().unwrap_or_default();
    apply_env(c, |key| std::env::var(key).ok())
}

/// Load an explicit config file, then env vars. Unlike [`load`], a missing or
/// invalid file is an error.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let c = load_from_file(path)?;
    Ok(apply_env(c, |key| std::env::var(key).ok()))
}

fn apply_env(mut c: Config, var: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(s) = var("ICECAST_HOST") {
        c.host = s;
    }
    if let Some(s) = var("ICECAST_PORT") {
        match s.parse::<u16>() {
            Ok(p) => c.port = p,
            Err(_) => tracing::warn!(value = %s, "ignoring invalid ICECAST_PORT"),
        }
    }
    if let Some(s) = var("ICECAST_USER") {
        c.user = Some(s);
    }
    if let Some(s) = var("ICECAST_PASSWORD") {
        c.password = Some(s);
    }
    if let Some(s) = var("ICECAST_MOUNT") {
        c.mount = s;
    }
    c
}

fn config_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut out = Vec::new();
    if let Some(h) = home {
        out.push(h.join(".config/ice-source/config.toml"));
    }
    out.push(PathBuf::from("/etc/ice-source/config.toml"));
    out
}

fn load_file() -> Option<Config> {
    let path = config_paths().into_iter().find(|p| p.exists())?;
    match load_from_file(&path) {
        Ok(c) => {
            tracing::debug!(path = %path.display(), "loaded config");
            Some(c)
        }
        Err(e) => {
            tracing::warn!(error = %e, "falling back to default config");
            None
        }
    }
}

fn load_from_file(path: &Path) -> Result<Config, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&s).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
