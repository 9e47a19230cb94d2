//! Client configuration.
//!
//! Stored as JSON at `<config dir>/filedock/config.json`:
//! - Linux: `$XDG_CONFIG_HOME`, falling back to `~/.config`
//! - Windows: `%APPDATA%`
//!
//! `FILEDOCK_API_URL` and `FILEDOCK_TOKEN` override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use filedock_backend::BackendConfig;
use filedock_backend::client::DEFAULT_UPLOAD_CHUNK_SIZE;
use filedock_upload::DEFAULT_MAX_CONCURRENT;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const ENV_API_URL: &str = "FILEDOCK_API_URL";
pub const ENV_TOKEN: &str = "FILEDOCK_TOKEN";

/// On-disk shape. Every field is optional so older files keep loading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    base_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    user_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    upload_concurrency: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    upload_chunk_size: Option<usize>,
}

/// Changes requested for the stored configuration. `None` keeps the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub user_name: Option<String>,
    pub upload_concurrency: Option<usize>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Effective client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub base_url: String,
    /// API bearer token. Empty when signed out.
    pub token: String,
    pub user_id: String,
    pub user_name: String,
    pub upload_concurrency: usize,
    pub request_timeout: Duration,
    pub upload_chunk_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            token: String::new(),
            user_id: String::new(),
            user_name: String::new(),
            upload_concurrency: DEFAULT_MAX_CONCURRENT,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            upload_chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
        }
    }
}

impl From<ConfigFile> for AppConfig {
    fn from(file: ConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            base_url: non_empty(file.base_url).unwrap_or(defaults.base_url),
            token: file.token,
            user_id: file.user_id,
            user_name: file.user_name,
            upload_concurrency: file
                .upload_concurrency
                .filter(|n| *n > 0)
                .unwrap_or(defaults.upload_concurrency),
            request_timeout: file
                .request_timeout_secs
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            upload_chunk_size: file
                .upload_chunk_size
                .filter(|n| *n > 0)
                .unwrap_or(defaults.upload_chunk_size),
        }
    }
}

impl From<&AppConfig> for ConfigFile {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            token: config.token.clone(),
            user_id: config.user_id.clone(),
            user_name: config.user_name.clone(),
            upload_concurrency: Some(config.upload_concurrency),
            request_timeout_secs: Some(config.request_timeout.as_secs()),
            upload_chunk_size: Some(config.upload_chunk_size),
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl AppConfig {
    /// Loads the config file and applies environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&config_path()?)?;
        config.apply_overrides(
            std::env::var(ENV_API_URL).ok(),
            std::env::var(ENV_TOKEN).ok(),
        );
        Ok(config)
    }

    /// Loads `path`. A missing or unparsable file yields defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str::<ConfigFile>(&content) {
            Ok(file) => Ok(file.into()),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    /// Environment values win over the file when set and non-empty.
    pub fn apply_overrides(&mut self, base_url: Option<String>, token: Option<String>) {
        if let Some(url) = base_url.and_then(non_empty) {
            self.base_url = url;
        }
        if let Some(token) = token.and_then(non_empty) {
            self.token = token;
        }
    }

    /// Applies `update` to the file at `path` and saves it when anything
    /// changed. Environment overrides are neither read nor written.
    pub fn update_file(path: &Path, update: ConfigUpdate) -> anyhow::Result<Self> {
        let mut config = Self::load_from(path)?;
        if update.is_empty() {
            return Ok(config);
        }
        if let Some(url) = update.base_url {
            config.base_url = url;
        }
        if let Some(token) = update.token {
            config.token = token;
        }
        if let Some(name) = update.user_name {
            config.user_name = name;
        }
        if let Some(n) = update.upload_concurrency {
            config.upload_concurrency = n.max(1);
        }
        config.save_to(path)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&ConfigFile::from(self))?;
        std::fs::write(path, json)?;
        set_permissions_0600(path);

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            base_url: self.base_url.clone(),
            request_timeout: self.request_timeout,
            upload_chunk_size: self.upload_chunk_size,
        }
    }

    /// Token with everything but the last four characters masked.
    pub fn masked_token(&self) -> String {
        let chars: Vec<char> = self.token.chars().collect();
        if chars.is_empty() {
            return "(not set)".into();
        }
        let visible: String = chars[chars.len().saturating_sub(4)..].iter().collect();
        format!("****{visible}")
    }
}

fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

/// Path of the config file.
pub fn config_path() -> anyhow::Result<PathBuf> {
    Ok(config_base_dir()?.join("filedock").join("config.json"))
}

fn config_base_dir() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA")
            .map_err(|_| anyhow::anyhow!("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata))
    }

    #[cfg(not(target_os = "windows"))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(xdg));
        }
        let home = std::env::var_os("HOME")
            .ok_or_else(|| anyhow::anyhow!("neither XDG_CONFIG_HOME nor HOME is set"))?;
        Ok(PathBuf::from(home).join(".config"))
    }
}
