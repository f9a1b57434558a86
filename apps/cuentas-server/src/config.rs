//! # Server Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CUENTAS_PORT=8000                                                  │
//! │     CUENTAS_STORE=sqlite                                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $CUENTAS_CONFIG, or                                                │
//! │     ~/.config/cuentas-de-cobro/cuentas.toml (Linux)                    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     127.0.0.1:8000, counter.json in ./data, weasyprint                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # cuentas.toml
//! [server]
//! bind = "0.0.0.0"
//! port = 8000
//!
//! [storage]
//! backend = "json"   # json | sqlite
//! data_dir = "/var/lib/cuentas"
//!
//! [render]
//! templates_dir = "templates"
//! template = "factura_template.html"
//! assets_dir = "assets"
//! base_dir = "."
//! pdf_command = "weasyprint"
//! timeout_secs = 60  # 0 disables the limit
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use cuentas_store::StoreBackend;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "CUENTAS_CONFIG";

/// Config file name inside the platform config directory.
pub const CONFIG_FILE: &str = "cuentas.toml";

// =============================================================================
// Errors
// =============================================================================

/// Configuration failures. All of them stop startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    #[error("Invalid config file {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            bind: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Where the counter lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StoreBackend,
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            backend: StoreBackend::Json,
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Template and PDF engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Directory holding the invoice templates.
    pub templates_dir: PathBuf,

    /// Template file name.
    pub template: String,

    /// Static visuals referenced by the template (logo, signature).
    pub assets_dir: PathBuf,

    /// Base path the engine resolves relative references against.
    pub base_dir: PathBuf,

    /// PDF engine program.
    pub pdf_command: String,

    /// Engine time limit in seconds, 0 for none.
    pub timeout_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            templates_dir: PathBuf::from("templates"),
            template: cuentas_core::DEFAULT_TEMPLATE.to_string(),
            assets_dir: PathBuf::from("assets"),
            base_dir: PathBuf::from("."),
            pdf_command: cuentas_render::DEFAULT_PDF_PROGRAM.to_string(),
            timeout_secs: 60,
        }
    }
}

impl RenderConfig {
    /// Engine time limit, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: HttpConfig,
    pub storage: StorageConfig,
    pub render: RenderConfig,
}

impl ServerConfig {
    /// Loads configuration from file and process environment.
    pub fn load() -> ConfigResult<Self> {
        let path = std::env::var(CONFIG_ENV)
            .ok()
            .map(PathBuf::from)
            .or_else(Self::default_config_path);
        Self::load_from(path.as_deref(), |key| std::env::var(key).ok())
    }

    /// Loads configuration from an optional file and an environment lookup.
    pub fn load_from(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "Loading config from file");
                Self::from_file(path)?
            }
            Some(path) => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides(env);
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = env("CUENTAS_BIND") {
            self.server.bind = bind;
        }

        if let Some(port) = env("CUENTAS_PORT") {
            match port.parse::<u16>() {
                Ok(p) => {
                    debug!(port = p, "Overriding port from environment");
                    self.server.port = p;
                }
                Err(_) => warn!(port = %port, "Ignoring invalid CUENTAS_PORT"),
            }
        }

        if let Some(dir) = env("CUENTAS_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }

        if let Some(backend) = env("CUENTAS_STORE") {
            match backend.parse() {
                Ok(parsed) => {
                    debug!(backend = %backend, "Overriding store backend from environment");
                    self.storage.backend = parsed;
                }
                Err(e) => warn!(error = %e, "Ignoring invalid CUENTAS_STORE"),
            }
        }

        if let Some(dir) = env("CUENTAS_TEMPLATES_DIR") {
            self.render.templates_dir = PathBuf::from(dir);
        }

        if let Some(name) = env("CUENTAS_TEMPLATE") {
            self.render.template = name;
        }

        if let Some(dir) = env("CUENTAS_ASSETS_DIR") {
            self.render.assets_dir = PathBuf::from(dir);
        }

        if let Some(command) = env("CUENTAS_PDF_COMMAND") {
            self.render.pdf_command = command;
        }

        if let Some(secs) = env("CUENTAS_RENDER_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.render.timeout_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring invalid CUENTAS_RENDER_TIMEOUT_SECS"),
            }
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.bind.trim().is_empty() {
            return Err(ConfigError::Invalid("server.bind must not be empty".into()));
        }
        if self.render.template.trim().is_empty() {
            return Err(ConfigError::Invalid("render.template must not be empty".into()));
        }
        if self.render.pdf_command.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "render.pdf_command must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// `bind:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("co", "cuentas", "cuentas-de-cobro")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
