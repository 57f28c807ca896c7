//! Portal configuration loading from `portal.toml`.
//!
//! Every key has a default, so a missing file is not an error. After the file is read, a few
//! deployment-specific values can be overridden from the environment (`DATABASE_URL`,
//! `PORTAL_BIND_ADDR`, `PORTAL_INVOICE_DIR`), which `main` populates from `.env` first.

use crate::{
    core::paging::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageLimits},
    errors::{Error, Result},
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_VAR: &str = "PORTAL_CONFIG";

/// Config file read when [`CONFIG_PATH_VAR`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "portal.toml";

/// Configuration for the whole portal
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Address the HTTP server listens on
    pub bind_addr: String,
    /// sea-orm connection string
    pub database_url: String,
    /// Directory invoice documents are written to
    pub invoice_dir: PathBuf,
    /// Page size used when a listing request gives none
    pub default_page_size: u64,
    /// Largest page size a listing will return
    pub max_page_size: u64,
    /// Treat `Success` and `Failed` payments as final
    pub strict_payment_transitions: bool,
    /// Fee categories created at startup when missing
    pub fee_categories: Vec<CatalogEntry>,
    /// Payment methods created at startup when missing
    pub payment_methods: Vec<CatalogEntry>,
}

/// A named catalog row to seed (fee category or payment method)
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Unique display name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            database_url: "sqlite://data/portal.sqlite?mode=rwc".to_string(),
            invoice_dir: PathBuf::from("data/invoices"),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            strict_payment_transitions: false,
            fee_categories: Vec::new(),
            payment_methods: Vec::new(),
        }
    }
}

impl PortalConfig {
    /// Paging limits for listing endpoints.
    ///
    /// A zero `default_page_size` falls back to the built-in default, and the default never
    /// exceeds the maximum.
    #[must_use]
    pub fn page_limits(&self) -> PageLimits {
        let max_size = self.max_page_size.max(1);
        let default_size = if self.default_page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.default_page_size
        };
        PageLimits {
            default_size: default_size.min(max_size),
            max_size,
        }
    }

    /// Replaces values for which `lookup` returns a non-empty override.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = get("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(addr) = get("PORTAL_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(dir) = get("PORTAL_INVOICE_DIR") {
            self.invoice_dir = PathBuf::from(dir);
        }
    }
}

/// Parses configuration from TOML text.
///
/// # Errors
/// Returns [`Error::Config`] if the TOML is malformed or a key has the wrong type.
pub fn parse_config(contents: &str) -> Result<PortalConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse portal config: {e}"),
    })
}

/// Loads configuration from a TOML file, falling back to defaults when it does not exist.
///
/// Environment overrides are not applied; see [`load_from_env`].
///
/// # Errors
/// Returns [`Error::Config`] if the file exists but cannot be read or parsed.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PortalConfig> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "No config file, using defaults");
            Ok(PortalConfig::default())
        }
        Err(e) => Err(Error::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        }),
    }
}

/// Loads configuration from `$PORTAL_CONFIG` (or `portal.toml`) and applies environment
/// overrides.
pub fn load_from_env() -> Result<PortalConfig> {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = load_config(&path)?;
    config.apply_overrides(|key| std::env::var(key).ok());
    Ok(config)
}
