//! Configuration management for spreadsheet access, tenant defaults, and paths.

use std::{
   fs,
   path::{Path, PathBuf},
   sync::OnceLock,
};

use directories::BaseDirs;
use figment::{
   Figment,
   providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Error, Result};

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Statuses the classifier may fall back to for rows without any signal.
pub const ALLOWED_UNMATCHED_STATUSES: &[&str] = &["shortlisted", "in_process", "applied", "pending"];

/// Application configuration loaded from config file and environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
   pub database_url:            String,
   pub bind_address:            String,
   pub port:                    u16,
   pub http_timeout_ms:         u64,
   pub auto_sync_interval_secs: u64,
   pub strict_headers:          bool,

   pub google:     GoogleConfig,
   pub recruiting: SheetDefaults,
   pub insurance:  InsuranceConfig,
   pub classifier: ClassifierConfig,
}

/// Credentials and endpoints for the spreadsheet provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
   pub access_token:    Option<String>,
   pub api_key:         Option<String>,
   pub api_base_url:    String,
   pub export_base_url: String,
}

impl Default for GoogleConfig {
   fn default() -> Self {
      Self {
         access_token:    None,
         api_key:         None,
         api_base_url:    "https://sheets.googleapis.com/v4/spreadsheets".to_string(),
         export_base_url: "https://docs.google.com/spreadsheets/d".to_string(),
      }
   }
}

/// Fallback spreadsheet location for a vertical or insurance client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetDefaults {
   pub spreadsheet_id: Option<String>,
   pub tab:            String,
}

impl SheetDefaults {
   fn with_tab(tab: &str) -> Self {
      Self { spreadsheet_id: None, tab: tab.to_string() }
   }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsuranceConfig {
   pub kmg:   SheetDefaults,
   pub joban: SheetDefaults,
}

impl Default for InsuranceConfig {
   fn default() -> Self {
      Self { kmg: SheetDefaults::with_tab("updating_input"), joban: SheetDefaults::with_tab("Sheet1") }
   }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
   pub unmatched_status: String,
}

impl Default for ClassifierConfig {
   fn default() -> Self {
      Self { unmatched_status: "shortlisted".to_string() }
   }
}

impl Default for Config {
   fn default() -> Self {
      Self {
         database_url:            format!("sqlite://{}", data_dir().join("sheetsync.db").display()),
         bind_address:            "127.0.0.1".to_string(),
         port:                    5000,
         http_timeout_ms:         10_000,
         auto_sync_interval_secs: 0,
         strict_headers:          true,
         google:                  GoogleConfig::default(),
         recruiting:              SheetDefaults::with_tab("output"),
         insurance:               InsuranceConfig::default(),
         classifier:              ClassifierConfig::default(),
      }
   }
}

impl Config {
   pub fn load() -> Result<Self> {
      Self::load_or_default(&ensure_global_config())
   }

   /// Like [`Config::load_from`], but an unreadable or unparseable file falls
   /// back to defaults. Values that parse but fail validation are an error.
   pub fn load_or_default(path: &Path) -> Result<Self> {
      match Self::load_from(path) {
         Err(Error::Config(ConfigError::Load(e))) => {
            tracing::warn!("failed to parse config, using defaults: {e}");
            Ok(Self::default())
         },
         other => other,
      }
   }

   /// Layers defaults, the TOML file at `path`, and `SHEETSYNC_*` env vars.
   pub fn load_from(path: &Path) -> Result<Self> {
      let cfg: Self = Figment::from(Serialized::defaults(Self::default()))
         .merge(Toml::file(path))
         .merge(Env::prefixed("SHEETSYNC_").split("__").lowercase(true))
         .extract()
         .map_err(|e| ConfigError::Load(Box::new(e)))?;
      cfg.validate()?;
      Ok(cfg)
   }

   fn create_default_config(path: &Path) {
      if let Some(parent) = path.parent() {
         let _ = fs::create_dir_all(parent);
      }
      let default_config = Self::default();
      if let Ok(toml) = toml::to_string_pretty(&default_config) {
         let _ = fs::write(path, toml);
      }
   }

   pub fn validate(&self) -> Result<()> {
      let tabs = [
         ("recruiting.tab", &self.recruiting.tab),
         ("insurance.kmg.tab", &self.insurance.kmg.tab),
         ("insurance.joban.tab", &self.insurance.joban.tab),
      ];
      for (key, tab) in tabs {
         if tab.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("{key} must not be empty")).into());
         }
      }
      let status = self.classifier.unmatched_status.as_str();
      if !ALLOWED_UNMATCHED_STATUSES.contains(&status) {
         return Err(
            ConfigError::Invalid(format!(
               "classifier.unmatched_status '{status}' is not one of {ALLOWED_UNMATCHED_STATUSES:?}"
            ))
            .into(),
         );
      }
      Ok(())
   }

   pub const fn http_timeout(&self) -> std::time::Duration {
      std::time::Duration::from_millis(self.http_timeout_ms)
   }

   pub fn listen_address(&self) -> String {
      format!("{}:{}", self.bind_address, self.port)
   }
}

/// Returns the global configuration instance, loading it on first use.
pub fn get() -> Result<&'static Config> {
   if let Some(cfg) = CONFIG.get() {
      return Ok(cfg);
   }
   let cfg = Config::load()?;
   Ok(CONFIG.get_or_init(|| cfg))
}

/// Returns the base directory for sheetsync data and configuration
pub fn base_dir() -> &'static PathBuf {
   static ONCE: OnceLock<PathBuf> = OnceLock::new();
   ONCE.get_or_init(|| resolve_base_dir(".sheetsync"))
}

fn ensure_global_config() -> PathBuf {
   let config_path = config_file_path();
   if !config_path.exists() {
      Config::create_default_config(config_path);
   }
   config_path.to_path_buf()
}

fn resolve_base_dir(dir_name: &str) -> PathBuf {
   BaseDirs::new()
      .map(|d| d.home_dir().join(dir_name))
      .or_else(|| {
         std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join(dir_name))
      })
      .unwrap_or_else(|| {
         std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(dir_name)
      })
}

macro_rules! define_paths {
   ($($fn_name:ident: $path:literal),* $(,)?) => {
      $(
         pub fn $fn_name() -> &'static PathBuf {
            static ONCE: OnceLock<PathBuf> = OnceLock::new();
            ONCE.get_or_init(|| base_dir().join($path))
         }
      )*
   };
}

define_paths! {
   config_file_path: "config.toml",
   data_dir: "data",
}
