use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{BudgetError, Budgets};

const APP_NAME: &str = "weekplan";
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_STORE_URL: &str = "http://localhost:17020/api/v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Hours of sleep reserved every day.
    pub sleep_hours: f64,
    /// Hours of meals reserved every day.
    pub meal_hours: f64,
    /// Base URL of the store API, including the `/api/v1` prefix.
    pub store_url: String,
    /// Bearer token sent with every store request.
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    /// Extra attempts for idempotent reads. Writes are never retried.
    pub read_retries: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        let budgets = Budgets::default();
        Self {
            sleep_hours: budgets.sleep_hours,
            meal_hours: budgets.meal_hours,
            store_url: DEFAULT_STORE_URL.to_string(),
            api_key: None,
            request_timeout_secs: 10,
            read_retries: 2,
        }
    }
}

impl PlannerConfig {
    /// Load configuration from the user's config directory, then apply
    /// environment overrides.
    /// Falls back to defaults if the file doesn't exist or fails to parse.
    pub fn load() -> Self {
        let mut config = match get_config_path().and_then(|path| Self::try_load_from(&path)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        config.apply_env();
        config
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn try_load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;

        let config = serde_json::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save to the user's config directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Override store settings from `WEEKPLAN_URL` and `WEEKPLAN_API_KEY`.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("WEEKPLAN_URL").ok(),
            std::env::var("WEEKPLAN_API_KEY").ok(),
        );
    }

    fn apply_overrides(&mut self, url: Option<String>, api_key: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.store_url = url;
        }
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
    }

    pub fn budgets(&self) -> std::result::Result<Budgets, BudgetError> {
        Budgets::new(self.sleep_hours, self.meal_hours)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}
