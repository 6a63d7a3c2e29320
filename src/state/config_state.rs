use crate::error::{AppError, Result};
use crate::utils::download_utils::DEFAULT_CONCURRENT_DOWNLOADS;
use crate::utils::path_utils;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;

fn default_concurrent_downloads() -> usize {
    DEFAULT_CONCURRENT_DOWNLOADS
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    pub min_memory: u32,
    pub max_memory: u32,
    pub global_java_path: Option<String>,
    pub global_java_args: String,
    #[serde(default)]
    pub skip_java_check: bool,
    #[serde(default)]
    pub close_on_launch: bool,
    #[serde(default = "crate::state::config_state::default_keep_logs_open")]
    pub keep_logs_open: bool,
    #[serde(default = "default_concurrent_downloads")]
    pub concurrent_downloads: usize,
}

pub fn default_keep_logs_open() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_memory: 512,
            max_memory: 2048,
            global_java_path: None,
            global_java_args: "-XX:+UseG1GC -Dsun.stdout.encoding=UTF-8".to_string(),
            skip_java_check: false,
            close_on_launch: false,
            keep_logs_open: true,
            concurrent_downloads: DEFAULT_CONCURRENT_DOWNLOADS,
        }
    }
}

pub struct SettingsManager {
    settings: RwLock<Settings>,
    path: PathBuf,
}

impl SettingsManager {
    pub fn new() -> Result<Self> {
        let path = path_utils::settings_path();
        let settings = if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match serde_json::from_str(&text) {
                    Ok(settings) => settings,
                    Err(e) => {
                        warn!("settings.json unreadable ({}), using defaults", e);
                        Settings::default()
                    }
                },
                Err(e) => {
                    warn!("Failed to read settings.json ({}), using defaults", e);
                    Settings::default()
                }
            }
        } else {
            Settings::default()
        };

        info!("Settings loaded from {:?}", path);
        Ok(Self {
            settings: RwLock::new(settings),
            path,
        })
    }

    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    pub async fn set(&self, new_settings: Settings) -> Result<()> {
        if new_settings.min_memory > new_settings.max_memory {
            return Err(AppError::Config(format!(
                "min_memory ({}) exceeds max_memory ({})",
                new_settings.min_memory, new_settings.max_memory
            )));
        }

        path_utils::atomic_write_json(&self.path, &new_settings).await?;
        *self.settings.write().await = new_settings;
        Ok(())
    }
}
