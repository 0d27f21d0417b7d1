use crate::app_dirs::AppDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// rotations in one full stroke, used for the paddle phase
    pub max_rotations: u32,
    pub rotation_increment: f64,
    /// world units moved per unit of distance
    pub rotation_scale: f64,
    pub speed_multiplier: f64,
    pub speed_window: usize,
    pub initial_speed: f64,
    pub finish_distance: f64,
    pub ghosts_enabled: bool,
    pub tick_rate_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_rotations: 7,
            rotation_increment: 0.1,
            rotation_scale: 100.0,
            speed_multiplier: 1.0,
            speed_window: 5,
            initial_speed: 4.0,
            finish_distance: 1.0,
            ghosts_enabled: true,
            tick_rate_ms: 100,
        }
    }
}

impl Config {
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }
}

/// Constants a single stroke decoder runs with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecoderConfig {
    pub max_rotations: u32,
    pub rotation_increment: f64,
    pub rotation_scale: f64,
    pub speed_multiplier: f64,
    pub speed_window: usize,
    pub initial_speed: f64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        (&Config::default()).into()
    }
}

impl From<&Config> for DecoderConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            max_rotations: cfg.max_rotations.max(1),
            rotation_increment: cfg.rotation_increment,
            rotation_scale: cfg.rotation_scale,
            speed_multiplier: cfg.speed_multiplier,
            speed_window: cfg.speed_window.max(1),
            initial_speed: cfg.initial_speed,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path().unwrap_or_else(|| PathBuf::from("rownin_config.json")),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => tracing::warn!("ignoring invalid config {}: {}", self.path.display(), e),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
