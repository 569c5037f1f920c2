use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::scheduler::SchedulerConfig;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub matcher: MatcherConfig,
    pub scheduler: SchedulerSettings,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Minimum rating for a list match to be accepted.
    pub min_rating: f64,
    /// Minimum provider confidence for a search fallback suggestion.
    pub search_confidence_floor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    pub reservoir: u32,
    pub refill_interval_secs: u64,
    pub refill_amount: u32,
    pub min_gap_ms: u64,
    pub max_concurrency: usize,
    pub heavy_use_threshold: u32,
    pub cooldown_secs: u64,
}

impl SchedulerSettings {
    pub fn to_scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            reservoir: self.reservoir,
            refill_interval: Duration::from_secs(self.refill_interval_secs),
            refill_amount: self.refill_amount,
            min_gap: Duration::from_millis(self.min_gap_ms),
            max_concurrency: self.max_concurrency,
            heavy_use_threshold: self.heavy_use_threshold,
            cooldown: Duration::from_secs(self.cooldown_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Scan log ring-buffer capacity.
    pub capacity: usize,
}

impl EngineConfig {
    /// Load config: user file (if exists) over built-in defaults.
    pub fn load() -> Result<Self, EngineError> {
        let user_path = Self::config_path();
        if user_path.exists() {
            let user_str = std::fs::read_to_string(&user_path)
                .map_err(|e| EngineError::Config(e.to_string()))?;
            toml::from_str(&user_str).map_err(|e| EngineError::Config(e.to_string()))
        } else {
            toml::from_str(DEFAULT_CONFIG).map_err(|e| EngineError::Config(e.to_string()))
        }
    }

    /// Save current config to the user config file.
    pub fn save(&self) -> Result<(), EngineError> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Path to the user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", "tsumugi")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = EngineConfig::default();
        assert_eq!(config.matcher.min_rating, 0.5);
        assert_eq!(config.scheduler.reservoir, 90);
        assert_eq!(config.scheduler.heavy_use_threshold, 9);
        assert_eq!(config.log.capacity, 2048);
    }

    #[test]
    fn test_roundtrip() {
        let config = EngineConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: EngineConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.scheduler.reservoir, config.scheduler.reservoir);
        assert_eq!(deserialized.matcher.min_rating, config.matcher.min_rating);
    }

    #[test]
    fn test_scheduler_settings_conversion() {
        let settings = EngineConfig::default().scheduler;
        let config = settings.to_scheduler_config();
        assert_eq!(config.refill_interval, Duration::from_secs(60));
        assert_eq!(config.min_gap, Duration::from_millis(250));
    }
}
