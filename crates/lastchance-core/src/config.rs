//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use lastchance_vitality::VitalityPolicy;

use crate::theme::Theme;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file
    pub database_path: PathBuf,
    /// Parent directory for asset cache generations
    pub cache_dir: PathBuf,
    /// Base URL the app shell is served from
    pub shell_base_url: String,
    /// Asset cache generation name; bump to force a full re-fetch
    pub cache_generation: String,
    /// Theme used when no preference has been stored
    pub default_theme: Theme,
    /// Shrinks the death threshold so the death rule can be tested by hand
    pub dev_mode: bool,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: data_dir.join("lastchance.db"),
            cache_dir: data_dir.join("cache"),
            shell_base_url: "https://lastchance.app/".to_string(),
            cache_generation: "lastchance-v2".to_string(),
            default_theme: Theme::Light,
            dev_mode: false,
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("LastChance"))
            .unwrap_or_else(|| PathBuf::from(".lastchance"))
    }

    pub fn policy(&self) -> VitalityPolicy {
        if self.dev_mode {
            VitalityPolicy::dev()
        } else {
            VitalityPolicy::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

// Simple dirs implementation for the platform data directory
mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_mode_picks_dev_policy() {
        let mut config = Config::new(PathBuf::from("/tmp/lastchance"));
        assert_eq!(config.policy().death_threshold, chrono::Duration::hours(48));

        config.dev_mode = true;
        assert_eq!(config.policy().death_threshold, chrono::Duration::seconds(60));
    }
}
