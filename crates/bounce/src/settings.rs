use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::media::PlaybackMode;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("no user config directory on this platform")]
    NoConfigDir,
    #[error("settings I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not encode settings: {0}")]
    Serialize(#[source] serde_json::Error),
}

fn default_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// Playback defaults applied when a controller is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_true")]
    pub loop_playback: bool,
    #[serde(default = "default_true")]
    pub bounce_playback: bool,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            version: 1,
            loop_playback: true,
            bounce_playback: true,
        }
    }
}

impl SettingsConfig {
    pub fn config_path() -> Result<PathBuf, SettingsError> {
        let config_dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(config_dir.join("bounce").join("settings.json"))
    }

    pub fn mode(&self) -> PlaybackMode {
        PlaybackMode {
            looping: self.loop_playback,
            bouncing: self.bounce_playback,
        }
    }

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        self.loop_playback = mode.looping;
        self.bounce_playback = mode.bouncing;
    }

    /// Load from the user config dir, falling back to defaults on any error.
    pub fn load() -> Self {
        let loaded = Self::config_path().and_then(|path| Self::load_from(&path));
        match loaded {
            Ok(config) => config,
            Err(SettingsError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Self::default()
            }
            Err(e) => {
                log::warn!("Failed to load settings: {e}");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded settings from {}", path.display());
        Ok(config)
    }

    pub fn save(&self) {
        let result = Self::config_path().and_then(|path| self.save_to(&path));
        if let Err(e) = result {
            log::error!("Failed to save settings: {e}");
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source: std::io::Error| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(SettingsError::Serialize)?;
        std::fs::write(path, json).map_err(io_err)?;
        log::info!("Saved settings to {}", path.display());
        Ok(())
    }
}
