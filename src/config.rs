//! User configuration for drumfill
//!
//! Stored as YAML in the user's config directory.
//! Default location: ~/.config/drumfill/config.yaml

use crate::error::Result;
use crate::instrument::{DrumKit, Timbre};
use crate::sequencer::playback::{PlayMode, DEFAULT_BPM};
use crate::sequencer::MIN_SIZE;
use crate::session::EntryMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrumfillConfig {
    pub grid: GridConfig,
    pub playback: PlaybackConfig,
    pub sound: SoundConfig,
    /// What a cell click does at startup
    pub entry_mode: EntryMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Side length at startup, clamped to 8..=16
    pub size: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { size: MIN_SIZE }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub bpm: u32,
    pub mode: PlayMode,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            mode: PlayMode::Grid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    pub timbre: Timbre,
    pub kit: DrumKit,
    /// Open the default audio output device
    pub audio_enabled: bool,
    /// MIDI output port name substring (case-insensitive), connected at startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub midi_port: Option<String>,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            timbre: Timbre::Sine,
            kit: DrumKit::Acoustic,
            audio_enabled: true,
            midi_port: None,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("drumfill")
        .join("config.yaml")
}

/// Load configuration, falling back to defaults when the file is missing or
/// does not parse.
pub fn load_config(path: &Path) -> DrumfillConfig {
    log::info!("load_config: Loading from {:?}", path);

    if !path.exists() {
        log::info!("load_config: Config file doesn't exist, using defaults");
        return DrumfillConfig::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<DrumfillConfig>(&contents) {
            Ok(config) => {
                log::info!(
                    "load_config: {}x{} grid, {} bpm, {:?} mode",
                    config.grid.size,
                    config.grid.size,
                    config.playback.bpm,
                    config.playback.mode
                );
                config
            }
            Err(e) => {
                log::warn!("load_config: Failed to parse config: {}, using defaults", e);
                DrumfillConfig::default()
            }
        },
        Err(e) => {
            log::warn!("load_config: Failed to read config: {}, using defaults", e);
            DrumfillConfig::default()
        }
    }
}

pub fn save_config(config: &DrumfillConfig, path: &Path) -> Result<()> {
    log::info!("save_config: Saving to {:?}", path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(path, yaml)?;
    Ok(())
}
