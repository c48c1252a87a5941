//! Settings persistence using TOML
//!
//! Stores settings in ~/.config/nbacktris/settings.toml (or platform equivalent)

use crate::board::{BOARD_HEIGHT, BOARD_WIDTH};
use crate::nback::{MAX_N_BACK_LEVEL, MIN_N_BACK_LEVEL};
use crate::score::DEFAULT_FALL_INTERVAL;
use crate::session::SessionConfig;
use crate::spawner::DEFAULT_MATCH_BIAS;
use crate::timer::DEFAULT_GAME_DURATION;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Largest board side accepted from a settings file
pub const MAX_BOARD_SIZE: usize = 100;
/// Smallest board side that still fits every piece
pub const MIN_BOARD_SIZE: usize = 4;

/// Game settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Gameplay settings
    pub gameplay: GameplaySettings,
    /// Board dimensions
    pub board: BoardSettings,
    /// Log output
    pub logging: LoggingSettings,
}

/// Gameplay settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplaySettings {
    /// N-back level used for the next game (1-15)
    pub n_back_level: u32,
    /// Countdown length in seconds
    pub game_duration_secs: u64,
    /// Chance (0-1) that the next piece is picked to be an n-back match
    pub match_bias: f64,
    /// Starting time between fall ticks in milliseconds
    pub initial_fall_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardSettings {
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive string
    pub filter: String,
}

impl Default for GameplaySettings {
    fn default() -> Self {
        Self {
            n_back_level: MIN_N_BACK_LEVEL,
            game_duration_secs: DEFAULT_GAME_DURATION.as_secs(),
            match_bias: DEFAULT_MATCH_BIAS,
            initial_fall_interval_ms: DEFAULT_FALL_INTERVAL.as_millis() as u64,
        }
    }
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            width: BOARD_WIDTH,
            height: BOARD_HEIGHT,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "nbacktris=debug".to_string(),
        }
    }
}

impl Settings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "nbacktris", "nbacktris")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.toml"))
    }

    /// Load settings from the default location. A missing file yields
    /// defaults; a malformed one is an error.
    pub fn load() -> Result<Self, String> {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, String> {
        match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).map_err(|e| {
                format!("Failed to parse {}: {}", path.display(), e)
            }),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<(), String> {
        let Some(path) = Self::settings_path() else {
            return Err("Could not determine settings path".to_string());
        };
        self.save_to(&path)
    }

    /// Save settings to a file, creating its directory if needed
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| format!("Failed to create config dir: {}", e))?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize: {}", e))?;

        fs::write(path, contents).map_err(|e| format!("Failed to write settings: {}", e))?;

        Ok(())
    }

    /// Engine configuration with every value brought into range
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            board_width: self.board.width.clamp(MIN_BOARD_SIZE, MAX_BOARD_SIZE),
            board_height: self.board.height.clamp(MIN_BOARD_SIZE, MAX_BOARD_SIZE),
            n_back_level: self
                .gameplay
                .n_back_level
                .clamp(MIN_N_BACK_LEVEL, MAX_N_BACK_LEVEL),
            game_duration: Duration::from_secs(self.gameplay.game_duration_secs),
            match_bias: self.gameplay.match_bias,
            initial_fall_interval: Duration::from_millis(self.gameplay.initial_fall_interval_ms.max(1)),
        }
    }

    /// Remember the difficulty the player picked for next time
    pub fn remember(&mut self, n_back_level: u32, game_duration: Duration) {
        self.gameplay.n_back_level = n_back_level;
        self.gameplay.game_duration_secs = game_duration.as_secs();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("nbacktris-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_defaults_match_engine() {
        let config = Settings::default().session_config();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let settings: Settings = toml::from_str("[gameplay]\nn_back_level = 4\n").unwrap();
        assert_eq!(settings.gameplay.n_back_level, 4);
        assert_eq!(settings.gameplay.game_duration_secs, 60);
        assert_eq!(settings.board, BoardSettings::default());
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let mut settings = Settings::default();
        settings.gameplay.n_back_level = 40;
        settings.gameplay.initial_fall_interval_ms = 0;
        settings.board.width = usize::MAX;
        settings.board.height = 1;
        let config = settings.session_config();
        assert_eq!(config.n_back_level, MAX_N_BACK_LEVEL);
        assert_eq!(config.initial_fall_interval, Duration::from_millis(1));
        assert_eq!(config.board_width, MAX_BOARD_SIZE);
        assert_eq!(config.board_height, MIN_BOARD_SIZE);
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("roundtrip/settings.toml");
        let mut settings = Settings::default();
        settings.remember(3, Duration::from_secs(90));
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = temp_path("broken/settings.toml");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "gameplay = [not toml").unwrap();
        let err = Settings::load_from(&path).unwrap_err();
        assert!(err.contains("Failed to parse"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_falls_back() {
        assert_eq!(Settings::load_from(&temp_path("nope/settings.toml")), Ok(Settings::default()));
    }
}
