//! Configuration management for killer.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::qr::{ErrorCorrection, QrOptions, MAX_BORDER, MAX_BOX_SIZE, MAX_VERSION};
use crate::session::MAX_PLAYERS;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name.
const CONFIG_DIR_NAME: &str = "killer";

/// Payload encoded by `killer generate` when none is given.
pub const DEFAULT_PAYLOAD: &str = "Hello, this is a QR code example!";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `KILLER_`)
/// 2. TOML config file at `~/.config/killer/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Game session configuration.
    pub session: SessionConfig,
    /// Camera configuration.
    pub camera: CameraConfig,
    /// Registration output configuration.
    pub registry: RegistryConfig,
    /// QR code generation configuration.
    pub qr: QrConfig,
}

/// Game session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Number of players in a session.
    pub players: usize,
    /// JSON file mapping tokens to player names.
    pub roster_path: Option<PathBuf>,
}

/// Camera configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Index of the hardware camera to open.
    pub device_index: usize,
    /// Delay between two frame reads in milliseconds.
    pub frame_interval_ms: u64,
    /// Replay the images of this directory instead of using hardware.
    pub frames_dir: Option<PathBuf>,
}

/// Registration output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Directory that receives `<identifier>_photo.png` files.
    pub photo_dir: PathBuf,
}

/// QR code generation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrConfig {
    /// Text or URL to encode.
    pub payload: String,
    /// Requested symbol version; `None` picks the smallest that fits.
    pub version: Option<i16>,
    /// Grow past `version` when the payload does not fit.
    pub fit: bool,
    /// Error correction level.
    pub error_correction: ErrorCorrection,
    /// Pixels per module.
    pub box_size: u32,
    /// Quiet zone width in modules.
    pub border: u32,
    /// Save the generated image here. Unset means display only.
    pub output: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            players: MAX_PLAYERS,
            roster_path: None,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            frame_interval_ms: 33,
            frames_dir: None,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            photo_dir: PathBuf::from("."),
        }
    }
}

impl Default for QrConfig {
    fn default() -> Self {
        let options = QrOptions::default();
        Self {
            payload: DEFAULT_PAYLOAD.to_string(),
            version: options.version,
            fit: options.fit,
            error_correction: options.error_correction,
            box_size: options.box_size,
            border: options.border,
            output: None,
        }
    }
}

impl QrConfig {
    /// The encoding parameters of this configuration.
    #[must_use]
    pub fn options(&self) -> QrOptions {
        QrOptions {
            version: self.version,
            fit: self.fit,
            error_correction: self.error_correction,
            box_size: self.box_size,
            border: self.border,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `KILLER_`, sections separated
    ///    by a double underscore, e.g. `KILLER_CAMERA__DEVICE_INDEX=1`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config = Self::read_from(config_path)?;
        config.validate()?;
        Ok(config)
    }

    /// Merge all sources like [`Config::load_from`] without validating the
    /// result, so `config show` can display a file that `validate` rejects.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed.
    pub fn read_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("KILLER_").split("__"));

        Ok(figment.extract()?)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.session.players > MAX_PLAYERS {
            return Err(Error::ConfigValidation {
                message: format!(
                    "session.players ({}) cannot be greater than {MAX_PLAYERS}",
                    self.session.players
                ),
            });
        }

        if self.camera.frame_interval_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "frame_interval_ms must be greater than 0".to_string(),
            });
        }

        if !(1..=MAX_BOX_SIZE).contains(&self.qr.box_size) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "box_size must be between 1 and {MAX_BOX_SIZE}, got {}",
                    self.qr.box_size
                ),
            });
        }

        if self.qr.border > MAX_BORDER {
            return Err(Error::ConfigValidation {
                message: format!(
                    "border cannot be greater than {MAX_BORDER}, got {}",
                    self.qr.border
                ),
            });
        }

        if let Some(version) = self.qr.version {
            if !(1..=MAX_VERSION).contains(&version) {
                return Err(Error::ConfigValidation {
                    message: format!("version must be between 1 and {MAX_VERSION}, got {version}"),
                });
            }
        }

        Ok(())
    }

    /// Get the frame interval as a Duration.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.camera.frame_interval_ms)
    }
}
