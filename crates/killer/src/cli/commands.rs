//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::qr::{ErrorCorrection, MAX_BORDER, MAX_BOX_SIZE};

/// Register command arguments.
#[derive(Debug, Args)]
pub struct RegisterCommand {
    /// Replay the images in this directory instead of using the camera
    #[arg(long, value_name = "DIR")]
    pub frames: Option<PathBuf>,
}

/// Generate command arguments.
///
/// Options left out fall back to the `[qr]` section of the configuration.
#[derive(Debug, Args)]
pub struct GenerateCommand {
    /// Text or URL to encode
    pub payload: Option<String>,

    /// Also save the code as a PNG file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Pixels per module in the saved image (1-100)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_BOX_SIZE)))]
    pub box_size: Option<u32>,

    /// Quiet zone width in modules (0-100)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_BORDER)))]
    pub border: Option<u32>,

    /// Smallest QR version to use (1-40)
    #[arg(long, value_parser = clap::value_parser!(i16).range(1..=40))]
    pub qr_version: Option<i16>,

    /// Error correction level
    #[arg(short, long, value_enum)]
    pub error_correction: Option<ErrorCorrectionArg>,

    /// Fail instead of growing past the requested version
    #[arg(long)]
    pub no_fit: bool,
}

/// Session command arguments.
#[derive(Debug, Args)]
pub struct SessionCommand {
    /// JSON file mapping tokens to player names
    #[arg(short, long, value_name = "FILE")]
    pub roster: Option<PathBuf>,

    /// Number of players (at most 4)
    #[arg(short, long)]
    pub players: Option<usize>,

    /// Replay the images in this directory instead of using the camera
    #[arg(long, value_name = "DIR")]
    pub frames: Option<PathBuf>,

    /// Print the registered players as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Error correction level argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ErrorCorrectionArg {
    /// About 7% recovery
    Low,
    /// About 15% recovery
    Medium,
    /// About 25% recovery
    Quartile,
    /// About 30% recovery
    High,
}

impl From<ErrorCorrectionArg> for ErrorCorrection {
    fn from(arg: ErrorCorrectionArg) -> Self {
        match arg {
            ErrorCorrectionArg::Low => Self::Low,
            ErrorCorrectionArg::Medium => Self::Medium,
            ErrorCorrectionArg::Quartile => Self::Quartile,
            ErrorCorrectionArg::High => Self::High,
        }
    }
}

impl GenerateCommand {
    /// Apply the command line overrides to the configured QR settings.
    pub fn apply_to(&self, qr: &mut crate::config::QrConfig) {
        if let Some(payload) = &self.payload {
            qr.payload.clone_from(payload);
        }
        if let Some(output) = &self.output {
            qr.output = Some(output.clone());
        }
        if let Some(box_size) = self.box_size {
            qr.box_size = box_size;
        }
        if let Some(border) = self.border {
            qr.border = border;
        }
        if let Some(version) = self.qr_version {
            qr.version = Some(version);
        }
        if let Some(level) = self.error_correction {
            qr.error_correction = level.into();
        }
        if self.no_fit {
            qr.fit = false;
        }
    }
}
