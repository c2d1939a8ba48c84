//! QR code generation.
//!
//! Payloads are encoded with `qrencode` and rasterised as black modules on a
//! white background, with a configurable module size and quiet zone.

use std::path::Path;

use image::{GenericImage, GrayImage, Luma};
use qrencode::types::QrError;
use qrencode::{EcLevel, QrCode, Version};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Largest normal QR code version.
pub const MAX_VERSION: i16 = 40;

/// Largest accepted module size, in pixels.
pub const MAX_BOX_SIZE: u32 = 100;

/// Largest accepted quiet zone, in modules.
pub const MAX_BORDER: u32 = 100;

/// Largest side of a generated image, in pixels.
pub const MAX_IMAGE_SIDE: u32 = 16_384;

const WHITE: Luma<u8> = Luma([255]);

/// Error correction level of a generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCorrection {
    /// Recovers about 7% of the data.
    #[default]
    Low,
    /// Recovers about 15% of the data.
    Medium,
    /// Recovers about 25% of the data.
    Quartile,
    /// Recovers about 30% of the data.
    High,
}

impl From<ErrorCorrection> for EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::Low => EcLevel::L,
            ErrorCorrection::Medium => EcLevel::M,
            ErrorCorrection::Quartile => EcLevel::Q,
            ErrorCorrection::High => EcLevel::H,
        }
    }
}

/// Encoding parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrOptions {
    /// Requested version; `None` picks the smallest that fits.
    pub version: Option<i16>,
    /// Grow past `version` when the payload does not fit.
    pub fit: bool,
    /// Error correction level.
    pub error_correction: ErrorCorrection,
    /// Pixels per module.
    pub box_size: u32,
    /// Quiet zone width in modules.
    pub border: u32,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            version: Some(1),
            fit: true,
            error_correction: ErrorCorrection::Low,
            box_size: 10,
            border: 4,
        }
    }
}

/// Build the QR symbol for `payload`.
///
/// # Errors
///
/// Returns an error if the payload does not fit the requested version and
/// `fit` is disabled, or does not fit any version at all.
pub fn encode(payload: &str, options: &QrOptions) -> Result<QrCode> {
    let level = EcLevel::from(options.error_correction);

    let code = match options.version {
        Some(version) => {
            match QrCode::with_version(payload, Version::Normal(version), level) {
                Err(QrError::DataTooLong) if options.fit => {
                    debug!(version, "Payload does not fit, growing version");
                    QrCode::with_error_correction_level(payload, level)?
                }
                other => other?,
            }
        }
        None => QrCode::with_error_correction_level(payload, level)?,
    };

    debug!(
        version = ?code.version(),
        width = code.width(),
        "Encoded QR payload"
    );
    Ok(code)
}

/// Rasterise `payload` as a black-on-white image.
///
/// The image is `(modules + 2 * border) * box_size` pixels wide.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn generate(payload: &str, options: &QrOptions) -> Result<GrayImage> {
    let code = encode(payload, options)?;
    let margin = checked_side(code.width(), options)?;

    let symbol = code
        .render::<Luma<u8>>()
        .quiet_zone(false)
        .module_dimensions(options.box_size, options.box_size)
        .build();

    let mut image = GrayImage::from_pixel(
        symbol.width() + 2 * margin,
        symbol.height() + 2 * margin,
        WHITE,
    );
    image.copy_from(&symbol, margin, margin)?;
    Ok(image)
}

/// Check that a symbol `modules` wide fits in [`MAX_IMAGE_SIDE`] and return
/// the border width in pixels.
fn checked_side(modules: usize, options: &QrOptions) -> Result<u32> {
    let too_large = || Error::ConfigValidation {
        message: format!(
            "a {modules}-module code with box_size {} and border {} exceeds {MAX_IMAGE_SIDE} pixels",
            options.box_size, options.border
        ),
    };

    let modules = u32::try_from(modules).map_err(|_| too_large())?;
    let margin = options
        .border
        .checked_mul(options.box_size)
        .ok_or_else(too_large)?;
    let side = modules
        .checked_mul(options.box_size)
        .and_then(|symbol| margin.checked_mul(2)?.checked_add(symbol))
        .ok_or_else(too_large)?;

    if side > MAX_IMAGE_SIDE {
        return Err(too_large());
    }
    Ok(margin)
}

/// Render `payload` with block characters for display in a terminal.
///
/// Light modules are drawn as full blocks so the code reads correctly on a
/// dark terminal background.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn render_terminal(payload: &str, options: &QrOptions) -> Result<String> {
    let code = encode(payload, options)?;
    Ok(code
        .render::<char>()
        .quiet_zone(true)
        .module_dimensions(2, 1)
        .dark_color(' ')
        .light_color('█')
        .build())
}

/// Save a generated image as PNG, creating parent directories.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file written.
pub fn save_png(image: &GrayImage, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| crate::Error::DirectoryCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    image.save_with_format(path, image::ImageFormat::Png)?;
    debug!(path = %path.display(), "Saved QR image");
    Ok(())
}
