//! Camera loops: scanning for a QR code and taking a player photo.
//!
//! Both loops hold the camera through a [`CameraGuard`] and wait between
//! frames on a tokio interval raced against the operator's key presses, so
//! waiting never pins a thread.

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::DynamicImage;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::camera::{Camera, CameraGuard};
use crate::decode::decode_first;
use crate::error::{Error, Result};
use crate::operator::{Operator, OperatorKey};

/// Preview window of the scan loop.
pub const SCANNER_WINDOW: &str = "QR Code Scanner";

/// Preview window of the photo capture.
pub const PHOTO_WINDOW: &str = "Press 's' to save";

/// How a scan ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A frame contained this payload.
    Found(String),
    /// The operator cancelled.
    Cancelled,
    /// The camera stopped producing frames.
    Exhausted,
}

fn frame_ticker(frame_interval: Duration) -> tokio::time::Interval {
    let mut ticker = interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Read frames until one contains a QR code.
///
/// The first decodable frame wins; frames without a code are shown in the
/// [`SCANNER_WINDOW`] preview. The camera is released before returning.
///
/// # Errors
///
/// Returns an error if the camera cannot be opened or fails while reading,
/// or if operator input fails.
pub async fn scan_qr_code<C, O>(
    camera: &mut C,
    operator: &mut O,
    frame_interval: Duration,
) -> Result<ScanOutcome>
where
    C: Camera + ?Sized,
    O: Operator + ?Sized,
{
    let mut guard = CameraGuard::open(camera)?;
    let mut ticker = frame_ticker(frame_interval);
    let mut keys_open = true;
    let mut frames = 0u64;

    loop {
        tokio::select! {
            biased;

            key = operator.next_key(), if keys_open => match key? {
                Some(OperatorKey::Cancel) => {
                    info!(frames, "Scan cancelled by operator");
                    return Ok(ScanOutcome::Cancelled);
                }
                Some(_) => {}
                None => {
                    debug!("Operator input closed");
                    keys_open = false;
                }
            },

            _ = ticker.tick() => {
                let Some(frame) = guard.read()? else {
                    warn!(frames, "Camera stopped producing frames");
                    return Ok(ScanOutcome::Exhausted);
                };
                frames += 1;

                if let Some(payload) = decode_first(&frame) {
                    info!(frames, "QR code found");
                    return Ok(ScanOutcome::Found(payload));
                }
                operator.show_frame(SCANNER_WINDOW, &frame);
            }
        }
    }
}

/// Show a live preview and save one frame to `path` when the operator
/// presses `s`.
///
/// Any other key, or closed input, discards the photo and nothing is
/// written. Returns the path of the saved photo. The camera is released
/// before returning.
///
/// # Errors
///
/// Returns an error if the camera cannot be opened or fails while reading,
/// if operator input fails, or if the photo cannot be written.
pub async fn take_picture<C, O>(
    camera: &mut C,
    operator: &mut O,
    frame_interval: Duration,
    path: &Path,
) -> Result<Option<PathBuf>>
where
    C: Camera + ?Sized,
    O: Operator + ?Sized,
{
    let mut guard = CameraGuard::open(camera)?;
    let Some(mut latest) = guard.read()? else {
        warn!("Camera produced no frame for the photo");
        return Ok(None);
    };
    operator.show_frame(PHOTO_WINDOW, &latest);

    let mut ticker = frame_ticker(frame_interval);
    // The first tick completes immediately; the frame above stands in for it.
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;

            key = operator.next_key() => match key? {
                Some(OperatorKey::Save) => {
                    save_photo(&latest, path)?;
                    return Ok(Some(path.to_path_buf()));
                }
                Some(other) => {
                    info!(key = ?other, "Photo discarded");
                    return Ok(None);
                }
                None => {
                    info!("Operator input closed, photo discarded");
                    return Ok(None);
                }
            },

            _ = ticker.tick() => {
                // A camera that stops streaming keeps the last frame on screen.
                if let Some(frame) = guard.read()? {
                    operator.show_frame(PHOTO_WINDOW, &frame);
                    latest = frame;
                }
            }
        }
    }
}

fn save_photo(frame: &DynamicImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    frame.save_with_format(path, image::ImageFormat::Png)?;
    info!(path = %path.display(), "Photo saved");
    Ok(())
}
