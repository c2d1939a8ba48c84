//! Camera access.
//!
//! A [`Camera`] is an exclusively owned device that is opened for one scan or
//! capture and released afterwards. [`CameraGuard`] ties the release to scope,
//! so the device is handed back on every exit path, including early returns
//! and errors in the middle of a read loop.

mod frames;
#[cfg(feature = "openpnp")]
mod openpnp;

use std::fmt::Debug;

use image::DynamicImage;
use tracing::debug;

use crate::config::CameraConfig;
use crate::error::{Error, Result};

pub use frames::FrameDirectory;
#[cfg(feature = "openpnp")]
pub use openpnp::OpenPnpCamera;

/// A source of camera frames.
///
/// Implementations must tolerate repeated `open`/`release` cycles, and
/// `release` must be safe to call on a camera that is not open.
pub trait Camera: Debug {
    /// Name of the device, for logs and error messages.
    fn name(&self) -> &str;

    /// Acquire the device.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceUnavailable`] if the device cannot be opened.
    fn open(&mut self) -> Result<()>;

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` when the device has no frame to give.
    ///
    /// # Errors
    ///
    /// Returns an error if the device fails while reading.
    fn read(&mut self) -> Result<Option<DynamicImage>>;

    /// Hand the device back.
    fn release(&mut self);

    /// Whether the device is currently acquired.
    fn is_open(&self) -> bool;
}

impl<C: Camera + ?Sized> Camera for Box<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn read(&mut self) -> Result<Option<DynamicImage>> {
        (**self).read()
    }

    fn release(&mut self) {
        (**self).release();
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

/// An open camera, released when dropped.
#[derive(Debug)]
pub struct CameraGuard<'a, C: Camera + ?Sized> {
    camera: &'a mut C,
}

impl<'a, C: Camera + ?Sized> CameraGuard<'a, C> {
    /// Open `camera` for the lifetime of the guard.
    ///
    /// # Errors
    ///
    /// Returns the camera's open error. The camera is released before
    /// returning so a half-opened device is not leaked.
    pub fn open(camera: &'a mut C) -> Result<Self> {
        if let Err(e) = camera.open() {
            camera.release();
            return Err(e);
        }
        debug!(camera = camera.name(), "Camera opened");
        Ok(Self { camera })
    }

    /// Read the next frame from the open camera.
    ///
    /// # Errors
    ///
    /// Returns an error if the device fails while reading.
    pub fn read(&mut self) -> Result<Option<DynamicImage>> {
        self.camera.read()
    }
}

impl<C: Camera + ?Sized> Drop for CameraGuard<'_, C> {
    fn drop(&mut self) {
        self.camera.release();
        debug!(camera = self.camera.name(), "Camera released");
    }
}

/// A camera that can never be opened.
///
/// Used when the binary was built without a hardware backend and no frame
/// directory is configured.
#[derive(Debug, Clone)]
pub struct Unavailable {
    reason: String,
}

impl Unavailable {
    /// Create a camera whose `open` fails with `reason`.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Camera for Unavailable {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn open(&mut self) -> Result<()> {
        Err(Error::device_unavailable(self.name(), self.reason.clone()))
    }

    fn read(&mut self) -> Result<Option<DynamicImage>> {
        Err(Error::camera_read("camera is not open"))
    }

    fn release(&mut self) {}

    fn is_open(&self) -> bool {
        false
    }
}

/// The camera described by the configuration.
///
/// A configured frame directory wins over hardware.
#[must_use]
pub fn open_default(config: &CameraConfig) -> Box<dyn Camera> {
    if let Some(dir) = &config.frames_dir {
        return Box::new(FrameDirectory::new(dir));
    }
    hardware_camera(config.device_index)
}

#[cfg(feature = "openpnp")]
fn hardware_camera(device_index: usize) -> Box<dyn Camera> {
    Box::new(OpenPnpCamera::new(device_index))
}

#[cfg(not(feature = "openpnp"))]
fn hardware_camera(device_index: usize) -> Box<dyn Camera> {
    Box::new(Unavailable::new(format!(
        "no camera backend for device {device_index}; rebuild with the `openpnp` feature or set camera.frames_dir"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCamera;

    #[test]
    fn test_guard_releases_on_drop() {
        let mut camera = ScriptedCamera::new(vec![]);
        {
            let _guard = CameraGuard::open(&mut camera).unwrap();
        }
        assert_eq!(camera.opens, 1);
        assert_eq!(camera.releases, 1);
        assert!(!camera.is_open());
    }

    #[test]
    fn test_guard_releases_after_failed_open() {
        let mut camera = ScriptedCamera::failing_open();
        assert!(matches!(
            CameraGuard::open(&mut camera),
            Err(Error::DeviceUnavailable { .. })
        ));
        assert_eq!(camera.releases, 1);
        assert_eq!(camera.opens, 0);
    }

    #[test]
    fn test_guard_releases_on_read_error() {
        fn read_all(camera: &mut ScriptedCamera) -> Result<usize> {
            let mut guard = CameraGuard::open(camera)?;
            let mut count = 0;
            while guard.read()?.is_some() {
                count += 1;
            }
            Ok(count)
        }

        let mut camera = ScriptedCamera::new(vec![crate::testing::blank_frame()]).with_read_error();
        assert!(read_all(&mut camera).is_err());
        assert_eq!(camera.releases, 1);
    }

    #[test]
    fn test_repeated_open_release_cycles() {
        let mut camera = ScriptedCamera::new(vec![]);
        for _ in 0..3 {
            let _guard = CameraGuard::open(&mut camera).unwrap();
        }
        assert_eq!(camera.opens, 3);
        assert_eq!(camera.releases, 3);
    }

    #[test]
    fn test_unavailable_camera() {
        let mut camera = Unavailable::new("no backend");
        let err = CameraGuard::open(&mut camera).unwrap_err();
        assert!(err.to_string().contains("no backend"));
        assert!(!camera.is_open());
    }

    #[test]
    fn test_open_default_prefers_frames_dir() {
        let config = CameraConfig {
            frames_dir: Some(std::path::PathBuf::from("frames")),
            ..CameraConfig::default()
        };
        assert_eq!(open_default(&config).name(), "frames");
    }

    #[cfg(not(feature = "openpnp"))]
    #[test]
    fn test_open_default_without_backend() {
        let mut camera = open_default(&CameraConfig::default());
        assert!(matches!(
            camera.open(),
            Err(Error::DeviceUnavailable { .. })
        ));
    }
}
