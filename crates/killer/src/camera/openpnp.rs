//! Hardware camera through `openpnp_capture`.

use image::{DynamicImage, RgbImage};
use openpnp_capture::{Device, Stream};
use tracing::{debug, warn};

use super::Camera;
use crate::error::{Error, Result};

/// A USB/built-in camera, selected by its enumeration index.
#[derive(Debug)]
pub struct OpenPnpCamera {
    index: usize,
    stream: Option<Stream>,
}

impl OpenPnpCamera {
    /// Create a camera for the device at `index` (0 is the default device).
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self {
            index,
            stream: None,
        }
    }

    fn unavailable(&self, message: impl Into<String>) -> Error {
        Error::device_unavailable(format!("camera{}", self.index), message)
    }
}

impl Camera for OpenPnpCamera {
    fn name(&self) -> &str {
        "openpnp"
    }

    fn open(&mut self) -> Result<()> {
        if self.stream.is_some() {
            warn!(index = self.index, "Camera already open");
            return Ok(());
        }

        let devices = Device::enumerate();
        let id = devices
            .get(self.index)
            .copied()
            .ok_or_else(|| self.unavailable(format!("{} devices found", devices.len())))?;
        let device = Device::new(id).ok_or_else(|| self.unavailable("failed to open device"))?;
        let format = device
            .formats()
            .into_iter()
            .next()
            .ok_or_else(|| self.unavailable("device reports no formats"))?;
        let stream =
            Stream::new(&device, &format).ok_or_else(|| self.unavailable("failed to create stream"))?;

        debug!(
            index = self.index,
            width = format.width,
            height = format.height,
            "Camera stream started"
        );
        self.stream = Some(stream);
        Ok(())
    }

    fn read(&mut self) -> Result<Option<DynamicImage>> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| Error::camera_read("camera is not open"))?;

        let format = stream.format();
        // RGB24 frames.
        let mut buffer = vec![0u8; format.width as usize * format.height as usize * 3];
        stream.advance();
        if stream.read(&mut buffer).is_err() {
            return Ok(None);
        }

        let frame = RgbImage::from_raw(format.width, format.height, buffer)
            .ok_or_else(|| Error::camera_read("frame size does not match stream format"))?;
        Ok(Some(DynamicImage::ImageRgb8(frame)))
    }

    fn release(&mut self) {
        // Dropping the stream stops capture and frees the device.
        self.stream = None;
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}
