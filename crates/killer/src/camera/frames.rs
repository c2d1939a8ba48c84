//! Camera backed by a directory of still images.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use tracing::{debug, trace};

use super::Camera;
use crate::error::{Error, Result};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Replays the images of a directory, in file name order, as camera frames.
///
/// The read position survives `release`, so a later capture continues with
/// the next image the way a live camera would keep streaming. Opening a
/// directory whose images were all read starts over from the first one.
#[derive(Debug, Clone)]
pub struct FrameDirectory {
    directory: PathBuf,
    files: Vec<PathBuf>,
    position: usize,
    open: bool,
}

impl FrameDirectory {
    /// Create a camera over `directory`. The directory is listed on `open`.
    #[must_use]
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            files: Vec::new(),
            position: 0,
            open: false,
        }
    }

    fn list_images(&self) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.directory)
            .map_err(|e| Error::device_unavailable(self.name(), e.to_string()))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
            if is_image {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl Camera for FrameDirectory {
    fn name(&self) -> &str {
        "frames"
    }

    fn open(&mut self) -> Result<()> {
        let files = self.list_images()?;
        if files.is_empty() {
            return Err(Error::device_unavailable(
                self.name(),
                format!("no images in {}", self.directory.display()),
            ));
        }

        if files != self.files || self.position >= files.len() {
            self.position = 0;
        }
        debug!(
            directory = %self.directory.display(),
            frames = files.len(),
            position = self.position,
            "Opened frame directory"
        );
        self.files = files;
        self.open = true;
        Ok(())
    }

    fn read(&mut self) -> Result<Option<DynamicImage>> {
        if !self.open {
            return Err(Error::camera_read("camera is not open"));
        }
        let Some(path) = self.files.get(self.position) else {
            return Ok(None);
        };

        trace!(path = %path.display(), "Reading frame");
        // An unreadable file is a failed read, not an image-processing error.
        let frame = image::open(path).map_err(|e| {
            Error::camera_read(format!("{}: {e}", path.display()))
        })?;
        self.position += 1;
        Ok(Some(frame))
    }

    fn release(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
