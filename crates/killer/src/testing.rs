//! Scripted camera and operator for unit tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use image::{DynamicImage, GenericImage, GrayImage, Luma};

use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::operator::{Operator, OperatorKey, RegistrationForm};
use crate::qr::{generate, QrOptions};

/// A white frame with nothing to decode.
pub fn blank_frame() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(320, 240, Luma([255])))
}

/// A camera-sized frame showing a QR code for `payload`.
pub fn qr_frame(payload: &str) -> DynamicImage {
    let options = QrOptions {
        box_size: 4,
        ..QrOptions::default()
    };
    let code = generate(payload, &options).unwrap();
    let mut frame = GrayImage::from_pixel(code.width() + 40, code.height() + 40, Luma([255]));
    frame.copy_from(&code, 20, 20).unwrap();
    DynamicImage::ImageLuma8(frame)
}

/// Camera that plays back a fixed list of frames and counts device use.
#[derive(Debug, Default)]
pub struct ScriptedCamera {
    frames: VecDeque<DynamicImage>,
    fail_open: bool,
    read_error: bool,
    open: bool,
    pub opens: usize,
    pub releases: usize,
    pub reads: usize,
}

impl ScriptedCamera {
    pub fn new(frames: Vec<DynamicImage>) -> Self {
        Self {
            frames: frames.into(),
            ..Self::default()
        }
    }

    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    /// Fail reads once the frames run out instead of reporting no frame.
    pub fn with_read_error(mut self) -> Self {
        self.read_error = true;
        self
    }
}

impl Camera for ScriptedCamera {
    fn name(&self) -> &str {
        "scripted"
    }

    fn open(&mut self) -> Result<()> {
        if self.fail_open {
            return Err(Error::device_unavailable(self.name(), "scripted failure"));
        }
        self.opens += 1;
        self.open = true;
        Ok(())
    }

    fn read(&mut self) -> Result<Option<DynamicImage>> {
        assert!(self.open, "read from a released camera");
        self.reads += 1;
        match self.frames.pop_front() {
            Some(frame) => Ok(Some(frame)),
            None if self.read_error => Err(Error::camera_read("scripted failure")),
            None => Ok(None),
        }
    }

    fn release(&mut self) {
        self.releases += 1;
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Operator whose key presses and form answers are scripted.
///
/// A key becomes available once the given number of frames has been shown,
/// which lets a test aim a key at a particular stage of the flow.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    keys: VecDeque<(usize, OperatorKey)>,
    names: VecDeque<Option<String>>,
    close_input: bool,
    pub shown: Vec<String>,
    pub forms: Vec<String>,
    pub messages: Vec<String>,
}

impl ScriptedOperator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_after(mut self, frames_shown: usize, key: OperatorKey) -> Self {
        self.keys.push_back((frames_shown, key));
        self
    }

    pub fn name(mut self, name: Option<&str>) -> Self {
        self.names.push_back(name.map(str::to_string));
        self
    }

    /// Report closed input once the scripted keys are used up.
    pub fn close_input(mut self) -> Self {
        self.close_input = true;
        self
    }
}

#[async_trait]
impl Operator for ScriptedOperator {
    async fn next_key(&mut self) -> Result<Option<OperatorKey>> {
        if let Some(&(after, key)) = self.keys.front() {
            if self.shown.len() >= after {
                self.keys.pop_front();
                return Ok(Some(key));
            }
        } else if self.close_input {
            return Ok(None);
        }
        std::future::pending::<Result<Option<OperatorKey>>>().await
    }

    async fn fill_form(&mut self, form: &RegistrationForm) -> Result<Option<String>> {
        self.forms.push(form.identifier.clone());
        Ok(self.names.pop_front().flatten())
    }

    fn show_frame(&mut self, window: &str, _frame: &DynamicImage) {
        self.shown.push(window.to_string());
    }

    fn notify(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}
