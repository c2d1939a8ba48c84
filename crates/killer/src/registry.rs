//! Player registration flow.
//!
//! [`PlayerRegistry::run`] drives one registration through
//! `Idle → Scanning → FormOpen → Done`, ending in `Failed` when no code is
//! scanned or the form is closed. [`PlayerRegistry::enroll`] fills a
//! [`Killer`] session by scanning the tokens handed out to its players.

use std::path::{Path, PathBuf};
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use tracing::{info, warn};

use crate::camera::Camera;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::operator::{Operator, RegistrationForm};
use crate::scanner::{scan_qr_code, take_picture, ScanOutcome};
use crate::session::Killer;

/// Characters kept as-is in photo file names.
const FILENAME_UNSAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

/// A completed registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    /// The scanned identifier.
    pub identifier: String,
    /// Name entered by the player.
    pub name: String,
    /// The saved photo, if the operator kept one.
    pub photo: Option<PathBuf>,
}

/// Why a registration did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The camera could not be used.
    DeviceUnavailable(String),
    /// The operator cancelled the scan.
    Cancelled,
    /// The camera stopped before a code was found.
    NoCode,
    /// The form was closed without submitting.
    FormClosed,
}

/// Where a registration stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationState {
    /// Nothing started yet.
    Idle,
    /// Looking for a QR code.
    Scanning,
    /// Waiting for the player's name.
    FormOpen {
        /// The scanned identifier.
        identifier: String,
    },
    /// The player is registered.
    Done(Registration),
    /// The attempt ended without registering anyone.
    Failed(FailureReason),
}

impl RegistrationState {
    /// Whether the flow has ended.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed(_))
    }
}

/// Settings for the registration flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Directory for player photos.
    pub photo_dir: PathBuf,
    /// Delay between camera frames.
    pub frame_interval: Duration,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for RegistryOptions {
    fn from(config: &Config) -> Self {
        Self {
            photo_dir: config.registry.photo_dir.clone(),
            frame_interval: config.frame_interval(),
        }
    }
}

/// File name of a player's photo: `<identifier>_photo.png`.
///
/// Characters other than ASCII letters, digits, `-` and `_` are
/// percent-encoded so a scanned identifier cannot escape the photo directory.
#[must_use]
pub fn photo_file_name(identifier: &str) -> String {
    format!(
        "{}_photo.png",
        utf8_percent_encode(identifier, FILENAME_UNSAFE)
    )
}

/// Path of a player's photo inside `photo_dir`.
#[must_use]
pub fn photo_path(photo_dir: &Path, identifier: &str) -> PathBuf {
    photo_dir.join(photo_file_name(identifier))
}

/// Registers players using a camera and an operator.
#[derive(Debug)]
pub struct PlayerRegistry<C, O> {
    camera: C,
    operator: O,
    options: RegistryOptions,
    state: RegistrationState,
}

impl<C: Camera, O: Operator> PlayerRegistry<C, O> {
    /// Create a registry in the `Idle` state.
    pub fn new(camera: C, operator: O, options: RegistryOptions) -> Self {
        Self {
            camera,
            operator,
            options,
            state: RegistrationState::Idle,
        }
    }

    /// The current state.
    pub fn state(&self) -> &RegistrationState {
        &self.state
    }

    /// The camera, e.g. to inspect it after a run.
    pub fn camera(&self) -> &C {
        &self.camera
    }

    /// The operator, e.g. to inspect it after a run.
    pub fn operator(&self) -> &O {
        &self.operator
    }

    fn transition(&mut self, next: RegistrationState) -> RegistrationState {
        info!(from = ?self.state, to = ?next, "Registration state changed");
        self.state = next.clone();
        next
    }

    fn fail(&mut self, reason: FailureReason) -> RegistrationState {
        self.transition(RegistrationState::Failed(reason))
    }

    async fn scan(&mut self) -> Result<ScanOutcome> {
        self.operator.notify("Scanning QR code...");
        scan_qr_code(
            &mut self.camera,
            &mut self.operator,
            self.options.frame_interval,
        )
        .await
    }

    /// Run one registration to completion.
    ///
    /// Returns the terminal state: `Done` with the registration, or `Failed`
    /// with the reason. Every outcome is also reported to the operator.
    ///
    /// # Errors
    ///
    /// Returns an error if operator input fails or the photo cannot be
    /// written. Camera failures end in `Failed` instead.
    pub async fn run(&mut self) -> Result<RegistrationState> {
        self.transition(RegistrationState::Scanning);

        let reason = match self.scan().await {
            Ok(ScanOutcome::Found(identifier)) => return self.complete(identifier).await,
            Ok(ScanOutcome::Cancelled) => FailureReason::Cancelled,
            Ok(ScanOutcome::Exhausted) => FailureReason::NoCode,
            Err(e) if e.is_device_error() => {
                warn!(error = %e, "Scan failed");
                FailureReason::DeviceUnavailable(e.to_string())
            }
            Err(e) => return Err(e),
        };
        self.operator.notify("QR Code scanning failed!");
        Ok(self.fail(reason))
    }

    /// Form and photo for a scanned identifier.
    async fn complete(&mut self, identifier: String) -> Result<RegistrationState> {
        self.operator.notify(&format!(
            "QR Code for Player {identifier} scanned successfully!"
        ));
        self.transition(RegistrationState::FormOpen {
            identifier: identifier.clone(),
        });

        let form = RegistrationForm::new(identifier.clone());
        let Some(name) = self.operator.fill_form(&form).await? else {
            self.operator
                .notify("Registration window closed without submitting.");
            return Ok(self.fail(FailureReason::FormClosed));
        };

        let path = photo_path(&self.options.photo_dir, &identifier);
        let photo = match take_picture(
            &mut self.camera,
            &mut self.operator,
            self.options.frame_interval,
            &path,
        )
        .await
        {
            Ok(photo) => photo,
            Err(e) if e.is_device_error() => {
                warn!(error = %e, "Photo capture failed");
                self.operator.notify(&format!("Photo capture failed: {e}"));
                None
            }
            Err(e) => return Err(e),
        };

        self.operator
            .notify(&format!("Player {identifier}: Name: {name} registered"));
        Ok(self.transition(RegistrationState::Done(Registration {
            identifier,
            name,
            photo,
        })))
    }

    /// Scan tokens and register them in `session` until it is full or a
    /// scan ends without a code.
    ///
    /// Returns the number of players added.
    ///
    /// # Errors
    ///
    /// Returns an error if operator input fails. Lookup misses and camera
    /// failures are reported to the operator.
    pub async fn enroll(&mut self, session: &mut Killer) -> Result<usize> {
        let mut added = 0;

        while !session.is_full() {
            let token = match self.scan().await {
                Ok(ScanOutcome::Found(token)) => token,
                Ok(ScanOutcome::Cancelled | ScanOutcome::Exhausted) => break,
                Err(e) if e.is_device_error() => {
                    warn!(error = %e, "Scan failed");
                    self.operator.notify("QR Code scanning failed!");
                    break;
                }
                Err(e) => return Err(e),
            };

            let before = session.players().len();
            match session.register(&token) {
                Ok(id) => {
                    let name = session
                        .player(&id)
                        .map(|p| p.name.clone())
                        .ok_or_else(|| Error::internal("registered player is missing"))?;
                    if session.players().len() > before {
                        added += 1;
                        self.operator
                            .notify(&format!("Player {name} was added successfully."));
                    } else {
                        self.operator
                            .notify(&format!("Player {name} is already registered."));
                    }
                }
                Err(Error::LookupMiss { token }) => {
                    self.operator.notify(&format!("Token {token} not found."));
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            added,
            players = session.players().len(),
            "Enrollment finished"
        );
        Ok(added)
    }
}
