//! `killer` - QR code player onboarding for the party game Killer
//!
//! This library provides the game session with its player limit, the camera
//! driven registration flow, and QR code generation for the codes handed out
//! to players.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod camera;
pub mod cli;
pub mod config;
pub mod decode;
pub mod error;
pub mod logging;
pub mod operator;
pub mod qr;
pub mod registry;
pub mod scanner;
pub mod session;

#[cfg(test)]
mod testing;

pub use camera::{Camera, CameraGuard};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use operator::{Operator, TerminalOperator};
pub use qr::QrOptions;
pub use registry::{PlayerRegistry, Registration, RegistrationState};
pub use scanner::ScanOutcome;
pub use session::{Killer, Player, PlayerId, MAX_PLAYERS};
