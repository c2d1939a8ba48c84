//! Error types for killer.
//!
//! Every fallible operation in the crate returns [`Result`], so the binary can
//! report a single error type to the operator.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for killer operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Session Errors ===
    /// A session was configured with more players than the game allows.
    #[error("too many players: {requested} requested, at most {max} allowed")]
    TooManyPlayers {
        /// The player count that was asked for.
        requested: usize,
        /// The maximum the game allows.
        max: usize,
    },

    /// A scanned token is not in the session's token table.
    #[error("token {token} not found")]
    LookupMiss {
        /// The scanned token.
        token: String,
    },

    /// Every player slot of the session is taken.
    #[error("session is full: all {limit} players are registered")]
    SessionFull {
        /// The session's player count.
        limit: usize,
    },

    /// No registered player has the given id.
    #[error("unknown player {id}")]
    UnknownPlayer {
        /// The id that was looked up.
        id: String,
    },

    // === Device Errors ===
    /// The camera could not be opened.
    #[error("camera '{device}' unavailable: {message}")]
    DeviceUnavailable {
        /// Name of the camera backend or device.
        device: String,
        /// Description of what went wrong.
        message: String,
    },

    /// Reading a frame from an open camera failed.
    #[error("failed to read camera frame: {0}")]
    CameraRead(String),

    // === QR Errors ===
    /// The payload could not be encoded as a QR code.
    #[error("QR encoding failed: {0}")]
    QrEncode(#[from] qrencode::types::QrError),

    /// Rasterising, loading or saving an image failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to read the roster of pending players.
    #[error("failed to read roster {path}: {message}")]
    Roster {
        /// Path to the roster file.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    // === Operator Errors ===
    /// The operator terminal failed.
    #[error("operator input failed: {0}")]
    Operator(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for killer operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a device unavailable error.
    #[must_use]
    pub fn device_unavailable(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            device: device.into(),
            message: message.into(),
        }
    }

    /// Create a camera read error.
    #[must_use]
    pub fn camera_read(message: impl Into<String>) -> Self {
        Self::CameraRead(message.into())
    }

    /// Create an operator error.
    #[must_use]
    pub fn operator(message: impl Into<String>) -> Self {
        Self::Operator(message.into())
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a lookup miss.
    #[must_use]
    pub fn is_lookup_miss(&self) -> bool {
        matches!(self, Self::LookupMiss { .. })
    }

    /// Check if this error comes from the camera.
    #[must_use]
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::DeviceUnavailable { .. } | Self::CameraRead(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_many_players_display() {
        let err = Error::TooManyPlayers {
            requested: 5,
            max: 4,
        };
        assert_eq!(
            err.to_string(),
            "too many players: 5 requested, at most 4 allowed"
        );
    }

    #[test]
    fn test_lookup_miss() {
        let err = Error::LookupMiss {
            token: "zzz".to_string(),
        };
        assert_eq!(err.to_string(), "token zzz not found");
        assert!(err.is_lookup_miss());
        assert!(!Error::internal("x").is_lookup_miss());
    }

    #[test]
    fn test_device_errors() {
        let err = Error::device_unavailable("camera0", "no such device");
        let msg = err.to_string();
        assert!(msg.contains("camera0"));
        assert!(msg.contains("no such device"));
        assert!(err.is_device_error());
        assert!(Error::camera_read("stream died").is_device_error());
        assert!(!Error::operator("closed").is_device_error());
    }

    #[test]
    fn test_session_full_display() {
        let err = Error::SessionFull { limit: 4 };
        assert!(err.to_string().contains("all 4 players"));
    }

    #[test]
    fn test_operator_error() {
        let err = Error::operator("terminal closed");
        assert_eq!(err.to_string(), "operator input failed: terminal closed");
    }

    #[test]
    fn test_from_qr_error() {
        let err: Error = qrencode::types::QrError::DataTooLong.into();
        assert!(matches!(err, Error::QrEncode(_)));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_roster_error_display() {
        let err = Error::Roster {
            path: PathBuf::from("/tmp/roster.json"),
            message: "expected an object".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/roster.json"));
        assert!(msg.contains("expected an object"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
