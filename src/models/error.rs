use std::io;
use thiserror::Error;

pub const REGISTRATION_FAILED: &str = "Registration failed! Please try again.";

#[derive(Debug, Error)]
pub enum TrackerError {
    /// Connection refused, timeout, or the body could not be read.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status} from {url}")]
    UpstreamRejection { status: u16, url: String },

    /// Routing service answered with a `code` other than `Ok`.
    #[error("Routing service returned status {0}")]
    RoutingStatus(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("{0}")]
    Registration(String),

    #[error("Coordinate ({latitude}, {longitude}) out of range")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("Token store error: {0}")]
    TokenStore(#[from] io::Error),

    #[error("Position unavailable: {0}")]
    Position(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TrackerError {
    pub fn registration_failed() -> Self {
        TrackerError::Registration(REGISTRATION_FAILED.to_string())
    }
}

impl From<ini::Error> for TrackerError {
    fn from(e: ini::Error) -> Self {
        match e {
            ini::Error::Io(e) => TrackerError::TokenStore(e),
            ini::Error::Parse(e) => TrackerError::TokenStore(io::Error::new(io::ErrorKind::InvalidData, e)),
        }
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(e: serde_json::Error) -> Self {
        TrackerError::MalformedResponse(e.to_string())
    }
}
