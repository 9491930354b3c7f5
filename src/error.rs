use std::fmt;

use thiserror::Error;

/// Error codes reported through [`UspError`] when the failure originates on the
/// client side of the connection rather than in a service `error` message.
pub mod codes {
    /// The WebSocket failed while the turn was still open.
    pub const TRANSPORT_FAILURE: u32 = 0x8000_0001;
    /// The service closed the connection before sending `turn.end`.
    pub const CONNECTION_CLOSED: u32 = 0x8000_0002;
    /// The service rejected the request; the description carries the close reason.
    pub const SERVICE_REJECTED: u32 = 0x8000_0003;
}

/// Error payload delivered to the event sink when a session fails remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UspError {
    pub code: u32,
    pub description: String,
}

impl UspError {
    #[must_use]
    pub fn new(code: u32, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }
}

impl fmt::Display for UspError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x} ({})", self.code, self.description)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Failed to parse or serialize JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Header error: {0}")]
    Header(#[from] tokio_tungstenite::tungstenite::http::header::InvalidHeaderValue),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Usage(String),

    #[error("{step} failed: {source}")]
    Configuration {
        step: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("the number of bytes sent to service ({accepted}) does not match expected ({offered})")]
    ShortWrite { offered: usize, accepted: usize },

    #[error("flushing audio failed: {0}")]
    Flush(#[source] Box<Error>),

    #[error("the total number of bytes sent ({sent}) does not match the file size ({expected})")]
    SizeMismatch { sent: usize, expected: usize },

    #[error("Invalid client message: {0}")]
    InvalidClientMessage(String),

    #[error("Malformed server frame: {0}")]
    MalformedFrame(String),

    #[error("The service closed the connection: {0}")]
    Rejected(String),

    #[error("The session is not connected")]
    NotConnected,

    #[error("The session is already connected")]
    AlreadyConnected,

    #[error("The connection was closed unexpectedly")]
    ConnectionClosed,
}

impl Error {
    pub(crate) fn configuration(step: &'static str, source: Self) -> Self {
        Self::Configuration {
            step,
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usp_error_displays_hex_code() {
        let err = UspError::new(0x1f, "bad audio");
        assert_eq!(err.to_string(), "0x1f (bad audio)");
    }

    #[test]
    fn configuration_error_names_step() {
        let err = Error::configuration("set language", Error::NotConnected);
        assert_eq!(err.to_string(), "set language failed: The session is not connected");
    }
}
