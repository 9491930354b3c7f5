#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

pub mod cli;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod sdk;
pub mod transport;

pub use error::{Error, Result, UspError};
pub use protocol::client_messages::ClientMessage;
pub use protocol::models::{
    AuthenticationKind, EndpointKind, OutputFormat, RecognitionMode, RecognitionStatus, SessionTarget,
};
pub use protocol::server_messages::{
    ServerMessage, SpeechEndDetected, SpeechFragment, SpeechHypothesis, SpeechPhrase, SpeechStartDetected,
    TurnStart, UserMessage,
};
pub use sdk::{
    CompletionSignal, ConsoleSink, EventSink, Pacing, Payload, SessionBuilder, SessionConfig, SpeechSession,
    StreamDriver, TransferProgress, TurnOutcome, UspSession,
};

use futures::{SinkExt, StreamExt};
use protocol::client_messages::EncodedFrame;
use protocol::frame::Frame;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use transport::ws::{ConnectOptions, WsStream};

const TRACE_LOG_MAX_BYTES: usize = 1024;
const MAX_AUDIO_CHUNK_BYTES: usize = 64 * 1024;
const TRACE_TRUNCATE_SUFFIX: &str = "... (truncated)";

/// Low-level connection to the speech service.
///
/// Every frame sent on one connection carries the same request id, so a
/// client serves exactly one turn.
#[must_use]
pub struct UspClient {
    stream: WsStream,
    request_id: String,
}

impl UspClient {
    /// Connect to the speech service.
    ///
    /// # Errors
    /// Returns an error if the connection fails or if the URL is invalid.
    pub async fn connect(target: &SessionTarget, options: &ConnectOptions<'_>) -> Result<Self> {
        let stream = transport::ws::connect(target, options).await?;
        Ok(Self {
            stream,
            request_id: new_request_id(),
        })
    }

    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Send a client message to the service.
    ///
    /// # Errors
    /// Returns an error if validation or encoding fails, or if the WebSocket send fails.
    pub async fn send(&mut self, message: ClientMessage) -> Result<()> {
        validate_client_message(&message)?;
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let ws_message = match message.encode(&self.request_id, &timestamp)? {
            EncodedFrame::Text(text) => {
                tracing::trace!("Sending frame: {}", safe_truncate(&text, TRACE_LOG_MAX_BYTES));
                Message::Text(text.into())
            }
            EncodedFrame::Binary(bytes) => {
                tracing::trace!(path = message.path(), len = bytes.len(), "Sending binary frame");
                Message::Binary(bytes.into())
            }
        };
        self.stream.send(ws_message).await?;
        Ok(())
    }

    /// Receive the next server message.
    ///
    /// Frames that cannot be decoded are logged and skipped.
    ///
    /// # Errors
    /// Returns an error if the WebSocket fails or the service closes the
    /// connection with a non-normal close code.
    pub async fn next_message(&mut self) -> Result<Option<ServerMessage>> {
        while let Some(msg) = self.stream.next().await {
            let frame = match msg? {
                Message::Text(text) => {
                    tracing::trace!("Received frame: {}", safe_truncate(&text, TRACE_LOG_MAX_BYTES));
                    Frame::parse_text(&text)
                }
                Message::Binary(data) => {
                    tracing::trace!(len = data.len(), "Received binary frame");
                    Frame::parse_binary(&data)
                }
                Message::Close(close) => {
                    if let Some(close) = close.filter(|c| c.code != CloseCode::Normal) {
                        return Err(Error::Rejected(format!("{}: {}", u16::from(close.code), close.reason.as_str())));
                    }
                    tracing::info!("WebSocket connection closed by server");
                    return Ok(None);
                }
                Message::Ping(payload) => {
                    tracing::debug!("Received Ping, sending Pong");
                    self.stream.send(Message::Pong(payload)).await?;
                    continue;
                }
                _ => continue,
            };
            match frame.and_then(ServerMessage::from_frame) {
                Ok(message) => return Ok(Some(message)),
                Err(err) => tracing::warn!(error = %err, "Skipping undecodable frame"),
            }
        }
        Ok(None)
    }

    /// Close the WebSocket.
    ///
    /// # Errors
    /// Returns an error if the close handshake cannot be sent.
    pub async fn close(&mut self) -> Result<()> {
        self.stream.close().await?;
        Ok(())
    }
}

pub(crate) fn new_request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string().to_uppercase()
}

fn safe_truncate(s: &str, max_bytes: usize) -> std::borrow::Cow<'_, str> {
    if s.len() <= max_bytes {
        return std::borrow::Cow::Borrowed(s);
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    std::borrow::Cow::Owned(format!(
        "{} {} {} bytes",
        &s[..end],
        TRACE_TRUNCATE_SUFFIX,
        s.len() - end
    ))
}

#[allow(clippy::result_large_err)]
fn validate_client_message(message: &ClientMessage) -> Result<()> {
    match message {
        ClientMessage::Audio { chunk } if chunk.len() > MAX_AUDIO_CHUNK_BYTES => {
            Err(Error::InvalidClientMessage(format!(
                "audio chunk exceeds {MAX_AUDIO_CHUNK_BYTES} bytes ({} bytes)",
                chunk.len()
            )))
        }
        ClientMessage::User { path, content_type, .. } => {
            if path.is_empty() {
                return Err(Error::InvalidClientMessage("message path is empty".to_string()));
            }
            if has_line_break(path) || has_line_break(content_type) {
                return Err(Error::InvalidClientMessage(format!(
                    "message headers must not contain line breaks: {path:?}"
                )));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn has_line_break(value: &str) -> bool {
    value.contains(['\r', '\n'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundary() {
        let text = "é".repeat(10);
        let truncated = safe_truncate(&text, 5);
        assert!(truncated.starts_with("éé "));
        assert!(truncated.ends_with("16 bytes"));
    }

    #[test]
    fn short_text_is_borrowed() {
        assert!(matches!(safe_truncate("abc", 8), std::borrow::Cow::Borrowed("abc")));
    }

    #[test]
    fn request_id_is_dashless_uppercase() {
        let id = new_request_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn rejects_oversized_audio_chunk() {
        let message = ClientMessage::Audio { chunk: vec![0; MAX_AUDIO_CHUNK_BYTES + 1] };
        assert!(matches!(validate_client_message(&message), Err(Error::InvalidClientMessage(_))));
        let message = ClientMessage::Audio { chunk: vec![0; MAX_AUDIO_CHUNK_BYTES] };
        assert!(validate_client_message(&message).is_ok());
    }

    #[test]
    fn rejects_header_injection_in_topic() {
        let message = ClientMessage::User {
            path: "topic\r\nPath: turn.end".to_string(),
            content_type: "application/json".to_string(),
            body: Vec::new(),
        };
        assert!(matches!(validate_client_message(&message), Err(Error::InvalidClientMessage(_))));
    }

    #[test]
    fn rejects_empty_topic() {
        let message = ClientMessage::User {
            path: String::new(),
            content_type: "application/json".to_string(),
            body: Vec::new(),
        };
        assert!(matches!(validate_client_message(&message), Err(Error::InvalidClientMessage(_))));
    }
}
