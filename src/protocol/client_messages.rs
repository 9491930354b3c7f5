use serde::{Deserialize, Serialize};

use super::frame::{self, Frame};
use crate::Result;

pub const SPEECH_CONFIG_PATH: &str = "speech.config";
pub const AUDIO_PATH: &str = "audio";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const AUDIO_CONTENT_TYPE: &str = "audio/x-wav";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    SpeechConfig {
        context: SpeechContext,
    },
    Audio {
        chunk: Vec<u8>,
    },
    /// Empty audio frame telling the service the input stream has ended.
    AudioEnd,
    User {
        path: String,
        content_type: String,
        body: Vec<u8>,
    },
}

/// A frame ready to go on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedFrame {
    Text(String),
    Binary(Vec<u8>),
}

impl ClientMessage {
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::SpeechConfig { .. } => SPEECH_CONFIG_PATH,
            Self::Audio { .. } | Self::AudioEnd => AUDIO_PATH,
            Self::User { path, .. } => path,
        }
    }

    /// Encode with the per-turn request id and the send timestamp.
    ///
    /// # Errors
    /// Returns an error if the speech context cannot be serialized, a user
    /// message body is not UTF-8, or the header block is oversized.
    #[allow(clippy::result_large_err)]
    pub fn encode(&self, request_id: &str, timestamp: &str) -> Result<EncodedFrame> {
        let base = Frame::new(self.path())
            .with_header(frame::REQUEST_ID, request_id)
            .with_header(frame::TIMESTAMP, timestamp);
        match self {
            Self::SpeechConfig { context } => {
                let body = serde_json::to_vec(context)?;
                let frame = base
                    .with_header(frame::CONTENT_TYPE, JSON_CONTENT_TYPE)
                    .with_body(body);
                Ok(EncodedFrame::Text(frame.encode_text()?))
            }
            Self::Audio { chunk } => {
                let frame = base
                    .with_header(frame::CONTENT_TYPE, AUDIO_CONTENT_TYPE)
                    .with_body(chunk.clone());
                Ok(EncodedFrame::Binary(frame.encode_binary()?))
            }
            Self::AudioEnd => Ok(EncodedFrame::Binary(base.encode_binary()?)),
            Self::User { content_type, body, .. } => {
                let frame = base
                    .with_header(frame::CONTENT_TYPE, content_type.as_str())
                    .with_body(body.clone());
                Ok(EncodedFrame::Text(frame.encode_text()?))
            }
        }
    }
}

/// Client description sent in `speech.config` right after connecting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpeechContext {
    pub context: ClientContext,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientContext {
    pub system: SystemInfo,
    pub os: OsInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemInfo {
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OsInfo {
    pub platform: String,
    pub name: String,
}

impl Default for SpeechContext {
    fn default() -> Self {
        Self {
            context: ClientContext {
                system: SystemInfo {
                    version: env!("CARGO_PKG_VERSION").to_string(),
                },
                os: OsInfo {
                    platform: std::env::consts::OS.to_string(),
                    name: std::env::consts::FAMILY.to_string(),
                },
            },
        }
    }
}
