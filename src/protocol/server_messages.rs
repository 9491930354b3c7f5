use serde::Deserialize;

use super::frame::{self, Frame};
use super::models::RecognitionStatus;
use crate::{Error, Result};

pub const SPEECH_START_DETECTED: &str = "speech.startDetected";
pub const SPEECH_END_DETECTED: &str = "speech.endDetected";
pub const SPEECH_HYPOTHESIS: &str = "speech.hypothesis";
pub const SPEECH_FRAGMENT: &str = "speech.fragment";
pub const SPEECH_PHRASE: &str = "speech.phrase";
pub const TURN_START: &str = "turn.start";
pub const TURN_END: &str = "turn.end";

/// Offsets and durations are in the service's native 100-nanosecond ticks.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct SpeechStartDetected {
    #[serde(default)]
    pub offset: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct SpeechEndDetected {
    #[serde(default)]
    pub offset: u64,
}

/// Body shared by `speech.hypothesis` and `speech.fragment`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct SpeechHypothesis {
    pub text: String,
    pub offset: u64,
    pub duration: u64,
}

pub type SpeechFragment = SpeechHypothesis;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct SpeechPhrase {
    pub recognition_status: RecognitionStatus,
    #[serde(default)]
    pub display_text: String,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub duration: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
pub struct TurnStart {
    #[serde(default)]
    pub context: TurnContext,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TurnContext {
    #[serde(default)]
    pub service_tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
    pub path: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    SpeechStartDetected(SpeechStartDetected),
    SpeechEndDetected(SpeechEndDetected),
    SpeechHypothesis(SpeechHypothesis),
    SpeechFragment(SpeechFragment),
    SpeechPhrase(SpeechPhrase),
    TurnStart(TurnStart),
    TurnEnd,
    /// Any path the protocol does not define; routed to registered topics.
    User(UserMessage),
}

impl ServerMessage {
    /// Decode a frame received from the service.
    ///
    /// # Errors
    /// Returns an error if the frame has no `Path` header or a known path
    /// carries a body that does not match its schema.
    #[allow(clippy::result_large_err)]
    pub fn from_frame(frame: Frame) -> Result<Self> {
        let path = frame
            .path()
            .ok_or_else(|| Error::MalformedFrame("frame has no Path header".to_string()))?
            .to_string();
        let message = match path.as_str() {
            SPEECH_START_DETECTED => Self::SpeechStartDetected(parse_body_or_default(&frame)?),
            SPEECH_END_DETECTED => Self::SpeechEndDetected(parse_body_or_default(&frame)?),
            SPEECH_HYPOTHESIS => Self::SpeechHypothesis(serde_json::from_slice(frame.body())?),
            SPEECH_FRAGMENT => Self::SpeechFragment(serde_json::from_slice(frame.body())?),
            SPEECH_PHRASE => Self::SpeechPhrase(serde_json::from_slice(frame.body())?),
            TURN_START => Self::TurnStart(parse_body_or_default(&frame)?),
            TURN_END => Self::TurnEnd,
            _ => {
                let content_type = frame.header(frame::CONTENT_TYPE).unwrap_or_default().to_string();
                Self::User(UserMessage {
                    path,
                    content_type,
                    content: frame.into_body(),
                })
            }
        };
        Ok(message)
    }

    #[must_use]
    pub const fn is_turn_end(&self) -> bool {
        matches!(self, Self::TurnEnd)
    }
}

#[allow(clippy::result_large_err)]
fn parse_body_or_default<T>(frame: &Frame) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if frame.body().iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(frame.body())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(path: &str, body: &str) -> Frame {
        Frame::parse_text(&format!("Path:{path}\r\nContent-Type:application/json\r\n\r\n{body}")).unwrap()
    }

    #[test]
    fn decodes_phrase() {
        let frame = text(
            SPEECH_PHRASE,
            r#"{"RecognitionStatus":"Success","DisplayText":"Hello.","Offset":100,"Duration":2000}"#,
        );
        let msg = ServerMessage::from_frame(frame).unwrap();
        assert_eq!(
            msg,
            ServerMessage::SpeechPhrase(SpeechPhrase {
                recognition_status: RecognitionStatus::Success,
                display_text: "Hello.".to_string(),
                offset: 100,
                duration: 2000,
            })
        );
    }

    #[test]
    fn decodes_turn_start_service_tag() {
        let frame = text(TURN_START, r#"{"context":{"serviceTag":"7B33613B"}}"#);
        let ServerMessage::TurnStart(start) = ServerMessage::from_frame(frame).unwrap() else {
            panic!("expected turn.start");
        };
        assert_eq!(start.context.service_tag, "7B33613B");
    }

    #[test]
    fn empty_bodies_are_accepted_where_optional() {
        assert_eq!(
            ServerMessage::from_frame(text(SPEECH_END_DETECTED, "")).unwrap(),
            ServerMessage::SpeechEndDetected(SpeechEndDetected::default())
        );
        assert!(ServerMessage::from_frame(text(TURN_END, "")).unwrap().is_turn_end());
    }

    #[test]
    fn unknown_path_becomes_user_message() {
        let msg = ServerMessage::from_frame(text("extraTopic", "payload")).unwrap();
        assert_eq!(
            msg,
            ServerMessage::User(UserMessage {
                path: "extraTopic".to_string(),
                content_type: "application/json".to_string(),
                content: b"payload".to_vec(),
            })
        );
    }

    #[test]
    fn hypothesis_requires_text() {
        let frame = text(SPEECH_HYPOTHESIS, r#"{"Offset":1,"Duration":2}"#);
        assert!(matches!(ServerMessage::from_frame(frame), Err(Error::Serialization(_))));
    }

    #[test]
    fn missing_path_is_malformed() {
        let frame = Frame::parse_text("Content-Type:text/plain\r\n\r\nx").unwrap();
        assert!(matches!(ServerMessage::from_frame(frame), Err(Error::MalformedFrame(_))));
    }
}
