use crate::UspError;
use crate::protocol::server_messages::{
    ServerMessage, SpeechEndDetected, SpeechFragment, SpeechHypothesis, SpeechPhrase, SpeechStartDetected,
    TurnStart, UserMessage,
};
use std::collections::HashMap;
use std::sync::Arc;

use super::driver::TransferProgress;

/// Receives the asynchronous events of one session.
///
/// Events are delivered from the session's background task in the order the
/// service sent them. Every method defaults to doing nothing.
pub trait EventSink: Send + Sync {
    fn on_speech_start_detected(&self, _message: &SpeechStartDetected) {}

    fn on_speech_end_detected(&self, _message: &SpeechEndDetected) {}

    fn on_speech_hypothesis(&self, _message: &SpeechHypothesis) {}

    fn on_speech_fragment(&self, _message: &SpeechFragment) {}

    fn on_speech_phrase(&self, _message: &SpeechPhrase) {}

    fn on_turn_start(&self, _message: &TurnStart) {}

    /// Normal end of the turn.
    fn on_turn_end(&self) {}

    /// Abnormal end of the turn.
    fn on_error(&self, _error: &UspError) {}

    /// A message on a registered user topic.
    fn on_user_message(&self, _message: &UserMessage) {}

    /// Called by the driver once the outbound stream is complete.
    fn on_transfer_complete(&self, _progress: &TransferProgress) {}
}

pub type UserMessageHandler = Arc<dyn Fn(&UserMessage) + Send + Sync>;

/// Wrap a sink's user-message entry point as a per-topic handler.
#[must_use]
pub fn user_message_handler(sink: Arc<dyn EventSink>) -> UserMessageHandler {
    Arc::new(move |message| sink.on_user_message(message))
}

pub(crate) fn dispatch(
    sink: &dyn EventSink,
    user_messages: &HashMap<String, UserMessageHandler>,
    message: &ServerMessage,
) {
    match message {
        ServerMessage::SpeechStartDetected(msg) => sink.on_speech_start_detected(msg),
        ServerMessage::SpeechEndDetected(msg) => sink.on_speech_end_detected(msg),
        ServerMessage::SpeechHypothesis(msg) => sink.on_speech_hypothesis(msg),
        ServerMessage::SpeechFragment(msg) => sink.on_speech_fragment(msg),
        ServerMessage::SpeechPhrase(msg) => sink.on_speech_phrase(msg),
        ServerMessage::TurnStart(msg) => sink.on_turn_start(msg),
        ServerMessage::TurnEnd => sink.on_turn_end(),
        ServerMessage::User(msg) => match user_messages.get(&msg.path) {
            Some(handler) => handler(msg),
            None => tracing::debug!(path = %msg.path, "Dropping message on unregistered path"),
        },
    }
}
