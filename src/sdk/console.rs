use crate::UspError;
use crate::protocol::server_messages::{
    SpeechEndDetected, SpeechFragment, SpeechHypothesis, SpeechPhrase, SpeechStartDetected, TurnStart,
    UserMessage,
};
use std::io::Write;
use std::sync::Mutex;

use super::completion::{CompletionSignal, TurnOutcome};
use super::driver::TransferProgress;
use super::handlers::EventSink;

/// Event sink that prints one `Response:` line per event and releases the
/// completion signal on `turn.end` or error.
pub struct ConsoleSink {
    completion: CompletionSignal,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    #[must_use]
    pub fn stdout(completion: CompletionSignal) -> Self {
        Self::with_writer(completion, Box::new(std::io::stdout()))
    }

    #[must_use]
    pub fn with_writer(completion: CompletionSignal, out: Box<dyn Write + Send>) -> Self {
        Self {
            completion,
            out: Mutex::new(out),
        }
    }

    fn report(&self, line: &str) {
        let mut out = self.out.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Err(err) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            tracing::warn!(error = %err, "Failed to write event report");
        }
    }
}

impl EventSink for ConsoleSink {
    // The service does not populate offsets for start/end detection yet, so
    // they are left out of the report.
    fn on_speech_start_detected(&self, _message: &SpeechStartDetected) {
        self.report("Response: Speech.StartDetected message.");
    }

    fn on_speech_end_detected(&self, _message: &SpeechEndDetected) {
        self.report("Response: Speech.EndDetected message.");
    }

    fn on_speech_hypothesis(&self, message: &SpeechHypothesis) {
        self.report(&format!(
            "Response: Speech.Hypothesis message. Text: {}, starts at offset {}, with duration {}.",
            message.text, message.offset, message.duration
        ));
    }

    fn on_speech_fragment(&self, message: &SpeechFragment) {
        self.report(&format!(
            "Response: Speech.Fragment message. Text: {}, starts at {}, with duration {}.",
            message.text, message.offset, message.duration
        ));
    }

    fn on_speech_phrase(&self, message: &SpeechPhrase) {
        self.report(&format!(
            "Response: Speech.Phrase message. Status: {}, Text: {}, starts at {}, with duration {}.",
            message.recognition_status, message.display_text, message.offset, message.duration
        ));
    }

    fn on_turn_start(&self, message: &TurnStart) {
        self.report(&format!(
            "Response: Turn.Start message. Context.ServiceTag: {}",
            message.context.service_tag
        ));
    }

    fn on_turn_end(&self) {
        self.report("Response: Turn.End message.");
        self.completion.complete(TurnOutcome::Completed);
    }

    fn on_error(&self, error: &UspError) {
        self.report(&format!("Response: On Error: {error}."));
        self.completion.complete(TurnOutcome::Failed(error.clone()));
    }

    fn on_user_message(&self, message: &UserMessage) {
        self.report(&format!(
            "Response: User defined message. Path: {}, contentType: {}, size: {}, content: {}.",
            message.path,
            message.content_type,
            message.content.len(),
            String::from_utf8_lossy(&message.content)
        ));
    }

    fn on_transfer_complete(&self, progress: &TransferProgress) {
        self.report(&format!("Sent {} bytes of data in total.", progress.sent));
    }
}
