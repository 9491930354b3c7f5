#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use usp_console::sdk::{CompletionSignal, EventSink, SpeechSession, TransferProgress, TurnOutcome, UserMessageHandler};
use usp_console::{AuthenticationKind, Error, OutputFormat, Result, UserMessage, UspError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetAuthentication(AuthenticationKind, String),
    SetLanguage(String),
    SetModelId(String),
    SetOutputFormat(OutputFormat),
    RegisterUserMessage(String),
    Connect,
    WriteAudio(usize),
    FlushAudio,
    SendMessage(String, usize),
    Close,
}

/// Records every call and ends the turn once the outbound stream is complete.
pub struct MockSession {
    pub calls: Vec<Call>,
    completion: CompletionSignal,
    handlers: HashMap<String, UserMessageHandler>,
    /// Outcome released after flush or message send.
    pub outcome: TurnOutcome,
    /// Name of a call that fails, e.g. `"connect"`.
    pub reject: Option<&'static str>,
    /// Index of an audio chunk that is accepted one byte short.
    pub short_write_at: Option<usize>,
    /// User messages delivered to registered handlers before the turn ends.
    pub incoming: Vec<UserMessage>,
    connected: bool,
}

impl MockSession {
    pub fn new(completion: CompletionSignal) -> Self {
        Self {
            calls: Vec::new(),
            completion,
            handlers: HashMap::new(),
            outcome: TurnOutcome::Completed,
            reject: None,
            short_write_at: None,
            incoming: Vec::new(),
            connected: false,
        }
    }

    pub fn audio_writes(&self) -> Vec<usize> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::WriteAudio(len) => Some(*len),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.calls.iter().filter(|call| *call == wanted).count()
    }

    fn record(&mut self, call: Call, name: &str) -> Result<()> {
        self.calls.push(call);
        if self.reject == Some(name) {
            return Err(Error::Rejected(format!("{name} rejected")));
        }
        Ok(())
    }

    fn finish_turn(&self) {
        for message in &self.incoming {
            if let Some(handler) = self.handlers.get(&message.path) {
                handler(message);
            }
        }
        self.completion.complete(self.outcome.clone());
    }
}

#[async_trait]
impl SpeechSession for MockSession {
    fn set_authentication(&mut self, kind: AuthenticationKind, credential: &str) -> Result<()> {
        self.record(Call::SetAuthentication(kind, credential.to_string()), "set_authentication")
    }

    fn set_language(&mut self, language: &str) -> Result<()> {
        self.record(Call::SetLanguage(language.to_string()), "set_language")
    }

    fn set_model_id(&mut self, model_id: &str) -> Result<()> {
        self.record(Call::SetModelId(model_id.to_string()), "set_model_id")
    }

    fn set_output_format(&mut self, format: OutputFormat) -> Result<()> {
        self.record(Call::SetOutputFormat(format), "set_output_format")
    }

    fn register_user_message(&mut self, path: &str, handler: UserMessageHandler) -> Result<()> {
        self.record(Call::RegisterUserMessage(path.to_string()), "register_user_message")?;
        self.handlers.insert(path.to_string(), handler);
        Ok(())
    }

    async fn connect(&mut self) -> Result<()> {
        self.record(Call::Connect, "connect")?;
        self.connected = true;
        Ok(())
    }

    async fn write_audio(&mut self, chunk: &[u8]) -> Result<usize> {
        let index = self.audio_writes().len();
        self.record(Call::WriteAudio(chunk.len()), "write_audio")?;
        if self.short_write_at == Some(index) {
            return Ok(chunk.len().saturating_sub(1));
        }
        Ok(chunk.len())
    }

    async fn flush_audio(&mut self) -> Result<()> {
        self.record(Call::FlushAudio, "flush_audio")?;
        self.finish_turn();
        Ok(())
    }

    async fn send_message(&mut self, path: &str, content: &[u8]) -> Result<usize> {
        self.record(Call::SendMessage(path.to_string(), content.len()), "send_message")?;
        self.finish_turn();
        Ok(content.len())
    }

    async fn close(&mut self) -> Result<()> {
        self.calls.push(Call::Close);
        self.connected = false;
        Ok(())
    }
}

/// Sink that remembers what the driver and the session reported.
#[derive(Default)]
pub struct RecordingSink {
    pub progress: Mutex<Vec<TransferProgress>>,
    pub user_messages: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<UspError>>,
}

impl EventSink for RecordingSink {
    fn on_error(&self, error: &UspError) {
        self.errors.lock().unwrap().push(error.clone());
    }

    fn on_user_message(&self, message: &UserMessage) {
        self.user_messages.lock().unwrap().push(message.path.clone());
    }

    fn on_transfer_complete(&self, progress: &TransferProgress) {
        self.progress.lock().unwrap().push(*progress);
    }
}

pub fn recording_sink() -> (Arc<RecordingSink>, Arc<dyn EventSink>) {
    let recorder = Arc::new(RecordingSink::default());
    let sink: Arc<dyn EventSink> = recorder.clone();
    (recorder, sink)
}
