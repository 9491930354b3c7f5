use crate::{Error, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use super::builder::SessionConfig;
use super::completion::{CompletionSignal, TurnOutcome};
use super::handlers::EventSink;
use super::session::SpeechSession;

/// Nominal bitrate of the audio payload: 16 kHz, 16-bit mono.
pub const AUDIO_BYTES_PER_SECOND: usize = 16_000 * 2;
/// Bytes per audio chunk; 0.4 seconds at the nominal bitrate.
pub const AUDIO_CHUNK_BYTES: usize = (AUDIO_BYTES_PER_SECOND * 2) / 5;
pub const DEFAULT_MESSAGE_PATH: &str = "message";

const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(200);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How the payload file is to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadKind {
    Audio,
    Message { path: String },
}

impl FromStr for PayloadKind {
    type Err = Error;

    /// Accepts `audio`, `message` or `message:<path>`. An empty path falls back
    /// to [`DEFAULT_MESSAGE_PATH`].
    fn from_str(value: &str) -> Result<Self> {
        if value == "audio" {
            return Ok(Self::Audio);
        }
        let path = match value.split_once(':') {
            Some(("message", path)) => path,
            None if value == "message" => "",
            _ => return Err(Error::Usage(format!("unknown message type: {value}"))),
        };
        let path = if path.is_empty() { DEFAULT_MESSAGE_PATH } else { path };
        Ok(Self::Message { path: path.to_string() })
    }
}

/// What is sent: raw audio or one message on a topic path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadContent {
    Audio(Vec<u8>),
    Message { path: String, content: Vec<u8> },
}

/// The full payload, read once before transfer begins.
///
/// `declared_len` is the size the file reported; the transfer is only
/// complete once that many bytes have been accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub content: PayloadContent,
    pub declared_len: usize,
}

impl Payload {
    #[must_use]
    pub fn audio(data: Vec<u8>) -> Self {
        let declared_len = data.len();
        Self {
            content: PayloadContent::Audio(data),
            declared_len,
        }
    }

    #[must_use]
    pub fn message(path: impl Into<String>, content: Vec<u8>) -> Self {
        let declared_len = content.len();
        Self {
            content: PayloadContent::Message {
                path: path.into(),
                content,
            },
            declared_len,
        }
    }

    #[must_use]
    pub const fn with_declared_len(mut self, declared_len: usize) -> Self {
        self.declared_len = declared_len;
        self
    }

    /// Read `file` completely, expecting as many bytes as its metadata reports.
    ///
    /// # Errors
    /// Returns an error if the file cannot be inspected or read.
    pub async fn load(kind: PayloadKind, file: &Path) -> Result<Self> {
        let declared = tokio::fs::metadata(file).await?.len();
        let content = tokio::fs::read(file).await?;
        let declared_len = usize::try_from(declared).unwrap_or(usize::MAX);
        if declared_len != content.len() {
            tracing::warn!(
                file = %file.display(),
                declared = declared_len,
                read = content.len(),
                "File size changed while reading"
            );
        }
        tracing::debug!(file = %file.display(), len = content.len(), "Loaded payload");
        let payload = match kind {
            PayloadKind::Audio => Self::audio(content),
            PayloadKind::Message { path } => Self::message(path, content),
        };
        Ok(payload.with_declared_len(declared_len))
    }

    /// Bytes actually held.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.content {
            PayloadContent::Audio(data) => data.len(),
            PayloadContent::Message { content, .. } => content.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Chunking and timing of the transfer and the completion wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub chunk_size: usize,
    /// Sleep after every audio chunk, including the last one.
    pub chunk_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            chunk_size: AUDIO_CHUNK_BYTES,
            chunk_delay: DEFAULT_CHUNK_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Pacing {
    /// Default chunking with no sleeps.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            chunk_delay: Duration::ZERO,
            poll_interval: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Bytes accepted by the session against the payload size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub sent: usize,
    pub total: usize,
}

impl TransferProgress {
    #[must_use]
    pub const fn new(total: usize) -> Self {
        Self { sent: 0, total }
    }

    pub const fn record(&mut self, accepted: usize) {
        self.sent += accepted;
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.sent == self.total
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Connected,
    Transferring,
    StreamClosed,
    AwaitingCompletion,
    Done,
    Failed,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connected => "connected",
            Self::Transferring => "transferring",
            Self::StreamClosed => "stream closed",
            Self::AwaitingCompletion => "awaiting completion",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Drives one session from configuration through the end of its turn.
///
/// The session is closed on every exit path, whether the run succeeds or not.
pub struct StreamDriver<S> {
    session: S,
    pacing: Pacing,
    completion: CompletionSignal,
    state: DriverState,
}

impl<S: SpeechSession> StreamDriver<S> {
    /// `completion` must be the signal the session's event sink releases.
    #[must_use]
    pub fn new(session: S, completion: CompletionSignal) -> Self {
        Self {
            session,
            pacing: Pacing::default(),
            completion,
            state: DriverState::Idle,
        }
    }

    #[must_use]
    pub const fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    #[must_use]
    pub const fn state(&self) -> DriverState {
        self.state
    }

    #[must_use]
    pub const fn session(&self) -> &S {
        &self.session
    }

    pub fn into_session(self) -> S {
        self.session
    }

    /// Configure, connect, transfer the payload, then wait for the turn to end.
    ///
    /// # Errors
    /// Returns an error if configuration, any send, the flush, or the final
    /// size check fails. A remote error is not an `Err`; it comes back as
    /// [`TurnOutcome::Failed`].
    pub async fn run(
        &mut self,
        config: &SessionConfig,
        sink: &Arc<dyn EventSink>,
        payload: &Payload,
    ) -> Result<TurnOutcome> {
        let result = self.drive(config, sink, payload).await;

        if let Err(err) = self.session.close().await {
            tracing::warn!(error = %err, "Failed to close session");
        }

        match &result {
            Ok(_) => self.transition(DriverState::Done),
            Err(err) => {
                tracing::debug!(error = %err, "Run failed");
                self.transition(DriverState::Failed);
            }
        }
        result
    }

    async fn drive(
        &mut self,
        config: &SessionConfig,
        sink: &Arc<dyn EventSink>,
        payload: &Payload,
    ) -> Result<TurnOutcome> {
        config.apply(&mut self.session, sink).await?;
        self.transition(DriverState::Connected);

        self.transition(DriverState::Transferring);
        let mut progress = TransferProgress::new(payload.declared_len);
        match &payload.content {
            PayloadContent::Audio(data) => self.stream_audio(data, &mut progress).await?,
            PayloadContent::Message { path, content } => self.send_message(path, content, &mut progress).await?,
        }
        self.transition(DriverState::StreamClosed);

        if !progress.is_complete() {
            return Err(Error::SizeMismatch {
                sent: progress.sent,
                expected: progress.total,
            });
        }
        sink.on_transfer_complete(&progress);

        self.transition(DriverState::AwaitingCompletion);
        let outcome = self.completion.wait(self.pacing.poll_interval).await;
        if let TurnOutcome::Failed(error) = &outcome {
            tracing::warn!(%error, "Turn ended with an error");
        }
        Ok(outcome)
    }

    async fn stream_audio(&mut self, data: &[u8], progress: &mut TransferProgress) -> Result<()> {
        for chunk in data.chunks(self.pacing.chunk_size.max(1)) {
            let accepted = self.session.write_audio(chunk).await?;
            if accepted != chunk.len() {
                return Err(Error::ShortWrite {
                    offered: chunk.len(),
                    accepted,
                });
            }
            progress.record(accepted);
            tracing::debug!(sent = progress.sent, total = progress.total, "Sent audio chunk");
            if !self.pacing.chunk_delay.is_zero() {
                tokio::time::sleep(self.pacing.chunk_delay).await;
            }
        }

        self.session
            .flush_audio()
            .await
            .map_err(|err| Error::Flush(Box::new(err)))
    }

    async fn send_message(&mut self, path: &str, content: &[u8], progress: &mut TransferProgress) -> Result<()> {
        let accepted = self.session.send_message(path, content).await?;
        if accepted != content.len() {
            return Err(Error::ShortWrite {
                offered: content.len(),
                accepted,
            });
        }
        progress.record(accepted);
        tracing::debug!(path, sent = accepted, "Sent message");
        Ok(())
    }

    fn transition(&mut self, next: DriverState) {
        tracing::debug!(from = %self.state, to = %next, "Driver state change");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_is_four_tenths_of_a_second() {
        assert_eq!(AUDIO_CHUNK_BYTES, 12_800);
        assert_eq!(Pacing::default().chunk_delay, Duration::from_millis(200));
        assert_eq!(Pacing::default().poll_interval, Duration::from_millis(500));
    }

    #[test]
    fn payload_kind_resolves_topic_path() {
        assert_eq!("audio".parse::<PayloadKind>().unwrap(), PayloadKind::Audio);
        assert_eq!(
            "message".parse::<PayloadKind>().unwrap(),
            PayloadKind::Message { path: "message".to_string() }
        );
        assert_eq!(
            "message:custom/path".parse::<PayloadKind>().unwrap(),
            PayloadKind::Message { path: "custom/path".to_string() }
        );
        assert_eq!(
            "message:".parse::<PayloadKind>().unwrap(),
            PayloadKind::Message { path: "message".to_string() }
        );
        assert!("video".parse::<PayloadKind>().is_err());
        assert!("audio:x".parse::<PayloadKind>().is_err());
    }

    #[test]
    fn progress_tracks_accepted_bytes() {
        let mut progress = TransferProgress::new(10);
        progress.record(4);
        assert!(!progress.is_complete());
        progress.record(6);
        assert!(progress.is_complete());
    }
}
