use crate::error::codes;
use crate::protocol::client_messages::{ClientMessage, JSON_CONTENT_TYPE, SpeechContext};
use crate::protocol::models::{AuthenticationKind, EndpointKind, OutputFormat, RecognitionMode, SessionTarget};
use crate::transport::ws::ConnectOptions;
use crate::{Error, Result, UspClient, UspError};

use super::handlers::{EventSink, UserMessageHandler, dispatch};
use super::transport::Transport;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use url::Url;

/// The calls a driver makes against one recognition session.
///
/// Setters and user-message registration are only valid before `connect`.
#[async_trait]
pub trait SpeechSession: Send {
    /// # Errors
    /// Returns an error if the session is already connected.
    #[allow(clippy::result_large_err)]
    fn set_authentication(&mut self, kind: AuthenticationKind, credential: &str) -> Result<()>;

    /// # Errors
    /// Returns an error if the session is already connected.
    #[allow(clippy::result_large_err)]
    fn set_language(&mut self, language: &str) -> Result<()>;

    /// # Errors
    /// Returns an error if the session is already connected.
    #[allow(clippy::result_large_err)]
    fn set_model_id(&mut self, model_id: &str) -> Result<()>;

    /// # Errors
    /// Returns an error if the session is already connected.
    #[allow(clippy::result_large_err)]
    fn set_output_format(&mut self, format: OutputFormat) -> Result<()>;

    /// Route messages on `path` to `handler`. Registering a path twice replaces
    /// the earlier handler.
    ///
    /// # Errors
    /// Returns an error if the session is already connected or the path is empty.
    #[allow(clippy::result_large_err)]
    fn register_user_message(&mut self, path: &str, handler: UserMessageHandler) -> Result<()>;

    /// # Errors
    /// Returns an error if the handshake fails or the session is already connected.
    async fn connect(&mut self) -> Result<()>;

    /// Send one audio chunk; returns the number of bytes accepted.
    ///
    /// # Errors
    /// Returns an error if the session is not connected or the send fails.
    async fn write_audio(&mut self, chunk: &[u8]) -> Result<usize>;

    /// Tell the service the audio stream has ended.
    ///
    /// # Errors
    /// Returns an error if the session is not connected or the send fails.
    async fn flush_audio(&mut self) -> Result<()>;

    /// Send one discrete message; returns the number of bytes accepted.
    ///
    /// # Errors
    /// Returns an error if the session is not connected or the send fails.
    async fn send_message(&mut self, path: &str, content: &[u8]) -> Result<usize>;

    /// Tear the session down. Closing an unconnected or already closed session
    /// is a no-op.
    ///
    /// # Errors
    /// Returns an error if the close handshake fails.
    async fn close(&mut self) -> Result<()>;
}

/// A session against the speech service over WebSocket.
pub struct UspSession {
    target: SessionTarget,
    sink: Arc<dyn EventSink>,
    authentication: Option<(AuthenticationKind, String)>,
    language: Option<String>,
    model_id: Option<String>,
    output_format: Option<OutputFormat>,
    user_messages: HashMap<String, UserMessageHandler>,
    connection: Option<Connection>,
}

struct Connection {
    sender: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

enum Command {
    Send { message: ClientMessage, respond: oneshot::Sender<Result<()>> },
    Close { respond: oneshot::Sender<Result<()>> },
}

impl UspSession {
    /// Create a session for a known service and recognition mode.
    ///
    /// # Errors
    /// Returns an error for [`EndpointKind::Custom`], which needs a URL.
    #[allow(clippy::result_large_err)]
    pub fn init(endpoint: EndpointKind, mode: RecognitionMode, sink: Arc<dyn EventSink>) -> Result<Self> {
        if endpoint == EndpointKind::Custom {
            return Err(Error::Usage("a custom endpoint must be opened by URL".to_string()));
        }
        Ok(Self::new(SessionTarget::Service { endpoint, mode }, sink))
    }

    /// Create a session for a caller-supplied URL.
    #[must_use]
    pub fn init_by_url(url: Url, sink: Arc<dyn EventSink>) -> Self {
        Self::new(SessionTarget::Url(url), sink)
    }

    fn new(target: SessionTarget, sink: Arc<dyn EventSink>) -> Self {
        Self {
            target,
            sink,
            authentication: None,
            language: None,
            model_id: None,
            output_format: None,
            user_messages: HashMap::new(),
            connection: None,
        }
    }

    #[must_use]
    pub const fn target(&self) -> &SessionTarget {
        &self.target
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    #[allow(clippy::result_large_err)]
    const fn ensure_unconnected(&self) -> Result<()> {
        if self.connection.is_some() {
            return Err(Error::AlreadyConnected);
        }
        Ok(())
    }

    /// Start the event task over an established transport.
    ///
    /// User-message registrations are frozen at this point.
    pub(crate) fn attach(&mut self, mut transport: Box<dyn Transport>) {
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(64);
        let sink = Arc::clone(&self.sink);
        let user_messages = std::mem::take(&mut self.user_messages);

        let task = tokio::spawn(async move {
            let mut turn_ended = false;
            loop {
                tokio::select! {
                    cmd = cmd_rx.recv() => {
                        match cmd {
                            Some(Command::Send { message, respond }) => {
                                let result = transport.send(message).await;
                                let _ = respond.send(result);
                            }
                            Some(Command::Close { respond }) => {
                                let result = transport.close().await;
                                let _ = respond.send(result);
                                break;
                            }
                            None => break,
                        }
                    }
                    message = transport.next_message() => {
                        match message {
                            Ok(Some(msg)) => {
                                turn_ended |= msg.is_turn_end();
                                dispatch(sink.as_ref(), &user_messages, &msg);
                            }
                            Ok(None) => {
                                if !turn_ended {
                                    sink.on_error(&UspError::new(
                                        codes::CONNECTION_CLOSED,
                                        "connection closed before the end of the turn",
                                    ));
                                }
                                break;
                            }
                            Err(err) => {
                                tracing::debug!(error = %err, "Transport failed");
                                if !turn_ended {
                                    sink.on_error(&transport_error(&err));
                                }
                                break;
                            }
                        }
                    }
                }
            }
            tracing::debug!("Session event task finished");
        });

        self.connection = Some(Connection { sender: cmd_tx, task });
    }

    async fn send(&self, message: ClientMessage) -> Result<()> {
        let connection = self.connection.as_ref().ok_or(Error::NotConnected)?;
        let (tx, rx) = oneshot::channel();
        connection
            .sender
            .send(Command::Send { message, respond: tx })
            .await
            .map_err(|_| Error::ConnectionClosed)?;
        rx.await.map_err(|_| Error::ConnectionClosed)??;
        Ok(())
    }
}

fn transport_error(err: &Error) -> UspError {
    match err {
        Error::Rejected(reason) => UspError::new(codes::SERVICE_REJECTED, reason.clone()),
        other => UspError::new(codes::TRANSPORT_FAILURE, other.to_string()),
    }
}

#[async_trait]
impl SpeechSession for UspSession {
    fn set_authentication(&mut self, kind: AuthenticationKind, credential: &str) -> Result<()> {
        self.ensure_unconnected()?;
        self.authentication = Some((kind, credential.to_string()));
        Ok(())
    }

    fn set_language(&mut self, language: &str) -> Result<()> {
        self.ensure_unconnected()?;
        self.language = Some(language.to_string());
        Ok(())
    }

    fn set_model_id(&mut self, model_id: &str) -> Result<()> {
        self.ensure_unconnected()?;
        self.model_id = Some(model_id.to_string());
        Ok(())
    }

    fn set_output_format(&mut self, format: OutputFormat) -> Result<()> {
        self.ensure_unconnected()?;
        self.output_format = Some(format);
        Ok(())
    }

    fn register_user_message(&mut self, path: &str, handler: UserMessageHandler) -> Result<()> {
        self.ensure_unconnected()?;
        if path.is_empty() {
            return Err(Error::InvalidClientMessage("user message path is empty".to_string()));
        }
        if self.user_messages.insert(path.to_string(), handler).is_some() {
            tracing::debug!(path, "Replacing user message handler");
        }
        Ok(())
    }

    async fn connect(&mut self) -> Result<()> {
        self.ensure_unconnected()?;
        let connection_id = crate::new_request_id();
        let options = ConnectOptions {
            authentication: self
                .authentication
                .as_ref()
                .map(|(kind, credential)| (*kind, credential.as_str())),
            language: self.language.as_deref(),
            model_id: self.model_id.as_deref(),
            output_format: self.output_format,
            connection_id: &connection_id,
        };
        let client = UspClient::connect(&self.target, &options).await?;
        tracing::debug!(request_id = client.request_id(), "Session connected");
        self.attach(Box::new(client));
        self.send(ClientMessage::SpeechConfig {
            context: SpeechContext::default(),
        })
        .await
    }

    async fn write_audio(&mut self, chunk: &[u8]) -> Result<usize> {
        if chunk.is_empty() {
            return Ok(0);
        }
        self.send(ClientMessage::Audio { chunk: chunk.to_vec() }).await?;
        Ok(chunk.len())
    }

    async fn flush_audio(&mut self) -> Result<()> {
        self.send(ClientMessage::AudioEnd).await
    }

    async fn send_message(&mut self, path: &str, content: &[u8]) -> Result<usize> {
        self.send(ClientMessage::User {
            path: path.to_string(),
            content_type: JSON_CONTENT_TYPE.to_string(),
            body: content.to_vec(),
        })
        .await?;
        Ok(content.len())
    }

    async fn close(&mut self) -> Result<()> {
        let Some(connection) = self.connection.take() else {
            return Ok(());
        };
        let (tx, rx) = oneshot::channel();
        let result = if connection.sender.send(Command::Close { respond: tx }).await.is_ok() {
            rx.await.unwrap_or(Ok(()))
        } else {
            // The event task already ended with the connection.
            Ok(())
        };
        drop(connection.sender);
        if let Err(err) = connection.task.await {
            tracing::warn!(error = %err, "Session event task panicked");
        }
        tracing::info!("Session closed");
        result
    }
}
