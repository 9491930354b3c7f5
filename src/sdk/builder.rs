use crate::protocol::models::{EndpointKind, OutputFormat, RecognitionMode, SessionTarget};
use crate::{Error, Result};
use std::sync::Arc;
use url::Url;

use super::handlers::{EventSink, user_message_handler};
use super::session::{SpeechSession, UspSession};

/// Everything the configurator applies to a session before data transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub target: SessionTarget,
    pub authentication: Option<String>,
    /// Spoken-language tag, or the model id for endpoints that select models.
    pub language: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub user_messages: Vec<String>,
}

impl SessionConfig {
    #[must_use]
    pub fn builder(target: SessionTarget) -> SessionBuilder {
        SessionBuilder::new(target)
    }

    #[must_use]
    pub const fn endpoint(&self) -> EndpointKind {
        self.target.endpoint()
    }

    /// Create an unconnected session for this configuration's target.
    ///
    /// # Errors
    /// Returns an error if a service target names [`EndpointKind::Custom`].
    #[allow(clippy::result_large_err)]
    pub fn open(&self, sink: Arc<dyn EventSink>) -> Result<UspSession> {
        match &self.target {
            SessionTarget::Service { endpoint, mode } => UspSession::init(*endpoint, *mode, sink),
            SessionTarget::Url(url) => Ok(UspSession::init_by_url(url.clone(), sink)),
        }
    }

    /// Configure `session` and connect it.
    ///
    /// The first rejected call aborts; connect is always the last step so a
    /// session is never connected with partial configuration.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] naming the step that failed.
    pub async fn apply<S: SpeechSession + ?Sized>(&self, session: &mut S, sink: &Arc<dyn EventSink>) -> Result<()> {
        let endpoint = self.endpoint();

        if let Some(credential) = &self.authentication {
            session
                .set_authentication(endpoint.authentication_kind(), credential)
                .map_err(|err| Error::configuration("set authentication", err))?;
        }

        if let Some(language) = &self.language {
            if endpoint.selects_model() {
                session
                    .set_model_id(language)
                    .map_err(|err| Error::configuration("set model id", err))?;
            } else {
                session
                    .set_language(language)
                    .map_err(|err| Error::configuration("set language", err))?;
            }
        }

        if let Some(format) = self.output_format {
            session
                .set_output_format(format)
                .map_err(|err| Error::configuration("set output format", err))?;
        }

        for path in &self.user_messages {
            session
                .register_user_message(path, user_message_handler(Arc::clone(sink)))
                .map_err(|err| Error::configuration("register user message", err))?;
            tracing::info!(path = %path, "Registered user message");
        }

        session
            .connect()
            .await
            .map_err(|err| Error::configuration("connect", err))?;
        tracing::info!(endpoint = ?endpoint, "Session connected");
        Ok(())
    }
}

pub struct SessionBuilder {
    target: SessionTarget,
    authentication: Option<String>,
    language: Option<String>,
    output_format: Option<OutputFormat>,
    user_messages: Vec<String>,
}

impl SessionBuilder {
    #[must_use]
    pub const fn new(target: SessionTarget) -> Self {
        Self {
            target,
            authentication: None,
            language: None,
            output_format: None,
            user_messages: Vec::new(),
        }
    }

    #[must_use]
    pub const fn service(endpoint: EndpointKind, mode: RecognitionMode) -> Self {
        Self::new(SessionTarget::Service { endpoint, mode })
    }

    #[must_use]
    pub const fn url(url: Url) -> Self {
        Self::new(SessionTarget::Url(url))
    }

    /// An empty credential leaves authentication unset.
    #[must_use]
    pub fn authentication(mut self, credential: impl Into<String>) -> Self {
        let credential = credential.into();
        self.authentication = (!credential.is_empty()).then_some(credential);
        self
    }

    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    #[must_use]
    pub const fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    #[must_use]
    pub fn user_message(mut self, path: impl Into<String>) -> Self {
        self.user_messages.push(path.into());
        self
    }

    #[must_use]
    pub fn user_messages<I, T>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.user_messages.extend(paths.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn build(self) -> SessionConfig {
        SessionConfig {
            target: self.target,
            authentication: self.authentication,
            language: self.language,
            output_format: self.output_format,
            user_messages: self.user_messages,
        }
    }
}
