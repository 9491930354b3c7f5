use crate::error::{Error, Result};
use crate::protocol::models::{AuthenticationKind, EndpointKind, OutputFormat, SessionTarget};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderName, HeaderValue};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

#[derive(Debug)]
pub struct WsStream(WebSocketStream<MaybeTlsStream<TcpStream>>);

impl WsStream {
    pub(crate) const fn new(stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        Self(stream)
    }
}

impl futures::Stream for WsStream {
    type Item = std::result::Result<
        tokio_tungstenite::tungstenite::Message,
        tokio_tungstenite::tungstenite::Error,
    >;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        std::pin::Pin::new(&mut self.0).poll_next(cx)
    }
}

impl futures::Sink<tokio_tungstenite::tungstenite::Message> for WsStream {
    type Error = tokio_tungstenite::tungstenite::Error;

    fn poll_ready(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::pin::Pin::new(&mut self.0).poll_ready(cx)
    }

    fn start_send(
        mut self: std::pin::Pin<&mut Self>,
        item: tokio_tungstenite::tungstenite::Message,
    ) -> std::result::Result<(), Self::Error> {
        std::pin::Pin::new(&mut self.0).start_send(item)
    }

    fn poll_flush(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::pin::Pin::new(&mut self.0).poll_flush(cx)
    }

    fn poll_close(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::pin::Pin::new(&mut self.0).poll_close(cx)
    }
}

const SPEECH_HOST: &str = "wss://speech.platform.bing.com";
const CRIS_HOST: &str = "wss://westus.stt.speech.microsoft.com";
const CDSDK_URL: &str = "wss://speech.platform.bing.com/cortana/api/v1";

/// Everything the handshake needs besides the target itself.
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions<'a> {
    pub authentication: Option<(AuthenticationKind, &'a str)>,
    pub language: Option<&'a str>,
    pub model_id: Option<&'a str>,
    pub output_format: Option<OutputFormat>,
    pub connection_id: &'a str,
}

/// Resolve the WebSocket URL for a session target.
///
/// Caller-supplied URLs are used verbatim.
///
/// # Errors
/// Returns an error if the resulting URL cannot be parsed.
pub fn service_url(target: &SessionTarget, options: &ConnectOptions<'_>) -> Result<Url> {
    let (endpoint, mode) = match target {
        SessionTarget::Url(url) => return Ok(url.clone()),
        SessionTarget::Service { endpoint, mode } => (*endpoint, *mode),
    };

    let mut url = match endpoint {
        EndpointKind::Custom => {
            return Err(Error::Usage("a custom endpoint must be opened by URL".to_string()));
        }
        EndpointKind::Speech => Url::parse(&format!(
            "{SPEECH_HOST}/speech/recognition/{}/cognitiveservices/v1",
            mode.as_str()
        ))?,
        EndpointKind::Cris => Url::parse(&format!(
            "{CRIS_HOST}/speech/recognition/{}/cognitiveservices/v1",
            mode.as_str()
        ))?,
        EndpointKind::Cdsdk => Url::parse(CDSDK_URL)?,
    };

    {
        let mut query = url.query_pairs_mut();
        if endpoint == EndpointKind::Cdsdk {
            query.append_pair("environment", "Home");
        }
        if let Some(model_id) = options.model_id {
            query.append_pair("cid", model_id);
        }
        if let Some(language) = options.language {
            query.append_pair("language", language);
        }
        if let Some(format) = options.output_format {
            query.append_pair("format", format.as_str());
        }
    }
    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

/// Establish a WebSocket connection to the speech service.
///
/// # Errors
/// Returns an error if the URL or a header value is invalid, or the handshake fails.
pub async fn connect(target: &SessionTarget, options: &ConnectOptions<'_>) -> Result<WsStream> {
    let url = service_url(target, options)?;

    let mut req = url.as_str().into_client_request()?;
    let headers = req.headers_mut();
    if let Some((kind, credential)) = options.authentication {
        headers.insert(
            HeaderName::from_static(header_key(kind)),
            HeaderValue::from_str(credential)?,
        );
    }
    headers.insert(
        HeaderName::from_static("x-connectionid"),
        HeaderValue::from_str(options.connection_id)?,
    );

    tracing::debug!(%url, connection_id = options.connection_id, "Opening WebSocket");
    let (ws_stream, _) = connect_async(req).await?;

    tracing::info!(%url, "Connected to speech service");

    Ok(WsStream::new(ws_stream))
}

// `HeaderName::from_static` requires lowercase names.
const fn header_key(kind: AuthenticationKind) -> &'static str {
    match kind {
        AuthenticationKind::SubscriptionKey => "ocp-apim-subscription-key",
        AuthenticationKind::DelegationToken => "x-search-delegationrpstoken",
    }
}
