use crate::protocol::models::{EndpointKind, OutputFormat, RecognitionMode};
use crate::sdk::{AUDIO_CHUNK_BYTES, Pacing, PayloadKind, SessionBuilder, SessionConfig, TurnOutcome};
use crate::{Error, Result};
use clap::Parser;
use clap::error::ErrorKind;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const USAGE: &str = "Usage: usp-console message_type(audio/message:[path]) file authentication \
endpoint_type(speech/cris/cdsdk/url) mode(interactive/conversation/dictation) language \
output(simple/detailed) user-defined-messages";

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

/// Keyword slots holding this value keep their default.
const PLACEHOLDER: &str = "-";

#[derive(Debug, Parser)]
#[command(name = "usp-console", version, about = "Stream a file to the speech service and print its events")]
pub struct Cli {
    /// `audio`, or `message[:path]` to send the file as one message
    #[arg(value_name = "MESSAGE_TYPE")]
    pub message_type: String,

    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Subscription key or delegation token; empty for none
    #[arg(value_name = "AUTHENTICATION", allow_hyphen_values = true)]
    pub authentication: Option<String>,

    /// `speech`, `cris`, `cdsdk` or `url`
    #[arg(value_name = "ENDPOINT_TYPE")]
    pub endpoint_type: Option<String>,

    /// `mode language output_format topics...`, or the URL for `url`
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<String>,

    /// Pause after each audio chunk
    #[arg(long, env = "USP_CHUNK_DELAY_MS", default_value_t = 200)]
    pub chunk_delay_ms: u64,

    /// Interval between completion checks
    #[arg(long, env = "USP_POLL_INTERVAL_MS", default_value_t = 500)]
    pub poll_interval_ms: u64,

    /// Log filter, e.g. `debug` or `usp_console=trace`
    #[arg(long, env = "USP_CONSOLE_LOG")]
    pub log_level: Option<String>,
}

/// A fully resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub payload_kind: PayloadKind,
    pub file: PathBuf,
    pub session: SessionConfig,
    pub pacing: Pacing,
}

impl Cli {
    /// Resolve the order-dependent positional arguments.
    ///
    /// # Errors
    /// Returns [`Error::Usage`] for unknown keywords or a malformed `url`
    /// invocation, and [`Error::Url`] if the URL does not parse.
    #[allow(clippy::result_large_err)]
    pub fn resolve(&self) -> Result<Invocation> {
        let payload_kind = self.message_type.parse::<PayloadKind>()?;

        let endpoint = self
            .endpoint_type
            .as_deref()
            .map_or(Ok(EndpointKind::Speech), str::parse::<EndpointKind>)?;

        let mut builder = if endpoint == EndpointKind::Custom {
            let [url] = self.rest.as_slice() else {
                return Err(Error::Usage("No URL specified or too many parameters.".to_string()));
            };
            SessionBuilder::url(Url::parse(url)?)
        } else {
            self.resolve_service(endpoint)?
        };

        if let Some(credential) = &self.authentication {
            builder = builder.authentication(credential.as_str());
        }

        Ok(Invocation {
            payload_kind,
            file: self.file.clone(),
            session: builder.build(),
            pacing: Pacing {
                chunk_size: AUDIO_CHUNK_BYTES,
                chunk_delay: Duration::from_millis(self.chunk_delay_ms),
                poll_interval: Duration::from_millis(self.poll_interval_ms),
            },
        })
    }

    #[allow(clippy::result_large_err)]
    fn resolve_service(&self, endpoint: EndpointKind) -> Result<SessionBuilder> {
        let mut args = self.rest.iter();

        let mode = match keyword(args.next()) {
            Some(mode) => mode.parse::<RecognitionMode>()?,
            None => RecognitionMode::default(),
        };
        let mut builder = SessionBuilder::service(endpoint, mode);

        // The language slot has no placeholder; a model id of `-` is passed as is.
        if let Some(language) = args.next() {
            builder = builder.language(language.as_str());
        }

        if let Some(format) = keyword(args.next()) {
            builder = builder.output_format(format.parse::<OutputFormat>()?);
        }

        Ok(builder.user_messages(args.map(String::as_str)))
    }
}

/// Exit status for a command line that did not parse.
///
/// Help and version requests succeed; anything else prints the usage line.
pub fn parse_failure_status(err: &clap::Error, out: &mut dyn Write) -> u8 {
    if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
        return EXIT_SUCCESS;
    }
    let _ = writeln!(out, "{USAGE}");
    EXIT_FAILURE
}

/// Report the result of a run and pick the exit status.
///
/// A turn that ended with a remote error still exits 0; the sink has already
/// reported it.
pub fn report_status(result: &Result<TurnOutcome>, out: &mut dyn Write) -> u8 {
    let written = match result {
        Ok(_) => return EXIT_SUCCESS,
        Err(Error::Usage(message)) => writeln!(out, "{message}"),
        Err(err) => writeln!(out, "Error: {err}"),
    };
    if let Err(err) = written {
        tracing::warn!(error = %err, "Failed to write error report");
    }
    EXIT_FAILURE
}

fn keyword(arg: Option<&String>) -> Option<&str> {
    arg.map(String::as_str).filter(|value| *value != PLACEHOLDER)
}
