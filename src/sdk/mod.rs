//! Session orchestration on top of the speech protocol.
//!
//! A [`SessionConfig`] prepares and connects a [`SpeechSession`], a
//! [`StreamDriver`] streams the payload through it, and an [`EventSink`]
//! receives the service's events until the turn ends. The low-level message
//! types stay reachable through `crate::protocol`.

mod builder;
mod completion;
mod console;
mod driver;
mod handlers;
mod session;
mod transport;

pub use builder::{SessionBuilder, SessionConfig};
pub use completion::{CompletionSignal, TurnOutcome};
pub use console::ConsoleSink;
pub use driver::{
    AUDIO_BYTES_PER_SECOND, AUDIO_CHUNK_BYTES, DEFAULT_MESSAGE_PATH, DriverState, Pacing, Payload, PayloadContent,
    PayloadKind, StreamDriver, TransferProgress,
};
pub use handlers::{EventSink, UserMessageHandler, user_message_handler};
pub use session::{SpeechSession, UspSession};
pub use transport::{BoxFuture, Transport};
