use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Service family a session talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Speech,
    /// Custom recognition service; the language slot selects a model id.
    Cris,
    /// Uses delegation-token authentication instead of a subscription key.
    Cdsdk,
    /// Caller-supplied URL; nothing is known about the service behind it.
    Custom,
}

impl EndpointKind {
    #[must_use]
    pub const fn authentication_kind(self) -> AuthenticationKind {
        match self {
            Self::Cdsdk => AuthenticationKind::DelegationToken,
            Self::Speech | Self::Cris | Self::Custom => AuthenticationKind::SubscriptionKey,
        }
    }

    /// Whether the language argument names a model rather than a spoken language.
    #[must_use]
    pub const fn selects_model(self) -> bool {
        matches!(self, Self::Cris)
    }
}

impl FromStr for EndpointKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "speech" => Ok(Self::Speech),
            "cris" => Ok(Self::Cris),
            "cdsdk" => Ok(Self::Cdsdk),
            "url" => Ok(Self::Custom),
            other => Err(Error::Usage(format!("unknown service endpoint type: {other}"))),
        }
    }
}

/// Where a session connects: a known service in a recognition mode, or a raw URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTarget {
    Service {
        endpoint: EndpointKind,
        mode: RecognitionMode,
    },
    Url(url::Url),
}

impl SessionTarget {
    #[must_use]
    pub const fn endpoint(&self) -> EndpointKind {
        match self {
            Self::Service { endpoint, .. } => *endpoint,
            Self::Url(_) => EndpointKind::Custom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecognitionMode {
    #[default]
    Interactive,
    Conversation,
    Dictation,
}

impl RecognitionMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::Conversation => "conversation",
            Self::Dictation => "dictation",
        }
    }
}

impl FromStr for RecognitionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interactive" => Ok(Self::Interactive),
            "conversation" => Ok(Self::Conversation),
            "dictation" => Ok(Self::Dictation),
            other => Err(Error::Usage(format!("unknown reco mode: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Simple,
    Detailed,
}

impl OutputFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Detailed => "detailed",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(Self::Simple),
            "detailed" => Ok(Self::Detailed),
            other => Err(Error::Usage(format!("unknown output format: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationKind {
    SubscriptionKey,
    DelegationToken,
}

impl AuthenticationKind {
    /// Header carrying the credential on the connection request.
    #[must_use]
    pub const fn header_name(self) -> &'static str {
        match self {
            Self::SubscriptionKey => "Ocp-Apim-Subscription-Key",
            Self::DelegationToken => "X-Search-DelegationRPSToken",
        }
    }
}

/// Outcome of a final `speech.phrase`.
///
/// The discriminants are positional and must match the service enumeration.
/// The service may send either the name or the numeric index.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[repr(u8)]
pub enum RecognitionStatus {
    Success = 0,
    NoMatch = 1,
    InitialSilenceTimeout = 2,
    BabbleTimeout = 3,
    Error = 4,
    EndOfDictation = 5,
}

impl RecognitionStatus {
    const TABLE: [Self; 6] = [
        Self::Success,
        Self::NoMatch,
        Self::InitialSilenceTimeout,
        Self::BabbleTimeout,
        Self::Error,
        Self::EndOfDictation,
    ];

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::TABLE.get(index).copied()
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    const TEXT: [&'static str; 6] = [
        "Success",
        "No Match",
        "Initial Silence Timeout",
        "Babble Timeout",
        "Error",
        "EndOfDictation",
    ];

    #[must_use]
    pub const fn as_text(self) -> &'static str {
        Self::TEXT[self.index()]
    }

    const fn wire_name(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::NoMatch => "NoMatch",
            Self::InitialSilenceTimeout => "InitialSilenceTimeout",
            Self::BabbleTimeout => "BabbleTimeout",
            Self::Error => "Error",
            Self::EndOfDictation => "EndOfDictation",
        }
    }
}

impl<'de> Deserialize<'de> for RecognitionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Index(usize),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Index(index) => Self::from_index(index)
                .ok_or_else(|| de::Error::custom(format!("unknown recognition status index {index}"))),
            Raw::Name(name) => Self::TABLE
                .iter()
                .copied()
                .find(|status| status.wire_name() == name)
                .ok_or_else(|| de::Error::custom(format!("unknown recognition status {name}"))),
        }
    }
}

impl fmt::Display for RecognitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_text())
    }
}
