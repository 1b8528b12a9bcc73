use std::fmt;

use thiserror::Error;

/// Which half of a region's configuration a payload belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Region,
    ServiceTypes,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadKind::Region => f.write_str("region"),
            PayloadKind::ServiceTypes => f.write_str("service types"),
        }
    }
}

/// An error raised while talking to the remote configuration source.
///
/// Both variants abort the current synchronization batch as a whole. The
/// refresh scheduler retries them under its backoff policy and never hands
/// them to cache readers.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The remote could not be reached or answered with a malformed envelope.
    #[error("transport error: {0}")]
    Transport(String),
    /// A single payload inside an otherwise valid response failed to parse.
    #[error("failed to decode {kind} payload for region {key}: {source}")]
    Decode {
        key: String,
        kind: PayloadKind,
        #[source]
        source: serde_json::Error,
    },
}

impl RemoteError {
    pub fn transport(message: impl fmt::Display) -> Self {
        RemoteError::Transport(message.to_string())
    }

    pub fn decode(key: impl Into<String>, kind: PayloadKind, source: serde_json::Error) -> Self {
        RemoteError::Decode {
            key: key.into(),
            kind,
            source,
        }
    }

    /// Returns `true` for payload decoding failures.
    pub fn is_decode(&self) -> bool {
        matches!(self, RemoteError::Decode { .. })
    }
}

/// An error returned by lookups that fall back to a direct remote read.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("could not find service type \"{service_type}\" in region \"{region}\"")]
    ServiceTypeNotFound {
        region: String,
        service_type: String,
    },
}

/// An error resolving the timezone of a region.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TimezoneError {
    #[error("no timezone defined for region \"{region}\"")]
    Missing { region: String },
    #[error("unknown timezone \"{timezone}\" for region \"{region}\"")]
    Unknown { region: String, timezone: String },
}
