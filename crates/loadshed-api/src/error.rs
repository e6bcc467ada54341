use strum::Display;
use thiserror::Error;

/// The API operation a request belongs to.
///
/// Every error carries one so callers can tell which panel a failure
/// should degrade without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Operation {
    Stage,
    Provinces,
    Towns,
    Schedule,
    StageUpdates,
}

/// Top-level error type for the `loadshed-api` crate.
///
/// Covers every failure mode of the web API surfaces: HTTP transport,
/// non-success responses, unparsable bodies, and the push channel.
/// `loadshed-core` maps these into its own taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("{operation}: HTTP transport error: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The base URL cannot carry path segments (e.g. `data:` URLs).
    #[error("Base URL cannot be a base: {0}")]
    CannotBeABase(String),

    /// HTTP client construction failed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Request validation ─────────────────────────────────────────
    /// A path identifier was empty.
    #[error("{operation}: {field} must not be empty")]
    InvalidArgument {
        operation: Operation,
        field: &'static str,
    },

    // ── Responses ──────────────────────────────────────────────────
    /// The server answered with a non-success status.
    #[error("{operation} failed: HTTP {status}")]
    Status { operation: Operation, status: u16 },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("{operation}: deserialization error: {message}")]
    Deserialization {
        operation: Operation,
        message: String,
        body: String,
    },

    // ── Push channel ───────────────────────────────────────────────
    /// The event stream could not be opened or broke mid-read.
    #[error("Event stream error: {0}")]
    EventStream(String),
}

impl Error {
    /// The operation this error belongs to, when it is request-scoped.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Transport { operation, .. }
            | Self::InvalidArgument { operation, .. }
            | Self::Status { operation, .. }
            | Self::Deserialization { operation, .. } => Some(*operation),
            Self::EventStream(_) => Some(Operation::StageUpdates),
            Self::InvalidUrl(_) | Self::CannotBeABase(_) | Self::ClientBuild(_) => None,
        }
    }

    /// HTTP status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { source, .. } => source.is_timeout() || source.is_connect(),
            Self::Status { status, .. } => *status >= 500,
            Self::EventStream(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
