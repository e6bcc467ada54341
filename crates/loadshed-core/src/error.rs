// ── Core error types ──
//
// Errors surfaced by the view-state engine. Every fetch-driven path
// catches these locally and degrades only its own panel; none of them
// is fatal. The `From<loadshed_api::Error>` impl folds the transport
// crate's detailed variants into a single `Transport` kind tagged with
// the operation and status.

use std::path::PathBuf;

use loadshed_api::Operation;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Fetch errors ─────────────────────────────────────────────────
    /// Non-success response, unparsable body or unreachable server.
    /// `message` is the transport error's own text, which already names
    /// the operation.
    #[error("{message}")]
    Transport {
        operation: Operation,
        /// HTTP status, when the server answered at all.
        status: Option<u16>,
        message: String,
    },

    // ── Push errors ──────────────────────────────────────────────────
    /// A pushed event payload was malformed.
    #[error("Malformed push payload: {message}")]
    Decode { message: String },

    // ── Export errors ────────────────────────────────────────────────
    #[error("No schedule loaded to export")]
    NothingToExport,

    #[error("Cannot serialize schedule: {0}")]
    ExportSerialize(#[from] serde_json::Error),

    #[error("Cannot write export file {}: {source}", .path.display())]
    ExportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Setup errors ─────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// The failed operation, for fetch errors.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Transport { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<loadshed_api::Error> for CoreError {
    fn from(err: loadshed_api::Error) -> Self {
        match err.operation() {
            Some(operation) => CoreError::Transport {
                operation,
                status: err.status(),
                message: err.to_string(),
            },
            None => CoreError::Config {
                message: err.to_string(),
            },
        }
    }
}
