use crate::model::ModelError;
use thiserror::Error;

/// Runtime errors.
///
/// Tool failures are not listed here: they never escape a conversation and
/// are reported to the model as error results instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("tool name must not be empty")]
    InvalidToolName,

    #[error("duplicate tool name: {0}")]
    DuplicateToolName(String),

    /// The model call failed and retries, if any, were exhausted.
    #[error("model transport failed after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: ModelError,
    },

    #[error("tool dispatch exceeded {rounds} rounds")]
    UnboundedLoop { rounds: usize },

    #[error("invalid transcript: {0}")]
    InvalidTranscript(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] storage::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
