use thiserror::Error;

/// Storage errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    /// An append would overwrite or skip over stored turns.
    #[error("conversation {id} holds {stored} turns, refusing append at index {index}")]
    Conflict {
        id: String,
        stored: usize,
        index: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
