use std::error::Error;
use thiserror::Error;

/// Result alias for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failure reported by a [`QuizStore`](crate::dao::game_store::QuizStore) backend.
///
/// Business outcomes (duplicate names, closed rounds, lost races) are never
/// errors; they travel as dedicated outcome enums. This type only covers the
/// backend not answering.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("store unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Wrap a backend failure.
    pub fn unavailable(message: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Short description suitable for health reports.
    pub fn message(&self) -> &str {
        match self {
            StorageError::Unavailable { message, .. } => message,
        }
    }
}
