use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The corpus artifact is missing a required field; fatal at startup.
    #[error("Corpus incomplete: passage '{passage}' has no {field}")]
    CorpusIncomplete { passage: String, field: &'static str },

    /// The dense path cannot run (embedder down, timed out, or misconfigured).
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("Query has no usable tokens after normalization")]
    EmptyQuery,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn incomplete(passage: impl Into<String>, field: &'static str) -> Self {
        Self::CorpusIncomplete { passage: passage.into(), field }
    }

    /// Errors after which the engine can keep serving on a reduced path.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::RetrievalUnavailable(_) | Self::EmptyQuery)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
