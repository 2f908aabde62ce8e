use thiserror::Error;

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("{0}")]
    Msg(String),

    #[error("vocabulary is empty")]
    EmptyVocab,

    #[error("logits row has {got} entries, vocabulary needs {expected}")]
    LogitsLength { expected: usize, got: usize },

    #[error("grammar compilation failed: {0}")]
    Grammar(String),

    #[error("grammar source given but no grammar compiler is available")]
    GrammarUnavailable,

    #[error("cannot draw from candidate distribution: {0}")]
    Distribution(String),

    #[error("decide called without a freshly prepared candidate set")]
    NotPrepared,

    #[error("detokenize failed: {0}")]
    Detokenize(String),
}

impl From<anyhow::Error> for SamplingError {
    fn from(e: anyhow::Error) -> Self {
        SamplingError::Msg(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SamplingError>;
