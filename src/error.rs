use thiserror::Error;

/// Errors produced anywhere in the quiz generator
#[derive(Error, Debug)]
pub enum QuizGeneratorError {
    /// The HTTP exchange with the provider could not complete
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-success status
    #[error("API request failed with code: {status}, message: {body}")]
    RemoteRejection { status: u16, body: String },

    /// The provider envelope did not have the expected shape
    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("Pool creation error: {0}")]
    PoolCreation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An intent was dispatched to a session state that cannot accept it
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, QuizGeneratorError>;

impl QuizGeneratorError {
    /// Whether the error came from talking to the generative provider
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            QuizGeneratorError::Transport(_) | QuizGeneratorError::RemoteRejection { .. }
        )
    }
}
