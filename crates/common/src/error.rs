use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Candle or ticker retrieval failed. Recoverable: the cycle is retried or skipped.
    #[error("Fetch error from {exchange}: {message}")]
    Fetch { exchange: String, message: String },

    /// Fewer candles than the indicators need.
    #[error("Insufficient history: need {required} candles, got {available}")]
    InsufficientHistory { required: usize, available: usize },

    /// A notification channel failed to deliver an alert.
    #[error("Notification error on {channel}: {message}")]
    Notification { channel: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn fetch(exchange: impl Into<String>, message: impl ToString) -> Self {
        Error::Fetch {
            exchange: exchange.into(),
            message: message.to_string(),
        }
    }

    pub fn notification(channel: impl Into<String>, message: impl ToString) -> Self {
        Error::Notification {
            channel: channel.into(),
            message: message.to_string(),
        }
    }

    /// Whether a monitor cycle may carry on after this error.
    /// Only configuration errors are fatal.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Config(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
