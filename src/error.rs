use std::error::Error;

/// Error returned by a destination sink (a [`Core`](crate::field::Core)
/// write or a [`Handler`](crate::attr::Handler) handle).
///
/// Adapters never wrap or inspect it; a failed write is surfaced to the
/// caller exactly as the destination produced it.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Failure reported by an object or array marshaler.
///
/// The encoders recover from it locally: the failing field is replaced by a
/// `<key>Error` string carrying the `Display` text of this error.
#[derive(thiserror::Error, Debug)]
pub enum MarshalError {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(BoxError),
}

impl MarshalError {
    pub fn msg(message: impl Into<String>) -> Self {
        MarshalError::Message(message.into())
    }
}

/// Error type returned when reading adapter options from the environment.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid boolean in {var}: {value:?}")]
    InvalidBool { var: &'static str, value: String },
}
