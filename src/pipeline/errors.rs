use thiserror::Error;

use super::FieldType;

// All errors that can be returned by the transformation pipeline.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    // Unknown error
    #[error("{0}")]
    Unknown(String),

    // Configuration errors, these abort the whole pipeline

    #[error("Transformer '{0}' is not found.")]
    TransformerNotFound(String),

    #[error("Transformer '{0}' is already registered.")]
    TransformerAlreadyRegistered(String),

    #[error("Invalid options for transformer '{0}': {1}")]
    InvalidOptions(String, String),

    #[error("Field matcher '{0}' is not found.")]
    MatcherNotFound(String),

    #[error("Field matcher '{0}' is already registered.")]
    MatcherAlreadyRegistered(String),

    #[error("Invalid options for field matcher '{0}': {1}")]
    InvalidMatcherOptions(String, String),

    #[error("Invalid regular expression '{0}': {1}")]
    InvalidRegex(String, String),

    // Data model errors

    // Field has a different number of values than the frame
    #[error("Field '{0}' has {1} values, but the frame has {2} rows.")]
    InvalidFieldLength(String, usize, usize),

    // Value cannot be converted to the requested field type
    #[error("Cannot convert value to {0}.")]
    InvalidTypeConversion(FieldType),

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    // External resources

    #[error("{0}")]
    IoError(String),

    #[error("{0}")]
    HttpError(String),

    #[error("The pipeline has been stopped.")]
    Interrupted,
}

impl From<serde_json::Error> for TransformError {
    fn from(e: serde_json::Error) -> Self {
        TransformError::InvalidJson(e.to_string())
    }
}
