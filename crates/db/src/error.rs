use thiserror::Error;

/// Errors raised by document collections.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    #[error("'{0}' is not a valid object id")]
    InvalidObjectId(String),

    #[error("duplicate key in {collection}.{index}: '{value}'")]
    DuplicateKey {
        collection: String,
        index: &'static str,
        value: String,
    },

    #[error("document id cannot change from {expected} to {actual}")]
    IdChanged { expected: String, actual: String },
}
