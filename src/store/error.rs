use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: String },

    #[error("{kind} {key} was modified since it was read")]
    Conflict { kind: &'static str, key: String },

    #[error("{kind} '{key}' already exists")]
    Duplicate { kind: &'static str, key: String },

    #[error("{kind} '{name}' still has child records")]
    HasChildren {
        kind: &'static str,
        id: i32,
        name: String,
        children: Vec<i32>,
    },

    #[error("{kind} '{key}' rejected, {field}: {message}")]
    Invalid {
        kind: &'static str,
        key: String,
        field: &'static str,
        message: String,
    },

    #[error("Stored data is inconsistent: {0}")]
    Corrupt(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}
