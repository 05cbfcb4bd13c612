use thiserror::Error;

/// Failures raised while fetching, resolving or coordinating schemas.
///
/// Validation failures of instance data are not errors; they are collected
/// in a [`crate::ValidationResult`]. The enum is `Clone` because one failed
/// load is handed to every caller that was waiting on the same URI.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Fetch error for {uri}: {message}")]
    Fetch { uri: String, message: String },

    #[error("Invalid schema: {keyword} {message} ({id})")]
    SchemaStructure {
        keyword: String,
        id: String,
        message: String,
    },

    #[error("JSON pointer error: {message} (pointer '{pointer}' in uri {uri})")]
    JsonPointer {
        pointer: String,
        uri: String,
        message: String,
    },

    #[error("Illegal state: {message}")]
    IllegalState { message: String },

    #[error("Circular $ref chain at {uri}")]
    CircularReference { uri: String },
}

pub type Result<T> = std::result::Result<T, SchemaError>;

impl SchemaError {
    pub fn fetch<S: Into<String>, M: Into<String>>(uri: S, message: M) -> Self {
        Self::Fetch {
            uri: uri.into(),
            message: message.into(),
        }
    }

    pub fn structure<K: Into<String>, I: Into<String>, M: Into<String>>(
        keyword: K,
        id: I,
        message: M,
    ) -> Self {
        Self::SchemaStructure {
            keyword: keyword.into(),
            id: id.into(),
            message: message.into(),
        }
    }

    pub fn json_pointer<P: Into<String>, U: Into<String>, M: Into<String>>(
        pointer: P,
        uri: U,
        message: M,
    ) -> Self {
        Self::JsonPointer {
            pointer: pointer.into(),
            uri: uri.into(),
            message: message.into(),
        }
    }

    pub fn illegal_state<S: Into<String>>(message: S) -> Self {
        Self::IllegalState {
            message: message.into(),
        }
    }

    pub fn circular_reference<S: Into<String>>(uri: S) -> Self {
        Self::CircularReference { uri: uri.into() }
    }

    /// Keyword that failed resolution, when the error is structural.
    pub fn keyword(&self) -> Option<&str> {
        match self {
            Self::SchemaStructure { keyword, .. } => Some(keyword),
            _ => None,
        }
    }
}
