//! Error types for the remapper engine

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemapError {
    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    #[error("Remapper nesting exceeds the maximum depth of {max_depth}")]
    DepthExceeded { max_depth: usize },
}

/// A malformed remapper definition. These indicate an authoring bug and are
/// always raised to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionError {
    #[error("Remapper step must have exactly one operator key, found {found}: [{keys}]")]
    DuplicateOperator { found: usize, keys: String },

    #[error("Unknown remapper operator: {operator}")]
    UnknownOperator { operator: String },

    #[error("Invalid arguments for {operator}: {reason}")]
    InvalidArguments { operator: String, reason: String },

    #[error("Invalid regular expression for string.replace: {reason}")]
    InvalidRegex { reason: String },

    #[error("Remapper definition must be a scalar, a step object or a list of steps, got {found}")]
    InvalidShape { found: String },
}

#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("Deserialization failed: {reason}")]
    DeserializationFailed { reason: String },

    #[error("Serialization failed: {reason}")]
    SerializationFailed { reason: String },
}

/// Failure while parsing or formatting a localized message.
///
/// Never escapes the engine: `string.format` converts it into a fallback string.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error("Malformed message \"{message}\" at offset {offset}: {reason}")]
    Syntax {
        message: String,
        offset: usize,
        reason: String,
    },

    #[error("The intl string context variable \"{name}\" was not provided to the string \"{message}\"")]
    MissingValue { name: String, message: String },

    #[error("Invalid value for \"{name}\": {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("No message found for id \"{id}\"")]
    MissingMessage { id: String },
}

impl DefinitionError {
    pub(crate) fn invalid_arguments(operator: &str, reason: impl Into<String>) -> Self {
        DefinitionError::InvalidArguments {
            operator: operator.to_string(),
            reason: reason.into(),
        }
    }
}
