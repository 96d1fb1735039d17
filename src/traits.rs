//! Core traits for the remapper engine

use crate::error::FormatError;
use crate::message_format::MessageFormat;
use serde::{Deserialize, Serialize};

/// Identifies a localized message: a translation id and the template used
/// when no translation exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDescriptor {
    pub id: Option<String>,
    pub default_message: Option<String>,
}

impl MessageDescriptor {
    pub fn new(id: Option<String>, default_message: Option<String>) -> Self {
        Self { id, default_message }
    }
}

/// Resolves message descriptors into formatters for `string.format`.
///
/// Supplied by the caller through the context; the engine never owns
/// translations. Implementations must be shareable across threads since one
/// context may serve concurrent evaluations.
pub trait MessageProvider: Send + Sync {
    /// Resolve a descriptor into a parsed message
    fn get_message(&self, descriptor: &MessageDescriptor) -> Result<MessageFormat, FormatError>;
}

impl<F> MessageProvider for F
where
    F: Fn(&MessageDescriptor) -> Result<MessageFormat, FormatError> + Send + Sync,
{
    fn get_message(&self, descriptor: &MessageDescriptor) -> Result<MessageFormat, FormatError> {
        self(descriptor)
    }
}
