//! Default message provider backed by an in-memory translation catalog

use crate::error::FormatError;
use crate::message_format::{Locale, MessageFormat};
use crate::traits::{MessageDescriptor, MessageProvider};
use std::collections::HashMap;

/// Translations for a single locale, keyed by message id.
///
/// A descriptor resolves to its translation when the id is known, otherwise
/// to its default message.
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    locale: Locale,
    messages: HashMap<String, String>,
}

impl MessageCatalog {
    /// Create an empty catalog for a locale
    pub fn new(locale: &str) -> Self {
        Self {
            locale: Locale::new(locale),
            messages: HashMap::new(),
        }
    }

    /// Add translations to the catalog
    pub fn with_messages<I, K, V>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.messages
            .extend(messages.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Add or replace a single translation
    pub fn insert(&mut self, id: impl Into<String>, template: impl Into<String>) {
        self.messages.insert(id.into(), template.into());
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn template_for<'a>(&'a self, descriptor: &'a MessageDescriptor) -> Result<&'a str, FormatError> {
        let translated = descriptor
            .id
            .as_ref()
            .and_then(|id| self.messages.get(id));
        match (translated, &descriptor.default_message, &descriptor.id) {
            (Some(template), _, _) => Ok(template.as_str()),
            (None, Some(template), _) => Ok(template.as_str()),
            (None, None, Some(id)) => Err(FormatError::MissingMessage { id: id.clone() }),
            (None, None, None) => Ok(""),
        }
    }
}

impl MessageProvider for MessageCatalog {
    fn get_message(&self, descriptor: &MessageDescriptor) -> Result<MessageFormat, FormatError> {
        let template = self.template_for(descriptor)?;
        MessageFormat::new(template, self.locale.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn descriptor(id: Option<&str>, default_message: Option<&str>) -> MessageDescriptor {
        MessageDescriptor::new(id.map(String::from), default_message.map(String::from))
    }

    #[test]
    fn test_translation_wins_over_default() {
        let catalog = MessageCatalog::new("nl").with_messages([("greeting", "Hallo {name}")]);
        let message = catalog
            .get_message(&descriptor(Some("greeting"), Some("Hello {name}")))
            .unwrap();
        let values = json!({"name": "Sandy"}).as_object().cloned().unwrap();
        assert_eq!(message.format(&values).unwrap(), "Hallo Sandy");
    }

    #[test]
    fn test_default_message_fallback() {
        let catalog = MessageCatalog::new("en");
        let message = catalog
            .get_message(&descriptor(Some("unknown"), Some("Plain text")))
            .unwrap();
        assert_eq!(message.format(&Map::new()).unwrap(), "Plain text");
    }

    #[test]
    fn test_missing_message() {
        let catalog = MessageCatalog::new("en");
        let err = catalog.get_message(&descriptor(Some("nothing"), None)).unwrap_err();
        assert!(matches!(err, FormatError::MissingMessage { .. }));
    }
}
