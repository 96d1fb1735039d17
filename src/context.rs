//! Read-only execution environment threaded through every evaluation

use crate::config::{EngineConfig, DEFAULT_MAX_DEPTH};
use crate::error::FormatError;
use crate::message_format::MessageFormat;
use crate::messages::MessageCatalog;
use crate::traits::{MessageDescriptor, MessageProvider};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Execution context for remapper evaluation.
///
/// Holds the message provider, the current user, ambient context variables
/// and a frozen reference instant. Cloning is cheap; the message provider is
/// shared.
#[derive(Clone)]
pub struct RemapperContext {
    messages: Arc<dyn MessageProvider>,
    user_info: Option<Value>,
    variables: Value,
    now: DateTime<Utc>,
    max_depth: usize,
}

impl std::fmt::Debug for RemapperContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemapperContext")
            .field("user_info", &self.user_info)
            .field("variables", &self.variables)
            .field("now", &self.now)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

impl RemapperContext {
    /// Create a builder for constructing a context
    pub fn builder() -> RemapperContextBuilder {
        RemapperContextBuilder::new()
    }

    /// Resolve a message descriptor through the configured provider
    pub fn get_message(&self, descriptor: &MessageDescriptor) -> Result<MessageFormat, FormatError> {
        self.messages.get_message(descriptor)
    }

    /// Information about the current user, if any
    pub fn user_info(&self) -> Option<&Value> {
        self.user_info.as_ref()
    }

    /// Ambient variables exposed through the `context` operator
    pub fn variables(&self) -> &Value {
        &self.variables
    }

    /// Reference instant for date components missing from parsed input
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Create a new context with updated context variables
    pub fn with_variables(&self, variables: Value) -> Self {
        Self {
            variables,
            ..self.clone()
        }
    }

    /// Create a new context with an updated reference instant
    pub fn with_now(&self, now: DateTime<Utc>) -> Self {
        Self { now, ..self.clone() }
    }
}

impl Default for RemapperContext {
    fn default() -> Self {
        RemapperContextBuilder::new().build()
    }
}

/// Builder for constructing remapper contexts
pub struct RemapperContextBuilder {
    config: EngineConfig,
    messages: HashMap<String, String>,
    provider: Option<Arc<dyn MessageProvider>>,
    user_info: Option<Value>,
    variables: Map<String, Value>,
    now: Option<DateTime<Utc>>,
}

impl RemapperContextBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            messages: HashMap::new(),
            provider: None,
            user_info: None,
            variables: Map::new(),
            now: None,
        }
    }

    /// Apply an engine configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the locale of the default message catalog
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.config.locale = locale.into();
        self
    }

    /// Add translations to the default message catalog
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

    /// Replace the default message catalog with a custom provider
    pub fn with_message_provider<P: MessageProvider + 'static>(mut self, provider: P) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Set the user information exposed through the `user` operator
    pub fn with_user_info(mut self, user_info: Value) -> Self {
        self.user_info = Some(user_info);
        self
    }

    /// Add a context variable exposed through the `context` operator
    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.variables.insert(key.into(), value);
        self
    }

    /// Set the frozen reference instant
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Set the maximum remapper nesting depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Build the context
    pub fn build(self) -> RemapperContext {
        let messages: Arc<dyn MessageProvider> = match self.provider {
            Some(provider) => provider,
            None => Arc::new(MessageCatalog::new(&self.config.locale).with_messages(self.messages)),
        };
        let max_depth = if self.config.max_depth == 0 {
            DEFAULT_MAX_DEPTH
        } else {
            self.config.max_depth
        };

        RemapperContext {
            messages,
            user_info: self.user_info,
            variables: Value::Object(self.variables),
            now: self.now.unwrap_or_else(Utc::now),
            max_depth,
        }
    }
}

impl Default for RemapperContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
