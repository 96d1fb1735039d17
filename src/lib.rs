//! Remapper engine
//!
//! Evaluates declarative data transformations ("remappers") against JSON
//! input. A remapper is a scalar literal or a list of single-operator steps
//! folded left to right; operators read properties, build objects, map
//! arrays, branch, compare, transform strings, format localized messages and
//! parse dates. Evaluation is pure: the only ambient inputs are the explicit
//! [`RemapperContext`] and its frozen reference instant.
//!
//! ```
//! use remapper::{remap, RemapperContext};
//! use serde_json::json;
//!
//! let definition = json!([{"object.from": {"name": [{"prop": "givenName"}]}}]);
//! let output = remap(&definition, &json!({"givenName": "Patrick"}), &RemapperContext::default()).unwrap();
//! assert_eq!(output, json!({"name": "Patrick"}));
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod date;
pub mod definition;
pub mod engine;
pub mod equal;
pub mod error;
pub mod message_format;
pub mod messages;
pub mod serialization;
pub mod traits;
pub mod value;

// Re-export core types and traits
pub use cache::{fingerprint, RemapperCache};
pub use config::{EngineConfig, DEFAULT_MAX_DEPTH};
pub use context::{RemapperContext, RemapperContextBuilder};
pub use definition::{ArrayProperty, Conditional, Remapper, Step, StringCase, StringFormat, StringReplace};
pub use engine::remap;
pub use equal::{all_equal, equal};
pub use error::{DefinitionError, FormatError, RemapError, SerializationError};
pub use message_format::{Locale, MessageFormat, PluralCategory};
pub use messages::MessageCatalog;
pub use serialization::{serializer_for_extension, DefinitionSerializer, JsonSerializer, YamlSerializer};
pub use traits::{MessageDescriptor, MessageProvider};
pub use value::{is_truthy, to_js_string};
