//! Loading and dumping remapper definitions

use crate::definition::{ArrayProperty, Remapper, Step, StringCase};
use crate::error::{RemapError, SerializationError};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Pluggable definition serialization
pub trait DefinitionSerializer: Send + Sync {
    /// Parse a definition from bytes
    fn load(&self, bytes: &[u8]) -> Result<Remapper, RemapError>;

    /// Render a definition back to bytes
    fn dump(&self, remapper: &Remapper) -> Result<Vec<u8>, SerializationError>;

    /// Get the name of this serialization format
    fn name(&self) -> &str;
}

/// JSON definitions
#[derive(Debug, Clone, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Create a JSON serializer with pretty printing
    pub fn new_pretty() -> Self {
        Self { pretty: true }
    }
}

impl DefinitionSerializer for JsonSerializer {
    fn load(&self, bytes: &[u8]) -> Result<Remapper, RemapError> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| SerializationError::DeserializationFailed {
            reason: format!("JSON deserialization failed: {}", e),
        })?;
        Ok(Remapper::parse(&value)?)
    }

    fn dump(&self, remapper: &Remapper) -> Result<Vec<u8>, SerializationError> {
        let value = remapper.to_value();
        let result = if self.pretty {
            serde_json::to_vec_pretty(&value)
        } else {
            serde_json::to_vec(&value)
        };
        result.map_err(|e| SerializationError::SerializationFailed {
            reason: format!("JSON serialization failed: {}", e),
        })
    }

    fn name(&self) -> &str {
        "json"
    }
}

/// YAML definitions, as found in app definitions
#[derive(Debug, Clone, Default)]
pub struct YamlSerializer;

impl YamlSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl DefinitionSerializer for YamlSerializer {
    fn load(&self, bytes: &[u8]) -> Result<Remapper, RemapError> {
        let value: Value = serde_yaml::from_slice(bytes).map_err(|e| SerializationError::DeserializationFailed {
            reason: format!("YAML deserialization failed: {}", e),
        })?;
        Ok(Remapper::parse(&value)?)
    }

    fn dump(&self, remapper: &Remapper) -> Result<Vec<u8>, SerializationError> {
        serde_yaml::to_string(&remapper.to_value())
            .map(String::into_bytes)
            .map_err(|e| SerializationError::SerializationFailed {
                reason: format!("YAML serialization failed: {}", e),
            })
    }

    fn name(&self) -> &str {
        "yaml"
    }
}

/// Pick a serializer from a file extension
pub fn serializer_for_extension(extension: &str) -> Option<Box<dyn DefinitionSerializer>> {
    match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "json" => Some(Box::new(JsonSerializer::new())),
        "yaml" | "yml" => Some(Box::new(YamlSerializer::new())),
        _ => None,
    }
}

impl Remapper {
    /// Render this remapper in its serialized definition shape
    pub fn to_value(&self) -> Value {
        match self {
            Remapper::Literal(value) => value.clone(),
            Remapper::Steps(steps) => Value::Array(steps.iter().map(Step::to_value).collect()),
        }
    }
}

impl Step {
    /// Render this step as a single-key `{ operator: args }` object
    pub fn to_value(&self) -> Value {
        let args = match self {
            Step::Static(value) => value.clone(),
            Step::Prop(path) | Step::Context(path) | Step::User(path) => Value::String(path.clone()),
            Step::Root => Value::Null,
            Step::Array(ArrayProperty::Index) => Value::from("index"),
            Step::Array(ArrayProperty::Length) => Value::from("length"),
            Step::ObjectFrom(entries) | Step::ObjectAssign(entries) => remapper_map(entries),
            Step::ObjectOmit(keys) => Value::from(keys.clone()),
            Step::ArrayMap(remappers) | Step::Equals(remappers) | Step::Not(remappers) => {
                Value::Array(remappers.iter().map(Remapper::to_value).collect())
            }
            Step::If(conditional) => {
                let mut map = Map::new();
                map.insert("condition".to_string(), conditional.condition.to_value());
                map.insert("then".to_string(), conditional.then.to_value());
                map.insert("else".to_string(), conditional.otherwise.to_value());
                Value::Object(map)
            }
            Step::StringCase(StringCase::Upper) => Value::from("upper"),
            Step::StringCase(StringCase::Lower) => Value::from("lower"),
            Step::StringCase(StringCase::Unchanged(value)) => value.clone(),
            Step::StringFormat(format) => {
                let mut map = Map::new();
                if let Some(id) = &format.message_id {
                    map.insert("messageId".to_string(), Value::String(id.clone()));
                }
                if let Some(template) = &format.template {
                    map.insert("template".to_string(), Value::String(template.clone()));
                }
                if !format.values.is_empty() {
                    map.insert("values".to_string(), remapper_map(&format.values));
                }
                Value::Object(map)
            }
            Step::StringReplace(replace) => {
                let mut map = Map::new();
                map.insert(replace.source().to_string(), Value::String(replace.replacement().to_string()));
                Value::Object(map)
            }
            Step::DateParse(format) => format.clone().map(Value::String).unwrap_or(Value::Null),
        };

        let mut step = Map::new();
        step.insert(self.operator_name().to_string(), args);
        Value::Object(step)
    }
}

fn remapper_map(entries: &[(String, Remapper)]) -> Value {
    Value::Object(
        entries
            .iter()
            .map(|(key, remapper)| (key.clone(), remapper.to_value()))
            .collect(),
    )
}

impl Serialize for Remapper {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Remapper {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Remapper::parse(&value).map_err(D::Error::custom)
    }
}
