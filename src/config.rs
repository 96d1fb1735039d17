//! Engine configuration

use serde::{Deserialize, Serialize};

/// Default nesting limit for remapper evaluation
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Settings shared by every evaluation that uses a context.
///
/// Usually embedded in an app's settings and deserialized alongside them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Locale used by the default message catalog
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Maximum nesting of remappers before evaluation is aborted
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            max_depth: default_max_depth(),
        }
    }
}
