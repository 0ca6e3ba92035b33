//! Runtime configuration schemas attached to factories.
//!
//! A schema decides whether a configuration entry is acceptable before the
//! factory ever sees it. The typed schema validates by deserializing into the
//! factory's own config struct, so `#[serde(deny_unknown_fields)]` on that
//! struct is how a factory rejects unrecognised keys.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::SchemaError;

/// Key holding the factory selector; consumed by lookup, not by schemas.
pub const TYPE_KEY: &str = "type";

/// Key toggling tool and plugin entries; stripped before validation.
pub const ENABLED_KEY: &str = "enabled";

type Validator = dyn Fn(Value) -> Result<(), serde_json::Error> + Send + Sync;

#[derive(Clone)]
pub struct ConfigSchema {
    name: Cow<'static, str>,
    validator: Option<Arc<Validator>>,
}

impl ConfigSchema {
    /// Schema satisfied by any value that deserializes into `C`.
    pub fn of<C: DeserializeOwned + 'static>() -> Self {
        let full = std::any::type_name::<C>();
        let short = full.rsplit("::").next().unwrap_or(full);
        Self {
            name: Cow::Owned(short.to_string()),
            validator: Some(Arc::new(|value| {
                serde_json::from_value::<C>(value).map(|_| ())
            })),
        }
    }

    /// Schema accepting any configuration object.
    pub fn permissive() -> Self {
        Self {
            name: Cow::Borrowed("any object"),
            validator: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validate `entry` and return the options object the factory receives:
    /// the entry minus its `type` selector.
    pub fn validate(&self, entry: &Value) -> Result<Value, SchemaError> {
        let options = options_of(entry)?;
        if let Some(validator) = &self.validator {
            validator(options.clone()).map_err(|source| SchemaError::Mismatch {
                schema: self.name.to_string(),
                source,
            })?;
        }
        Ok(options)
    }
}

impl fmt::Debug for ConfigSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigSchema")
            .field("name", &self.name)
            .finish()
    }
}

fn options_of(entry: &Value) -> Result<Value, SchemaError> {
    match entry {
        Value::Object(map) => {
            let options: Map<String, Value> = map
                .iter()
                .filter(|(key, _)| key.as_str() != TYPE_KEY)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            Ok(Value::Object(options))
        }
        other => Err(SchemaError::NotAnObject {
            found: json_kind(other),
        }),
    }
}

/// Human-readable JSON kind for diagnostics.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
