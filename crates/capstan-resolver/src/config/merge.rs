//! Defaults merger.
//!
//! Merge rules, applied per top-level key:
//! - a key present in the configuration wins over the default;
//! - when both sides hold a plain object (e.g. `storage`), the merge goes
//!   exactly one level deeper and every sub-value is taken whole from one
//!   side, so `storage.blob` from the configuration is used verbatim;
//! - an object that is itself an extension entry (it has a `type`, like
//!   `compaction`) is atomic: fields of a default entry never leak into a
//!   configured entry;
//! - arrays (`tools`, `plugins`) are replaced wholesale.

use serde_json::{Map, Value};

use super::ConfigDocument;
use crate::schema::TYPE_KEY;

/// Merge bundle `defaults` under `config`.
pub fn apply_defaults(config: &ConfigDocument, defaults: Option<&ConfigDocument>) -> ConfigDocument {
    let Some(defaults) = defaults else {
        return config.clone();
    };

    let mut merged = config.as_map().clone();
    for (key, default_value) in defaults.iter() {
        match merged.get_mut(key) {
            None => {
                merged.insert(key.clone(), default_value.clone());
            }
            Some(Value::Object(configured)) => {
                if let Value::Object(default_section) = default_value {
                    fill_section(configured, default_section);
                }
            }
            Some(_) => {}
        }
    }
    ConfigDocument::from_map(merged)
}

fn fill_section(configured: &mut Map<String, Value>, defaults: &Map<String, Value>) {
    if is_entry(configured) || is_entry(defaults) {
        return;
    }
    for (key, value) in defaults {
        if !configured.contains_key(key) {
            configured.insert(key.clone(), value.clone());
        }
    }
}

fn is_entry(section: &Map<String, Value>) -> bool {
    section.contains_key(TYPE_KEY)
}
