//! Environment and property sources, scrubbed before export.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scrubber::SecretScrubber;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl PropertyValue {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            origin: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertiesSource {
    pub name: String,
    pub properties: BTreeMap<String, PropertyValue>,
}

/// Payload of the `env` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentData {
    pub active_profiles: Vec<String>,
    pub property_sources: Vec<PropertiesSource>,
}

/// A named group of properties exposed on the `env` endpoint.
pub trait EnvironmentProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Current properties, already passed through `scrubber`.
    fn properties_source(&self, scrubber: &SecretScrubber) -> PropertiesSource;
}

/// Process environment variables.
#[derive(Debug, Default, Clone)]
pub struct OsEnvironmentProvider;

impl OsEnvironmentProvider {
    pub const NAME: &'static str = "systemEnvironment";

    pub fn new() -> Self {
        Self
    }
}

impl EnvironmentProvider for OsEnvironmentProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn properties_source(&self, scrubber: &SecretScrubber) -> PropertiesSource {
        // Non-UTF-8 variables are skipped.
        let properties = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .map(|(key, value)| {
                let scrubbed = scrubber.scrub(&key, &value);
                (key, PropertyValue::new(scrubbed))
            })
            .collect();

        PropertiesSource {
            name: Self::NAME.to_string(),
            properties,
        }
    }
}

/// Application-supplied properties. Nested objects are flattened into
/// dot-separated keys.
pub struct CustomEnvironmentProvider<F> {
    name: String,
    produce: F,
}

impl<F> CustomEnvironmentProvider<F>
where
    F: Fn() -> Value + Send + Sync,
{
    pub fn new(name: impl Into<String>, produce: F) -> Self {
        Self {
            name: name.into(),
            produce,
        }
    }
}

impl<F> EnvironmentProvider for CustomEnvironmentProvider<F>
where
    F: Fn() -> Value + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn properties_source(&self, scrubber: &SecretScrubber) -> PropertiesSource {
        let mut flat = BTreeMap::new();
        match (self.produce)() {
            Value::Object(map) => flatten("", &map, &mut flat),
            Value::Null => {}
            other => {
                tracing::warn!(source = %self.name, "custom environment is not an object");
                flat.insert(self.name.clone(), other);
            }
        }

        let properties = flat
            .into_iter()
            .map(|(key, value)| {
                let scrubbed = scrubber.scrub_json(&key, &value);
                (key, PropertyValue::new(scrubbed))
            })
            .collect();

        PropertiesSource {
            name: self.name.clone(),
            properties,
        }
    }
}

/// `{"b": {"c": 2}}` becomes `{"b.c": 2}`.
pub fn flatten(prefix: &str, object: &serde_json::Map<String, Value>, out: &mut BTreeMap<String, Value>) {
    for (key, value) in object {
        let full_key = format!("{}{}", prefix, key);
        match value {
            Value::Object(nested) => flatten(&format!("{}.", full_key), nested, out),
            leaf => {
                out.insert(full_key, leaf.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_objects() {
        let value = json!({"a": 1, "b": {"c": 2, "d": {"e": 3}}});
        let mut out = BTreeMap::new();
        flatten("", value.as_object().unwrap(), &mut out);
        assert_eq!(out.len(), 3);
        assert_eq!(out["a"], json!(1));
        assert_eq!(out["b.c"], json!(2));
        assert_eq!(out["b.d.e"], json!(3));
    }

    #[test]
    fn test_custom_provider_scrubs_after_flattening() {
        let provider = CustomEnvironmentProvider::new("custom", || {
            json!({
                "a": "s1",
                "b": {"secret": "ha ha", "c": 625},
                "d": {"e": true, "f": "hello", "g": {"h": 123, "i": "abcde"}}
            })
        });
        let source = provider.properties_source(&SecretScrubber::new());

        assert_eq!(source.name, "custom");
        let values: BTreeMap<&str, &Value> = source
            .properties
            .iter()
            .map(|(k, v)| (k.as_str(), &v.value))
            .collect();
        assert_eq!(values["a"], &json!("s1"));
        assert_eq!(values["b.secret"], &json!("******"));
        assert_eq!(values["b.c"], &json!(625));
        assert_eq!(values["d.e"], &json!(true));
        assert_eq!(values["d.g.h"], &json!(123));
        assert_eq!(values["d.g.i"], &json!("abcde"));
        assert_eq!(values.len(), 7);
    }

    #[test]
    fn test_property_value_omits_missing_origin() {
        let json = serde_json::to_value(PropertyValue::new("x")).unwrap();
        assert_eq!(json, json!({"value": "x"}));
    }
}
