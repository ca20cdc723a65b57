//! Application info document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDetails {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitCommitInfo {
    pub time: DateTime<Utc>,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitInfo {
    pub commit: GitCommitInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    pub app: AppDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<GitInfo>,
}

impl AppInfo {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            app: AppDetails {
                name: name.into(),
                description,
            },
            build: None,
            git: None,
        }
    }

    /// The `info` document: this record with `additional` merged on top.
    /// Additional keys replace same-named sections.
    pub fn document(&self, additional: &Map<String, Value>) -> Value {
        let mut doc = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for (key, value) in additional {
            doc.insert(key.clone(), value.clone());
        }
        Value::Object(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_sections_are_omitted() {
        let info = AppInfo::new("orders", None);
        assert_eq!(info.document(&Map::new()), json!({"app": {"name": "orders"}}));
    }

    #[test]
    fn test_additional_info_merges_at_top_level() {
        let mut info = AppInfo::new("orders", Some("Order service".into()));
        info.build = Some(BuildInfo {
            version: Some("1.2.3".into()),
            ..Default::default()
        });
        let mut extra = Map::new();
        extra.insert("team".into(), json!("payments"));

        let doc = info.document(&extra);
        assert_eq!(doc["app"]["description"], "Order service");
        assert_eq!(doc["build"], json!({"version": "1.2.3"}));
        assert_eq!(doc["team"], "payments");
        assert!(doc.get("git").is_none());
    }
}
