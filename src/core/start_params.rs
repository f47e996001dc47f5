//! Start parameters - the display payload delivered with a start request

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default indicator title when the caller omits one
pub const DEFAULT_TITLE: &str = "Location Service";

/// Default indicator body text when the caller omits one
pub const DEFAULT_CONTENT: &str = "Tracking location in background";

/// Default icon reference when the caller omits one
pub const DEFAULT_ICON: &str = "ic_location";

/// Argument keys understood by the start command
pub mod keys {
    pub const TITLE: &str = "title";
    pub const CONTENT: &str = "content";
    pub const ICON: &str = "icon";
}

/// Display parameters for one background task lifetime.
///
/// Doubles as the intent payload the OS keeps for sticky restarts, hence the
/// serde derives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartParameters {
    pub title: String,
    pub content: String,
    #[serde(rename = "icon")]
    pub icon_ref: String,
}

impl StartParameters {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        icon_ref: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            icon_ref: icon_ref.into(),
        }
    }

    /// Build parameters from a loosely-typed argument map.
    ///
    /// Missing keys and non-string values both fall back to the defaults.
    pub fn from_args(args: &Map<String, Value>) -> Self {
        Self {
            title: string_arg(args, keys::TITLE).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            content: string_arg(args, keys::CONTENT)
                .unwrap_or_else(|| DEFAULT_CONTENT.to_string()),
            icon_ref: string_arg(args, keys::ICON).unwrap_or_else(|| DEFAULT_ICON.to_string()),
        }
    }

    /// Same as [`from_args`](Self::from_args) for an arbitrary JSON value.
    /// Anything other than an object yields the defaults.
    pub fn from_value(value: &Value) -> Self {
        match value.as_object() {
            Some(args) => Self::from_args(args),
            None => Self::default(),
        }
    }
}

impl Default for StartParameters {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE, DEFAULT_CONTENT, DEFAULT_ICON)
    }
}

fn string_arg(args: &Map<String, Value>, key: &str) -> Option<String> {
    args.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_when_empty() {
        let params = StartParameters::from_args(&Map::new());
        assert_eq!(params.title, "Location Service");
        assert_eq!(params.content, "Tracking location in background");
        assert_eq!(params.icon_ref, "ic_location");
    }

    #[test]
    fn test_explicit_values() {
        let args = json!({"title": "T", "content": "C", "icon": "i"});
        let params = StartParameters::from_value(&args);
        assert_eq!(params, StartParameters::new("T", "C", "i"));
    }

    #[test]
    fn test_wrong_types_fall_back_silently() {
        let args = json!({"title": 42, "content": null, "icon": ["x"]});
        assert_eq!(StartParameters::from_value(&args), StartParameters::default());
    }

    #[test]
    fn test_partial_args() {
        let args = json!({"content": "Sharing trip"});
        let params = StartParameters::from_value(&args);
        assert_eq!(params.title, DEFAULT_TITLE);
        assert_eq!(params.content, "Sharing trip");
        assert_eq!(params.icon_ref, DEFAULT_ICON);
    }

    #[test]
    fn test_non_object_value() {
        assert_eq!(StartParameters::from_value(&Value::Null), StartParameters::default());
        assert_eq!(
            StartParameters::from_value(&json!("title")),
            StartParameters::default()
        );
    }

    #[test]
    fn test_intent_payload_uses_icon_key() {
        let value = serde_json::to_value(StartParameters::new("T", "C", "i")).unwrap();
        assert_eq!(value["icon"], "i");
        assert!(value.get("icon_ref").is_none());
    }
}
