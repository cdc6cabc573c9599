//! Resource types and the API shapes they share.

pub mod chart;
pub mod dashboard;
pub mod dashboard_group;
pub mod detector;
pub mod team;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::validation::{PlotType, ValueUnit};

/// `None` for an empty string.
pub(crate) fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Decodes a field the API may send as `null`, falling back to `T::default()`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decodes a response object into its wire struct.
pub(crate) fn decode<T: DeserializeOwned>(type_name: &str, value: &Value) -> Result<T> {
    T::deserialize(value)
        .map_err(|err| Error::unexpected(format!("{type_name} response could not be decoded: {err}")))
}

/// Per-series display settings, `publishLabelOptions[]` in the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPublishLabel {
    /// `publish()` label the settings apply to
    pub label: String,
    /// Legend name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette_index: Option<u32>,
    /// 0 for left, 1 for right
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<u8>,
    /// Per-series plot type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot_type: Option<PlotType>,
    /// Value unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_unit: Option<ValueUnit>,
    /// Text before the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_prefix: Option<String>,
    /// Text after the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_suffix: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Sample {
        #[serde(default, deserialize_with = "null_as_default")]
        tags: Vec<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        hidden: bool,
    }

    #[test]
    fn test_null_as_default() {
        let sample: Sample = decode("sample", &json!({"tags": null, "hidden": null})).unwrap();
        assert!(sample.tags.is_empty());
        assert!(!sample.hidden);

        let sample: Sample = decode("sample", &json!({"creator": "U1"})).unwrap();
        assert!(sample.tags.is_empty());

        let sample: Sample = decode("sample", &json!({"tags": ["a"], "hidden": true})).unwrap();
        assert_eq!(sample.tags, vec!["a"]);
        assert!(sample.hidden);

        let err = decode::<Sample>("sample", &json!({"tags": "a"})).unwrap_err();
        assert!(err.to_string().contains("sample response could not be decoded"));
    }
}
