//! `signalform_detector`: SignalFlow detectors with alerting rules.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use signalform_client::{SignalFxClient, StatusCode};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::lifecycle::Resource;
use crate::palette;
use crate::resources::{ApiPublishLabel, decode, non_empty, null_as_default};
use crate::rule::{ApiRule, RuleSet};
use crate::schema::{Attribute, AttributeType, Block, Nesting, Schema, with_lifecycle_attributes};
use crate::time::ApiTime;
use crate::validation::{
    Severity, ValueUnit, ms_to_secs, require, secs_to_ms, validate_max_delay,
    validate_program_text, validate_time_window,
};

/// Server-side program check run before every write.
pub const VALIDATE_PATH: &str = "/v2/detector/validate";

/// Display settings for one published stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorVizOptions {
    /// `publish()` label
    pub label: String,
    /// Legend name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Palette color name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Value unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_unit: Option<ValueUnit>,
    /// Text before the value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_prefix: Option<String>,
    /// Text after the value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_suffix: Option<String>,
}

/// Detector configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Detector name
    pub name: String,
    /// Description
    pub description: String,
    /// SignalFlow program
    pub program_text: String,
    /// Relative window shown in the detector view, seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<i64>,
    /// Absolute window start, epoch seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    /// Absolute window end, epoch seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    /// How long to wait for late data, seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay: Option<i64>,
    /// Show data points on lines
    pub show_data_markers: bool,
    /// Show event lines
    pub show_event_lines: bool,
    /// Disable sampling of high cardinality results
    pub disable_sampling: bool,
    /// Time zone used by calendar window functions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    /// Owning team IDs
    pub teams: Vec<String>,
    /// Tags
    pub tags: Vec<String>,
    /// Per-stream display settings
    pub viz_options: Vec<DetectorVizOptions>,
    /// Alerting rules
    pub rule: RuleSet,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiVisualization {
    #[serde(default, deserialize_with = "null_as_default")]
    disable_sampling: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    show_data_markers: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    show_event_lines: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time: Option<ApiTime>,
    #[serde(default, deserialize_with = "null_as_default")]
    publish_label_options: Vec<ApiPublishLabel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiDetector {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    program_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_delay: Option<i64>,
    #[serde(default, rename = "timezone", skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    teams: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    rules: Vec<ApiRule>,
    #[serde(default)]
    visualization_options: Option<ApiVisualization>,
}

/// The detector resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detector;

impl Detector {
    fn viz_block() -> Block {
        Block::new()
            .attribute(Attribute::required("label", AttributeType::String).describe("publish() label"))
            .attribute(Attribute::optional("display_name", AttributeType::String))
            .attribute(
                Attribute::optional("color", AttributeType::String)
                    .describe("Palette color name")
                    .allowed(palette::PALETTE.iter().map(|(name, _)| *name).collect()),
            )
            .attribute(
                Attribute::optional("value_unit", AttributeType::String)
                    .allowed(ValueUnit::allowed()),
            )
            .attribute(Attribute::optional("value_prefix", AttributeType::String))
            .attribute(Attribute::optional("value_suffix", AttributeType::String))
    }

    fn rule_block() -> Block {
        Block::new()
            .attribute(Attribute::optional("description", AttributeType::String))
            .attribute(
                Attribute::required("severity", AttributeType::String).allowed(Severity::allowed()),
            )
            .attribute(
                Attribute::required("detect_label", AttributeType::String)
                    .describe("Label of the detect() block this rule fires on"),
            )
            .attribute(Attribute::optional("disabled", AttributeType::Bool).default_value(false))
            .attribute(
                Attribute::optional("notifications", AttributeType::List)
                    .describe("Compact notification strings, e.g. Email,oncall@example.com"),
            )
            .attribute(Attribute::optional("parameterized_body", AttributeType::String))
            .attribute(Attribute::optional("parameterized_subject", AttributeType::String))
            .attribute(Attribute::optional("runbook_url", AttributeType::String))
            .attribute(Attribute::optional("tip", AttributeType::String))
    }
}

#[async_trait]
impl Resource for Detector {
    type Config = DetectorConfig;

    const TYPE_NAME: &'static str = "signalform_detector";
    const API_PATH: &'static str = "/v2/detector";
    const APP_PATH: &'static str = "/detector/v2/";

    fn schema(&self) -> Schema {
        let block = Block::new()
            .attribute(Attribute::required("name", AttributeType::String))
            .attribute(Attribute::optional("description", AttributeType::String))
            .attribute(
                Attribute::required("program_text", AttributeType::String)
                    .describe("SignalFlow program, up to 50000 characters"),
            )
            .attribute(
                Attribute::optional("time_range", AttributeType::Int)
                    .describe("Relative window in seconds")
                    .conflicts_with(&["start_time", "end_time"]),
            )
            .attribute(
                Attribute::optional("start_time", AttributeType::Int)
                    .conflicts_with(&["time_range"]),
            )
            .attribute(
                Attribute::optional("end_time", AttributeType::Int)
                    .conflicts_with(&["time_range"]),
            )
            .attribute(
                Attribute::optional("max_delay", AttributeType::Int)
                    .describe("Seconds to wait for late data, 0 to 900"),
            )
            .attribute(Attribute::optional("show_data_markers", AttributeType::Bool).default_value(false))
            .attribute(Attribute::optional("show_event_lines", AttributeType::Bool).default_value(false))
            .attribute(Attribute::optional("disable_sampling", AttributeType::Bool).default_value(false))
            .attribute(Attribute::optional("time_zone", AttributeType::String))
            .attribute(Attribute::optional("teams", AttributeType::Set))
            .attribute(Attribute::optional("tags", AttributeType::Set))
            .nested("viz_options", Nesting::Set, 0, None, Self::viz_block())
            .nested("rule", Nesting::Set, 1, None, Self::rule_block());

        Schema {
            type_name: Self::TYPE_NAME,
            version: 0,
            block: with_lifecycle_attributes(block),
        }
    }

    fn validate(&self, config: &DetectorConfig) -> Result<()> {
        require("name", &config.name)?;
        validate_program_text(&config.program_text)?;
        validate_max_delay(config.max_delay)?;
        validate_time_window(config.time_range.as_ref(), config.start_time, config.end_time)?;
        for viz in &config.viz_options {
            require("viz_options.label", &viz.label)?;
            if let Some(color) = &viz.color {
                palette::validate_color_name("viz_options.color", color)?;
            }
        }
        if config.rule.is_empty() {
            return Err(Error::validation("rule", "at least one rule is required"));
        }
        config.rule.validate()
    }

    fn to_payload(&self, config: &DetectorConfig) -> Result<Value> {
        let publish_label_options = config
            .viz_options
            .iter()
            .map(|viz| {
                Ok(ApiPublishLabel {
                    label: viz.label.clone(),
                    display_name: viz.display_name.clone(),
                    palette_index: palette::optional_index("viz_options.color", viz.color.as_deref())?,
                    value_unit: viz.value_unit,
                    value_prefix: viz.value_prefix.clone(),
                    value_suffix: viz.value_suffix.clone(),
                    ..ApiPublishLabel::default()
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let api = ApiDetector {
            name: config.name.clone(),
            description: non_empty(&config.description),
            program_text: config.program_text.clone(),
            max_delay: config.max_delay.map(secs_to_ms),
            time_zone: config.time_zone.clone(),
            teams: config.teams.clone(),
            tags: config.tags.clone(),
            rules: config.rule.to_api()?,
            visualization_options: Some(ApiVisualization {
                disable_sampling: config.disable_sampling,
                show_data_markers: config.show_data_markers,
                show_event_lines: config.show_event_lines,
                time: ApiTime::from_secs(config.time_range, config.start_time, config.end_time),
                publish_label_options,
            }),
        };
        Ok(serde_json::to_value(api)?)
    }

    fn apply_response(&self, config: &mut DetectorConfig, response: &Value) -> Result<()> {
        let api: ApiDetector = decode(Self::TYPE_NAME, response)?;

        config.name = api.name;
        config.description = api.description.unwrap_or_default();
        config.program_text = api.program_text;
        config.max_delay = api.max_delay.map(ms_to_secs);
        config.time_zone = api.time_zone;
        config.teams = api.teams;
        config.tags = api.tags;
        config.rule = RuleSet::from_api(&api.rules);

        let viz = api.visualization_options.unwrap_or_default();
        config.disable_sampling = viz.disable_sampling;
        config.show_data_markers = viz.show_data_markers;
        config.show_event_lines = viz.show_event_lines;
        (config.time_range, config.start_time, config.end_time) =
            viz.time.map_or((None, None, None), ApiTime::to_secs);
        config.viz_options = viz
            .publish_label_options
            .into_iter()
            .map(|label| DetectorVizOptions {
                label: label.label,
                display_name: label.display_name,
                color: label
                    .palette_index
                    .and_then(palette::name_of)
                    .map(str::to_string),
                value_unit: label.value_unit,
                value_prefix: label.value_prefix,
                value_suffix: label.value_suffix,
            })
            .collect();
        Ok(())
    }

    fn app_fragment(&self, id: &str) -> String {
        format!("{}{id}/edit", Self::APP_PATH)
    }

    #[instrument(skip_all)]
    async fn before_write(&self, client: &SignalFxClient, payload: &Value) -> Result<()> {
        let response = client.post(VALIDATE_PATH, payload).await?;
        match response.status {
            StatusCode::OK | StatusCode::NO_CONTENT => {
                debug!("Detector program validated");
                Ok(())
            }
            _ => Err(Error::api(&response)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::rule::Rule;

    fn config() -> DetectorConfig {
        let mut rule = Rule::new(Severity::Critical, "cpu high");
        rule.notifications = vec!["Email,oncall@example.com".to_string()];
        DetectorConfig {
            name: "CPU".to_string(),
            program_text: "detect(when(data('cpu.utilization') > 90)).publish('cpu high')"
                .to_string(),
            time_range: Some(3600),
            max_delay: Some(30),
            viz_options: vec![DetectorVizOptions {
                label: "cpu high".to_string(),
                color: Some("red".to_string()),
                value_unit: Some(ValueUnit::Second),
                ..DetectorVizOptions::default()
            }],
            rule: vec![rule].into(),
            ..DetectorConfig::default()
        }
    }

    #[test]
    fn test_payload_shape() {
        let payload = Detector.to_payload(&config()).unwrap();
        assert_eq!(payload["programText"], config().program_text);
        assert_eq!(payload["maxDelay"], 30_000);
        assert!(payload.get("description").is_none());
        assert_eq!(
            payload["visualizationOptions"]["time"],
            json!({"type": "relative", "range": 3_600_000})
        );
        assert_eq!(
            payload["visualizationOptions"]["publishLabelOptions"][0],
            json!({"label": "cpu high", "paletteIndex": 16, "valueUnit": "Second"})
        );
        assert_eq!(payload["rules"][0]["notifications"][0]["email"], "oncall@example.com");
    }

    #[test]
    fn test_validate() {
        assert!(Detector.validate(&config()).is_ok());

        let mut no_rules = config();
        no_rules.rule = RuleSet::new();
        assert!(Detector.validate(&no_rules).is_err());

        let mut conflict = config();
        conflict.start_time = Some(1);
        assert!(Detector.validate(&conflict).is_err());

        let mut delay = config();
        delay.max_delay = Some(901);
        assert!(Detector.validate(&delay).is_err());

        let mut color = config();
        color.viz_options[0].color = Some("crimson".to_string());
        assert!(Detector.validate(&color).is_err());
    }

    #[test]
    fn test_response_maps_back() {
        let payload = Detector.to_payload(&config()).unwrap();
        let mut read = DetectorConfig::default();
        Detector.apply_response(&mut read, &payload).unwrap();
        assert_eq!(read, config());
    }

    #[test]
    fn test_server_body_with_nulls() {
        let body = json!({
            "id": "D1",
            "creator": "U1",
            "created": 1_700_000_000_000_i64,
            "lastUpdated": 1_700_000_000_000_i64,
            "name": "CPU",
            "description": null,
            "programText": "detect(when(data('cpu.utilization') > 90)).publish('cpu high')",
            "maxDelay": null,
            "timezone": null,
            "teams": null,
            "tags": null,
            "labelResolutions": {"cpu high": 1000},
            "rules": [{
                "severity": "Critical",
                "detectLabel": "cpu high",
                "disabled": null,
                "notifications": null,
                "runbookUrl": null
            }],
            "visualizationOptions": {
                "disableSampling": null,
                "showDataMarkers": true,
                "showEventLines": null,
                "time": null,
                "publishLabelOptions": null
            }
        });

        let mut read = DetectorConfig::default();
        Detector.apply_response(&mut read, &body).unwrap();
        assert_eq!(read.name, "CPU");
        assert!(read.description.is_empty());
        assert!(read.teams.is_empty());
        assert!(read.tags.is_empty());
        assert!(read.show_data_markers);
        assert!(!read.disable_sampling);
        assert!(read.viz_options.is_empty());
        assert_eq!(read.rule.len(), 1);
        let rule = read.rule.iter().next().unwrap();
        assert!(rule.notifications.is_empty());
        assert!(!rule.disabled);
    }

    #[test]
    fn test_app_fragment() {
        assert_eq!(Detector.app_fragment("ABC"), "/detector/v2/ABC/edit");
    }

    #[test]
    fn test_schema_requires_rule() {
        let schema = Detector.schema();
        assert_eq!(schema.type_name, "signalform_detector");
        assert_eq!(schema.block.find_block("rule").unwrap().min_items, 1);
        assert!(schema.block.find("program_text").is_some());
    }
}
