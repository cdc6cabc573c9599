//! `signalform_heatmap_chart`.
//!
//! A heatmap is colored either by a continuous range (`color_range`) or by
//! discrete thresholds (`color_scale`). The two are mutually exclusive and
//! select `colorBy` as `Range` or `Scale`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    ApiChart, ApiChartOptions, ApiColorScale, ApiProgramOptions, CHART_API_PATH,
    CHART_APP_PATH, ColorScale, base_block, color_scale_block, color_scales_from_api,
    color_scales_to_api,
};
use crate::error::{Error, Result};
use crate::lifecycle::Resource;
use crate::resources::null_as_default;
use crate::schema::{Attribute, AttributeType, Block, Nesting, Schema, with_lifecycle_attributes};
use crate::validation::{
    UnitPrefix, ms_to_secs, require, secs_to_ms, validate_hex_color, validate_max_delay,
    validate_program_text, validate_sort_by,
};

/// Continuous coloring between two values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorRange {
    /// Value mapped to the lightest shade
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    /// Value mapped to the darkest shade
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    /// Base color as `#rrggbb`
    pub color: String,
}

/// Heatmap chart configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapChartConfig {
    /// Chart name
    pub name: String,
    /// Description
    pub description: String,
    /// SignalFlow program
    pub program_text: String,
    /// Metric or binary prefixes
    pub unit_prefix: UnitPrefix,
    /// Minimum data resolution, seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_resolution: Option<i64>,
    /// How long to wait for late data, seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay: Option<i64>,
    /// Disable sampling
    pub disable_sampling: bool,
    /// Dimensions to group cells by, outermost first
    pub group_by: Vec<String>,
    /// Sort expression such as `+host`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    /// Hide the timestamp
    pub hide_timestamp: bool,
    /// Refresh interval, seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<i64>,
    /// Continuous coloring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_range: Option<ColorRange>,
    /// Threshold coloring
    pub color_scale: Vec<ColorScale>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiColorRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
    color: String,
}

/// `options` of a `Heatmap` chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapChartOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit_prefix: Option<UnitPrefix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    program_options: Option<ApiProgramOptions>,
    #[serde(default, deserialize_with = "null_as_default")]
    group_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sort_by: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    timestamp_hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_interval: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color_range: Option<ApiColorRange>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        rename = "colorScale2",
        skip_serializing_if = "Vec::is_empty"
    )]
    color_scale: Vec<ApiColorScale>,
}

/// The heatmap chart resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeatmapChart;

#[async_trait]
impl Resource for HeatmapChart {
    type Config = HeatmapChartConfig;

    const TYPE_NAME: &'static str = "signalform_heatmap_chart";
    const API_PATH: &'static str = CHART_API_PATH;
    const APP_PATH: &'static str = CHART_APP_PATH;

    fn schema(&self) -> Schema {
        let color_range = Block::new()
            .attribute(Attribute::optional("min_value", AttributeType::Float))
            .attribute(Attribute::optional("max_value", AttributeType::Float))
            .attribute(Attribute::required("color", AttributeType::String).describe("#rrggbb"));
        let block = base_block(true)
            .attribute(
                Attribute::optional("unit_prefix", AttributeType::String)
                    .allowed(UnitPrefix::allowed())
                    .default_value(UnitPrefix::Metric.as_str()),
            )
            .attribute(Attribute::optional("minimum_resolution", AttributeType::Int).describe("Seconds"))
            .attribute(Attribute::optional("max_delay", AttributeType::Int).describe("Seconds, 0 to 900"))
            .attribute(Attribute::optional("disable_sampling", AttributeType::Bool).default_value(false))
            .attribute(Attribute::optional("group_by", AttributeType::List))
            .attribute(Attribute::optional("sort_by", AttributeType::String))
            .attribute(Attribute::optional("hide_timestamp", AttributeType::Bool).default_value(false))
            .attribute(Attribute::optional("refresh_interval", AttributeType::Int).describe("Seconds"))
            .nested("color_range", Nesting::Single, 0, Some(1), color_range)
            .nested("color_scale", Nesting::Set, 0, None, color_scale_block());
        Schema {
            type_name: Self::TYPE_NAME,
            version: 0,
            block: with_lifecycle_attributes(block),
        }
    }

    fn validate(&self, config: &HeatmapChartConfig) -> Result<()> {
        require("name", &config.name)?;
        validate_program_text(&config.program_text)?;
        validate_max_delay(config.max_delay)?;
        if let Some(sort_by) = &config.sort_by {
            validate_sort_by(sort_by)?;
        }
        if config.color_range.is_some() && !config.color_scale.is_empty() {
            return Err(Error::validation(
                "color_range",
                "conflicts with color_scale",
            ));
        }
        if let Some(range) = &config.color_range {
            validate_hex_color("color_range.color", &range.color)?;
        }
        color_scales_to_api(&config.color_scale)?;
        Ok(())
    }

    fn to_payload(&self, config: &HeatmapChartConfig) -> Result<Value> {
        let color_scale = color_scales_to_api(&config.color_scale)?;
        let color_by = if config.color_range.is_some() {
            Some("Range".to_string())
        } else if !color_scale.is_empty() {
            Some("Scale".to_string())
        } else {
            None
        };
        let options = HeatmapChartOptions {
            unit_prefix: Some(config.unit_prefix),
            program_options: Some(ApiProgramOptions::from_secs(
                config.minimum_resolution,
                config.max_delay,
                config.disable_sampling,
            )),
            group_by: config.group_by.clone(),
            sort_by: config.sort_by.clone(),
            timestamp_hidden: config.hide_timestamp,
            refresh_interval: config.refresh_interval.map(secs_to_ms),
            color_by,
            color_range: config.color_range.as_ref().map(|range| ApiColorRange {
                min: range.min_value,
                max: range.max_value,
                color: range.color.clone(),
            }),
            color_scale,
        };
        ApiChart::new(
            &config.name,
            &config.description,
            &config.program_text,
            ApiChartOptions::Heatmap(options),
        )
        .into_payload()
    }

    fn apply_response(&self, config: &mut HeatmapChartConfig, response: &Value) -> Result<()> {
        let chart = ApiChart::decode(Self::TYPE_NAME, "Heatmap", response)?;
        let ApiChartOptions::Heatmap(options) = chart.options else {
            return Err(Error::unexpected("options are not a heatmap"));
        };

        config.name = chart.name;
        config.description = chart.description.unwrap_or_default();
        config.program_text = chart.program_text.unwrap_or_default();
        config.unit_prefix = options.unit_prefix.unwrap_or_default();
        let program = options.program_options.unwrap_or_default();
        (config.minimum_resolution, config.max_delay) = program.to_secs();
        config.disable_sampling = program.disable_sampling;
        config.group_by = options.group_by;
        config.sort_by = options.sort_by;
        config.hide_timestamp = options.timestamp_hidden;
        config.refresh_interval = options.refresh_interval.map(ms_to_secs);
        config.color_range = options.color_range.map(|range| ColorRange {
            min_value: range.min,
            max_value: range.max,
            color: range.color,
        });
        config.color_scale = color_scales_from_api(options.color_scale);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config() -> HeatmapChartConfig {
        HeatmapChartConfig {
            name: "CPU by host".to_string(),
            program_text: "data('cpu.utilization').publish('A')".to_string(),
            minimum_resolution: Some(60),
            group_by: vec!["az".to_string(), "host".to_string()],
            sort_by: Some("+host".to_string()),
            hide_timestamp: true,
            color_range: Some(ColorRange {
                min_value: Some(0.0),
                max_value: Some(100.0),
                color: "#ff0000".to_string(),
            }),
            ..HeatmapChartConfig::default()
        }
    }

    #[test]
    fn test_color_range_payload() {
        let payload = HeatmapChart.to_payload(&config()).unwrap();
        let options = &payload["options"];
        assert_eq!(options["type"], "Heatmap");
        assert_eq!(options["colorBy"], "Range");
        assert_eq!(
            options["colorRange"],
            json!({"min": 0.0, "max": 100.0, "color": "#ff0000"})
        );
        assert_eq!(options["groupBy"], json!(["az", "host"]));
        assert_eq!(options["timestampHidden"], true);
        assert_eq!(options["programOptions"]["minimumResolution"], 60_000);
    }

    #[test]
    fn test_color_scale_payload() {
        let mut config = config();
        config.color_range = None;
        config.color_scale = vec![ColorScale {
            gt: Some(80.0),
            color: "red".to_string(),
            ..ColorScale::default()
        }];
        let payload = HeatmapChart.to_payload(&config).unwrap();
        assert_eq!(payload["options"]["colorBy"], "Scale");
        assert!(payload["options"].get("colorRange").is_none());
    }

    #[test]
    fn test_response_maps_back() {
        let payload = HeatmapChart.to_payload(&config()).unwrap();
        let mut read = HeatmapChartConfig::default();
        HeatmapChart.apply_response(&mut read, &payload).unwrap();
        assert_eq!(read, config());
    }

    #[test]
    fn test_server_body_with_nulls() {
        let body = json!({
            "id": "C1",
            "name": "CPU by host",
            "description": null,
            "programText": "data('cpu.utilization').publish('A')",
            "options": {
                "type": "Heatmap",
                "groupBy": null,
                "sortBy": null,
                "timestampHidden": null,
                "colorBy": null,
                "colorRange": null,
                "colorScale2": null,
                "colorScale": null
            }
        });
        let mut read = config();
        HeatmapChart.apply_response(&mut read, &body).unwrap();
        assert!(read.group_by.is_empty());
        assert!(read.sort_by.is_none());
        assert!(read.color_range.is_none());
        assert!(read.color_scale.is_empty());
        assert!(!read.hide_timestamp);
    }

    #[test]
    fn test_range_and_scale_conflict() {
        let mut config = config();
        config.color_scale = vec![ColorScale {
            gt: Some(80.0),
            color: "red".to_string(),
            ..ColorScale::default()
        }];
        let err = HeatmapChart.validate(&config).unwrap_err();
        assert!(err.to_string().contains("conflicts"));
    }

    #[test]
    fn test_range_color_must_be_hex() {
        let mut config = config();
        if let Some(range) = config.color_range.as_mut() {
            range.color = "red".to_string();
        }
        assert!(HeatmapChart.validate(&config).is_err());
    }
}
