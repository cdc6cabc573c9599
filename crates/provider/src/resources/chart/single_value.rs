//! `signalform_single_value_chart`: one large number.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    ApiChart, ApiChartOptions, ApiColorScale, ApiProgramOptions, CHART_API_PATH,
    CHART_APP_PATH, ChartVizOptions, ColorScale, base_block, color_scale_block,
    color_scales_from_api, color_scales_to_api, publish_labels, validate_viz_options,
    viz_block, viz_from_labels,
};
use crate::error::{Error, Result};
use crate::lifecycle::Resource;
use crate::resources::{ApiPublishLabel, null_as_default};
use crate::schema::{Attribute, AttributeType, Nesting, Schema, with_lifecycle_attributes};
use crate::validation::{
    ScaleColorBy, SecondaryVisualization, UnitPrefix, ms_to_secs, require, secs_to_ms,
    validate_max_delay, validate_program_text,
};

/// Single value chart configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleValueChartConfig {
    /// Chart name
    pub name: String,
    /// Description
    pub description: String,
    /// SignalFlow program
    pub program_text: String,
    /// Metric or binary prefixes
    pub unit_prefix: UnitPrefix,
    /// Color by dimension, metric or scale
    pub color_by: ScaleColorBy,
    /// How long to wait for late data, seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay: Option<i64>,
    /// Refresh interval, seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<i64>,
    /// Digits shown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_precision: Option<u32>,
    /// Hide the timestamp under the value
    pub is_timestamp_hidden: bool,
    /// Secondary visualization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_visualization: Option<SecondaryVisualization>,
    /// Show a sparkline under the value
    pub show_spark_line: bool,
    /// Value ranges to colors, requires `color_by = "Scale"`
    pub color_scale: Vec<ColorScale>,
    /// Per-series display settings
    pub viz_options: Vec<ChartVizOptions>,
}

/// `options` of a `SingleValue` chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleValueChartOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit_prefix: Option<UnitPrefix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color_by: Option<ScaleColorBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    program_options: Option<ApiProgramOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_interval: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_precision: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    timestamp_hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secondary_visualization: Option<SecondaryVisualization>,
    #[serde(default, deserialize_with = "null_as_default")]
    show_spark_line: bool,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        rename = "colorScale2",
        skip_serializing_if = "Vec::is_empty"
    )]
    color_scale: Vec<ApiColorScale>,
    #[serde(default, deserialize_with = "null_as_default")]
    publish_label_options: Vec<ApiPublishLabel>,
}

/// The single value chart resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleValueChart;

#[async_trait]
impl Resource for SingleValueChart {
    type Config = SingleValueChartConfig;

    const TYPE_NAME: &'static str = "signalform_single_value_chart";
    const API_PATH: &'static str = CHART_API_PATH;
    const APP_PATH: &'static str = CHART_APP_PATH;

    fn schema(&self) -> Schema {
        let block = base_block(true)
            .attribute(
                Attribute::optional("unit_prefix", AttributeType::String)
                    .allowed(UnitPrefix::allowed())
                    .default_value(UnitPrefix::Metric.as_str()),
            )
            .attribute(
                Attribute::optional("color_by", AttributeType::String)
                    .allowed(ScaleColorBy::allowed())
                    .default_value(ScaleColorBy::Dimension.as_str()),
            )
            .attribute(Attribute::optional("max_delay", AttributeType::Int).describe("Seconds, 0 to 900"))
            .attribute(Attribute::optional("refresh_interval", AttributeType::Int).describe("Seconds"))
            .attribute(Attribute::optional("max_precision", AttributeType::Int))
            .attribute(Attribute::optional("is_timestamp_hidden", AttributeType::Bool).default_value(false))
            .attribute(
                Attribute::optional("secondary_visualization", AttributeType::String)
                    .allowed(SecondaryVisualization::allowed()),
            )
            .attribute(Attribute::optional("show_spark_line", AttributeType::Bool).default_value(false))
            .nested("color_scale", Nesting::Set, 0, None, color_scale_block())
            .nested("viz_options", Nesting::Set, 0, None, viz_block(false));
        Schema {
            type_name: Self::TYPE_NAME,
            version: 0,
            block: with_lifecycle_attributes(block),
        }
    }

    fn validate(&self, config: &SingleValueChartConfig) -> Result<()> {
        require("name", &config.name)?;
        validate_program_text(&config.program_text)?;
        validate_max_delay(config.max_delay)?;
        if !config.color_scale.is_empty() && config.color_by != ScaleColorBy::Scale {
            return Err(Error::validation(
                "color_scale",
                "requires color_by = \"Scale\"",
            ));
        }
        color_scales_to_api(&config.color_scale)?;
        validate_viz_options(&config.viz_options)
    }

    fn to_payload(&self, config: &SingleValueChartConfig) -> Result<Value> {
        let options = SingleValueChartOptions {
            unit_prefix: Some(config.unit_prefix),
            color_by: Some(config.color_by),
            program_options: Some(ApiProgramOptions::from_secs(None, config.max_delay, false)),
            refresh_interval: config.refresh_interval.map(secs_to_ms),
            max_precision: config.max_precision,
            timestamp_hidden: config.is_timestamp_hidden,
            secondary_visualization: config.secondary_visualization,
            show_spark_line: config.show_spark_line,
            color_scale: color_scales_to_api(&config.color_scale)?,
            publish_label_options: publish_labels(&config.viz_options)?,
        };
        ApiChart::new(
            &config.name,
            &config.description,
            &config.program_text,
            ApiChartOptions::SingleValue(options),
        )
        .into_payload()
    }

    fn apply_response(&self, config: &mut SingleValueChartConfig, response: &Value) -> Result<()> {
        let chart = ApiChart::decode(Self::TYPE_NAME, "SingleValue", response)?;
        let ApiChartOptions::SingleValue(options) = chart.options else {
            return Err(Error::unexpected("options are not a single value chart"));
        };

        config.name = chart.name;
        config.description = chart.description.unwrap_or_default();
        config.program_text = chart.program_text.unwrap_or_default();
        config.unit_prefix = options.unit_prefix.unwrap_or_default();
        config.color_by = options.color_by.unwrap_or_default();
        config.max_delay = options.program_options.unwrap_or_default().to_secs().1;
        config.refresh_interval = options.refresh_interval.map(ms_to_secs);
        config.max_precision = options.max_precision;
        config.is_timestamp_hidden = options.timestamp_hidden;
        config.secondary_visualization = options.secondary_visualization;
        config.show_spark_line = options.show_spark_line;
        config.color_scale = color_scales_from_api(options.color_scale);
        config.viz_options = viz_from_labels(options.publish_label_options);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SingleValueChartConfig {
        SingleValueChartConfig {
            name: "Error rate".to_string(),
            program_text: "data('errors').sum().publish('A')".to_string(),
            max_delay: Some(60),
            max_precision: Some(4),
            is_timestamp_hidden: true,
            show_spark_line: true,
            secondary_visualization: Some(SecondaryVisualization::Radial),
            ..SingleValueChartConfig::default()
        }
    }

    #[test]
    fn test_payload_shape() {
        let payload = SingleValueChart.to_payload(&config()).unwrap();
        let options = &payload["options"];
        assert_eq!(options["type"], "SingleValue");
        assert_eq!(options["timestampHidden"], true);
        assert_eq!(options["showSparkLine"], true);
        assert_eq!(options["programOptions"]["maxDelay"], 60_000);
        assert!(options.get("colorScale2").is_none());
    }

    #[test]
    fn test_response_maps_back() {
        let payload = SingleValueChart.to_payload(&config()).unwrap();
        let mut read = SingleValueChartConfig::default();
        SingleValueChart.apply_response(&mut read, &payload).unwrap();
        assert_eq!(read, config());
    }

    #[test]
    fn test_color_scale_requires_scale_coloring() {
        let mut config = config();
        config.color_scale.push(ColorScale {
            gt: Some(1.0),
            color: "red".to_string(),
            ..ColorScale::default()
        });
        assert!(SingleValueChart.validate(&config).is_err());
        config.color_by = ScaleColorBy::Scale;
        assert!(SingleValueChart.validate(&config).is_ok());
    }
}
