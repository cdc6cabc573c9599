//! `signalform_list_chart`: the latest value of each series as a sorted list.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    ApiChart, ApiChartOptions, ApiColorScale, ApiLegendOptions, ApiProgramOptions,
    CHART_API_PATH, CHART_APP_PATH, ChartVizOptions, ColorScale, base_block,
    color_scale_block, color_scales_from_api, color_scales_to_api, hidden_legend_fields,
    legend_hiding, publish_labels, validate_viz_options, viz_block, viz_from_labels,
};
use crate::error::{Error, Result};
use crate::lifecycle::Resource;
use crate::resources::{ApiPublishLabel, null_as_default};
use crate::schema::{Attribute, AttributeType, Nesting, Schema, with_lifecycle_attributes};
use crate::validation::{
    ScaleColorBy, SecondaryVisualization, UnitPrefix, ms_to_secs, require, secs_to_ms,
    validate_max_delay, validate_program_text, validate_sort_by,
};

/// List chart configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListChartConfig {
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
    /// Disable sampling
    pub disable_sampling: bool,
    /// Refresh interval, seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<i64>,
    /// Properties hidden from each row
    pub legend_fields_to_hide: Vec<String>,
    /// Digits shown per value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_precision: Option<u32>,
    /// Secondary visualization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_visualization: Option<SecondaryVisualization>,
    /// Sort expression such as `-value`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    /// Value ranges to colors, requires `color_by = "Scale"`
    pub color_scale: Vec<ColorScale>,
    /// Per-series display settings
    pub viz_options: Vec<ChartVizOptions>,
}

/// `options` of a `List` chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListChartOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit_prefix: Option<UnitPrefix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color_by: Option<ScaleColorBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    program_options: Option<ApiProgramOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_interval: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    legend_options: Option<ApiLegendOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secondary_visualization: Option<SecondaryVisualization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sort_by: Option<String>,
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

/// The list chart resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListChart;

#[async_trait]
impl Resource for ListChart {
    type Config = ListChartConfig;

    const TYPE_NAME: &'static str = "signalform_list_chart";
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
            .attribute(Attribute::optional("disable_sampling", AttributeType::Bool).default_value(false))
            .attribute(Attribute::optional("refresh_interval", AttributeType::Int).describe("Seconds"))
            .attribute(Attribute::optional("legend_fields_to_hide", AttributeType::Set))
            .attribute(Attribute::optional("max_precision", AttributeType::Int))
            .attribute(
                Attribute::optional("secondary_visualization", AttributeType::String)
                    .allowed(SecondaryVisualization::allowed()),
            )
            .attribute(
                Attribute::optional("sort_by", AttributeType::String)
                    .describe("+ or - followed by a property, e.g. -value"),
            )
            .nested("color_scale", Nesting::Set, 0, None, color_scale_block())
            .nested("viz_options", Nesting::Set, 0, None, viz_block(false));
        Schema {
            type_name: Self::TYPE_NAME,
            version: 0,
            block: with_lifecycle_attributes(block),
        }
    }

    fn validate(&self, config: &ListChartConfig) -> Result<()> {
        require("name", &config.name)?;
        validate_program_text(&config.program_text)?;
        validate_max_delay(config.max_delay)?;
        if let Some(sort_by) = &config.sort_by {
            validate_sort_by(sort_by)?;
        }
        if !config.color_scale.is_empty() && config.color_by != ScaleColorBy::Scale {
            return Err(Error::validation(
                "color_scale",
                "requires color_by = \"Scale\"",
            ));
        }
        color_scales_to_api(&config.color_scale)?;
        validate_viz_options(&config.viz_options)
    }

    fn to_payload(&self, config: &ListChartConfig) -> Result<Value> {
        let options = ListChartOptions {
            unit_prefix: Some(config.unit_prefix),
            color_by: Some(config.color_by),
            program_options: Some(ApiProgramOptions::from_secs(
                None,
                config.max_delay,
                config.disable_sampling,
            )),
            refresh_interval: config.refresh_interval.map(secs_to_ms),
            legend_options: legend_hiding(&config.legend_fields_to_hide),
            max_precision: config.max_precision,
            secondary_visualization: config.secondary_visualization,
            sort_by: config.sort_by.clone(),
            color_scale: color_scales_to_api(&config.color_scale)?,
            publish_label_options: publish_labels(&config.viz_options)?,
        };
        ApiChart::new(
            &config.name,
            &config.description,
            &config.program_text,
            ApiChartOptions::List(options),
        )
        .into_payload()
    }

    fn apply_response(&self, config: &mut ListChartConfig, response: &Value) -> Result<()> {
        let chart = ApiChart::decode(Self::TYPE_NAME, "List", response)?;
        let ApiChartOptions::List(options) = chart.options else {
            return Err(Error::unexpected("options are not a list chart"));
        };

        config.name = chart.name;
        config.description = chart.description.unwrap_or_default();
        config.program_text = chart.program_text.unwrap_or_default();
        config.unit_prefix = options.unit_prefix.unwrap_or_default();
        config.color_by = options.color_by.unwrap_or_default();
        let program = options.program_options.unwrap_or_default();
        config.max_delay = program.to_secs().1;
        config.disable_sampling = program.disable_sampling;
        config.refresh_interval = options.refresh_interval.map(ms_to_secs);
        config.legend_fields_to_hide = hidden_legend_fields(options.legend_options.as_ref());
        config.max_precision = options.max_precision;
        config.secondary_visualization = options.secondary_visualization;
        config.sort_by = options.sort_by;
        config.color_scale = color_scales_from_api(options.color_scale);
        config.viz_options = viz_from_labels(options.publish_label_options);
        Ok(())
    }
}
