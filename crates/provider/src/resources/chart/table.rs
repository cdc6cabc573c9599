//! `signalform_table_chart`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    ApiChart, ApiChartOptions, ApiProgramOptions, CHART_API_PATH, CHART_APP_PATH,
    ChartVizOptions, base_block, publish_labels, validate_viz_options, viz_block,
    viz_from_labels,
};
use crate::error::{Error, Result};
use crate::lifecycle::Resource;
use crate::resources::{ApiPublishLabel, null_as_default};
use crate::schema::{Attribute, AttributeType, Nesting, Schema, with_lifecycle_attributes};
use crate::validation::{
    UnitPrefix, ms_to_secs, require, secs_to_ms, validate_max_delay, validate_program_text,
};

/// Table chart configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableChartConfig {
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
    /// Dimensions to group rows by
    pub group_by: Vec<String>,
    /// Refresh interval, seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<i64>,
    /// Hide the timestamp
    pub hide_timestamp: bool,
    /// Digits shown per value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_precision: Option<u32>,
    /// Per-series display settings
    pub viz_options: Vec<ChartVizOptions>,
}

/// `options` of a `TableChart`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableChartOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit_prefix: Option<UnitPrefix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    program_options: Option<ApiProgramOptions>,
    #[serde(default, deserialize_with = "null_as_default")]
    group_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_interval: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    timestamp_hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    maximum_precision: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    publish_label_options: Vec<ApiPublishLabel>,
}

/// The table chart resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableChart;

#[async_trait]
impl Resource for TableChart {
    type Config = TableChartConfig;

    const TYPE_NAME: &'static str = "signalform_table_chart";
    const API_PATH: &'static str = CHART_API_PATH;
    const APP_PATH: &'static str = CHART_APP_PATH;

    fn schema(&self) -> Schema {
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
            .attribute(Attribute::optional("refresh_interval", AttributeType::Int).describe("Seconds"))
            .attribute(Attribute::optional("hide_timestamp", AttributeType::Bool).default_value(false))
            .attribute(Attribute::optional("max_precision", AttributeType::Int))
            .nested("viz_options", Nesting::Set, 0, None, viz_block(false));
        Schema {
            type_name: Self::TYPE_NAME,
            version: 0,
            block: with_lifecycle_attributes(block),
        }
    }

    fn validate(&self, config: &TableChartConfig) -> Result<()> {
        require("name", &config.name)?;
        validate_program_text(&config.program_text)?;
        validate_max_delay(config.max_delay)?;
        validate_viz_options(&config.viz_options)
    }

    fn to_payload(&self, config: &TableChartConfig) -> Result<Value> {
        let options = TableChartOptions {
            unit_prefix: Some(config.unit_prefix),
            program_options: Some(ApiProgramOptions::from_secs(
                config.minimum_resolution,
                config.max_delay,
                config.disable_sampling,
            )),
            group_by: config.group_by.clone(),
            refresh_interval: config.refresh_interval.map(secs_to_ms),
            timestamp_hidden: config.hide_timestamp,
            maximum_precision: config.max_precision,
            publish_label_options: publish_labels(&config.viz_options)?,
        };
        ApiChart::new(
            &config.name,
            &config.description,
            &config.program_text,
            ApiChartOptions::TableChart(options),
        )
        .into_payload()
    }

    fn apply_response(&self, config: &mut TableChartConfig, response: &Value) -> Result<()> {
        let chart = ApiChart::decode(Self::TYPE_NAME, "TableChart", response)?;
        let ApiChartOptions::TableChart(options) = chart.options else {
            return Err(Error::unexpected("options are not a table chart"));
        };

        config.name = chart.name;
        config.description = chart.description.unwrap_or_default();
        config.program_text = chart.program_text.unwrap_or_default();
        config.unit_prefix = options.unit_prefix.unwrap_or_default();
        let program = options.program_options.unwrap_or_default();
        (config.minimum_resolution, config.max_delay) = program.to_secs();
        config.disable_sampling = program.disable_sampling;
        config.group_by = options.group_by;
        config.refresh_interval = options.refresh_interval.map(ms_to_secs);
        config.hide_timestamp = options.timestamp_hidden;
        config.max_precision = options.maximum_precision;
        config.viz_options = viz_from_labels(options.publish_label_options);
        Ok(())
    }
}
