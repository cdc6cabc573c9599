//! `signalform_time_chart`: line, area, column and histogram charts over time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    ApiChart, ApiChartOptions, ApiLegendOptions, ApiProgramOptions, CHART_API_PATH,
    CHART_APP_PATH, ChartVizOptions, base_block, hidden_legend_fields, legend_hiding,
    publish_labels, validate_viz_options, viz_block, viz_from_labels,
};
use crate::error::{Error, Result};
use crate::lifecycle::Resource;
use crate::palette;
use crate::resources::{ApiPublishLabel, null_as_default};
use crate::schema::{Attribute, AttributeType, Block, Nesting, Schema, with_lifecycle_attributes};
use crate::time::ApiTime;
use crate::validation::{
    ColorBy, PlotType, UnitPrefix, require, validate_max_delay, validate_program_text,
    validate_time_window,
};

/// One Y axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisConfig {
    /// Axis title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Lower bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    /// Upper bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    /// Upper reference line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_watermark: Option<f64>,
    /// Upper reference line label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_watermark_label: Option<String>,
    /// Lower reference line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_watermark: Option<f64>,
    /// Lower reference line label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_watermark_label: Option<String>,
}

/// Histogram rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramOptions {
    /// Palette color name used as the base of the theme
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_theme: Option<String>,
}

/// Time chart configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeChartConfig {
    /// Chart name
    pub name: String,
    /// Description
    pub description: String,
    /// SignalFlow program
    pub program_text: String,
    /// Default plot type for every series
    pub plot_type: PlotType,
    /// Metric or binary prefixes
    pub unit_prefix: UnitPrefix,
    /// Color by dimension or metric
    pub color_by: ColorBy,
    /// Minimum data resolution, seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_resolution: Option<i64>,
    /// How long to wait for late data, seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay: Option<i64>,
    /// Disable sampling
    pub disable_sampling: bool,
    /// Relative window, seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<i64>,
    /// Absolute window start, epoch seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    /// Absolute window end, epoch seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    /// Digits shown on axis labels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axes_precision: Option<u32>,
    /// Force zero onto the Y axes
    pub axes_include_zero: bool,
    /// Left Y axis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis_left: Option<AxisConfig>,
    /// Right Y axis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis_right: Option<AxisConfig>,
    /// Dimension shown in the on-chart legend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_chart_legend_dimension: Option<String>,
    /// Properties hidden from the data table legend
    pub legend_fields_to_hide: Vec<String>,
    /// Show event lines
    pub show_event_lines: bool,
    /// Show data points on lines and areas
    pub show_data_markers: bool,
    /// Stack area and column series
    pub stacked: bool,
    /// Histogram rendering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histogram_options: Option<HistogramOptions>,
    /// Per-series display settings
    pub viz_options: Vec<ChartVizOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAxis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    high_watermark: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    high_watermark_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    low_watermark: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    low_watermark_label: Option<String>,
}

impl From<&AxisConfig> for ApiAxis {
    fn from(axis: &AxisConfig) -> Self {
        Self {
            label: axis.label.clone(),
            min: axis.min_value,
            max: axis.max_value,
            high_watermark: axis.high_watermark,
            high_watermark_label: axis.high_watermark_label.clone(),
            low_watermark: axis.low_watermark,
            low_watermark_label: axis.low_watermark_label.clone(),
        }
    }
}

impl ApiAxis {
    /// `None` for an axis with nothing set.
    fn into_config(self) -> Option<AxisConfig> {
        (self != Self::default()).then(|| AxisConfig {
            label: self.label,
            min_value: self.min,
            max_value: self.max,
            high_watermark: self.high_watermark,
            high_watermark_label: self.high_watermark_label,
            low_watermark: self.low_watermark,
            low_watermark_label: self.low_watermark_label,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiOnChartLegend {
    #[serde(default, deserialize_with = "null_as_default")]
    show_legend: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dimension_in_legend: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiDataMarkers {
    #[serde(default, deserialize_with = "null_as_default")]
    show_data_markers: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiHistogramOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color_theme_index: Option<u32>,
}

/// `options` of a `TimeSeriesChart`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeChartOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_plot_type: Option<PlotType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit_prefix: Option<UnitPrefix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color_by: Option<ColorBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    program_options: Option<ApiProgramOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time: Option<ApiTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    axis_precision: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    include_zero: bool,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    axes: Vec<ApiAxis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    on_chart_legend_options: Option<ApiOnChartLegend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    legend_options: Option<ApiLegendOptions>,
    #[serde(default, deserialize_with = "null_as_default")]
    show_event_lines: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    stacked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line_chart_options: Option<ApiDataMarkers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    area_chart_options: Option<ApiDataMarkers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    histogram_chart_options: Option<ApiHistogramOptions>,
    #[serde(default, deserialize_with = "null_as_default")]
    publish_label_options: Vec<ApiPublishLabel>,
}

/// The time chart resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeChart;

impl TimeChart {
    fn axis_block() -> Block {
        let float = |name| Attribute::optional(name, AttributeType::Float);
        let string = |name| Attribute::optional(name, AttributeType::String);
        Block::new()
            .attribute(string("label"))
            .attribute(float("min_value"))
            .attribute(float("max_value"))
            .attribute(float("high_watermark"))
            .attribute(string("high_watermark_label"))
            .attribute(float("low_watermark"))
            .attribute(string("low_watermark_label"))
    }
}

#[async_trait]
impl Resource for TimeChart {
    type Config = TimeChartConfig;

    const TYPE_NAME: &'static str = "signalform_time_chart";
    const API_PATH: &'static str = CHART_API_PATH;
    const APP_PATH: &'static str = CHART_APP_PATH;

    fn schema(&self) -> Schema {
        let bool_false = |name| Attribute::optional(name, AttributeType::Bool).default_value(false);
        let int = |name| Attribute::optional(name, AttributeType::Int);
        let block = base_block(true)
            .attribute(
                Attribute::optional("plot_type", AttributeType::String)
                    .allowed(PlotType::allowed())
                    .default_value(PlotType::LineChart.as_str()),
            )
            .attribute(
                Attribute::optional("unit_prefix", AttributeType::String)
                    .allowed(UnitPrefix::allowed())
                    .default_value(UnitPrefix::Metric.as_str()),
            )
            .attribute(
                Attribute::optional("color_by", AttributeType::String)
                    .allowed(ColorBy::allowed())
                    .default_value(ColorBy::Dimension.as_str()),
            )
            .attribute(int("minimum_resolution").describe("Seconds"))
            .attribute(int("max_delay").describe("Seconds, 0 to 900"))
            .attribute(bool_false("disable_sampling"))
            .attribute(
                int("time_range")
                    .describe("Relative window in seconds")
                    .conflicts_with(&["start_time", "end_time"]),
            )
            .attribute(int("start_time").conflicts_with(&["time_range"]))
            .attribute(int("end_time").conflicts_with(&["time_range"]))
            .attribute(int("axes_precision"))
            .attribute(bool_false("axes_include_zero"))
            .attribute(Attribute::optional("on_chart_legend_dimension", AttributeType::String))
            .attribute(Attribute::optional("legend_fields_to_hide", AttributeType::Set))
            .attribute(bool_false("show_event_lines"))
            .attribute(bool_false("show_data_markers"))
            .attribute(bool_false("stacked"))
            .nested("axis_left", Nesting::Single, 0, Some(1), Self::axis_block())
            .nested("axis_right", Nesting::Single, 0, Some(1), Self::axis_block())
            .nested(
                "histogram_options",
                Nesting::Single,
                0,
                Some(1),
                Block::new().attribute(
                    Attribute::optional("color_theme", AttributeType::String)
                        .allowed(palette::PALETTE.iter().map(|(name, _)| *name).collect()),
                ),
            )
            .nested("viz_options", Nesting::Set, 0, None, viz_block(true));

        Schema {
            type_name: Self::TYPE_NAME,
            version: 0,
            block: with_lifecycle_attributes(block),
        }
    }

    fn validate(&self, config: &TimeChartConfig) -> Result<()> {
        require("name", &config.name)?;
        validate_program_text(&config.program_text)?;
        validate_max_delay(config.max_delay)?;
        validate_time_window(config.time_range.as_ref(), config.start_time, config.end_time)?;
        if let Some(theme) = config
            .histogram_options
            .as_ref()
            .and_then(|histogram| histogram.color_theme.as_deref())
        {
            palette::validate_color_name("histogram_options.color_theme", theme)?;
        }
        validate_viz_options(&config.viz_options)
    }

    fn to_payload(&self, config: &TimeChartConfig) -> Result<Value> {
        let axes = if config.axis_left.is_some() || config.axis_right.is_some() {
            vec![
                config.axis_left.as_ref().map(ApiAxis::from).unwrap_or_default(),
                config.axis_right.as_ref().map(ApiAxis::from).unwrap_or_default(),
            ]
        } else {
            Vec::new()
        };
        let markers = ApiDataMarkers {
            show_data_markers: config.show_data_markers,
        };
        let histogram_chart_options = match &config.histogram_options {
            Some(histogram) => Some(ApiHistogramOptions {
                color_theme_index: palette::optional_index(
                    "histogram_options.color_theme",
                    histogram.color_theme.as_deref(),
                )?,
            }),
            None => None,
        };

        let options = TimeChartOptions {
            default_plot_type: Some(config.plot_type),
            unit_prefix: Some(config.unit_prefix),
            color_by: Some(config.color_by),
            program_options: Some(ApiProgramOptions::from_secs(
                config.minimum_resolution,
                config.max_delay,
                config.disable_sampling,
            )),
            time: ApiTime::from_secs(config.time_range, config.start_time, config.end_time),
            axis_precision: config.axes_precision,
            include_zero: config.axes_include_zero,
            axes,
            on_chart_legend_options: config.on_chart_legend_dimension.as_ref().map(|dimension| {
                ApiOnChartLegend {
                    show_legend: true,
                    dimension_in_legend: Some(dimension.clone()),
                }
            }),
            legend_options: legend_hiding(&config.legend_fields_to_hide),
            show_event_lines: config.show_event_lines,
            stacked: config.stacked,
            line_chart_options: Some(markers.clone()),
            area_chart_options: Some(markers),
            histogram_chart_options,
            publish_label_options: publish_labels(&config.viz_options)?,
        };

        ApiChart::new(
            &config.name,
            &config.description,
            &config.program_text,
            ApiChartOptions::TimeSeries(options),
        )
        .into_payload()
    }

    fn apply_response(&self, config: &mut TimeChartConfig, response: &Value) -> Result<()> {
        let chart = ApiChart::decode(Self::TYPE_NAME, "TimeSeriesChart", response)?;
        let ApiChartOptions::TimeSeries(options) = chart.options else {
            return Err(Error::unexpected("options are not a time series chart"));
        };

        config.name = chart.name;
        config.description = chart.description.unwrap_or_default();
        config.program_text = chart.program_text.unwrap_or_default();
        config.plot_type = options.default_plot_type.unwrap_or_default();
        config.unit_prefix = options.unit_prefix.unwrap_or_default();
        config.color_by = options.color_by.unwrap_or_default();

        let program = options.program_options.unwrap_or_default();
        (config.minimum_resolution, config.max_delay) = program.to_secs();
        config.disable_sampling = program.disable_sampling;
        (config.time_range, config.start_time, config.end_time) =
            options.time.map_or((None, None, None), ApiTime::to_secs);

        config.axes_precision = options.axis_precision;
        config.axes_include_zero = options.include_zero;
        let mut axes = options.axes.into_iter();
        config.axis_left = axes.next().and_then(ApiAxis::into_config);
        config.axis_right = axes.next().and_then(ApiAxis::into_config);

        config.on_chart_legend_dimension = options
            .on_chart_legend_options
            .filter(|legend| legend.show_legend)
            .and_then(|legend| legend.dimension_in_legend);
        config.legend_fields_to_hide = hidden_legend_fields(options.legend_options.as_ref());
        config.show_event_lines = options.show_event_lines;
        config.stacked = options.stacked;
        config.show_data_markers = options
            .line_chart_options
            .is_some_and(|markers| markers.show_data_markers);
        config.histogram_options = options.histogram_chart_options.map(|histogram| HistogramOptions {
            color_theme: histogram
                .color_theme_index
                .and_then(palette::name_of)
                .map(str::to_string),
        });
        config.viz_options = viz_from_labels(options.publish_label_options);
        Ok(())
    }
}
