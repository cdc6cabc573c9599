//! Chart resources.
//!
//! All charts share `/v2/chart` and a `{name, description, programText,
//! options}` envelope; `options.type` selects the chart kind. Each kind lives
//! in its own module and owns its options struct.

pub mod heatmap;
pub mod list;
pub mod single_value;
pub mod table;
pub mod text;
pub mod time;

pub use heatmap::{HeatmapChart, HeatmapChartConfig};
pub use list::{ListChart, ListChartConfig};
pub use single_value::{SingleValueChart, SingleValueChartConfig};
pub use table::{TableChart, TableChartConfig};
pub use text::{TextChart, TextChartConfig};
pub use time::{TimeChart, TimeChartConfig};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::palette;
use crate::resources::{ApiPublishLabel, decode, non_empty, null_as_default};
use crate::schema::{Attribute, AttributeType, Block};
use crate::validation::{Axis, PlotType, ValueUnit, ms_to_secs, require, secs_to_ms};

/// Collection path shared by every chart kind.
pub const CHART_API_PATH: &str = "/v2/chart";
/// Web app prefix shared by every chart kind.
pub const CHART_APP_PATH: &str = "/chart/v2/";

/// Kind-specific `options`, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ApiChartOptions {
    /// Time series chart
    #[serde(rename = "TimeSeriesChart")]
    TimeSeries(time::TimeChartOptions),
    /// List chart
    List(list::ListChartOptions),
    /// Single value chart
    SingleValue(single_value::SingleValueChartOptions),
    /// Heatmap
    Heatmap(heatmap::HeatmapChartOptions),
    /// Table
    TableChart(table::TableChartOptions),
    /// Markdown text
    Text(text::TextChartOptions),
}

impl ApiChartOptions {
    /// The `options.type` value.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TimeSeries(_) => "TimeSeriesChart",
            Self::List(_) => "List",
            Self::SingleValue(_) => "SingleValue",
            Self::Heatmap(_) => "Heatmap",
            Self::TableChart(_) => "TableChart",
            Self::Text(_) => "Text",
        }
    }
}

/// Request and response envelope for every chart kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiChart {
    /// Chart name
    pub name: String,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// SignalFlow program
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_text: Option<String>,
    /// Kind-specific options
    pub options: ApiChartOptions,
}

impl ApiChart {
    pub(crate) fn new(name: &str, description: &str, program_text: &str, options: ApiChartOptions) -> Self {
        Self {
            name: name.to_string(),
            description: non_empty(description),
            program_text: non_empty(program_text),
            options,
        }
    }

    pub(crate) fn into_payload(self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decodes a response and checks its kind matches `expected`.
    pub(crate) fn decode(type_name: &str, expected: &str, response: &Value) -> Result<Self> {
        let chart: Self = decode(type_name, response)?;
        if chart.options.kind() != expected {
            return Err(Error::unexpected(format!(
                "{type_name} expected options.type {expected}, got {}",
                chart.options.kind()
            )));
        }
        Ok(chart)
    }
}

/// `programOptions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiProgramOptions {
    /// Minimum resolution in ms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_resolution: Option<i64>,
    /// Max delay in ms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay: Option<i64>,
    /// Disable sampling
    #[serde(default, deserialize_with = "null_as_default")]
    pub disable_sampling: bool,
}

impl ApiProgramOptions {
    /// Builds program options from second-valued settings.
    #[must_use]
    pub fn from_secs(minimum_resolution: Option<i64>, max_delay: Option<i64>, disable_sampling: bool) -> Self {
        Self {
            minimum_resolution: minimum_resolution.map(secs_to_ms),
            max_delay: max_delay.map(secs_to_ms),
            disable_sampling,
        }
    }

    /// `(minimum_resolution, max_delay)` in seconds.
    #[must_use]
    pub fn to_secs(&self) -> (Option<i64>, Option<i64>) {
        (
            self.minimum_resolution.map(ms_to_secs),
            self.max_delay.map(ms_to_secs),
        )
    }
}

/// One `legendOptions.fields` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiLegendField {
    /// Dimension or property
    pub property: String,
    /// Shown in the legend
    pub enabled: bool,
}

/// `legendOptions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiLegendOptions {
    /// Field visibility
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: Vec<ApiLegendField>,
}

/// Legend options hiding `fields`, or `None` when nothing is hidden.
#[must_use]
pub fn legend_hiding(fields: &[String]) -> Option<ApiLegendOptions> {
    (!fields.is_empty()).then(|| ApiLegendOptions {
        fields: fields
            .iter()
            .map(|property| ApiLegendField {
                property: property.clone(),
                enabled: false,
            })
            .collect(),
    })
}

/// Properties hidden by a legend configuration.
#[must_use]
pub fn hidden_legend_fields(options: Option<&ApiLegendOptions>) -> Vec<String> {
    options
        .map(|legend| {
            legend
                .fields
                .iter()
                .filter(|field| !field.enabled)
                .map(|field| field.property.clone())
                .collect()
        })
        .unwrap_or_default()
}

/// Per-series display settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartVizOptions {
    /// `publish()` label
    pub label: String,
    /// Legend name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Palette color name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Y axis, time charts only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis: Option<Axis>,
    /// Per-series plot type, time charts only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_type: Option<PlotType>,
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

/// Checks labels and colors of every viz block.
///
/// # Errors
///
/// Returns the first invalid entry.
pub fn validate_viz_options(options: &[ChartVizOptions]) -> Result<()> {
    for viz in options {
        require("viz_options.label", &viz.label)?;
        if let Some(color) = &viz.color {
            palette::validate_color_name("viz_options.color", color)?;
        }
    }
    Ok(())
}

/// `publishLabelOptions` for viz blocks.
///
/// # Errors
///
/// Returns an error for unknown color names.
pub fn publish_labels(options: &[ChartVizOptions]) -> Result<Vec<ApiPublishLabel>> {
    options
        .iter()
        .map(|viz| {
            Ok(ApiPublishLabel {
                label: viz.label.clone(),
                display_name: viz.display_name.clone(),
                palette_index: palette::optional_index("viz_options.color", viz.color.as_deref())?,
                y_axis: viz.axis.map(Axis::index),
                plot_type: viz.plot_type,
                value_unit: viz.value_unit,
                value_prefix: viz.value_prefix.clone(),
                value_suffix: viz.value_suffix.clone(),
            })
        })
        .collect()
}

/// Viz blocks from `publishLabelOptions`.
#[must_use]
pub fn viz_from_labels(labels: Vec<ApiPublishLabel>) -> Vec<ChartVizOptions> {
    labels
        .into_iter()
        .map(|label| ChartVizOptions {
            label: label.label,
            display_name: label.display_name,
            color: label.palette_index.and_then(palette::name_of).map(str::to_string),
            axis: label.y_axis.map(Axis::from_index),
            plot_type: label.plot_type,
            value_unit: label.value_unit,
            value_prefix: label.value_prefix,
            value_suffix: label.value_suffix,
        })
        .collect()
}

/// A value range mapped to a color.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorScale {
    /// Lower bound, exclusive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    /// Lower bound, inclusive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<f64>,
    /// Upper bound, exclusive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
    /// Upper bound, inclusive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<f64>,
    /// Palette color name
    pub color: String,
}

/// `colorScale2[]` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiColorScale {
    /// Lower bound, exclusive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    /// Lower bound, inclusive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<f64>,
    /// Upper bound, exclusive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
    /// Upper bound, inclusive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<f64>,
    /// Color
    pub palette_index: u32,
}

/// Converts color scale blocks, validating colors.
///
/// # Errors
///
/// Returns an error for unknown color names.
pub fn color_scales_to_api(scales: &[ColorScale]) -> Result<Vec<ApiColorScale>> {
    scales
        .iter()
        .map(|scale| {
            palette::validate_color_name("color_scale.color", &scale.color)?;
            Ok(ApiColorScale {
                gt: scale.gt,
                gte: scale.gte,
                lt: scale.lt,
                lte: scale.lte,
                palette_index: palette::index_of(&scale.color).unwrap_or_default(),
            })
        })
        .collect()
}

/// Color scale blocks from the API form. Unknown indices become empty names.
#[must_use]
pub fn color_scales_from_api(scales: Vec<ApiColorScale>) -> Vec<ColorScale> {
    scales
        .into_iter()
        .map(|scale| ColorScale {
            gt: scale.gt,
            gte: scale.gte,
            lt: scale.lt,
            lte: scale.lte,
            color: palette::name_of(scale.palette_index)
                .unwrap_or_default()
                .to_string(),
        })
        .collect()
}

/// `name`, `description` and (optionally required) `program_text`.
#[must_use]
pub fn base_block(program_required: bool) -> Block {
    let program = if program_required {
        Attribute::required("program_text", AttributeType::String)
    } else {
        Attribute::optional("program_text", AttributeType::String)
    };
    Block::new()
        .attribute(Attribute::required("name", AttributeType::String))
        .attribute(Attribute::optional("description", AttributeType::String))
        .attribute(program.describe("SignalFlow program"))
}

/// Schema for `viz_options`; `series_options` adds the time chart's axis and plot type.
#[must_use]
pub fn viz_block(series_options: bool) -> Block {
    let mut block = Block::new()
        .attribute(Attribute::required("label", AttributeType::String))
        .attribute(Attribute::optional("display_name", AttributeType::String))
        .attribute(
            Attribute::optional("color", AttributeType::String)
                .allowed(palette::PALETTE.iter().map(|(name, _)| *name).collect()),
        );
    if series_options {
        block = block
            .attribute(Attribute::optional("axis", AttributeType::String).allowed(Axis::allowed()))
            .attribute(
                Attribute::optional("plot_type", AttributeType::String).allowed(PlotType::allowed()),
            );
    }
    block
        .attribute(Attribute::optional("value_unit", AttributeType::String).allowed(ValueUnit::allowed()))
        .attribute(Attribute::optional("value_prefix", AttributeType::String))
        .attribute(Attribute::optional("value_suffix", AttributeType::String))
}

/// Schema for `color_scale`.
#[must_use]
pub fn color_scale_block() -> Block {
    Block::new()
        .attribute(Attribute::optional("gt", AttributeType::Float))
        .attribute(Attribute::optional("gte", AttributeType::Float))
        .attribute(Attribute::optional("lt", AttributeType::Float))
        .attribute(Attribute::optional("lte", AttributeType::Float))
        .attribute(
            Attribute::required("color", AttributeType::String)
                .allowed(palette::PALETTE.iter().map(|(name, _)| *name).collect()),
        )
}
