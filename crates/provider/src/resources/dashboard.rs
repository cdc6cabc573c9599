//! `signalform_dashboard`: dashboards, chart layout, filters and event overlays.
//!
//! Charts are placed on a 12-column grid. Besides explicit `chart` blocks,
//! `grid` and `column` blocks are layout directives that expand to
//! placements when the payload is built.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::lifecycle::Resource;
use crate::palette;
use crate::resources::{decode, non_empty, null_as_default};
use crate::schema::{Attribute, AttributeType, Block, Nesting, Schema, with_lifecycle_attributes};
use crate::validation::{
    ChartsResolution, DASHBOARD_COLUMNS, EventOverlayType, ms_to_secs, parse_relative_time,
    require, secs_to_ms, validate_layout, validate_time_window,
};

const fn default_full_width() -> u32 {
    DASHBOARD_COLUMNS
}

const fn default_block_width() -> u32 {
    4
}

const fn default_height() -> u32 {
    1
}

/// An explicitly placed chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPlacement {
    /// Chart ID
    pub chart_id: String,
    /// Row, from the top
    #[serde(default)]
    pub row: u32,
    /// Column, from the left
    #[serde(default)]
    pub column: u32,
    /// Columns spanned
    #[serde(default = "default_full_width")]
    pub width: u32,
    /// Rows spanned
    #[serde(default = "default_height")]
    pub height: u32,
}

/// Charts filling rows left to right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBlock {
    /// Charts in placement order
    pub chart_ids: Vec<String>,
    /// First row
    #[serde(default)]
    pub start_row: u32,
    /// Column each row starts at
    #[serde(default)]
    pub start_column: u32,
    /// Width of every chart
    #[serde(default = "default_block_width")]
    pub width: u32,
    /// Height of every chart
    #[serde(default = "default_height")]
    pub height: u32,
}

/// Charts stacked in one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnBlock {
    /// Charts from top to bottom
    pub chart_ids: Vec<String>,
    /// Column
    #[serde(default)]
    pub column: u32,
    /// First row
    #[serde(default)]
    pub start_row: u32,
    /// Width of every chart
    #[serde(default = "default_block_width")]
    pub width: u32,
    /// Height of every chart
    #[serde(default = "default_height")]
    pub height: u32,
}

/// A dashboard variable bound to a dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Variable {
    /// Dimension or property
    pub property: String,
    /// Label shown on the dashboard
    pub alias: String,
    /// Description
    pub description: String,
    /// Current values
    pub values: Vec<String>,
    /// Whether a value must be selected
    pub value_required: bool,
    /// Suggested values
    pub values_suggested: Vec<String>,
    /// Only suggested values may be chosen
    pub restricted_suggestions: bool,
    /// Only replace existing filters on the same property
    pub replace_only: bool,
    /// Apply only to charts whose data has the property
    pub apply_if_exist: bool,
}

/// A static dashboard filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    /// Dimension or property
    pub property: String,
    /// Values to match
    pub values: Vec<String>,
    /// Exclude instead of include
    pub negated: bool,
    /// Apply only to charts whose data has the property
    pub apply_if_exist: bool,
}

/// Filter on an overlay's events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySource {
    /// Dimension or property
    pub property: String,
    /// Values to match
    pub values: Vec<String>,
    /// Exclude instead of include
    pub negated: bool,
}

/// An event overlay available on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventOverlay {
    /// Event search text
    pub signal: String,
    /// Draw a vertical line for each event
    pub line: bool,
    /// Label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Palette color name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Event source kind
    #[serde(rename = "type")]
    pub kind: EventOverlayType,
    /// Event filters
    pub source: Vec<OverlaySource>,
}

/// An overlay shown by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectedEventOverlay {
    /// Event search text
    pub signal: String,
    /// Event source kind
    #[serde(rename = "type")]
    pub kind: EventOverlayType,
    /// Event filters
    pub source: Vec<OverlaySource>,
}

/// Dashboard configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Dashboard name
    pub name: String,
    /// Description
    pub description: String,
    /// Owning dashboard group ID
    pub dashboard_group: String,
    /// Chart density
    pub charts_resolution: ChartsResolution,
    /// Relative window such as `-1h`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<String>,
    /// Absolute window start, epoch seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    /// Absolute window end, epoch seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    /// Explicit placements
    pub chart: Vec<ChartPlacement>,
    /// Grid layouts
    pub grid: Vec<GridBlock>,
    /// Column layouts
    pub column: Vec<ColumnBlock>,
    /// Variables
    pub variable: Vec<Variable>,
    /// Static filters
    pub filter: Vec<Filter>,
    /// Available event overlays
    pub event_overlay: Vec<EventOverlay>,
    /// Overlays shown by default
    pub selected_event_overlay: Vec<SelectedEventOverlay>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPlacement {
    chart_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    row: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    column: u32,
    #[serde(default = "default_full_width")]
    width: u32,
    #[serde(default = "default_height")]
    height: u32,
}

/// Expands a grid block into placements.
fn grid_layout(grid: &GridBlock) -> Vec<ApiPlacement> {
    let mut placements = Vec::with_capacity(grid.chart_ids.len());
    let mut row = grid.start_row;
    let mut column = grid.start_column;
    for chart_id in &grid.chart_ids {
        if column.saturating_add(grid.width) > DASHBOARD_COLUMNS {
            row = row.saturating_add(grid.height);
            column = grid.start_column;
        }
        placements.push(ApiPlacement {
            chart_id: chart_id.clone(),
            row,
            column,
            width: grid.width,
            height: grid.height,
        });
        column = column.saturating_add(grid.width);
    }
    placements
}

/// Expands a column block into placements.
fn column_layout(block: &ColumnBlock) -> Vec<ApiPlacement> {
    let mut row = block.start_row;
    block
        .chart_ids
        .iter()
        .map(|chart_id| {
            let placement = ApiPlacement {
                chart_id: chart_id.clone(),
                row,
                column: block.column,
                width: block.width,
                height: block.height,
            };
            row = row.saturating_add(block.height);
            placement
        })
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiVariable {
    #[serde(default, deserialize_with = "null_as_default")]
    property: String,
    #[serde(default, deserialize_with = "null_as_default")]
    alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    value: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    required: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    preferred_suggestions: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    restricted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    replace_only: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    apply_if_exists: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSource {
    #[serde(default, deserialize_with = "null_as_default")]
    property: String,
    #[serde(default, deserialize_with = "null_as_default")]
    value: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default", rename = "NOT")]
    not: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    apply_if_exists: bool,
}

/// `filters.time`: a relative window ends "Now"; an absolute one is epoch ms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum ApiFilterTime {
    Relative { start: String, end: String },
    Absolute { start: i64, end: i64 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ApiFilters {
    #[serde(default, deserialize_with = "null_as_default")]
    variables: Vec<ApiVariable>,
    #[serde(default, deserialize_with = "null_as_default")]
    sources: Vec<ApiSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time: Option<ApiFilterTime>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventSignal {
    #[serde(default, deserialize_with = "null_as_default")]
    event_search_text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    event_type: EventOverlayType,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ApiOverlaySource {
    #[serde(default, deserialize_with = "null_as_default")]
    property: String,
    #[serde(default, deserialize_with = "null_as_default")]
    values: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default", rename = "NOT")]
    not: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventOverlay {
    #[serde(default, deserialize_with = "null_as_default")]
    event_signal: ApiEventSignal,
    #[serde(default, deserialize_with = "null_as_default")]
    sources: Vec<ApiOverlaySource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    event_line: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event_color_index: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSelectedEventOverlay {
    #[serde(default, deserialize_with = "null_as_default")]
    event_signal: ApiEventSignal,
    #[serde(default, deserialize_with = "null_as_default")]
    sources: Vec<ApiOverlaySource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiDashboard {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chart_density: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    charts: Vec<ApiPlacement>,
    #[serde(default, deserialize_with = "null_as_default")]
    filters: ApiFilters,
    #[serde(default, deserialize_with = "null_as_default")]
    event_overlays: Vec<ApiEventOverlay>,
    #[serde(default, deserialize_with = "null_as_default")]
    selected_event_overlays: Vec<ApiSelectedEventOverlay>,
}

fn sources_to_api(sources: &[OverlaySource]) -> Vec<ApiOverlaySource> {
    sources
        .iter()
        .map(|source| ApiOverlaySource {
            property: source.property.clone(),
            values: source.values.clone(),
            not: source.negated,
        })
        .collect()
}

fn sources_from_api(sources: Vec<ApiOverlaySource>) -> Vec<OverlaySource> {
    sources
        .into_iter()
        .map(|source| OverlaySource {
            property: source.property,
            values: source.values,
            negated: source.not,
        })
        .collect()
}

/// The dashboard resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dashboard;

impl Dashboard {
    /// Every placement the payload will carry, in block order.
    fn placements(config: &DashboardConfig) -> Vec<ApiPlacement> {
        let explicit = config.chart.iter().map(|chart| ApiPlacement {
            chart_id: chart.chart_id.clone(),
            row: chart.row,
            column: chart.column,
            width: chart.width,
            height: chart.height,
        });
        explicit
            .chain(config.grid.iter().flat_map(grid_layout))
            .chain(config.column.iter().flat_map(column_layout))
            .collect()
    }

    fn source_block() -> Block {
        Block::new()
            .attribute(Attribute::required("property", AttributeType::String))
            .attribute(Attribute::required("values", AttributeType::Set))
            .attribute(Attribute::optional("negated", AttributeType::Bool).default_value(false))
    }

    fn overlay_type() -> Attribute {
        Attribute::optional("type", AttributeType::String)
            .allowed(EventOverlayType::allowed())
            .default_value(EventOverlayType::EventTimeSeries.as_str())
    }
}

#[async_trait]
impl Resource for Dashboard {
    type Config = DashboardConfig;

    const TYPE_NAME: &'static str = "signalform_dashboard";
    const API_PATH: &'static str = "/v2/dashboard";
    const APP_PATH: &'static str = "/dashboard/";

    fn schema(&self) -> Schema {
        let int = |name| Attribute::optional(name, AttributeType::Int);
        let chart = Block::new()
            .attribute(Attribute::required("chart_id", AttributeType::String))
            .attribute(int("row").default_value(0))
            .attribute(int("column").default_value(0))
            .attribute(int("width").default_value(DASHBOARD_COLUMNS))
            .attribute(int("height").default_value(1));
        let grid = Block::new()
            .attribute(Attribute::required("chart_ids", AttributeType::List))
            .attribute(int("start_row").default_value(0))
            .attribute(int("start_column").default_value(0))
            .attribute(int("width").default_value(4))
            .attribute(int("height").default_value(1));
        let column = Block::new()
            .attribute(Attribute::required("chart_ids", AttributeType::List))
            .attribute(int("column").default_value(0))
            .attribute(int("start_row").default_value(0))
            .attribute(int("width").default_value(4))
            .attribute(int("height").default_value(1));
        let variable = Block::new()
            .attribute(Attribute::required("property", AttributeType::String))
            .attribute(Attribute::required("alias", AttributeType::String))
            .attribute(Attribute::optional("description", AttributeType::String))
            .attribute(Attribute::optional("values", AttributeType::Set))
            .attribute(Attribute::optional("value_required", AttributeType::Bool).default_value(false))
            .attribute(Attribute::optional("values_suggested", AttributeType::Set))
            .attribute(
                Attribute::optional("restricted_suggestions", AttributeType::Bool)
                    .default_value(false),
            )
            .attribute(Attribute::optional("replace_only", AttributeType::Bool).default_value(false))
            .attribute(Attribute::optional("apply_if_exist", AttributeType::Bool).default_value(false));
        let filter = Self::source_block()
            .attribute(Attribute::optional("apply_if_exist", AttributeType::Bool).default_value(false));
        let event_overlay = Block::new()
            .attribute(Attribute::required("signal", AttributeType::String))
            .attribute(Attribute::optional("line", AttributeType::Bool).default_value(false))
            .attribute(Attribute::optional("label", AttributeType::String))
            .attribute(
                Attribute::optional("color", AttributeType::String)
                    .allowed(palette::PALETTE.iter().map(|(name, _)| *name).collect()),
            )
            .attribute(Self::overlay_type())
            .nested("source", Nesting::Set, 0, None, Self::source_block());
        let selected_event_overlay = Block::new()
            .attribute(Attribute::required("signal", AttributeType::String))
            .attribute(Self::overlay_type())
            .nested("source", Nesting::Set, 0, None, Self::source_block());

        let block = Block::new()
            .attribute(Attribute::required("name", AttributeType::String))
            .attribute(Attribute::optional("description", AttributeType::String))
            .attribute(Attribute::required("dashboard_group", AttributeType::String))
            .attribute(
                Attribute::optional("charts_resolution", AttributeType::String)
                    .allowed(ChartsResolution::allowed())
                    .default_value("default"),
            )
            .attribute(
                Attribute::optional("time_range", AttributeType::String)
                    .describe("Relative window such as -1h")
                    .conflicts_with(&["start_time", "end_time"]),
            )
            .attribute(int("start_time").conflicts_with(&["time_range"]))
            .attribute(int("end_time").conflicts_with(&["time_range"]))
            .nested("chart", Nesting::Set, 0, None, chart)
            .nested("grid", Nesting::List, 0, None, grid)
            .nested("column", Nesting::List, 0, None, column)
            .nested("variable", Nesting::Set, 0, None, variable)
            .nested("filter", Nesting::Set, 0, None, filter)
            .nested("event_overlay", Nesting::List, 0, None, event_overlay)
            .nested("selected_event_overlay", Nesting::List, 0, None, selected_event_overlay);

        Schema {
            type_name: Self::TYPE_NAME,
            version: 0,
            block: with_lifecycle_attributes(block),
        }
    }

    fn validate(&self, config: &DashboardConfig) -> Result<()> {
        require("name", &config.name)?;
        require("dashboard_group", &config.dashboard_group)?;
        if let Some(range) = &config.time_range {
            parse_relative_time("time_range", range)?;
        }
        validate_time_window(config.time_range.as_ref(), config.start_time, config.end_time)?;

        for chart in &config.chart {
            require("chart.chart_id", &chart.chart_id)?;
            validate_layout("chart", chart.column, chart.width)?;
        }
        for grid in &config.grid {
            validate_layout("grid", grid.start_column, grid.width)?;
        }
        for column in &config.column {
            validate_layout("column", column.column, column.width)?;
        }
        for variable in &config.variable {
            require("variable.property", &variable.property)?;
            require("variable.alias", &variable.alias)?;
        }
        for filter in &config.filter {
            require("filter.property", &filter.property)?;
        }
        for overlay in &config.event_overlay {
            require("event_overlay.signal", &overlay.signal)?;
            if let Some(color) = &overlay.color {
                palette::validate_color_name("event_overlay.color", color)?;
            }
        }
        for overlay in &config.selected_event_overlay {
            require("selected_event_overlay.signal", &overlay.signal)?;
        }
        Ok(())
    }

    fn to_payload(&self, config: &DashboardConfig) -> Result<Value> {
        let time = match (&config.time_range, config.start_time, config.end_time) {
            (Some(range), _, _) => Some(ApiFilterTime::Relative {
                start: range.clone(),
                end: "Now".to_string(),
            }),
            (None, Some(start), Some(end)) => Some(ApiFilterTime::Absolute {
                start: secs_to_ms(start),
                end: secs_to_ms(end),
            }),
            _ => None,
        };

        let filters = ApiFilters {
            variables: config
                .variable
                .iter()
                .map(|variable| ApiVariable {
                    property: variable.property.clone(),
                    alias: variable.alias.clone(),
                    description: non_empty(&variable.description),
                    value: variable.values.clone(),
                    required: variable.value_required,
                    preferred_suggestions: variable.values_suggested.clone(),
                    restricted: variable.restricted_suggestions,
                    replace_only: variable.replace_only,
                    apply_if_exists: variable.apply_if_exist,
                })
                .collect(),
            sources: config
                .filter
                .iter()
                .map(|filter| ApiSource {
                    property: filter.property.clone(),
                    value: filter.values.clone(),
                    not: filter.negated,
                    apply_if_exists: filter.apply_if_exist,
                })
                .collect(),
            time,
        };

        let event_overlays = config
            .event_overlay
            .iter()
            .map(|overlay| {
                Ok(ApiEventOverlay {
                    event_signal: ApiEventSignal {
                        event_search_text: overlay.signal.clone(),
                        event_type: overlay.kind,
                    },
                    sources: sources_to_api(&overlay.source),
                    label: overlay.label.clone(),
                    event_line: overlay.line,
                    event_color_index: palette::optional_index(
                        "event_overlay.color",
                        overlay.color.as_deref(),
                    )?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let selected_event_overlays = config
            .selected_event_overlay
            .iter()
            .map(|overlay| ApiSelectedEventOverlay {
                event_signal: ApiEventSignal {
                    event_search_text: overlay.signal.clone(),
                    event_type: overlay.kind,
                },
                sources: sources_to_api(&overlay.source),
            })
            .collect();

        let api = ApiDashboard {
            name: config.name.clone(),
            description: non_empty(&config.description),
            group_id: config.dashboard_group.clone(),
            chart_density: Some(config.charts_resolution.api_value().to_string()),
            charts: Self::placements(config),
            filters,
            event_overlays,
            selected_event_overlays,
        };
        Ok(serde_json::to_value(api)?)
    }

    fn apply_response(&self, config: &mut DashboardConfig, response: &Value) -> Result<()> {
        let api: ApiDashboard = decode(Self::TYPE_NAME, response)?;

        config.name = api.name;
        config.description = api.description.unwrap_or_default();
        config.dashboard_group = api.group_id;
        if let Some(density) = &api.chart_density {
            config.charts_resolution = ChartsResolution::from_api(density)?;
        }

        (config.time_range, config.start_time, config.end_time) = match api.filters.time {
            Some(ApiFilterTime::Relative { start, .. }) => (Some(start), None, None),
            Some(ApiFilterTime::Absolute { start, end }) => {
                (None, Some(ms_to_secs(start)), Some(ms_to_secs(end)))
            }
            None => (None, None, None),
        };

        // Grid and column blocks are layout directives; only charts listed in
        // explicit `chart` blocks are refreshed from the server's chart list.
        let explicit: HashSet<String> = config
            .chart
            .iter()
            .map(|chart| chart.chart_id.clone())
            .collect();
        if !explicit.is_empty() {
            config.chart = api
                .charts
                .into_iter()
                .filter(|chart| explicit.contains(&chart.chart_id))
                .map(|chart| ChartPlacement {
                    chart_id: chart.chart_id,
                    row: chart.row,
                    column: chart.column,
                    width: chart.width,
                    height: chart.height,
                })
                .collect();
        }

        config.variable = api
            .filters
            .variables
            .into_iter()
            .map(|variable| Variable {
                property: variable.property,
                alias: variable.alias,
                description: variable.description.unwrap_or_default(),
                values: variable.value,
                value_required: variable.required,
                values_suggested: variable.preferred_suggestions,
                restricted_suggestions: variable.restricted,
                replace_only: variable.replace_only,
                apply_if_exist: variable.apply_if_exists,
            })
            .collect();
        config.filter = api
            .filters
            .sources
            .into_iter()
            .map(|source| Filter {
                property: source.property,
                values: source.value,
                negated: source.not,
                apply_if_exist: source.apply_if_exists,
            })
            .collect();
        config.event_overlay = api
            .event_overlays
            .into_iter()
            .map(|overlay| EventOverlay {
                signal: overlay.event_signal.event_search_text,
                line: overlay.event_line,
                label: overlay.label,
                color: overlay
                    .event_color_index
                    .and_then(palette::name_of)
                    .map(str::to_string),
                kind: overlay.event_signal.event_type,
                source: sources_from_api(overlay.sources),
            })
            .collect();
        config.selected_event_overlay = api
            .selected_event_overlays
            .into_iter()
            .map(|overlay| SelectedEventOverlay {
                signal: overlay.event_signal.event_search_text,
                kind: overlay.event_signal.event_type,
                source: sources_from_api(overlay.sources),
            })
            .collect();
        Ok(())
    }
}
