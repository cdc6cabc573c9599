//! `signalform_text_chart`: a Markdown panel with no program.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ApiChart, ApiChartOptions, CHART_API_PATH, CHART_APP_PATH};
use crate::error::{Error, Result};
use crate::lifecycle::Resource;
use crate::resources::null_as_default;
use crate::schema::{Attribute, AttributeType, Block, Schema, with_lifecycle_attributes};
use crate::validation::require;

/// Text chart configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextChartConfig {
    /// Chart name
    pub name: String,
    /// Description
    pub description: String,
    /// Markdown body
    pub markdown: String,
}

/// `options` of a `Text` chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChartOptions {
    /// Markdown body
    #[serde(default, deserialize_with = "null_as_default")]
    pub markdown: String,
}

/// The text chart resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextChart;

#[async_trait]
impl Resource for TextChart {
    type Config = TextChartConfig;

    const TYPE_NAME: &'static str = "signalform_text_chart";
    const API_PATH: &'static str = CHART_API_PATH;
    const APP_PATH: &'static str = CHART_APP_PATH;

    fn schema(&self) -> Schema {
        let block = Block::new()
            .attribute(Attribute::required("name", AttributeType::String))
            .attribute(Attribute::optional("description", AttributeType::String))
            .attribute(Attribute::required("markdown", AttributeType::String));
        Schema {
            type_name: Self::TYPE_NAME,
            version: 0,
            block: with_lifecycle_attributes(block),
        }
    }

    fn validate(&self, config: &TextChartConfig) -> Result<()> {
        require("name", &config.name)?;
        require("markdown", &config.markdown)
    }

    fn to_payload(&self, config: &TextChartConfig) -> Result<Value> {
        ApiChart::new(
            &config.name,
            &config.description,
            "",
            ApiChartOptions::Text(TextChartOptions {
                markdown: config.markdown.clone(),
            }),
        )
        .into_payload()
    }

    fn apply_response(&self, config: &mut TextChartConfig, response: &Value) -> Result<()> {
        let chart = ApiChart::decode(Self::TYPE_NAME, "Text", response)?;
        let ApiChartOptions::Text(options) = chart.options else {
            return Err(Error::unexpected("options are not a text chart"));
        };
        config.name = chart.name;
        config.description = chart.description.unwrap_or_default();
        config.markdown = options.markdown;
        Ok(())
    }
}
