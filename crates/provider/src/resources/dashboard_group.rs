//! `signalform_dashboard_group`: containers for dashboards.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::lifecycle::Resource;
use crate::resources::{decode, non_empty, null_as_default};
use crate::schema::{Attribute, AttributeType, Block, Schema, with_lifecycle_attributes};
use crate::validation::require;

/// Dashboard group configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardGroupConfig {
    /// Group name
    pub name: String,
    /// Description
    pub description: String,
    /// Owning team IDs
    pub teams: Vec<String>,
    /// Dashboard IDs in the group, filled by reads
    pub dashboards: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiDashboardGroup {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    teams: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing)]
    dashboards: Vec<String>,
}

/// The dashboard group resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardGroup;

#[async_trait]
impl Resource for DashboardGroup {
    type Config = DashboardGroupConfig;

    const TYPE_NAME: &'static str = "signalform_dashboard_group";
    const API_PATH: &'static str = "/v2/dashboardgroup";
    const APP_PATH: &'static str = "/dashboardgroup/";

    fn schema(&self) -> Schema {
        let block = Block::new()
            .attribute(Attribute::required("name", AttributeType::String))
            .attribute(Attribute::optional("description", AttributeType::String))
            .attribute(Attribute::optional("teams", AttributeType::Set).describe("Owning team IDs"))
            .attribute(
                Attribute::computed("dashboards", AttributeType::List)
                    .describe("IDs of the dashboards in this group"),
            );
        Schema {
            type_name: Self::TYPE_NAME,
            version: 0,
            block: with_lifecycle_attributes(block),
        }
    }

    fn validate(&self, config: &DashboardGroupConfig) -> Result<()> {
        require("name", &config.name)
    }

    fn to_payload(&self, config: &DashboardGroupConfig) -> Result<Value> {
        let api = ApiDashboardGroup {
            name: config.name.clone(),
            description: non_empty(&config.description),
            teams: config.teams.clone(),
            dashboards: Vec::new(),
        };
        Ok(serde_json::to_value(api)?)
    }

    fn apply_response(&self, config: &mut DashboardGroupConfig, response: &Value) -> Result<()> {
        let api: ApiDashboardGroup = decode(Self::TYPE_NAME, response)?;
        config.name = api.name;
        config.description = api.description.unwrap_or_default();
        config.teams = api.teams;
        config.dashboards = api.dashboards;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_payload_omits_dashboards() {
        let config = DashboardGroupConfig {
            name: "Ops".to_string(),
            description: "Operations".to_string(),
            teams: vec!["T1".to_string()],
            dashboards: vec!["D1".to_string()],
        };
        assert_eq!(
            DashboardGroup.to_payload(&config).unwrap(),
            json!({"name": "Ops", "description": "Operations", "teams": ["T1"]})
        );
    }

    #[test]
    fn test_read_fills_dashboards() {
        let mut config = DashboardGroupConfig::default();
        DashboardGroup
            .apply_response(
                &mut config,
                &json!({"id": "G1", "name": "Ops", "description": null, "dashboards": ["D1", "D2"]}),
            )
            .unwrap();
        assert_eq!(config.name, "Ops");
        assert_eq!(config.description, "");
        assert_eq!(config.dashboards, vec!["D1", "D2"]);
    }

    #[test]
    fn test_read_accepts_null_collections() {
        let mut config = DashboardGroupConfig {
            teams: vec!["T1".to_string()],
            ..DashboardGroupConfig::default()
        };
        DashboardGroup
            .apply_response(
                &mut config,
                &json!({
                    "id": "G1",
                    "name": "Ops",
                    "teams": null,
                    "dashboards": null,
                    "importQualifiers": [],
                    "creator": "U1",
                    "lastUpdated": 1_700_000_000_000_i64
                }),
            )
            .unwrap();
        assert!(config.teams.is_empty());
        assert!(config.dashboards.is_empty());
    }

    #[test]
    fn test_validate_requires_name() {
        assert!(DashboardGroup.validate(&DashboardGroupConfig::default()).is_err());
    }
}
