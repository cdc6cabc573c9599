//! `signalform_team`: teams, their members and per-severity notification policies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::lifecycle::Resource;
use crate::notification::{Notification, validate_notification_strings};
use crate::resources::{decode, non_empty, null_as_default};
use crate::schema::{Attribute, AttributeType, Block, Schema, with_lifecycle_attributes};
use crate::validation::require;

/// Team configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamConfig {
    /// Team name
    pub name: String,
    /// Description
    pub description: String,
    /// Member user IDs
    pub members: Vec<String>,
    /// Targets for critical alerts
    pub notifications_critical: Vec<String>,
    /// Targets for major alerts
    pub notifications_major: Vec<String>,
    /// Targets for minor alerts
    pub notifications_minor: Vec<String>,
    /// Targets for warnings
    pub notifications_warning: Vec<String>,
    /// Targets for info alerts
    pub notifications_info: Vec<String>,
    /// Targets when no severity-specific list applies
    pub notifications_default: Vec<String>,
}

impl TeamConfig {
    /// `(attribute, list)` for every severity list.
    fn notification_lists(&self) -> [(&'static str, &[String]); 6] {
        [
            ("notifications_critical", self.notifications_critical.as_slice()),
            ("notifications_major", self.notifications_major.as_slice()),
            ("notifications_minor", self.notifications_minor.as_slice()),
            ("notifications_warning", self.notifications_warning.as_slice()),
            ("notifications_info", self.notifications_info.as_slice()),
            ("notifications_default", self.notifications_default.as_slice()),
        ]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ApiNotificationLists {
    #[serde(default, deserialize_with = "null_as_default")]
    critical: Vec<Notification>,
    #[serde(default, deserialize_with = "null_as_default")]
    major: Vec<Notification>,
    #[serde(default, deserialize_with = "null_as_default")]
    minor: Vec<Notification>,
    #[serde(default, deserialize_with = "null_as_default")]
    warning: Vec<Notification>,
    #[serde(default, deserialize_with = "null_as_default")]
    info: Vec<Notification>,
    #[serde(default, deserialize_with = "null_as_default")]
    default: Vec<Notification>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTeam {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    members: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    notification_lists: ApiNotificationLists,
}

fn to_strings(list: &[Notification]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

/// The team resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct Team;

#[async_trait]
impl Resource for Team {
    type Config = TeamConfig;

    const TYPE_NAME: &'static str = "signalform_team";
    const API_PATH: &'static str = "/v2/team";
    const APP_PATH: &'static str = "/team/";

    fn schema(&self) -> Schema {
        let mut block = Block::new()
            .attribute(Attribute::required("name", AttributeType::String))
            .attribute(Attribute::optional("description", AttributeType::String))
            .attribute(Attribute::optional("members", AttributeType::Set).describe("Member user IDs"));
        for name in TeamConfig::default().notification_lists().map(|(name, _)| name) {
            block = block.attribute(
                Attribute::optional(name, AttributeType::List)
                    .describe("Compact notification strings, e.g. Slack,CREDID,channel"),
            );
        }
        Schema {
            type_name: Self::TYPE_NAME,
            version: 0,
            block: with_lifecycle_attributes(block),
        }
    }

    fn validate(&self, config: &TeamConfig) -> Result<()> {
        require("name", &config.name)?;
        for (name, list) in config.notification_lists() {
            validate_notification_strings(list).map_err(|err| match err {
                Error::InvalidNotification { value, message } => Error::InvalidNotification {
                    value,
                    message: format!("{name} {message}"),
                },
                other => other,
            })?;
        }
        Ok(())
    }

    fn to_payload(&self, config: &TeamConfig) -> Result<Value> {
        let api = ApiTeam {
            name: config.name.clone(),
            description: non_empty(&config.description),
            members: config.members.clone(),
            notification_lists: ApiNotificationLists {
                critical: validate_notification_strings(&config.notifications_critical)?,
                major: validate_notification_strings(&config.notifications_major)?,
                minor: validate_notification_strings(&config.notifications_minor)?,
                warning: validate_notification_strings(&config.notifications_warning)?,
                info: validate_notification_strings(&config.notifications_info)?,
                default: validate_notification_strings(&config.notifications_default)?,
            },
        };
        Ok(serde_json::to_value(api)?)
    }

    fn apply_response(&self, config: &mut TeamConfig, response: &Value) -> Result<()> {
        let api: ApiTeam = decode(Self::TYPE_NAME, response)?;
        let lists = api.notification_lists;
        config.name = api.name;
        config.description = api.description.unwrap_or_default();
        config.members = api.members;
        config.notifications_critical = to_strings(&lists.critical);
        config.notifications_major = to_strings(&lists.major);
        config.notifications_minor = to_strings(&lists.minor);
        config.notifications_warning = to_strings(&lists.warning);
        config.notifications_info = to_strings(&lists.info);
        config.notifications_default = to_strings(&lists.default);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config() -> TeamConfig {
        TeamConfig {
            name: "SRE".to_string(),
            members: vec!["U1".to_string(), "U2".to_string()],
            notifications_critical: vec!["PagerDuty,PD1".to_string()],
            notifications_default: vec!["Email,sre@example.com".to_string()],
            ..TeamConfig::default()
        }
    }

    #[test]
    fn test_payload_shape() {
        let payload = Team.to_payload(&config()).unwrap();
        assert_eq!(
            payload["notificationLists"]["critical"],
            json!([{"type": "PagerDuty", "credentialId": "PD1"}])
        );
        assert_eq!(
            payload["notificationLists"]["default"],
            json!([{"type": "Email", "email": "sre@example.com"}])
        );
        assert_eq!(payload["notificationLists"]["info"], json!([]));
        assert_eq!(payload["members"], json!(["U1", "U2"]));
    }

    #[test]
    fn test_response_maps_back() {
        let payload = Team.to_payload(&config()).unwrap();
        let mut read = TeamConfig::default();
        Team.apply_response(&mut read, &payload).unwrap();
        assert_eq!(read, config());
    }

    #[test]
    fn test_invalid_notification_rejected() {
        let mut config = config();
        config.notifications_minor = vec!["Slack,C,#general".to_string()];
        assert!(Team.validate(&config).is_err());
    }

    #[test]
    fn test_invalid_notification_names_its_list() {
        let mut config = config();
        config.notifications_warning = vec![
            "Email,ops@example.com".to_string(),
            "Carrier,pigeon".to_string(),
        ];
        let err = Team.validate(&config).unwrap_err();
        assert!(matches!(err, Error::InvalidNotification { .. }), "{err:?}");
        assert!(
            err.to_string().contains("notifications_warning entry 1"),
            "{err}"
        );
    }

    #[test]
    fn test_server_body_with_nulls() {
        let body = json!({
            "id": "T1",
            "name": "SRE",
            "description": null,
            "members": null,
            "notificationLists": {
                "critical": [{"type": "PagerDuty", "credentialId": "PD1"}],
                "major": null,
                "minor": null,
                "warning": null,
                "info": null,
                "default": null
            },
            "lastUpdated": 1_700_000_000_000_i64,
            "lastUpdatedBy": "U1"
        });
        let mut read = TeamConfig::default();
        Team.apply_response(&mut read, &body).unwrap();
        assert_eq!(read.name, "SRE");
        assert!(read.members.is_empty());
        assert_eq!(read.notifications_critical, vec!["PagerDuty,PD1".to_string()]);
        assert!(read.notifications_major.is_empty());

        let bare = json!({"id": "T2", "name": "Ops", "members": [], "notificationLists": null});
        let mut read = TeamConfig::default();
        Team.apply_response(&mut read, &bare).unwrap();
        assert!(read.notifications_default.is_empty());
    }

    #[test]
    fn test_schema_lists_every_severity() {
        let schema = Team.schema();
        for name in ["notifications_critical", "notifications_default"] {
            assert!(schema.block.find(name).is_some(), "{name} missing");
        }
    }
}
