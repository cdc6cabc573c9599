//! Notification targets for detector rules and team notification policies.
//!
//! Configuration writes a target as a compact comma separated string such as
//! `Slack,CREDID,alerts`; the API expects a tagged JSON object. This module
//! converts between the two and enforces each type's shape.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::resources::null_as_default;
use crate::validation::ResponderType;

/// A notification target.
///
/// Serializes to the API object form, e.g. `{"type":"Email","email":"a@b.c"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Notification {
    /// Email to an address.
    Email {
        /// Recipient
        #[serde(rename = "email")]
        address: String,
    },
    /// PagerDuty integration.
    PagerDuty {
        /// Integration credential
        credential_id: String,
    },
    /// Slack channel through an integration.
    Slack {
        /// Integration credential
        credential_id: String,
        /// Channel name without `#`
        channel: String,
    },
    /// Generic webhook, by integration or raw URL.
    Webhook {
        /// Integration credential, may be empty when `url` is set
        #[serde(
            default,
            deserialize_with = "null_as_default",
            skip_serializing_if = "String::is_empty"
        )]
        credential_id: String,
        /// Shared secret
        #[serde(
            default,
            deserialize_with = "null_as_default",
            skip_serializing_if = "String::is_empty"
        )]
        secret: String,
        /// Target URL, may be empty when `credential_id` is set
        #[serde(
            default,
            deserialize_with = "null_as_default",
            skip_serializing_if = "String::is_empty"
        )]
        url: String,
    },
    /// Every member of a team, using each member's preferences.
    Team {
        /// Team ID
        #[serde(rename = "team")]
        team_id: String,
    },
    /// A team's email address.
    TeamEmail {
        /// Team ID
        #[serde(rename = "team")]
        team_id: String,
    },
    /// Opsgenie responder.
    Opsgenie {
        /// Integration credential
        credential_id: String,
        /// Responder display name
        responder_name: String,
        /// Responder ID
        responder_id: String,
        /// Responder kind
        responder_type: ResponderType,
    },
    /// VictorOps routing key.
    VictorOps {
        /// Integration credential
        credential_id: String,
        /// Routing key
        routing_key: String,
    },
    /// BigPanda integration.
    BigPanda {
        /// Integration credential
        credential_id: String,
    },
    /// Office 365 integration.
    Office365 {
        /// Integration credential
        credential_id: String,
    },
    /// ServiceNow integration.
    ServiceNow {
        /// Integration credential
        credential_id: String,
    },
    /// xMatters integration.
    XMatters {
        /// Integration credential
        credential_id: String,
    },
}

/// Number of comma separated fields, type included, for a type name.
fn field_count(kind: &str) -> Option<usize> {
    match kind {
        "Email" | "PagerDuty" | "Team" | "TeamEmail" | "BigPanda" | "Office365"
        | "ServiceNow" | "XMatters" => Some(2),
        "Slack" | "VictorOps" => Some(3),
        "Webhook" => Some(4),
        "Opsgenie" => Some(5),
        _ => None,
    }
}

const KNOWN_TYPES: &str = "Email, PagerDuty, Slack, Webhook, Team, TeamEmail, Opsgenie, VictorOps, BigPanda, Office365, ServiceNow, XMatters";

impl Notification {
    /// The type name used in both forms.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Email { .. } => "Email",
            Self::PagerDuty { .. } => "PagerDuty",
            Self::Slack { .. } => "Slack",
            Self::Webhook { .. } => "Webhook",
            Self::Team { .. } => "Team",
            Self::TeamEmail { .. } => "TeamEmail",
            Self::Opsgenie { .. } => "Opsgenie",
            Self::VictorOps { .. } => "VictorOps",
            Self::BigPanda { .. } => "BigPanda",
            Self::Office365 { .. } => "Office365",
            Self::ServiceNow { .. } => "ServiceNow",
            Self::XMatters { .. } => "XMatters",
        }
    }

    /// Checks the per-type field rules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNotification`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        let value = self.to_string();
        let required = |name: &str, field: &str| {
            if field.is_empty() {
                Err(Error::notification(&value, format!("{name} is required")))
            } else {
                Ok(())
            }
        };

        match self {
            Self::Email { address } => {
                required("email address", address)?;
                if !address.contains('@') {
                    return Err(Error::notification(
                        &value,
                        format!("'{address}' is not an email address"),
                    ));
                }
            }
            Self::Slack {
                credential_id,
                channel,
            } => {
                required("credential ID", credential_id)?;
                required("channel", channel)?;
                if channel.starts_with('#') {
                    return Err(Error::notification(
                        &value,
                        "channel must be given without the leading #",
                    ));
                }
            }
            Self::Webhook {
                credential_id, url, ..
            } => {
                if credential_id.is_empty() && url.is_empty() {
                    return Err(Error::notification(
                        &value,
                        "either a credential ID or a URL is required",
                    ));
                }
                if !url.is_empty() {
                    let parsed = Url::parse(url).map_err(|err| {
                        Error::notification(&value, format!("'{url}' is not a valid URL: {err}"))
                    })?;
                    if !matches!(parsed.scheme(), "http" | "https") {
                        return Err(Error::notification(
                            &value,
                            format!("'{url}' must use http or https"),
                        ));
                    }
                }
            }
            Self::Team { team_id } | Self::TeamEmail { team_id } => {
                required("team ID", team_id)?;
            }
            Self::Opsgenie {
                credential_id,
                responder_name,
                responder_id,
                ..
            } => {
                required("credential ID", credential_id)?;
                required("responder name", responder_name)?;
                required("responder ID", responder_id)?;
            }
            Self::VictorOps {
                credential_id,
                routing_key,
            } => {
                required("credential ID", credential_id)?;
                required("routing key", routing_key)?;
            }
            Self::PagerDuty { credential_id }
            | Self::BigPanda { credential_id }
            | Self::Office365 { credential_id }
            | Self::ServiceNow { credential_id }
            | Self::XMatters { credential_id } => {
                required("credential ID", credential_id)?;
            }
        }
        Ok(())
    }

    /// The API object form.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if encoding fails.
    pub fn to_api(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decodes the API object form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNotification`] for unknown types or missing fields.
    pub fn from_api(value: &serde_json::Value) -> Result<Self> {
        Self::deserialize(value).map_err(|err| Error::notification(value.to_string(), err.to_string()))
    }
}

impl FromStr for Notification {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::notification(s, "notification is empty"));
        }
        let parts: Vec<&str> = s.split(',').collect();
        let kind = parts[0];
        let expected = field_count(kind).ok_or_else(|| {
            Error::notification(
                s,
                format!("unknown notification type '{kind}', expected one of: {KNOWN_TYPES}"),
            )
        })?;
        if parts.len() != expected {
            return Err(Error::notification(
                s,
                format!(
                    "{kind} takes {expected} comma separated fields, got {}",
                    parts.len()
                ),
            ));
        }

        let field = |index: usize| parts[index].to_string();
        let notification = match kind {
            "Email" => Self::Email { address: field(1) },
            "PagerDuty" => Self::PagerDuty {
                credential_id: field(1),
            },
            "Slack" => Self::Slack {
                credential_id: field(1),
                channel: field(2),
            },
            "Webhook" => Self::Webhook {
                credential_id: field(1),
                secret: field(2),
                url: field(3),
            },
            "Team" => Self::Team { team_id: field(1) },
            "TeamEmail" => Self::TeamEmail { team_id: field(1) },
            "Opsgenie" => Self::Opsgenie {
                credential_id: field(1),
                responder_name: field(2),
                responder_id: field(3),
                responder_type: parts[4].parse().map_err(|_| {
                    Error::notification(
                        s,
                        format!(
                            "responder type '{}' is not one of: {}",
                            parts[4],
                            ResponderType::allowed().join(", ")
                        ),
                    )
                })?,
            },
            "VictorOps" => Self::VictorOps {
                credential_id: field(1),
                routing_key: field(2),
            },
            "BigPanda" => Self::BigPanda {
                credential_id: field(1),
            },
            "Office365" => Self::Office365 {
                credential_id: field(1),
            },
            "ServiceNow" => Self::ServiceNow {
                credential_id: field(1),
            },
            _ => Self::XMatters {
                credential_id: field(1),
            },
        };
        notification.validate()?;
        Ok(notification)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())?;
        match self {
            Self::Email { address } => write!(f, ",{address}"),
            Self::Slack {
                credential_id,
                channel,
            } => write!(f, ",{credential_id},{channel}"),
            Self::Webhook {
                credential_id,
                secret,
                url,
            } => write!(f, ",{credential_id},{secret},{url}"),
            Self::Team { team_id } | Self::TeamEmail { team_id } => write!(f, ",{team_id}"),
            Self::Opsgenie {
                credential_id,
                responder_name,
                responder_id,
                responder_type,
            } => write!(
                f,
                ",{credential_id},{responder_name},{responder_id},{responder_type}"
            ),
            Self::VictorOps {
                credential_id,
                routing_key,
            } => write!(f, ",{credential_id},{routing_key}"),
            Self::PagerDuty { credential_id }
            | Self::BigPanda { credential_id }
            | Self::Office365 { credential_id }
            | Self::ServiceNow { credential_id }
            | Self::XMatters { credential_id } => write!(f, ",{credential_id}"),
        }
    }
}

/// Parses every entry of a notification list.
///
/// # Errors
///
/// Returns the first failure, with its list index prefixed to the message.
pub fn validate_notification_strings(values: &[String]) -> Result<Vec<Notification>> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            value.parse::<Notification>().map_err(|err| match err {
                Error::InvalidNotification { value, message } => Error::InvalidNotification {
                    value,
                    message: format!("entry {index}: {message}"),
                },
                other => other,
            })
        })
        .collect()
}

/// Converts compact strings to API objects.
///
/// # Errors
///
/// Returns the first entry that fails to parse.
pub fn to_api_list(values: &[String]) -> Result<Vec<serde_json::Value>> {
    validate_notification_strings(values)?
        .iter()
        .map(Notification::to_api)
        .collect()
}

/// Converts API objects back to compact strings.
///
/// # Errors
///
/// Returns the first object that fails to decode.
pub fn from_api_list(values: &[serde_json::Value]) -> Result<Vec<String>> {
    values
        .iter()
        .map(|value| Notification::from_api(value).map(|n| n.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: &str) -> Result<Notification> {
        value.parse()
    }

    #[test]
    fn test_parse_every_type() {
        let cases = [
            "Email,oncall@example.com",
            "PagerDuty,CRED1",
            "Slack,CRED1,alerts",
            "Webhook,CRED1,s3cret,https://hooks.example.com/x",
            "Team,TEAM1",
            "TeamEmail,TEAM1",
            "Opsgenie,CRED1,Ops,RESP1,Team",
            "VictorOps,CRED1,routing",
            "BigPanda,CRED1",
            "Office365,CRED1",
            "ServiceNow,CRED1",
            "XMatters,CRED1",
        ];
        for case in cases {
            let notification = parse(case).unwrap();
            assert_eq!(notification.to_string(), case);
        }
    }

    #[test]
    fn test_wrong_field_count() {
        let err = parse("Slack,CRED1").unwrap_err();
        assert!(err.to_string().contains("takes 3"));
        assert!(err.to_string().contains("got 2"));
        assert!(parse("Email,a@b.c,extra").is_err());
    }

    #[test]
    fn test_rejections() {
        assert!(parse("").is_err());
        assert!(parse("Carrier,pigeon").is_err());
        assert!(parse("Email,not-an-address").is_err());
        assert!(parse("Slack,CRED1,#alerts").is_err());
        assert!(parse("Opsgenie,CRED1,Ops,RESP1,Robot").is_err());
        assert!(parse("Webhook,,,").is_err());
        assert!(parse("Webhook,,,ftp://example.com").is_err());
        assert!(parse("Webhook,,,not a url").is_err());
        assert!(parse("PagerDuty,").is_err());
        assert!(parse("Team,").is_err());
    }

    #[test]
    fn test_webhook_url_only() {
        let notification = parse("Webhook,,,https://hooks.example.com/x").unwrap();
        assert_eq!(
            notification.to_api().unwrap(),
            json!({"type": "Webhook", "url": "https://hooks.example.com/x"})
        );
    }

    #[test]
    fn test_api_form() {
        assert_eq!(
            parse("Email,a@b.c").unwrap().to_api().unwrap(),
            json!({"type": "Email", "email": "a@b.c"})
        );
        assert_eq!(
            parse("Team,T1").unwrap().to_api().unwrap(),
            json!({"type": "Team", "team": "T1"})
        );
        assert_eq!(
            parse("Opsgenie,C,Ops,R,Schedule").unwrap().to_api().unwrap(),
            json!({
                "type": "Opsgenie",
                "credentialId": "C",
                "responderName": "Ops",
                "responderId": "R",
                "responderType": "Schedule"
            })
        );
    }

    #[test]
    fn test_from_api() {
        let slack = Notification::from_api(&json!({
            "type": "Slack",
            "credentialId": "C",
            "channel": "alerts"
        }))
        .unwrap();
        assert_eq!(slack.to_string(), "Slack,C,alerts");

        let webhook =
            Notification::from_api(&json!({"type": "Webhook", "credentialId": "C"})).unwrap();
        assert_eq!(webhook.to_string(), "Webhook,C,,");

        assert!(Notification::from_api(&json!({"type": "Fax"})).is_err());
    }

    #[test]
    fn test_from_api_webhook_with_nulls() {
        let webhook = Notification::from_api(&json!({
            "type": "Webhook",
            "credentialId": null,
            "secret": null,
            "url": "https://hooks.example.com/alert",
            "method": "POST"
        }))
        .unwrap();
        assert_eq!(webhook.to_string(), "Webhook,,,https://hooks.example.com/alert");
    }

    #[test]
    fn test_list_reports_index() {
        let values = vec!["Email,a@b.c".to_string(), "Slack,C,#bad".to_string()];
        let err = validate_notification_strings(&values).unwrap_err();
        assert!(err.to_string().contains("entry 1"));
    }

    #[test]
    fn test_list_conversion() {
        let values = vec!["Email,a@b.c".to_string(), "PagerDuty,P".to_string()];
        let api = to_api_list(&values).unwrap();
        assert_eq!(from_api_list(&api).unwrap(), values);
    }
}
