pub mod document;
pub mod rule_hash;

use std::path::PathBuf;

use ::tracing::{Instrument, info, warn};
use serde_json::{Value, json};
use signalform_provider::notification::validate_notification_strings;
use signalform_provider::{ConfigOverrides, SignalformProvider};

use crate::errors::{CliError, Result};
use crate::tracing::command_span;
use document::StateDocument;

#[derive(Debug, Clone)]
pub enum Command {
    Schema { type_name: Option<String> },
    Validate { file: PathBuf },
    Create { file: PathBuf },
    Read { file: PathBuf },
    Update { file: PathBuf },
    Delete { file: PathBuf },
    Exists { file: PathBuf },
    Import { type_name: String, id: String },
    NotificationCheck { values: Vec<String> },
    RuleHash { file: PathBuf },
}

impl Command {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Schema { .. } => "schema",
            Self::Validate { .. } => "validate",
            Self::Create { .. } => "create",
            Self::Read { .. } => "read",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Exists { .. } => "exists",
            Self::Import { .. } => "import",
            Self::NotificationCheck { .. } => "notification check",
            Self::RuleHash { .. } => "rule-hash",
        }
    }

    /// Whether the command talks to the API and so needs credentials.
    pub const fn needs_api(&self) -> bool {
        matches!(
            self,
            Self::Create { .. }
                | Self::Read { .. }
                | Self::Update { .. }
                | Self::Delete { .. }
                | Self::Exists { .. }
                | Self::Import { .. }
        )
    }
}

/// Runs a command and returns the JSON printed on stdout.
pub async fn execute(command: Command, overrides: ConfigOverrides) -> Result<Value> {
    let span = command_span(command.name());
    run(command, overrides).instrument(span).await
}

async fn run(command: Command, overrides: ConfigOverrides) -> Result<Value> {
    match command {
        Command::NotificationCheck { values } => check_notifications(&values),
        Command::RuleHash { file } => rule_hash::execute(&file),
        command => {
            let provider = if command.needs_api() {
                SignalformProvider::from_config(overrides)?
            } else {
                SignalformProvider::offline()?
            };
            run_with_provider(&provider, command).await
        }
    }
}

async fn run_with_provider(provider: &SignalformProvider, command: Command) -> Result<Value> {
    match command {
        Command::Schema { type_name: None } => Ok(json!(provider.resource_types())),
        Command::Schema {
            type_name: Some(type_name),
        } => Ok(serde_json::to_value(provider.schema(&type_name)?)?),
        Command::Validate { file } => {
            let document = StateDocument::load(&file)?;
            provider.validate(&document.type_name, &document.state).await?;
            Ok(json!({"type": document.type_name, "valid": true}))
        }
        Command::Create { file } => {
            let document = StateDocument::load(&file)?;
            let state = provider.create(&document.type_name, document.state).await?;
            StateDocument::new(document.type_name, state).to_value()
        }
        Command::Read { file } => {
            let document = StateDocument::load(&file)?;
            let id = document.id().to_string();
            match provider.read(&document.type_name, document.state).await? {
                Some(state) => StateDocument::new(document.type_name, state).to_value(),
                None => {
                    warn!(id = %id, "{} is gone; emitting a null state", document.type_name);
                    StateDocument::new(document.type_name, Value::Null).to_value()
                }
            }
        }
        Command::Update { file } => {
            let document = StateDocument::load(&file)?;
            let state = provider.update(&document.type_name, document.state).await?;
            StateDocument::new(document.type_name, state).to_value()
        }
        Command::Delete { file } => {
            let document = StateDocument::load(&file)?;
            let id = document.id().to_string();
            provider.delete(&document.type_name, document.state).await?;
            info!(id = %id, "Deleted {}", document.type_name);
            Ok(json!({"type": document.type_name, "id": id, "deleted": true}))
        }
        Command::Exists { file } => {
            let document = StateDocument::load(&file)?;
            let exists = provider.exists(&document.type_name, &document.state).await?;
            Ok(json!({"type": document.type_name, "id": document.id(), "exists": exists}))
        }
        Command::Import { type_name, id } => match provider.import(&type_name, &id).await? {
            Some(state) => StateDocument::new(type_name, state).to_value(),
            None => Err(CliError::NotFound { type_name, id }),
        },
        Command::NotificationCheck { values } => check_notifications(&values),
        Command::RuleHash { file } => rule_hash::execute(&file),
    }
}

/// API form of each notification string.
fn check_notifications(values: &[String]) -> Result<Value> {
    let notifications = validate_notification_strings(values)?;
    let checked = values
        .iter()
        .zip(&notifications)
        .map(|(input, notification)| {
            Ok(json!({"input": input, "kind": notification.kind(), "api": notification.to_api()?}))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Array(checked))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_offline_commands() {
        for command in [
            Command::Schema { type_name: None },
            Command::Validate {
                file: PathBuf::from("x.json"),
            },
            Command::NotificationCheck { values: vec![] },
            Command::RuleHash {
                file: PathBuf::from("x.json"),
            },
        ] {
            assert!(!command.needs_api(), "{}", command.name());
        }
        assert!(
            Command::Import {
                type_name: "signalform_team".to_string(),
                id: "T1".to_string()
            }
            .needs_api()
        );
    }

    #[test]
    fn test_check_notifications() {
        let output = check_notifications(&[
            "Email,oncall@example.com".to_string(),
            "Slack,CRED,alerts".to_string(),
        ])
        .unwrap();
        assert_eq!(output[0]["kind"], "Email");
        assert_eq!(output[0]["api"]["email"], "oncall@example.com");
        assert_eq!(output[1]["api"]["channel"], "alerts");

        let err = check_notifications(&["Slack,CRED".to_string()]).unwrap_err();
        assert!(err.to_string().contains("Invalid notification"));
    }

    #[tokio::test]
    async fn test_schema_listing() {
        let types = execute(Command::Schema { type_name: None }, ConfigOverrides::default())
            .await
            .unwrap();
        assert!(
            types
                .as_array()
                .unwrap()
                .contains(&json!("signalform_detector"))
        );

        let schema = execute(
            Command::Schema {
                type_name: Some("signalform_team".to_string()),
            },
            ConfigOverrides::default(),
        )
        .await
        .unwrap();
        assert_eq!(schema["type_name"], "signalform_team");
    }

    #[tokio::test]
    async fn test_validate_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chart.json");
        std::fs::write(
            &path,
            r#"{"type": "signalform_text_chart", "state": {"name": "notes", "markdown": "hi"}}"#,
        )
        .unwrap();

        let output = execute(Command::Validate { file: path }, ConfigOverrides::default())
            .await
            .unwrap();
        assert_eq!(output["valid"], true);
    }
}
