use std::path::PathBuf;

use clap::{Parser, Subcommand};
use signalform_provider::ConfigOverrides;

use crate::commands::Command;
use crate::tracing::LogLevel;

#[derive(Parser, Debug)]
#[command(name = "signalform")]
#[command(about = "Manage SignalFx detectors, dashboards, charts and teams from JSON state documents")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'l',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    #[arg(long, global = true, help = "Output logs in JSON format")]
    pub json: bool,

    #[arg(
        long,
        global = true,
        env = "SFX_AUTH_TOKEN",
        hide_env_values = true,
        help = "SignalFx organization access token"
    )]
    pub auth_token: Option<String>,

    #[arg(long, global = true, env = "SFX_API_URL", help = "SignalFx API URL")]
    pub api_url: Option<String>,

    #[arg(
        long,
        global = true,
        env = "SFX_CUSTOM_APP_URL",
        help = "SignalFx web app URL used for resource links"
    )]
    pub custom_app_url: Option<String>,

    #[arg(long, global = true, help = "Request timeout in seconds")]
    pub timeout: Option<u64>,
}

impl Cli {
    /// Provider settings given on the command line or through `SFX_*`.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            auth_token: self.auth_token.clone(),
            api_url: self.api_url.clone(),
            custom_app_url: self.custom_app_url.clone(),
            timeout_seconds: self.timeout,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "List resource types, or print one type's schema")]
    Schema {
        #[arg(help = "Resource type, e.g. signalform_detector")]
        type_name: Option<String>,
    },
    #[command(about = "Validate a state document without calling the API")]
    Validate { file: PathBuf },
    #[command(about = "Create the object described by a state document")]
    Create { file: PathBuf },
    #[command(about = "Refresh a state document from the API")]
    Read { file: PathBuf },
    #[command(about = "Push a state document's configuration to the API")]
    Update { file: PathBuf },
    #[command(about = "Delete the object behind a state document")]
    Delete { file: PathBuf },
    #[command(about = "Check whether the object behind a state document exists")]
    Exists { file: PathBuf },
    #[command(about = "Build a state document for an existing object")]
    Import { type_name: String, id: String },
    #[command(about = "Notification string operations")]
    Notification {
        #[command(subcommand)]
        subcommand: NotificationCommands,
    },
    #[command(about = "Print the hash of each detector rule in a file")]
    RuleHash { file: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum NotificationCommands {
    #[command(about = "Parse notification strings and print their API form")]
    Check {
        #[arg(required = true, help = "e.g. Email,oncall@example.com or Slack,CREDID,alerts")]
        values: Vec<String>,
    },
}

impl From<Commands> for Command {
    fn from(cmd: Commands) -> Self {
        match cmd {
            Commands::Schema { type_name } => Self::Schema { type_name },
            Commands::Validate { file } => Self::Validate { file },
            Commands::Create { file } => Self::Create { file },
            Commands::Read { file } => Self::Read { file },
            Commands::Update { file } => Self::Update { file },
            Commands::Delete { file } => Self::Delete { file },
            Commands::Exists { file } => Self::Exists { file },
            Commands::Import { type_name, id } => Self::Import { type_name, id },
            Commands::Notification { subcommand } => match subcommand {
                NotificationCommands::Check { values } => Self::NotificationCheck { values },
            },
            Commands::RuleHash { file } => Self::RuleHash { file },
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::try_parse_from(["signalform", "schema"]).unwrap();

        assert_eq!(cli.level, LogLevel::Warn);
        assert!(!cli.json);
        assert!(cli.timeout.is_none());
        assert!(matches!(cli.command, Commands::Schema { type_name: None }));
    }

    #[test]
    fn test_cli_log_level_parsing() {
        let cli = Cli::try_parse_from(["signalform", "--level", "debug", "schema"]).unwrap();
        assert_eq!(cli.level, LogLevel::Debug);

        let cli = Cli::try_parse_from(["signalform", "-l", "error", "schema"]).unwrap();
        assert_eq!(cli.level, LogLevel::Error);

        assert!(Cli::try_parse_from(["signalform", "--level", "loud", "schema"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "signalform",
            "create",
            "detector.json",
            "--auth-token",
            "secret",
            "--api-url",
            "https://api.eu0.signalfx.com",
            "--timeout",
            "30",
            "--json",
        ])
        .unwrap();

        assert!(cli.json);
        let overrides = cli.overrides();
        assert_eq!(overrides.auth_token.as_deref(), Some("secret"));
        assert_eq!(overrides.api_url.as_deref(), Some("https://api.eu0.signalfx.com"));
        assert!(overrides.custom_app_url.is_none());
        assert_eq!(overrides.timeout_seconds, Some(30));
        assert!(matches!(cli.command, Commands::Create { .. }));
    }

    #[test]
    fn test_import_arguments() {
        let cli = Cli::try_parse_from(["signalform", "import", "signalform_team", "T1"]).unwrap();
        let command: Command = cli.command.into();
        assert!(matches!(
            command,
            Command::Import { ref type_name, ref id } if type_name == "signalform_team" && id == "T1"
        ));
    }

    #[test]
    fn test_notification_check_requires_values() {
        assert!(Cli::try_parse_from(["signalform", "notification", "check"]).is_err());

        let cli = Cli::try_parse_from([
            "signalform",
            "notification",
            "check",
            "Email,a@example.com",
            "Team,T1",
        ])
        .unwrap();
        let command: Command = cli.command.into();
        let Command::NotificationCheck { values } = command else {
            panic!("Expected NotificationCheck command");
        };
        assert_eq!(values, vec!["Email,a@example.com", "Team,T1"]);
    }

    #[test]
    fn test_missing_subcommand() {
        assert!(Cli::try_parse_from(["signalform"]).is_err());
    }

    #[test]
    fn test_help_flag() {
        let err = Cli::try_parse_from(["signalform", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
