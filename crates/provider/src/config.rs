//! Provider configuration.
//!
//! Values are layered; later sources override earlier ones:
//!
//! 1. built-in defaults
//! 2. `/etc/signalfx.conf`, then `~/.signalfx.conf` (JSON)
//! 3. `SFX_AUTH_TOKEN`, `SFX_API_URL` and `SFX_CUSTOM_APP_URL`
//! 4. explicit overrides (CLI flags or a provider block)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use signalform_client::SignalFxClient;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{Error, Result};

/// Default REST API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.signalfx.com";
/// Default web app, used to build resource links.
pub const DEFAULT_APP_URL: &str = "https://app.signalfx.com";
/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Environment variable holding the access token.
pub const ENV_AUTH_TOKEN: &str = "SFX_AUTH_TOKEN";
/// Environment variable overriding the API URL.
pub const ENV_API_URL: &str = "SFX_API_URL";
/// Environment variable overriding the app URL.
pub const ENV_CUSTOM_APP_URL: &str = "SFX_CUSTOM_APP_URL";

const SYSTEM_CONFIG: &str = "/etc/signalfx.conf";
const USER_CONFIG: &str = ".signalfx.conf";

/// Resolved provider settings.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Organization access token
    pub auth_token: String,
    /// REST API base URL
    pub api_url: String,
    /// Web app base URL
    pub custom_app_url: String,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("auth_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("custom_app_url", &self.custom_app_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// A partial configuration; `None` leaves the lower layer in place.
///
/// Also the shape of `signalfx.conf`; keys used by other SignalFx tools
/// are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigOverrides {
    /// Access token
    pub auth_token: Option<String>,
    /// REST API base URL
    pub api_url: Option<String>,
    /// Web app base URL
    pub custom_app_url: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: Option<u64>,
}

impl ConfigOverrides {
    /// Reads the `SFX_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|value| !value.is_empty());
        Self {
            auth_token: var(ENV_AUTH_TOKEN),
            api_url: var(ENV_API_URL),
            custom_app_url: var(ENV_CUSTOM_APP_URL),
            timeout_seconds: None,
        }
    }

    /// Reads a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the path if the file cannot be read
    /// or is not valid JSON.
    pub fn from_file(path: &Path) -> Result<Self> {
        let with_path = |message: String| Error::Config {
            message,
            path: Some(path.to_path_buf()),
        };
        let raw = std::fs::read_to_string(path)
            .map_err(|err| with_path(format!("failed to read {}: {err}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|err| with_path(format!("failed to parse {}: {err}", path.display())))
    }

    fn apply(self, config: &mut ProviderConfig) {
        if let Some(token) = self.auth_token {
            config.auth_token = token;
        }
        if let Some(api_url) = self.api_url {
            config.api_url = api_url;
        }
        if let Some(app_url) = self.custom_app_url {
            config.custom_app_url = app_url;
        }
        if let Some(timeout) = self.timeout_seconds {
            config.timeout_seconds = timeout;
        }
    }
}

/// The system file followed by the user's home file.
#[must_use]
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(USER_CONFIG));
    }
    paths
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            auth_token: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            custom_app_url: DEFAULT_APP_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl ProviderConfig {
    /// Loads from the default file locations, the environment and `overrides`.
    ///
    /// # Errors
    ///
    /// See [`ProviderConfig::load_from`].
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        Self::load_from(&default_config_paths(), overrides)
    }

    /// Loads from `paths` (missing files are skipped), the environment and
    /// `overrides`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed files, a missing token or
    /// non-absolute URLs.
    #[instrument(skip(overrides))]
    pub fn load_from(paths: &[PathBuf], overrides: ConfigOverrides) -> Result<Self> {
        let mut config = Self::default();
        for path in paths {
            if !path.is_file() {
                debug!(path = %path.display(), "Config file not present");
                continue;
            }
            debug!(path = %path.display(), "Loading config file");
            ConfigOverrides::from_file(path)?.apply(&mut config);
        }
        ConfigOverrides::from_env().apply(&mut config);
        overrides.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Checks the token is present and both URLs are absolute.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.auth_token.trim().is_empty() {
            return Err(Error::config(format!(
                "auth_token is required (set {ENV_AUTH_TOKEN} or add it to ~/{USER_CONFIG})"
            )));
        }
        for (name, value) in [
            ("api_url", &self.api_url),
            ("custom_app_url", &self.custom_app_url),
        ] {
            let parsed = Url::parse(value)
                .map_err(|err| Error::config(format!("{name} '{value}' is not a valid URL: {err}")))?;
            if parsed.cannot_be_a_base() {
                return Err(Error::config(format!(
                    "{name} '{value}' must be an absolute URL"
                )));
            }
        }
        Ok(())
    }

    /// Request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Builds an API client from these settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn client(&self) -> Result<SignalFxClient> {
        Ok(SignalFxClient::new(
            &self.api_url,
            &self.custom_app_url,
            &self.auth_token,
            self.timeout(),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const UNSET: [(&str, Option<&str>); 3] = [
        (ENV_AUTH_TOKEN, None),
        (ENV_API_URL, None),
        (ENV_CUSTOM_APP_URL, None),
    ];

    fn write_config(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults_with_explicit_token() {
        temp_env::with_vars(UNSET, || {
            let config = ProviderConfig::load_from(
                &[],
                ConfigOverrides {
                    auth_token: Some("tok".to_string()),
                    ..ConfigOverrides::default()
                },
            )
            .unwrap();
            assert_eq!(config.api_url, DEFAULT_API_URL);
            assert_eq!(config.custom_app_url, DEFAULT_APP_URL);
            assert_eq!(config.timeout_seconds, 120);
        });
    }

    #[test]
    fn test_missing_token_is_error() {
        temp_env::with_vars(UNSET, || {
            let err = ProviderConfig::load_from(&[], ConfigOverrides::default()).unwrap_err();
            assert!(err.to_string().contains("auth_token"));
        });
    }

    #[test]
    fn test_layering_order() {
        let dir = tempfile::tempdir().unwrap();
        let system = write_config(
            &dir,
            "system.conf",
            r#"{"auth_token": "system", "api_url": "https://system.example.com"}"#,
        );
        let user = write_config(&dir, "user.conf", r#"{"auth_token": "user"}"#);

        temp_env::with_vars(UNSET, || {
            let config = ProviderConfig::load_from(
                &[system.clone(), user.clone()],
                ConfigOverrides::default(),
            )
            .unwrap();
            assert_eq!(config.auth_token, "user");
            assert_eq!(config.api_url, "https://system.example.com");
        });

        temp_env::with_vars(
            [
                (ENV_AUTH_TOKEN, Some("env")),
                (ENV_API_URL, None),
                (ENV_CUSTOM_APP_URL, Some("https://app.eu0.signalfx.com")),
            ],
            || {
                let config =
                    ProviderConfig::load_from(&[system.clone(), user.clone()], ConfigOverrides::default())
                        .unwrap();
                assert_eq!(config.auth_token, "env");
                assert_eq!(config.custom_app_url, "https://app.eu0.signalfx.com");

                let config = ProviderConfig::load_from(
                    &[system.clone(), user.clone()],
                    ConfigOverrides {
                        auth_token: Some("flag".to_string()),
                        ..ConfigOverrides::default()
                    },
                )
                .unwrap();
                assert_eq!(config.auth_token, "flag");
            },
        );
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_vars([(ENV_AUTH_TOKEN, Some("env"))], || {
            let config = ProviderConfig::load_from(
                &[dir.path().join("absent.conf")],
                ConfigOverrides::default(),
            )
            .unwrap();
            assert_eq!(config.auth_token, "env");
        });
    }

    #[test]
    fn test_file_shared_with_other_tools_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "signalfx.conf",
            r#"{"auth_token": "tok", "useremail": "a@b.c", "realm": "us1"}"#,
        );
        let overrides = ConfigOverrides::from_file(&path).unwrap();
        assert_eq!(overrides.auth_token.as_deref(), Some("tok"));

        temp_env::with_vars(UNSET, || {
            let config = ProviderConfig::load_from(&[path.clone()], ConfigOverrides::default())
                .unwrap();
            assert_eq!(config.auth_token, "tok");
        });
    }

    #[test]
    fn test_malformed_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "bad.conf", "{not json");
        temp_env::with_vars(UNSET, || {
            let err = ProviderConfig::load_from(&[path.clone()], ConfigOverrides::default())
                .unwrap_err();
            match err {
                Error::Config { path: Some(p), .. } => assert_eq!(p, path),
                other => panic!("unexpected error: {other:?}"),
            }
        });
    }

    #[test]
    fn test_relative_url_rejected() {
        temp_env::with_vars(UNSET, || {
            let err = ProviderConfig::load_from(
                &[],
                ConfigOverrides {
                    auth_token: Some("tok".to_string()),
                    api_url: Some("api.signalfx.com".to_string()),
                    ..ConfigOverrides::default()
                },
            )
            .unwrap_err();
            assert!(err.to_string().contains("api_url"));
        });
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ProviderConfig {
            auth_token: "secret".to_string(),
            ..ProviderConfig::default()
        };
        assert!(!format!("{config:?}").contains("secret"));
    }
}
