//! Create/read/update/delete shared by every resource.
//!
//! Each resource type supplies its schema, validation and the mapping between
//! its configuration and the API's JSON through [`Resource`]. The functions
//! here drive the HTTP calls and keep the tracking fields (`id`, `synced`,
//! `last_updated`, `url`) consistent.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use signalform_client::{SignalFxClient, StatusCode};
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::schema::Schema;

/// Slack, in milliseconds, before a newer server timestamp counts as drift.
pub const DRIFT_TOLERANCE_MS: f64 = 10_000.0;

/// Tracking fields common to every resource state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    /// False once the object was modified outside of this provider
    #[serde(default = "default_synced")]
    pub synced: bool,
    /// Server modification time, epoch milliseconds
    #[serde(default)]
    pub last_updated: f64,
    /// Web app link
    #[serde(default)]
    pub url: String,
}

const fn default_synced() -> bool {
    true
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            synced: true,
            last_updated: 0.0,
            url: String::new(),
        }
    }
}

/// Full state of one managed object: its ID, configuration and tracking fields.
///
/// Serialized flat, so `{"id": "...", "name": "...", "synced": true, ...}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceState<C> {
    /// SignalFx ID; empty when not tracked
    #[serde(default)]
    pub id: String,
    /// Resource-specific configuration
    #[serde(flatten)]
    pub config: C,
    /// Tracking fields
    #[serde(flatten)]
    pub sync: SyncState,
}

impl<C: Default> ResourceState<C> {
    /// A not-yet-created state for `config`.
    pub fn new(config: C) -> Self {
        Self {
            id: String::new(),
            config,
            sync: SyncState::default(),
        }
    }

    /// A state that only knows its ID, as used by import.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            config: C::default(),
            sync: SyncState::default(),
        }
    }

    /// Whether the state refers to a remote object.
    pub fn is_tracked(&self) -> bool {
        !self.id.is_empty()
    }
}

/// Result of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The object exists and the state was refreshed.
    Found,
    /// The object is gone and the ID was cleared.
    Gone,
}

/// A SignalFx object type managed through the REST API.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    /// Configuration fields of this resource.
    type Config: Serialize + DeserializeOwned + Clone + Default + Debug + Send + Sync;

    /// Host-facing type name, e.g. `signalform_detector`.
    const TYPE_NAME: &'static str;
    /// Collection path, e.g. `/v2/detector`.
    const API_PATH: &'static str;
    /// Web app fragment prefix, e.g. `/chart/v2/`.
    const APP_PATH: &'static str;

    /// Attribute schema.
    fn schema(&self) -> Schema;

    /// Checks the configuration without contacting the API.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    fn validate(&self, config: &Self::Config) -> Result<()>;

    /// Builds the create/update request body.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be encoded.
    fn to_payload(&self, config: &Self::Config) -> Result<Value>;

    /// Copies a read response back onto the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the response does not have the expected shape.
    fn apply_response(&self, config: &mut Self::Config, response: &Value) -> Result<()>;

    /// Web app fragment for an object.
    fn app_fragment(&self, id: &str) -> String {
        format!("{}{id}", Self::APP_PATH)
    }

    /// Extra checks run with the payload before create and update.
    ///
    /// # Errors
    ///
    /// Returns an error to abort the write.
    async fn before_write(&self, _client: &SignalFxClient, _payload: &Value) -> Result<()> {
        Ok(())
    }
}

/// `id` and `lastUpdated` from any object response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMeta {
    id: String,
    #[serde(default)]
    last_updated: Option<f64>,
}

fn decode_meta(body: &Value) -> Result<ApiMeta> {
    ApiMeta::deserialize(body)
        .map_err(|err| Error::unexpected(format!("response is missing id/lastUpdated: {err}")))
}

fn item_path<R: Resource>(id: &str) -> String {
    format!("{}/{id}", R::API_PATH)
}

fn app_link<R: Resource>(resource: &R, client: &SignalFxClient, id: &str) -> Result<String> {
    Ok(client.app_link(&resource.app_fragment(id))?.to_string())
}

fn require_id<C>(resource: &'static str, state: &ResourceState<C>) -> Result<()> {
    if state.id.is_empty() {
        Err(Error::MissingId {
            type_name: resource,
        })
    } else {
        Ok(())
    }
}

/// Creates the object and records its ID, timestamp and link.
///
/// # Errors
///
/// Returns validation errors, transport errors, or [`Error::Api`] for a
/// non-success status.
#[instrument(skip_all, fields(resource = R::TYPE_NAME))]
pub async fn create<R: Resource>(
    resource: &R,
    client: &SignalFxClient,
    state: &mut ResourceState<R::Config>,
) -> Result<()> {
    resource.validate(&state.config)?;
    let payload = resource.to_payload(&state.config)?;
    resource.before_write(client, &payload).await?;

    let response = client.post(R::API_PATH, &payload).await?;
    if !response.is_success() {
        return Err(Error::api(&response));
    }
    let body: Value = response.json()?;
    let meta = decode_meta(&body)?;

    state.sync.url = app_link(resource, client, &meta.id)?;
    state.sync.last_updated = meta.last_updated.unwrap_or_default();
    state.sync.synced = true;
    state.id = meta.id;

    info!(id = %state.id, "Created {}", R::TYPE_NAME);
    Ok(())
}

/// Refreshes the state from the API.
///
/// A server timestamp more than [`DRIFT_TOLERANCE_MS`] newer than the
/// recorded one marks the state out of sync. A 404 clears the ID.
///
/// # Errors
///
/// Returns [`Error::MissingId`] for an untracked state, transport errors, or
/// [`Error::Api`] for statuses other than 200 and 404.
#[instrument(skip_all, fields(resource = R::TYPE_NAME, id = %state.id))]
pub async fn read<R: Resource>(
    resource: &R,
    client: &SignalFxClient,
    state: &mut ResourceState<R::Config>,
) -> Result<ReadOutcome> {
    require_id(R::TYPE_NAME, state)?;

    let response = client.get(&item_path::<R>(&state.id)).await?;
    if response.is_not_found() {
        warn!("{} {} no longer exists; removing it from state", R::TYPE_NAME, state.id);
        state.id.clear();
        return Ok(ReadOutcome::Gone);
    }
    if response.status != StatusCode::OK {
        return Err(Error::api(&response));
    }

    let body: Value = response.json()?;
    let meta = decode_meta(&body)?;
    let server_updated = meta.last_updated.unwrap_or_default();

    if state.sync.last_updated <= 0.0 {
        state.sync.last_updated = server_updated;
    } else if server_updated > state.sync.last_updated + DRIFT_TOLERANCE_MS {
        warn!(
            recorded = state.sync.last_updated,
            server = server_updated,
            "{} {} was modified outside of signalform",
            R::TYPE_NAME,
            state.id
        );
        state.sync.synced = false;
        state.sync.last_updated = server_updated;
    }

    resource.apply_response(&mut state.config, &body)?;
    state.sync.url = app_link(resource, client, &state.id)?;
    debug!("Read {}", R::TYPE_NAME);
    Ok(ReadOutcome::Found)
}

/// Replaces the remote object with the current configuration.
///
/// # Errors
///
/// Returns validation errors, [`Error::MissingId`], transport errors, or
/// [`Error::Api`] for a non-success status.
#[instrument(skip_all, fields(resource = R::TYPE_NAME, id = %state.id))]
pub async fn update<R: Resource>(
    resource: &R,
    client: &SignalFxClient,
    state: &mut ResourceState<R::Config>,
) -> Result<()> {
    require_id(R::TYPE_NAME, state)?;
    resource.validate(&state.config)?;
    let payload = resource.to_payload(&state.config)?;
    resource.before_write(client, &payload).await?;

    let response = client.put(&item_path::<R>(&state.id), &payload).await?;
    if !response.is_success() {
        return Err(Error::api(&response));
    }
    let body: Value = response.json()?;
    if let Some(updated) = decode_meta(&body)?.last_updated {
        state.sync.last_updated = updated;
    }
    state.sync.synced = true;
    state.sync.url = app_link(resource, client, &state.id)?;

    info!("Updated {}", R::TYPE_NAME);
    Ok(())
}

/// Deletes the remote object. Already-deleted objects are not an error.
///
/// # Errors
///
/// Returns [`Error::MissingId`], transport errors, or [`Error::Api`] for
/// statuses other than 200, 204 and 404.
#[instrument(skip_all, fields(resource = R::TYPE_NAME, id = %state.id))]
pub async fn delete<R: Resource>(
    client: &SignalFxClient,
    state: &mut ResourceState<R::Config>,
) -> Result<()> {
    require_id(R::TYPE_NAME, state)?;

    let response = client.delete(&item_path::<R>(&state.id)).await?;
    match response.status {
        StatusCode::OK | StatusCode::NO_CONTENT => {
            info!("Deleted {}", R::TYPE_NAME);
        }
        StatusCode::NOT_FOUND => {
            warn!("{} {} was already deleted", R::TYPE_NAME, state.id);
        }
        _ => return Err(Error::api(&response)),
    }
    state.id.clear();
    Ok(())
}

/// Whether the remote object still exists. An untracked state never does.
///
/// # Errors
///
/// Returns transport errors or [`Error::Api`] for statuses other than 200
/// and 404.
#[instrument(skip_all, fields(resource = R::TYPE_NAME, id = %state.id))]
pub async fn exists<R: Resource>(
    client: &SignalFxClient,
    state: &ResourceState<R::Config>,
) -> Result<bool> {
    if !state.is_tracked() {
        return Ok(false);
    }
    let response = client.get(&item_path::<R>(&state.id)).await?;
    match response.status {
        StatusCode::OK => Ok(true),
        StatusCode::NOT_FOUND => Ok(false),
        _ => Err(Error::api(&response)),
    }
}

/// Builds a state for an existing object by ID.
///
/// Returns `None` if no object has that ID.
///
/// # Errors
///
/// See [`read`].
#[instrument(skip(resource, client), fields(resource = R::TYPE_NAME))]
pub async fn import<R: Resource>(
    resource: &R,
    client: &SignalFxClient,
    id: &str,
) -> Result<Option<ResourceState<R::Config>>> {
    let mut state = ResourceState::with_id(id);
    match read(resource, client, &mut state).await? {
        ReadOutcome::Found => Ok(Some(state)),
        ReadOutcome::Gone => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Named {
        name: String,
    }

    #[test]
    fn test_state_serializes_flat() {
        let mut state = ResourceState::new(Named {
            name: "cpu".to_string(),
        });
        state.id = "ABC".to_string();
        state.sync.last_updated = 1.5;
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({"id": "ABC", "name": "cpu", "synced": true, "last_updated": 1.5, "url": ""})
        );
    }

    #[test]
    fn test_state_defaults() {
        let state: ResourceState<Named> = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert!(!state.is_tracked());
        assert!(state.sync.synced);
        assert!(state.sync.last_updated.abs() < f64::EPSILON);
    }

    #[test]
    fn test_with_id() {
        let state: ResourceState<Named> = ResourceState::with_id("XYZ");
        assert!(state.is_tracked());
        assert_eq!(state.config, Named::default());
    }

    #[test]
    fn test_meta_requires_id() {
        assert!(decode_meta(&json!({"lastUpdated": 1})).is_err());
        let meta = decode_meta(&json!({"id": "A", "lastUpdated": 1_700_000_000_000_i64})).unwrap();
        assert_eq!(meta.id, "A");
        assert_eq!(meta.last_updated, Some(1_700_000_000_000.0));
    }
}
