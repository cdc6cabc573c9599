//! The resource registry.
//!
//! [`SignalformProvider`] maps host-facing type names to resource
//! implementations and runs lifecycle operations on JSON state documents, so
//! callers such as the CLI never name a concrete configuration type.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use signalform_client::SignalFxClient;
use tracing::{debug, instrument};

use crate::config::{ConfigOverrides, ProviderConfig};
use crate::error::{Error, Result};
use crate::lifecycle::{self, ReadOutcome, Resource, ResourceState};
use crate::resources::chart::{
    HeatmapChart, ListChart, SingleValueChart, TableChart, TextChart, TimeChart,
};
use crate::resources::dashboard::Dashboard;
use crate::resources::dashboard_group::DashboardGroup;
use crate::resources::detector::Detector;
use crate::resources::team::Team;
use crate::schema::Schema;

/// A [`Resource`] with its configuration type erased to JSON.
#[async_trait]
pub trait DynResource: Send + Sync {
    /// Host-facing type name.
    fn type_name(&self) -> &'static str;

    /// Attribute schema.
    fn schema(&self) -> Schema;

    /// Decodes and validates a state document.
    async fn validate(&self, state: &Value) -> Result<()>;

    /// Creates the object and returns the new state.
    async fn create(&self, client: &SignalFxClient, state: Value) -> Result<Value>;

    /// Refreshes a state, or `None` if the object is gone.
    async fn read(&self, client: &SignalFxClient, state: Value) -> Result<Option<Value>>;

    /// Pushes a changed configuration and returns the new state.
    async fn update(&self, client: &SignalFxClient, state: Value) -> Result<Value>;

    /// Deletes the object.
    async fn delete(&self, client: &SignalFxClient, state: Value) -> Result<()>;

    /// Whether the object still exists.
    async fn exists(&self, client: &SignalFxClient, state: &Value) -> Result<bool>;

    /// State for an existing object, or `None` if the ID is unknown.
    async fn import(&self, client: &SignalFxClient, id: &str) -> Result<Option<Value>>;
}

struct Erased<R>(R);

impl<R: Resource> Erased<R> {
    fn decode(state: &Value) -> Result<ResourceState<R::Config>> {
        serde_json::from_value(state.clone()).map_err(|err| {
            Error::validation(R::TYPE_NAME, format!("state document is invalid: {err}"))
        })
    }

    fn encode(state: &ResourceState<R::Config>) -> Result<Value> {
        Ok(serde_json::to_value(state)?)
    }
}

#[async_trait]
impl<R: Resource> DynResource for Erased<R> {
    fn type_name(&self) -> &'static str {
        R::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        self.0.schema()
    }

    async fn validate(&self, state: &Value) -> Result<()> {
        let state = Self::decode(state)?;
        self.0.validate(&state.config)
    }

    async fn create(&self, client: &SignalFxClient, state: Value) -> Result<Value> {
        let mut state = Self::decode(&state)?;
        lifecycle::create(&self.0, client, &mut state).await?;
        Self::encode(&state)
    }

    async fn read(&self, client: &SignalFxClient, state: Value) -> Result<Option<Value>> {
        let mut state = Self::decode(&state)?;
        match lifecycle::read(&self.0, client, &mut state).await? {
            ReadOutcome::Found => Self::encode(&state).map(Some),
            ReadOutcome::Gone => Ok(None),
        }
    }

    async fn update(&self, client: &SignalFxClient, state: Value) -> Result<Value> {
        let mut state = Self::decode(&state)?;
        lifecycle::update(&self.0, client, &mut state).await?;
        Self::encode(&state)
    }

    async fn delete(&self, client: &SignalFxClient, state: Value) -> Result<()> {
        let mut state = Self::decode(&state)?;
        lifecycle::delete::<R>(client, &mut state).await
    }

    async fn exists(&self, client: &SignalFxClient, state: &Value) -> Result<bool> {
        let state = Self::decode(state)?;
        lifecycle::exists::<R>(client, &state).await
    }

    async fn import(&self, client: &SignalFxClient, id: &str) -> Result<Option<Value>> {
        match lifecycle::import(&self.0, client, id).await? {
            Some(state) => Self::encode(&state).map(Some),
            None => Ok(None),
        }
    }
}

/// Every resource type, keyed by type name, plus the client they share.
pub struct SignalformProvider {
    client: SignalFxClient,
    resources: BTreeMap<&'static str, Arc<dyn DynResource>>,
}

impl std::fmt::Debug for SignalformProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalformProvider")
            .field("client", &self.client)
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SignalformProvider {
    /// A provider with every built-in resource type registered.
    #[must_use]
    pub fn new(client: SignalFxClient) -> Self {
        let mut provider = Self {
            client,
            resources: BTreeMap::new(),
        };
        provider.register(Detector);
        provider.register(Dashboard);
        provider.register(DashboardGroup);
        provider.register(Team);
        provider.register(TimeChart);
        provider.register(ListChart);
        provider.register(SingleValueChart);
        provider.register(HeatmapChart);
        provider.register(TableChart);
        provider.register(TextChart);
        provider
    }

    /// Loads configuration, builds the client and registers every resource.
    ///
    /// # Errors
    ///
    /// Returns configuration errors such as a missing token.
    pub fn from_config(overrides: ConfigOverrides) -> Result<Self> {
        let config = ProviderConfig::load(overrides)?;
        Ok(Self::new(config.client()?))
    }

    /// A provider for schema and validation work. Its client carries no
    /// token, so API calls through it are rejected by the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn offline() -> Result<Self> {
        Ok(Self::new(ProviderConfig::default().client()?))
    }

    /// Adds or replaces a resource type.
    pub fn register<R: Resource>(&mut self, resource: R) {
        debug!(resource = R::TYPE_NAME, "Registering resource type");
        self.resources.insert(R::TYPE_NAME, Arc::new(Erased(resource)));
    }

    /// The shared API client.
    #[must_use]
    pub const fn client(&self) -> &SignalFxClient {
        &self.client
    }

    /// Registered type names, sorted.
    #[must_use]
    pub fn resource_types(&self) -> Vec<&'static str> {
        self.resources.keys().copied().collect()
    }

    /// Looks up a resource type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownResourceType`].
    pub fn resource(&self, type_name: &str) -> Result<&dyn DynResource> {
        self.resources
            .get(type_name)
            .map(Arc::as_ref)
            .ok_or_else(|| Error::UnknownResourceType {
                type_name: type_name.to_string(),
            })
    }

    /// Schema of one resource type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownResourceType`].
    pub fn schema(&self, type_name: &str) -> Result<Schema> {
        Ok(self.resource(type_name)?.schema())
    }

    /// Validates a state document offline.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    #[instrument(skip(self, state))]
    pub async fn validate(&self, type_name: &str, state: &Value) -> Result<()> {
        self.resource(type_name)?.validate(state).await
    }

    /// Creates an object from a state document.
    ///
    /// # Errors
    ///
    /// See [`lifecycle::create`].
    #[instrument(skip(self, state))]
    pub async fn create(&self, type_name: &str, state: Value) -> Result<Value> {
        self.resource(type_name)?.create(&self.client, state).await
    }

    /// Refreshes a state document; `None` when the object is gone.
    ///
    /// # Errors
    ///
    /// See [`lifecycle::read`].
    #[instrument(skip(self, state))]
    pub async fn read(&self, type_name: &str, state: Value) -> Result<Option<Value>> {
        self.resource(type_name)?.read(&self.client, state).await
    }

    /// Pushes a state document's configuration.
    ///
    /// # Errors
    ///
    /// See [`lifecycle::update`].
    #[instrument(skip(self, state))]
    pub async fn update(&self, type_name: &str, state: Value) -> Result<Value> {
        self.resource(type_name)?.update(&self.client, state).await
    }

    /// Deletes the object behind a state document.
    ///
    /// # Errors
    ///
    /// See [`lifecycle::delete`].
    #[instrument(skip(self, state))]
    pub async fn delete(&self, type_name: &str, state: Value) -> Result<()> {
        self.resource(type_name)?.delete(&self.client, state).await
    }

    /// Whether the object behind a state document exists.
    ///
    /// # Errors
    ///
    /// See [`lifecycle::exists`].
    #[instrument(skip(self, state))]
    pub async fn exists(&self, type_name: &str, state: &Value) -> Result<bool> {
        self.resource(type_name)?.exists(&self.client, state).await
    }

    /// Imports an existing object by ID.
    ///
    /// # Errors
    ///
    /// See [`lifecycle::import`].
    #[instrument(skip(self))]
    pub async fn import(&self, type_name: &str, id: &str) -> Result<Option<Value>> {
        self.resource(type_name)?.import(&self.client, id).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn provider() -> SignalformProvider {
        SignalformProvider::offline().unwrap()
    }

    #[test]
    fn test_every_type_registered() {
        assert_eq!(
            provider().resource_types(),
            vec![
                "signalform_dashboard",
                "signalform_dashboard_group",
                "signalform_detector",
                "signalform_heatmap_chart",
                "signalform_list_chart",
                "signalform_single_value_chart",
                "signalform_table_chart",
                "signalform_team",
                "signalform_text_chart",
                "signalform_time_chart",
            ]
        );
    }

    #[test]
    fn test_schema_type_names_match_registry() {
        let provider = provider();
        for type_name in provider.resource_types() {
            assert_eq!(provider.schema(type_name).unwrap().type_name, type_name);
        }
    }

    #[test]
    fn test_unknown_type() {
        let err = provider().schema("signalform_alert_muting_rule").unwrap_err();
        assert!(matches!(err, Error::UnknownResourceType { .. }));
    }

    #[tokio::test]
    async fn test_validate_decodes_state() {
        let provider = provider();
        provider
            .validate("signalform_text_chart", &json!({"name": "notes", "markdown": "hi"}))
            .await
            .unwrap();

        let err = provider
            .validate("signalform_team", &json!({"name": ""}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        let err = provider
            .validate("signalform_time_chart", &json!({"name": "x", "plot_type": "Pie"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("state document is invalid"));
    }

    #[tokio::test]
    async fn test_untracked_state_does_not_exist() {
        let exists = provider()
            .exists("signalform_detector", &json!({"name": "cpu"}))
            .await
            .unwrap();
        assert!(!exists);
    }
}
