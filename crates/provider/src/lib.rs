//! Declarative management of SignalFx objects.
//!
//! Detectors, dashboards, dashboard groups, teams and six chart kinds are
//! described as plain configuration structs. Each type implements
//! [`lifecycle::Resource`], which translates between the configuration and
//! the SignalFx REST API's JSON. The generic functions in [`lifecycle`] then
//! create, read, update, delete and import objects while tracking drift.
//!
//! [`SignalformProvider`] wraps every resource type behind JSON state
//! documents for callers that pick the type at runtime.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod notification;
pub mod palette;
pub mod provider;
pub mod resources;
pub mod rule;
pub mod schema;
pub mod time;
pub mod validation;

pub use config::{ConfigOverrides, ProviderConfig};
pub use error::{Error, Result};
pub use lifecycle::{ReadOutcome, Resource, ResourceState, SyncState};
pub use notification::Notification;
pub use provider::{DynResource, SignalformProvider};
pub use rule::{Rule, RuleSet, rule_hash};
pub use schema::Schema;
pub use signalform_client::SignalFxClient;
