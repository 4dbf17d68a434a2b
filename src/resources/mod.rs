//! One reconciler per Capella resource kind.
//!
//! Each reconciler owns the schema of its kind, decodes configuration into a
//! typed spec, and drives the control-plane API through create, read,
//! update and delete. [`crate::CapellaProvider`] dispatches to them by type name.

pub mod bucket;
pub mod cloud;
pub mod constraints;
pub mod database_user;
pub mod hosted_cluster;
pub mod project;
pub mod vpc_cluster;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::CapellaClient;
use crate::config::PollConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::models::{Cluster, V3Cluster};
use crate::schema::{Attribute, Block, NestedBlock, Schema, Validator};

pub use bucket::BucketReconciler;
pub use cloud::CloudDataSource;
pub use database_user::DatabaseUserReconciler;
pub use hosted_cluster::HostedClusterReconciler;
pub use project::ProjectReconciler;
pub use vpc_cluster::VpcClusterReconciler;

/// Everything a reconciler needs to talk to Capella.
#[derive(Debug, Clone)]
pub struct Context {
    /// Authenticated API client.
    pub client: CapellaClient,
    /// Provider-wide poll timing overrides.
    pub poll: PollConfig,
}

impl Context {
    /// Create a context.
    pub fn new(client: CapellaClient, poll: PollConfig) -> Self {
        Self { client, poll }
    }
}

/// Lifecycle of one resource kind.
#[async_trait::async_trait]
pub trait Reconciler: Send + Sync {
    /// The engine-facing type name, e.g. `couchbasecapella_bucket`.
    fn type_name(&self) -> &'static str;

    /// Schema of the resource configuration and state.
    fn schema(&self) -> Schema;

    /// Create the resource and wait until it is usable. Returns its state.
    async fn create(&self, ctx: &Context, config: Value) -> ProviderResult<Value>;

    /// Refresh the state. `None` means the resource is gone.
    async fn read(&self, ctx: &Context, state: Value) -> ProviderResult<Option<Value>>;

    /// Apply in-place changes. Returns the new state.
    async fn update(&self, ctx: &Context, prior: Value, planned: Value) -> ProviderResult<Value>;

    /// Delete the resource and wait until it is gone.
    async fn delete(&self, ctx: &Context, state: Value) -> ProviderResult<()>;

    /// Build state for an existing resource from its ID.
    async fn import(&self, _ctx: &Context, _id: &str) -> ProviderResult<Value> {
        Err(ProviderError::Unimplemented(format!(
            "import is not supported for {}",
            self.type_name()
        )))
    }
}

/// Per-resource operation deadlines, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    /// Deadline for create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<u64>,
    /// Deadline for update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<u64>,
    /// Deadline for delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<u64>,
}

impl Timeouts {
    /// Create deadline, or `default`.
    pub fn create_or(timeouts: Option<&Self>, default: Duration) -> Duration {
        timeouts
            .and_then(|t| t.create)
            .map_or(default, Duration::from_secs)
    }

    /// Update deadline, or `default`.
    pub fn update_or(timeouts: Option<&Self>, default: Duration) -> Duration {
        timeouts
            .and_then(|t| t.update)
            .map_or(default, Duration::from_secs)
    }

    /// Delete deadline, or `default`.
    pub fn delete_or(timeouts: Option<&Self>, default: Duration) -> Duration {
        timeouts
            .and_then(|t| t.delete)
            .map_or(default, Duration::from_secs)
    }

    /// The `timeouts` block shared by asynchronous kinds.
    pub fn block() -> NestedBlock {
        let seconds = || Attribute::optional_int64().with_validator(Validator::int_range(1, 86_400));
        NestedBlock::single(
            Block::new()
                .with_description("Operation deadlines in seconds")
                .with_attribute("create", seconds())
                .with_attribute("update", seconds())
                .with_attribute("delete", seconds()),
        )
    }
}

/// Attribute for the computed `id` of a resource.
pub(crate) fn id_attribute(description: &str) -> Attribute {
    Attribute::computed_string().with_description(description)
}

/// Attribute for a required UUID reference that forces replacement.
pub(crate) fn uuid_reference(description: &str) -> Attribute {
    Attribute::required_string()
        .with_description(description)
        .with_force_new()
        .with_validator(Validator::Uuid)
}

/// Read the `id` of a resource from its state.
pub(crate) fn state_id(state: &Value) -> ProviderResult<String> {
    state
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ProviderError::InvalidRequest("state has no id".to_string()))
}

/// Decode a prior state into its typed form.
pub(crate) fn from_state<T: DeserializeOwned>(state: &Value) -> ProviderResult<T> {
    serde_json::from_value(state.clone())
        .map_err(|e| ProviderError::InvalidRequest(format!("malformed state: {}", e)))
}

/// Encode a typed state.
pub(crate) fn to_state<T: Serialize>(state: &T) -> ProviderResult<Value> {
    Ok(serde_json::to_value(state)?)
}

/// Check that buckets and users can be managed on `cluster_id`.
///
/// Only in-VPC clusters expose these endpoints. A cluster known only to the
/// hosted API is rejected with a dedicated message; an unknown cluster is
/// reported as not found.
pub(crate) async fn ensure_vpc_cluster(
    client: &CapellaClient,
    cluster_id: &str,
    managed: &str,
) -> ProviderResult<()> {
    let vpc: Option<Cluster> = client
        .get_optional(&format!("/v2/clusters/{}", cluster_id), "read cluster")
        .await?;
    if vpc.is_some() {
        return Ok(());
    }

    let hosted: Option<V3Cluster> = client
        .get_optional(&format!("/v3/clusters/{}", cluster_id), "read hosted cluster")
        .await?;
    match hosted {
        Some(_) => Err(ProviderError::Unimplemented(format!(
            "managing {} is not available for hosted clusters",
            managed
        ))),
        None => Err(ProviderError::NotFound(format!(
            "cluster {} does not exist",
            cluster_id
        ))),
    }
}
