//! `couchbasecapella_bucket`: a bucket on an in-VPC cluster.
//!
//! The bucket API has no single-item lookup, so every operation lists the
//! cluster's buckets and scans by name. The bucket name is the resource ID.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::constraints::CONFLICT_RESOLUTIONS;
use super::{
    ensure_vpc_cluster, from_state, to_state, uuid_reference, Context, Reconciler, Timeouts,
};
use crate::client::CapellaClient;
use crate::error::{ProviderError, ProviderResult};
use crate::models::{Bucket, CreateBucketRequest, DeleteBucketRequest, UpdateBucketRequest};
use crate::poll::StatusPoller;
use crate::schema::{Attribute, Schema, Validator};
use crate::validation::decode;

/// Resource type name.
pub const TYPE_NAME: &str = "couchbasecapella_bucket";

const MANAGED: &str = "buckets";
const DELETE_TIMEOUT: Duration = Duration::from_secs(300);
const DELETE_INTERVAL: Duration = Duration::from_secs(2);

/// Desired state of a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BucketSpec {
    /// Cluster the bucket lives on.
    pub cluster_id: String,
    /// Bucket name.
    pub name: String,
    /// Memory quota in MiB.
    pub memory_quota: i64,
    /// Replica count.
    #[serde(default = "default_replicas")]
    pub replicas: i64,
    /// Conflict resolution mode.
    pub conflict_resolution: String,
    /// Operation deadlines.
    #[serde(default)]
    pub timeouts: Option<Timeouts>,
}

fn default_replicas() -> i64 {
    1
}

/// Recorded state of a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketState {
    /// The bucket name.
    pub id: String,
    /// Cluster the bucket lives on.
    pub cluster_id: String,
    /// Bucket name.
    pub name: String,
    /// Memory quota in MiB.
    pub memory_quota: i64,
    /// Replica count.
    pub replicas: i64,
    /// Conflict resolution mode.
    pub conflict_resolution: String,
    /// Operation deadlines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<Timeouts>,
}

impl From<BucketSpec> for BucketState {
    fn from(spec: BucketSpec) -> Self {
        Self {
            id: spec.name.clone(),
            cluster_id: spec.cluster_id,
            name: spec.name,
            memory_quota: spec.memory_quota,
            replicas: spec.replicas,
            conflict_resolution: spec.conflict_resolution,
            timeouts: spec.timeouts,
        }
    }
}

impl BucketState {
    /// Overwrite the fields the API echoes back.
    fn refresh_from(mut self, bucket: &Bucket) -> Self {
        self.memory_quota = bucket.memory_quota;
        if let Some(replicas) = bucket.replicas {
            self.replicas = replicas;
        }
        if let Some(conflict_resolution) = &bucket.conflict_resolution {
            self.conflict_resolution = conflict_resolution.clone();
        }
        self
    }
}

/// Reconciler for buckets.
#[derive(Debug, Default, Clone, Copy)]
pub struct BucketReconciler;

impl BucketReconciler {
    async fn list(client: &CapellaClient, cluster_id: &str) -> ProviderResult<Vec<Bucket>> {
        client
            .get(&format!("/v2/clusters/{}/buckets", cluster_id), "list buckets")
            .await
    }

    async fn find(
        client: &CapellaClient,
        cluster_id: &str,
        name: &str,
    ) -> ProviderResult<Option<Bucket>> {
        Ok(Self::list(client, cluster_id)
            .await?
            .into_iter()
            .find(|bucket| bucket.name == name))
    }

    async fn refresh(&self, ctx: &Context, state: BucketState) -> ProviderResult<Option<BucketState>> {
        match ensure_vpc_cluster(&ctx.client, &state.cluster_id, MANAGED).await {
            Ok(()) => {},
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        }
        let found = Self::find(&ctx.client, &state.cluster_id, &state.id).await?;
        Ok(found.map(|bucket| state.refresh_from(&bucket)))
    }
}

#[async_trait::async_trait]
impl Reconciler for BucketReconciler {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Manage Couchbase Capella buckets")
            .with_attribute("id", Attribute::computed_string().with_description("The bucket name"))
            .with_attribute("cluster_id", uuid_reference("ID of the cluster"))
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("Name of the bucket")
                    .with_force_new()
                    .with_validator(Validator::pattern(
                        r"^[a-zA-Z0-9][a-zA-Z0-9_.]{0,98}$",
                        "use letters, numbers, periods (.) or underscores (_); bucket names cannot exceed 100 characters and must begin with a letter or a number",
                    )),
            )
            .with_attribute(
                "memory_quota",
                Attribute::required_int64()
                    .with_description("Bucket memory quota in MiB")
                    .with_validator(Validator::int_range(100, i64::MAX)),
            )
            .with_attribute(
                "replicas",
                Attribute::optional_int64()
                    .with_description("Number of bucket replicas")
                    .with_default(serde_json::json!(1))
                    .with_force_new()
                    .with_validator(Validator::int_range(0, 3)),
            )
            .with_attribute(
                "conflict_resolution",
                Attribute::required_string()
                    .with_description("Conflict resolution for the bucket")
                    .with_force_new()
                    .with_validator(Validator::one_of(CONFLICT_RESOLUTIONS.iter().copied())),
            )
            .with_block("timeouts", Timeouts::block())
    }

    async fn create(&self, ctx: &Context, config: Value) -> ProviderResult<Value> {
        let spec: BucketSpec = decode(&self.schema(), &config)?;
        ensure_vpc_cluster(&ctx.client, &spec.cluster_id, MANAGED).await?;

        if Self::find(&ctx.client, &spec.cluster_id, &spec.name)
            .await?
            .is_some()
        {
            return Err(ProviderError::AlreadyExists(format!(
                "a bucket named {} already exists on cluster {}",
                spec.name, spec.cluster_id
            )));
        }

        let request = CreateBucketRequest {
            name: spec.name.clone(),
            memory_quota: spec.memory_quota,
            replicas: spec.replicas,
            conflict_resolution: spec.conflict_resolution.clone(),
        };
        ctx.client
            .post_empty(
                &format!("/v2/clusters/{}/buckets", spec.cluster_id),
                &request,
                "create bucket",
            )
            .await?;
        info!(cluster_id = %spec.cluster_id, name = %spec.name, "bucket created");

        let state = BucketState::from(spec);
        match self.refresh(ctx, state.clone()).await? {
            Some(refreshed) => to_state(&refreshed),
            None => {
                warn!(name = %state.name, "bucket not listed yet after create");
                to_state(&state)
            },
        }
    }

    async fn read(&self, ctx: &Context, state: Value) -> ProviderResult<Option<Value>> {
        let state: BucketState = from_state(&state)?;
        match self.refresh(ctx, state).await? {
            Some(refreshed) => Ok(Some(to_state(&refreshed)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, ctx: &Context, prior: Value, planned: Value) -> ProviderResult<Value> {
        let prior: BucketState = from_state(&prior)?;
        let spec: BucketSpec = decode(&self.schema(), &planned)?;
        ensure_vpc_cluster(&ctx.client, &spec.cluster_id, MANAGED).await?;

        if spec.memory_quota != prior.memory_quota {
            let bucket = Self::find(&ctx.client, &spec.cluster_id, &prior.id)
                .await?
                .ok_or_else(|| {
                    ProviderError::NotFound(format!("failed to find the bucket {}", prior.id))
                })?;
            ctx.client
                .put(
                    &format!("/v2/clusters/{}/buckets/{}", spec.cluster_id, bucket.id),
                    &UpdateBucketRequest {
                        memory_quota: spec.memory_quota,
                    },
                    "update bucket",
                )
                .await?;
            info!(name = %prior.id, memory_quota = spec.memory_quota, "bucket memory quota updated");
        }

        let state = BucketState::from(spec);
        match self.refresh(ctx, state.clone()).await? {
            Some(refreshed) => to_state(&refreshed),
            None => to_state(&state),
        }
    }

    async fn delete(&self, ctx: &Context, state: Value) -> ProviderResult<()> {
        let state: BucketState = from_state(&state)?;
        ensure_vpc_cluster(&ctx.client, &state.cluster_id, MANAGED).await?;

        if Self::find(&ctx.client, &state.cluster_id, &state.id)
            .await?
            .is_none()
        {
            return Err(ProviderError::NotFound(format!(
                "bucket {} doesn't exist on cluster {}",
                state.id, state.cluster_id
            )));
        }

        ctx.client
            .delete_with_body(
                &format!("/v2/clusters/{}/buckets", state.cluster_id),
                &DeleteBucketRequest {
                    name: state.id.clone(),
                },
                "delete bucket",
            )
            .await?;

        let poller = StatusPoller::until_absent()
            .pending_while_present()
            .with_interval(DELETE_INTERVAL)
            .with_timeout(Timeouts::delete_or(state.timeouts.as_ref(), DELETE_TIMEOUT))
            .with_overrides(&ctx.poll);
        let (client, cluster_id, name) = (&ctx.client, state.cluster_id.as_str(), state.id.as_str());
        poller
            .wait(name, move || async move {
                let found = Self::find(client, cluster_id, name).await?;
                Ok(found.map(|_| "present".to_string()))
            })
            .await?;

        info!(cluster_id = %state.cluster_id, name = %state.id, "bucket deleted");
        Ok(())
    }
}
