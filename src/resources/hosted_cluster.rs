//! `couchbasecapella_hosted_cluster`: a cluster hosted by Couchbase (v3 API).
//!
//! Creation and server changes are asynchronous: the API answers at once
//! and the cluster moves through `deploying` until it is `healthy`. Deletion
//! moves through `destroying` until the cluster is gone.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::constraints::{
    iops_range, instances_for, regions_for, BASIC_SUPPORT, HOSTED_PROVIDERS, SERVICES,
    STORAGE_TYPES, SUPPORT_PACKAGES, TIMEZONES,
};
use super::{
    from_state, id_attribute, to_state, uuid_reference, Context, Reconciler, Timeouts,
};
use crate::client::CapellaClient;
use crate::error::{ProviderError, ProviderResult};
use crate::models::{
    ClusterStatus, V3Cluster, V3CreateClusterRequest, V3Place, V3PlaceHosted, V3Servers,
    V3ServersStorage, V3SupportPackage, V3UpdateClusterMetaRequest, V3UpdateClusterServersRequest,
    V3UpdateClusterSupportRequest,
};
use crate::poll::StatusPoller;
use crate::schema::{Attribute, Block, NestedBlock, Schema, Validator};
use crate::validation::decode;

/// Resource type name.
pub const TYPE_NAME: &str = "couchbasecapella_hosted_cluster";

const HEALTHY: &str = "healthy";
const DEPLOYING: &str = "deploying";
const DESTROYING: &str = "destroying";

const DEPLOY_DELAY: Duration = Duration::from_secs(120);
const DEPLOY_INTERVAL: Duration = Duration::from_secs(30);
const DESTROY_DELAY: Duration = Duration::from_secs(300);
const DESTROY_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1500);

/// Provider, region and network of a hosted cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedPlace {
    /// Cloud provider.
    pub provider: String,
    /// Provider region.
    pub region: String,
    /// CIDR block.
    pub cidr: String,
}

/// Where a hosted cluster runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    /// Single availability zone.
    pub single_az: bool,
    /// Hosted placement.
    pub hosted: HostedPlace,
}

/// Support package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportPackage {
    /// Support timezone.
    pub timezone: String,
    /// Package type.
    pub support_package_type: String,
}

/// Storage of a server group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    /// Storage type.
    pub storage_type: String,
    /// Provisioned IOPS.
    pub iops: i64,
    /// Size in GiB.
    pub storage_size: i64,
}

/// A server group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerGroup {
    /// Number of nodes.
    pub size: i64,
    /// Compute instance type.
    pub compute: String,
    /// Couchbase services.
    pub services: Vec<String>,
    /// Storage configuration.
    pub storage: Storage,
}

impl From<&ServerGroup> for V3Servers {
    fn from(group: &ServerGroup) -> Self {
        Self {
            size: group.size,
            compute: group.compute.clone(),
            services: group.services.clone(),
            storage: V3ServersStorage {
                storage_type: group.storage.storage_type.clone(),
                iops: group.storage.iops,
                size: group.storage.storage_size,
            },
        }
    }
}

impl From<V3Servers> for ServerGroup {
    fn from(servers: V3Servers) -> Self {
        Self {
            size: servers.size,
            compute: servers.compute,
            services: servers.services,
            storage: Storage {
                storage_type: servers.storage.storage_type,
                iops: servers.storage.iops,
                storage_size: servers.storage.size,
            },
        }
    }
}

impl From<&SupportPackage> for V3SupportPackage {
    fn from(support: &SupportPackage) -> Self {
        Self {
            timezone: support.timezone.clone(),
            package_type: support.support_package_type.clone(),
        }
    }
}

#[derive(Deserialize)]
struct RawHostedClusterSpec {
    name: String,
    #[serde(default)]
    description: Option<String>,
    project_id: String,
    place: Place,
    support_package: SupportPackage,
    servers: Vec<ServerGroup>,
    #[serde(default)]
    timeouts: Option<Timeouts>,
}

/// Desired state of a hosted cluster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawHostedClusterSpec")]
pub struct HostedClusterSpec {
    /// Cluster name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Owning project.
    pub project_id: String,
    /// Placement.
    pub place: Place,
    /// Support package.
    pub support_package: SupportPackage,
    /// Server groups.
    pub servers: Vec<ServerGroup>,
    /// Operation deadlines.
    pub timeouts: Option<Timeouts>,
}

impl TryFrom<RawHostedClusterSpec> for HostedClusterSpec {
    type Error = String;

    fn try_from(raw: RawHostedClusterSpec) -> Result<Self, Self::Error> {
        let provider = raw.place.hosted.provider.as_str();
        if !regions_for(provider).contains(&raw.place.hosted.region.as_str()) {
            return Err(format!(
                "region '{}' is not available for provider {}",
                raw.place.hosted.region, provider
            ));
        }

        for (i, group) in raw.servers.iter().enumerate() {
            if !instances_for(provider).contains(&group.compute.as_str()) {
                return Err(format!(
                    "servers.{}: compute '{}' is not a valid {} instance",
                    i, group.compute, provider
                ));
            }
            if let Some((min, max)) = iops_range(&group.storage.storage_type) {
                if !(min..=max).contains(&group.storage.iops) {
                    return Err(format!(
                        "servers.{}: for storage type {} iops should be a value between {} and {}",
                        i, group.storage.storage_type, min, max
                    ));
                }
            }
        }

        Ok(Self {
            name: raw.name,
            description: raw.description,
            project_id: raw.project_id,
            place: raw.place,
            support_package: raw.support_package,
            servers: raw.servers,
            timeouts: raw.timeouts,
        })
    }
}

impl HostedClusterSpec {
    /// The create request. A `Basic` support package only runs in one
    /// availability zone, so it forces `single_az`.
    fn create_request(&self) -> V3CreateClusterRequest {
        let single_az =
            self.place.single_az || self.support_package.support_package_type == BASIC_SUPPORT;
        V3CreateClusterRequest {
            environment: "hosted".to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            project_id: self.project_id.clone(),
            place: V3Place {
                single_az,
                hosted: V3PlaceHosted {
                    provider: self.place.hosted.provider.clone(),
                    region: self.place.hosted.region.clone(),
                    cidr: self.place.hosted.cidr.clone(),
                },
            },
            servers: self.servers.iter().map(V3Servers::from).collect(),
            support_package: V3SupportPackage::from(&self.support_package),
        }
    }
}

/// Recorded state of a hosted cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedClusterState {
    /// Cluster UUID.
    pub id: String,
    /// Cluster name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Owning project.
    pub project_id: String,
    /// Placement.
    pub place: Place,
    /// Support package.
    pub support_package: SupportPackage,
    /// Server groups.
    pub servers: Vec<ServerGroup>,
    /// Operation deadlines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<Timeouts>,
}

impl HostedClusterState {
    fn new(id: String, spec: HostedClusterSpec) -> Self {
        Self {
            id,
            name: spec.name,
            description: spec.description,
            project_id: spec.project_id,
            place: spec.place,
            support_package: spec.support_package,
            servers: spec.servers,
            timeouts: spec.timeouts,
        }
    }

    fn refresh_from(mut self, cluster: V3Cluster) -> Self {
        self.name = cluster.name;
        if cluster.description.is_some() {
            self.description = cluster.description;
        }
        self
    }
}

/// Reconciler for hosted clusters.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostedClusterReconciler;

impl HostedClusterReconciler {
    async fn fetch(client: &CapellaClient, id: &str) -> ProviderResult<Option<V3Cluster>> {
        client
            .get_optional(&format!("/v3/clusters/{}", id), "read hosted cluster")
            .await
    }

    async fn status(client: &CapellaClient, id: &str) -> ProviderResult<Option<String>> {
        let status: Option<ClusterStatus> = client
            .get_optional(
                &format!("/v3/clusters/{}/status", id),
                "read hosted cluster status",
            )
            .await?;
        Ok(status.map(|s| s.status))
    }

    async fn wait_healthy(ctx: &Context, id: &str, timeout: Duration) -> ProviderResult<()> {
        let client = &ctx.client;
        StatusPoller::until_status(&[HEALTHY])
            .pending(&[DEPLOYING])
            .with_delay(DEPLOY_DELAY)
            .with_interval(DEPLOY_INTERVAL)
            .with_timeout(timeout)
            .with_overrides(&ctx.poll)
            .wait(id, move || Self::status(client, id))
            .await
    }

    async fn refresh(ctx: &Context, state: HostedClusterState) -> ProviderResult<HostedClusterState> {
        match Self::fetch(&ctx.client, &state.id).await? {
            Some(cluster) => Ok(state.refresh_from(cluster)),
            None => Ok(state),
        }
    }
}

#[async_trait::async_trait]
impl Reconciler for HostedClusterReconciler {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        let place = Block::new()
            .with_description("Where the cluster is deployed")
            .with_attribute(
                "single_az",
                Attribute::required_bool()
                    .with_description("Deploy in a single availability zone"),
            )
            .with_block(
                "hosted",
                NestedBlock::single(
                    Block::new()
                        .with_attribute(
                            "provider",
                            Attribute::required_string()
                                .with_description("Cloud provider")
                                .with_validator(Validator::one_of(HOSTED_PROVIDERS.iter().copied())),
                        )
                        .with_attribute(
                            "region",
                            Attribute::required_string()
                                .with_description("A region of the cloud provider")
                                .with_validator(Validator::NotEmpty),
                        )
                        .with_attribute(
                            "cidr",
                            Attribute::required_string()
                                .with_description("CIDR block")
                                .with_validator(Validator::pattern(
                                    r"^(\d{1,3}\.){3}\d{1,3}/\d{1,2}$",
                                    "please enter a valid CIDR block, e.g. 10.0.16.0/20",
                                )),
                        ),
                )
                .required(),
            );

        let support_package = Block::new()
            .with_description("Support package for the cluster")
            .with_attribute(
                "timezone",
                Attribute::required_string()
                    .with_validator(Validator::one_of(TIMEZONES.iter().copied())),
            )
            .with_attribute(
                "support_package_type",
                Attribute::required_string()
                    .with_validator(Validator::one_of(SUPPORT_PACKAGES.iter().copied())),
            );

        let storage = Block::new()
            .with_attribute(
                "storage_type",
                Attribute::required_string()
                    .with_validator(Validator::one_of(STORAGE_TYPES.iter().copied())),
            )
            .with_attribute(
                "iops",
                Attribute::required_int64().with_validator(Validator::int_range(1000, 64000)),
            )
            .with_attribute(
                "storage_size",
                Attribute::required_int64()
                    .with_description("Storage size in GiB")
                    .with_validator(Validator::int_range(50, 16000)),
            );

        let servers = Block::new()
            .with_description("A group of nodes running the same services")
            .with_attribute(
                "size",
                Attribute::required_int64()
                    .with_description("Number of nodes")
                    .with_validator(Validator::int_range(3, 27)),
            )
            .with_attribute(
                "compute",
                Attribute::required_string()
                    .with_description("Compute instance type")
                    .with_validator(Validator::NotEmpty),
            )
            .with_attribute(
                "services",
                Attribute::required_string_list()
                    .with_min_items(1)
                    .with_validator(Validator::one_of(SERVICES.iter().copied())),
            )
            .with_block("storage", NestedBlock::single(storage).required());

        Schema::v0()
            .with_description("Manage Couchbase Capella hosted clusters")
            .with_attribute("id", id_attribute("ID of the cluster"))
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("Name of the cluster")
                    .with_validator(Validator::pattern(
                        r"^[a-zA-Z0-9][a-zA-Z0-9_. -]{1,98}$",
                        "use letters, numbers, periods (.), dashes (-) or spaces; cluster names must be 2 to 99 characters and begin with a letter or a number",
                    )),
            )
            .with_attribute(
                "description",
                Attribute::optional_string().with_description("A description of the cluster"),
            )
            .with_attribute("project_id", uuid_reference("ID of the project the cluster belongs to"))
            .with_block("place", NestedBlock::single(place).required().with_force_new())
            .with_block("support_package", NestedBlock::single(support_package).required())
            .with_block("servers", NestedBlock::list(servers).with_min_items(1))
            .with_block("timeouts", Timeouts::block())
    }

    async fn create(&self, ctx: &Context, config: Value) -> ProviderResult<Value> {
        let spec: HostedClusterSpec = decode(&self.schema(), &config)?;

        let id = ctx
            .client
            .post_for_location("/v3/clusters", &spec.create_request(), "create hosted cluster")
            .await?;
        info!(id = %id, name = %spec.name, "hosted cluster requested");

        let timeout = Timeouts::create_or(spec.timeouts.as_ref(), DEFAULT_TIMEOUT);
        Self::wait_healthy(ctx, &id, timeout).await?;

        let state = Self::refresh(ctx, HostedClusterState::new(id, spec)).await?;
        to_state(&state)
    }

    async fn read(&self, ctx: &Context, state: Value) -> ProviderResult<Option<Value>> {
        let state: HostedClusterState = from_state(&state)?;
        match Self::fetch(&ctx.client, &state.id).await? {
            Some(cluster) => Ok(Some(to_state(&state.refresh_from(cluster))?)),
            None => Ok(None),
        }
    }

    async fn update(&self, ctx: &Context, prior: Value, planned: Value) -> ProviderResult<Value> {
        let prior: HostedClusterState = from_state(&prior)?;
        let spec: HostedClusterSpec = decode(&self.schema(), &planned)?;
        let id = prior.id.as_str();

        if spec.name != prior.name || spec.description != prior.description {
            ctx.client
                .put(
                    &format!("/v3/clusters/{}/meta", id),
                    &V3UpdateClusterMetaRequest {
                        name: spec.name.clone(),
                        description: spec.description.clone().unwrap_or_default(),
                    },
                    "update hosted cluster name",
                )
                .await?;
            info!(id, "hosted cluster metadata updated");
        }

        if spec.support_package != prior.support_package {
            ctx.client
                .put(
                    &format!("/v3/clusters/{}/support", id),
                    &V3UpdateClusterSupportRequest {
                        support_package: V3SupportPackage::from(&spec.support_package),
                    },
                    "update hosted cluster support package",
                )
                .await?;
            info!(id, "hosted cluster support package updated");
        }

        if spec.servers != prior.servers {
            ctx.client
                .put(
                    &format!("/v3/clusters/{}/servers", id),
                    &V3UpdateClusterServersRequest {
                        servers: spec.servers.iter().map(V3Servers::from).collect(),
                    },
                    "update hosted cluster servers",
                )
                .await?;
            info!(id, "hosted cluster servers update requested");

            let timeout = Timeouts::update_or(spec.timeouts.as_ref(), DEFAULT_TIMEOUT);
            Self::wait_healthy(ctx, id, timeout).await?;
        }

        let state = Self::refresh(ctx, HostedClusterState::new(prior.id.clone(), spec)).await?;
        to_state(&state)
    }

    async fn delete(&self, ctx: &Context, state: Value) -> ProviderResult<()> {
        let state: HostedClusterState = from_state(&state)?;
        let id = state.id.as_str();
        let client = &ctx.client;

        let status = Self::status(client, id)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("hosted cluster {} doesn't exist", id)))?;
        if status != HEALTHY {
            return Err(ProviderError::FailedPrecondition(format!(
                "cluster {} is not ready to be deleted, cluster status: {}",
                id, status
            )));
        }

        client
            .delete(&format!("/v3/clusters/{}", id), "delete hosted cluster")
            .await?;
        info!(id, "hosted cluster deletion requested");

        StatusPoller::until_absent()
            .pending(&[DESTROYING])
            .with_delay(DESTROY_DELAY)
            .with_interval(DESTROY_INTERVAL)
            .with_timeout(Timeouts::delete_or(state.timeouts.as_ref(), DEFAULT_TIMEOUT))
            .with_overrides(&ctx.poll)
            .wait(id, move || Self::status(client, id))
            .await
    }

    async fn import(&self, ctx: &Context, id: &str) -> ProviderResult<Value> {
        let cluster = Self::fetch(&ctx.client, id)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("hosted cluster {} doesn't exist", id)))?;

        let (Some(project_id), Some(place), Some(servers), Some(support)) = (
            cluster.project_id,
            cluster.place,
            cluster.servers,
            cluster.support_package,
        ) else {
            return Err(ProviderError::UnexpectedState(format!(
                "hosted cluster {} is missing its project, placement, servers or support package",
                id
            )));
        };

        to_state(&HostedClusterState {
            id: cluster.id,
            name: cluster.name,
            description: cluster.description,
            project_id,
            place: Place {
                single_az: place.single_az,
                hosted: HostedPlace {
                    provider: place.hosted.provider,
                    region: place.hosted.region,
                    cidr: place.hosted.cidr,
                },
            },
            support_package: SupportPackage {
                timezone: support.timezone,
                support_package_type: support.package_type,
            },
            servers: servers.into_iter().map(ServerGroup::from).collect(),
            timeouts: None,
        })
    }
}
