//! `couchbasecapella_vpc_cluster`: a cluster deployed into a customer VPC (v2 API).
//!
//! The cluster is placed in a registered cloud. Every server group names
//! exactly one placement (AWS or Azure) and it must be the cloud's provider.
//! The API offers no in-place update, so every field except `timeouts`
//! forces replacement.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::constraints::{AWS_INSTANCES, AZURE_INSTANCES, AZURE_VOLUME_TYPES, SERVICES};
use super::{from_state, id_attribute, to_state, uuid_reference, Context, Reconciler, Timeouts};
use crate::client::CapellaClient;
use crate::error::{ProviderError, ProviderResult};
use crate::models::{Cloud, Cluster, ClusterStatus, CreateClusterRequest, Server, ServerAws, ServerAzure};
use crate::poll::StatusPoller;
use crate::schema::{Attribute, Block, NestedBlock, Schema, Validator};
use crate::validation::decode;

/// Resource type name.
pub const TYPE_NAME: &str = "couchbasecapella_vpc_cluster";

const READY: &str = "ready";

const DEPLOY_DELAY: Duration = Duration::from_secs(300);
const DEPLOY_INTERVAL: Duration = Duration::from_secs(30);
const DESTROY_DELAY: Duration = Duration::from_secs(300);
const DESTROY_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1500);

/// Placement of one server group. Exactly one provider per group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerPlacement {
    /// EC2 instances with EBS volumes.
    Aws {
        /// EC2 instance type.
        instance_size: String,
        /// EBS volume size in GiB.
        ebs_size_gib: i64,
    },
    /// Azure VMs with managed disks.
    Azure {
        /// VM size.
        instance_size: String,
        /// Managed disk type.
        volume_type: String,
    },
}

impl ServerPlacement {
    /// The cloud provider this placement belongs to.
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Aws { .. } => "aws",
            Self::Azure { .. } => "azure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AwsBlock {
    instance_size: String,
    ebs_size_gib: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AzureBlock {
    instance_size: String,
    volume_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawServer {
    size: i64,
    services: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aws: Option<AwsBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    azure: Option<AzureBlock>,
}

/// A server group of a VPC cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawServer", into = "RawServer")]
pub struct VpcServer {
    /// Number of nodes.
    pub size: i64,
    /// Couchbase services.
    pub services: Vec<String>,
    /// Where the nodes run.
    pub placement: ServerPlacement,
}

impl TryFrom<RawServer> for VpcServer {
    type Error = String;

    fn try_from(raw: RawServer) -> Result<Self, Self::Error> {
        let placement = match (raw.aws, raw.azure) {
            (Some(aws), None) => ServerPlacement::Aws {
                instance_size: aws.instance_size,
                ebs_size_gib: aws.ebs_size_gib,
            },
            (None, Some(azure)) => ServerPlacement::Azure {
                instance_size: azure.instance_size,
                volume_type: azure.volume_type,
            },
            (None, None) => return Err("each server needs an aws or an azure block".to_string()),
            (Some(_), Some(_)) => {
                return Err("a server takes either an aws or an azure block, not both".to_string())
            },
        };
        Ok(Self {
            size: raw.size,
            services: raw.services,
            placement,
        })
    }
}

impl From<VpcServer> for RawServer {
    fn from(server: VpcServer) -> Self {
        let (aws, azure) = match server.placement {
            ServerPlacement::Aws {
                instance_size,
                ebs_size_gib,
            } => (
                Some(AwsBlock {
                    instance_size,
                    ebs_size_gib,
                }),
                None,
            ),
            ServerPlacement::Azure {
                instance_size,
                volume_type,
            } => (
                None,
                Some(AzureBlock {
                    instance_size,
                    volume_type,
                }),
            ),
        };
        Self {
            size: server.size,
            services: server.services,
            aws,
            azure,
        }
    }
}

impl From<&VpcServer> for Server {
    fn from(server: &VpcServer) -> Self {
        let (aws, azure) = match &server.placement {
            ServerPlacement::Aws {
                instance_size,
                ebs_size_gib,
            } => (
                Some(ServerAws {
                    instance_size: instance_size.clone(),
                    ebs_size_gib: *ebs_size_gib,
                }),
                None,
            ),
            ServerPlacement::Azure {
                instance_size,
                volume_type,
            } => (
                None,
                Some(ServerAzure {
                    instance_size: instance_size.clone(),
                    volume_type: volume_type.clone(),
                }),
            ),
        };
        Self {
            size: server.size,
            services: server.services.clone(),
            aws,
            azure,
        }
    }
}

#[derive(Deserialize)]
struct RawVpcClusterSpec {
    name: String,
    cloud_id: String,
    project_id: String,
    #[serde(default)]
    servers: Vec<VpcServer>,
    #[serde(default)]
    timeouts: Option<Timeouts>,
}

/// Desired state of a VPC cluster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawVpcClusterSpec")]
pub struct VpcClusterSpec {
    /// Cluster name.
    pub name: String,
    /// Cloud to deploy into.
    pub cloud_id: String,
    /// Owning project.
    pub project_id: String,
    /// Server groups, all on one provider.
    pub servers: Vec<VpcServer>,
    /// Operation deadlines.
    pub timeouts: Option<Timeouts>,
}

impl TryFrom<RawVpcClusterSpec> for VpcClusterSpec {
    type Error = String;

    fn try_from(raw: RawVpcClusterSpec) -> Result<Self, Self::Error> {
        let spec = Self {
            name: raw.name,
            cloud_id: raw.cloud_id,
            project_id: raw.project_id,
            servers: raw.servers,
            timeouts: raw.timeouts,
        };
        spec.server_provider()?;
        Ok(spec)
    }
}

impl VpcClusterSpec {
    /// The single provider shared by every server group, if there are any.
    pub fn server_provider(&self) -> Result<Option<&'static str>, String> {
        let mut providers = self.servers.iter().map(|s| s.placement.provider());
        let Some(first) = providers.next() else {
            return Ok(None);
        };
        if providers.any(|p| p != first) {
            return Err("all servers must use the same cloud provider".to_string());
        }
        Ok(Some(first))
    }

    fn check_cloud(&self, cloud: &Cloud) -> ProviderResult<()> {
        let provider = self.server_provider().map_err(ProviderError::Validation)?;
        match provider {
            Some(provider) if provider != cloud.provider => Err(ProviderError::Validation(format!(
                "server configuration does not match the cloud provider: cloud {} runs on {}, servers are configured for {}",
                cloud.id, cloud.provider, provider
            ))),
            _ => Ok(()),
        }
    }

    fn create_request(&self) -> CreateClusterRequest {
        CreateClusterRequest {
            name: self.name.clone(),
            cloud_id: self.cloud_id.clone(),
            project_id: self.project_id.clone(),
            servers: self.servers.iter().map(Server::from).collect(),
        }
    }
}

/// Recorded state of a VPC cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcClusterState {
    /// Cluster UUID.
    pub id: String,
    /// Cluster name.
    pub name: String,
    /// Cloud the cluster runs in.
    pub cloud_id: String,
    /// Owning project.
    pub project_id: String,
    /// Server groups.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<VpcServer>,
    /// Operation deadlines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<Timeouts>,
}

/// Reconciler for VPC clusters.
#[derive(Debug, Default, Clone, Copy)]
pub struct VpcClusterReconciler;

impl VpcClusterReconciler {
    async fn fetch(client: &CapellaClient, id: &str) -> ProviderResult<Option<Cluster>> {
        client
            .get_optional(&format!("/v2/clusters/{}", id), "read cluster")
            .await
    }

    async fn status(client: &CapellaClient, id: &str) -> ProviderResult<Option<String>> {
        let status: Option<ClusterStatus> = client
            .get_optional(&format!("/v2/clusters/{}/status", id), "read cluster status")
            .await?;
        Ok(status.map(|s| s.status))
    }
}

#[async_trait::async_trait]
impl Reconciler for VpcClusterReconciler {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        let aws = Block::new()
            .with_description("AWS placement")
            .with_attribute(
                "instance_size",
                Attribute::required_string()
                    .with_validator(Validator::one_of(AWS_INSTANCES.iter().copied())),
            )
            .with_attribute(
                "ebs_size_gib",
                Attribute::required_int64()
                    .with_description("EBS volume size in GiB")
                    .with_validator(Validator::int_range(50, 16000)),
            );

        let azure = Block::new()
            .with_description("Azure placement")
            .with_attribute(
                "instance_size",
                Attribute::required_string()
                    .with_validator(Validator::one_of(AZURE_INSTANCES.iter().copied())),
            )
            .with_attribute(
                "volume_type",
                Attribute::required_string()
                    .with_validator(Validator::one_of(AZURE_VOLUME_TYPES.iter().copied())),
            );

        let servers = Block::new()
            .with_attribute(
                "size",
                Attribute::required_int64()
                    .with_description("Number of nodes")
                    .with_validator(Validator::int_range(2, 27)),
            )
            .with_attribute(
                "services",
                Attribute::required_string_list()
                    .with_min_items(1)
                    .with_validator(Validator::one_of(SERVICES.iter().copied())),
            )
            .with_block("aws", NestedBlock::single(aws))
            .with_block("azure", NestedBlock::single(azure));

        Schema::v0()
            .with_description("Manage Couchbase Capella VPC clusters")
            .with_attribute("id", id_attribute("ID of the cluster"))
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("Name of the cluster")
                    .with_force_new()
                    .with_validator(Validator::pattern(
                        r"^[a-zA-Z0-9][a-zA-Z0-9_. -]{1,126}$",
                        "use letters, numbers, periods (.), dashes (-) or spaces; cluster names must be 2 to 127 characters and begin with a letter or a number",
                    )),
            )
            .with_attribute("cloud_id", uuid_reference("ID of the cloud the cluster is deployed in"))
            .with_attribute("project_id", uuid_reference("ID of the project"))
            .with_block("servers", NestedBlock::list(servers).with_force_new())
            .with_block("timeouts", Timeouts::block())
    }

    async fn create(&self, ctx: &Context, config: Value) -> ProviderResult<Value> {
        let spec: VpcClusterSpec = decode(&self.schema(), &config)?;
        let client = &ctx.client;

        let cloud: Cloud = client
            .get_optional(&format!("/v2/clouds/{}", spec.cloud_id), "read cloud")
            .await?
            .ok_or_else(|| {
                ProviderError::NotFound(format!(
                    "the cloud {} doesn't exist, please verify your cloud_id",
                    spec.cloud_id
                ))
            })?;
        spec.check_cloud(&cloud)?;

        let id = client
            .post_for_location("/v2/clusters", &spec.create_request(), "create cluster")
            .await?;
        info!(id = %id, name = %spec.name, cloud_id = %spec.cloud_id, "vpc cluster requested");

        let poll_id = id.as_str();
        StatusPoller::until_status(&[READY])
            .pending(&["deploying", "deploy_succeeded"])
            .with_delay(DEPLOY_DELAY)
            .with_interval(DEPLOY_INTERVAL)
            .with_timeout(Timeouts::create_or(spec.timeouts.as_ref(), DEFAULT_TIMEOUT))
            .with_overrides(&ctx.poll)
            .wait(poll_id, move || Self::status(client, poll_id))
            .await?;

        let mut state = VpcClusterState {
            id: id.clone(),
            name: spec.name,
            cloud_id: spec.cloud_id,
            project_id: spec.project_id,
            servers: spec.servers,
            timeouts: spec.timeouts,
        };
        if let Some(cluster) = Self::fetch(client, &id).await? {
            state.name = cluster.name;
        }
        to_state(&state)
    }

    async fn read(&self, ctx: &Context, state: Value) -> ProviderResult<Option<Value>> {
        let mut state: VpcClusterState = from_state(&state)?;
        match Self::fetch(&ctx.client, &state.id).await? {
            Some(cluster) => {
                state.name = cluster.name;
                Ok(Some(to_state(&state)?))
            },
            None => Ok(None),
        }
    }

    async fn update(&self, _ctx: &Context, prior: Value, planned: Value) -> ProviderResult<Value> {
        let prior: VpcClusterState = from_state(&prior)?;
        let spec: VpcClusterSpec = decode(&self.schema(), &planned)?;

        // Only the local deadlines may change without touching the cluster.
        let unchanged = spec.name == prior.name
            && spec.cloud_id == prior.cloud_id
            && spec.project_id == prior.project_id
            && spec.servers == prior.servers;
        if !unchanged {
            return Err(ProviderError::Unimplemented(
                "the current release doesn't support updating VPC clusters; please use the Capella UI"
                    .to_string(),
            ));
        }

        to_state(&VpcClusterState {
            timeouts: spec.timeouts,
            ..prior
        })
    }

    async fn delete(&self, ctx: &Context, state: Value) -> ProviderResult<()> {
        let state: VpcClusterState = from_state(&state)?;
        let id = state.id.as_str();
        let client = &ctx.client;

        let status = Self::status(client, id)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("vpc cluster {} doesn't exist", id)))?;
        if status != READY {
            return Err(ProviderError::FailedPrecondition(format!(
                "vpc cluster {} is not ready to be deleted, cluster status: {}",
                id, status
            )));
        }

        client
            .delete(&format!("/v2/clusters/{}", id), "delete cluster")
            .await?;
        info!(id, "vpc cluster deletion requested");

        StatusPoller::until_absent()
            .pending(&["destroying", "destroy_succeeded"])
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
            .ok_or_else(|| ProviderError::NotFound(format!("vpc cluster {} doesn't exist", id)))?;

        let (Some(cloud_id), Some(project_id)) = (cluster.cloud_id, cluster.project_id) else {
            return Err(ProviderError::UnexpectedState(format!(
                "vpc cluster {} is missing its cloud or project",
                id
            )));
        };

        to_state(&VpcClusterState {
            id: cluster.id,
            name: cluster.name,
            cloud_id,
            project_id,
            servers: Vec::new(),
            timeouts: None,
        })
    }
}
