//! `couchbasecapella_database_user`: a database user on an in-VPC cluster.
//!
//! The username is the resource ID. A user is granted either one role on
//! every bucket or a list of roles per bucket, never both.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::constraints::BUCKET_ROLES;
use super::{ensure_vpc_cluster, from_state, to_state, uuid_reference, Context, Reconciler};
use crate::client::CapellaClient;
use crate::error::{ProviderError, ProviderResult};
use crate::models::{
    BucketRoleRequest, CreateDatabaseUserRequest, DatabaseUser, UpdateDatabaseUserRequest,
};
use crate::schema::{Attribute, Block, NestedBlock, Schema, Validator};
use crate::validation::decode;

/// Resource type name.
pub const TYPE_NAME: &str = "couchbasecapella_database_user";

const MANAGED: &str = "database users";

/// Roles on one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRole {
    /// Bucket the roles apply to.
    pub bucket_name: String,
    /// Granted roles.
    pub bucket_access: Vec<String>,
}

impl From<&BucketRole> for BucketRoleRequest {
    fn from(role: &BucketRole) -> Self {
        Self {
            bucket_name: role.bucket_name.clone(),
            bucket_access: role.bucket_access.clone(),
        }
    }
}

/// How a user is granted access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketAccess {
    /// One role on every bucket.
    All(String),
    /// Roles per bucket.
    PerBucket(Vec<BucketRole>),
}

impl BucketAccess {
    fn resolve(all: Option<String>, buckets: Option<Vec<BucketRole>>) -> Result<Self, String> {
        let buckets = buckets.filter(|b| !b.is_empty());
        match (all, buckets) {
            (Some(role), None) => Ok(Self::All(role)),
            (None, Some(buckets)) => Ok(Self::PerBucket(buckets)),
            (None, None) => Err("no bucket access roles specified: set all_bucket_access or buckets".to_string()),
            (Some(_), Some(_)) => Err(
                "specify either access for specific buckets or access for all buckets, not both"
                    .to_string(),
            ),
        }
    }

    fn all_bucket_access(&self) -> Option<String> {
        match self {
            Self::All(role) => Some(role.clone()),
            Self::PerBucket(_) => None,
        }
    }

    fn buckets(&self) -> Option<Vec<BucketRole>> {
        match self {
            Self::All(_) => None,
            Self::PerBucket(buckets) => Some(buckets.clone()),
        }
    }

    fn request_buckets(&self) -> Option<Vec<BucketRoleRequest>> {
        match self {
            Self::All(_) => None,
            Self::PerBucket(buckets) => Some(buckets.iter().map(BucketRoleRequest::from).collect()),
        }
    }
}

#[derive(Deserialize)]
struct RawDatabaseUserSpec {
    cluster_id: String,
    username: String,
    password: String,
    #[serde(default)]
    all_bucket_access: Option<String>,
    #[serde(default)]
    buckets: Option<Vec<BucketRole>>,
}

/// Desired state of a database user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawDatabaseUserSpec")]
pub struct DatabaseUserSpec {
    /// Cluster the user lives on.
    pub cluster_id: String,
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
    /// Access grant.
    pub access: BucketAccess,
}

impl TryFrom<RawDatabaseUserSpec> for DatabaseUserSpec {
    type Error = String;

    fn try_from(raw: RawDatabaseUserSpec) -> Result<Self, Self::Error> {
        Ok(Self {
            access: BucketAccess::resolve(raw.all_bucket_access, raw.buckets)?,
            cluster_id: raw.cluster_id,
            username: raw.username,
            password: raw.password,
        })
    }
}

/// Recorded state of a database user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseUserState {
    /// The username.
    pub id: String,
    /// Cluster the user lives on.
    pub cluster_id: String,
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
    /// Role on every bucket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_bucket_access: Option<String>,
    /// Roles per bucket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<BucketRole>>,
}

impl From<DatabaseUserSpec> for DatabaseUserState {
    fn from(spec: DatabaseUserSpec) -> Self {
        Self {
            id: spec.username.clone(),
            cluster_id: spec.cluster_id,
            username: spec.username,
            password: spec.password,
            all_bucket_access: spec.access.all_bucket_access(),
            buckets: spec.access.buckets(),
        }
    }
}

/// Reconciler for database users.
#[derive(Debug, Default, Clone, Copy)]
pub struct DatabaseUserReconciler;

impl DatabaseUserReconciler {
    async fn exists(client: &CapellaClient, cluster_id: &str, username: &str) -> ProviderResult<bool> {
        let users: Vec<DatabaseUser> = client
            .get(&format!("/v2/clusters/{}/users", cluster_id), "list database users")
            .await?;
        Ok(users.iter().any(|user| user.username == username))
    }
}

#[async_trait::async_trait]
impl Reconciler for DatabaseUserReconciler {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        let role = || Validator::one_of(BUCKET_ROLES.iter().copied());
        Schema::v0()
            .with_description("Manage Couchbase Capella database users")
            .with_attribute("id", Attribute::computed_string().with_description("The username"))
            .with_attribute("cluster_id", uuid_reference("ID of the cluster"))
            .with_attribute(
                "username",
                Attribute::required_string()
                    .with_description("Username for the database user")
                    .with_force_new()
                    .with_validator(Validator::NotEmpty),
            )
            .with_attribute(
                "password",
                Attribute::required_string()
                    .with_description("Password for the database user")
                    .sensitive()
                    .with_force_new()
                    .with_validator(Validator::Password),
            )
            .with_attribute(
                "all_bucket_access",
                Attribute::optional_string()
                    .with_description("Role granted on every bucket")
                    .with_validator(role()),
            )
            .with_block(
                "buckets",
                NestedBlock::set(
                    Block::new()
                        .with_description("Roles on one bucket")
                        .with_attribute(
                            "bucket_name",
                            Attribute::required_string().with_validator(Validator::NotEmpty),
                        )
                        .with_attribute(
                            "bucket_access",
                            Attribute::required_string_list()
                                .with_min_items(1)
                                .with_validator(role()),
                        ),
                ),
            )
    }

    async fn create(&self, ctx: &Context, config: Value) -> ProviderResult<Value> {
        let spec: DatabaseUserSpec = decode(&self.schema(), &config)?;
        ensure_vpc_cluster(&ctx.client, &spec.cluster_id, MANAGED).await?;

        if Self::exists(&ctx.client, &spec.cluster_id, &spec.username).await? {
            return Err(ProviderError::AlreadyExists(format!(
                "a user named {} already exists on cluster {}",
                spec.username, spec.cluster_id
            )));
        }

        let request = CreateDatabaseUserRequest {
            username: spec.username.clone(),
            password: spec.password.clone(),
            buckets: spec.access.request_buckets(),
            all_buckets_access: spec.access.all_bucket_access(),
        };
        ctx.client
            .post_empty(
                &format!("/v2/clusters/{}/users", spec.cluster_id),
                &request,
                "create database user",
            )
            .await?;
        info!(cluster_id = %spec.cluster_id, username = %spec.username, "database user created");

        to_state(&DatabaseUserState::from(spec))
    }

    async fn read(&self, ctx: &Context, state: Value) -> ProviderResult<Option<Value>> {
        let state: DatabaseUserState = from_state(&state)?;
        match ensure_vpc_cluster(&ctx.client, &state.cluster_id, MANAGED).await {
            Ok(()) => {},
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        }

        if Self::exists(&ctx.client, &state.cluster_id, &state.id).await? {
            Ok(Some(to_state(&state)?))
        } else {
            Ok(None)
        }
    }

    async fn update(&self, ctx: &Context, prior: Value, planned: Value) -> ProviderResult<Value> {
        let prior: DatabaseUserState = from_state(&prior)?;
        let spec: DatabaseUserSpec = decode(&self.schema(), &planned)?;
        ensure_vpc_cluster(&ctx.client, &spec.cluster_id, MANAGED).await?;

        let unchanged = prior.all_bucket_access == spec.access.all_bucket_access()
            && prior.buckets == spec.access.buckets();
        if !unchanged {
            ctx.client
                .put(
                    &format!("/v2/clusters/{}/users/{}", spec.cluster_id, prior.id),
                    &UpdateDatabaseUserRequest {
                        buckets: spec.access.request_buckets(),
                        all_buckets_access: spec.access.all_bucket_access(),
                    },
                    "update database user",
                )
                .await?;
            info!(username = %prior.id, "database user access updated");
        }

        to_state(&DatabaseUserState::from(spec))
    }

    async fn delete(&self, ctx: &Context, state: Value) -> ProviderResult<()> {
        let state: DatabaseUserState = from_state(&state)?;
        ensure_vpc_cluster(&ctx.client, &state.cluster_id, MANAGED).await?;

        if !Self::exists(&ctx.client, &state.cluster_id, &state.id).await? {
            return Err(ProviderError::NotFound(format!(
                "database user {} doesn't exist on cluster {}",
                state.id, state.cluster_id
            )));
        }

        ctx.client
            .delete(
                &format!("/v2/clusters/{}/users/{}", state.cluster_id, state.id),
                "delete database user",
            )
            .await?;
        info!(cluster_id = %state.cluster_id, username = %state.id, "database user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CLUSTER: &str = "0b4bd1f3-3c35-4a0a-9d6c-9bcbd2a33f52";

    fn config(extra: Value) -> Value {
        let mut value = json!({"cluster_id": CLUSTER, "username": "app", "password": "Password123!"});
        if let (Some(obj), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            obj.extend(extra.clone());
        }
        value
    }

    #[test]
    fn test_all_bucket_access() {
        let spec: DatabaseUserSpec = decode(
            &DatabaseUserReconciler.schema(),
            &config(json!({"all_bucket_access": "data_reader"})),
        )
        .unwrap();
        assert_eq!(spec.access, BucketAccess::All("data_reader".to_string()));
    }

    #[test]
    fn test_per_bucket_access() {
        let spec: DatabaseUserSpec = decode(
            &DatabaseUserReconciler.schema(),
            &config(json!({"buckets": [{"bucket_name": "b1", "bucket_access": ["data_writer"]}]})),
        )
        .unwrap();

        let state = DatabaseUserState::from(spec);
        assert!(state.all_bucket_access.is_none());
        assert_eq!(state.buckets.unwrap()[0].bucket_name, "b1");
    }

    #[test]
    fn test_access_must_be_exactly_one() {
        let schema = DatabaseUserReconciler.schema();

        let err = decode::<DatabaseUserSpec>(&schema, &config(json!({}))).unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(err.message().contains("no bucket access roles"));

        let both = config(json!({
            "all_bucket_access": "data_reader",
            "buckets": [{"bucket_name": "b1", "bucket_access": ["data_writer"]}]
        }));
        let err = decode::<DatabaseUserSpec>(&schema, &both).unwrap_err();
        assert!(err.message().contains("not both"));
    }

    #[test]
    fn test_rejects_weak_password_and_unknown_role() {
        let schema = DatabaseUserReconciler.schema();
        let value = json!({
            "cluster_id": CLUSTER,
            "username": "app",
            "password": "short",
            "all_bucket_access": "admin"
        });

        let err = decode::<DatabaseUserSpec>(&schema, &value).unwrap_err();
        assert!(err.message().contains("password"));
        assert!(err.message().contains("all_bucket_access"));
    }
}
