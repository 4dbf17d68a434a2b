//! `couchbasecapella_cloud` data source: a registered cloud, looked up by ID.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{to_state, Context};
use crate::error::{ProviderError, ProviderResult};
use crate::models::Cloud;
use crate::schema::{Attribute, Schema, Validator};
use crate::validation::decode;

/// Data source type name.
pub const TYPE_NAME: &str = "couchbasecapella_cloud";

#[derive(Debug, Deserialize)]
struct CloudQuery {
    cloud_id: String,
}

/// What the data source reports about a cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloudState {
    /// Cloud UUID.
    pub id: String,
    /// Cloud UUID, as queried.
    pub cloud_id: String,
    /// Cloud name.
    pub name: String,
    /// Cloud provider.
    pub provider: String,
    /// Provider region.
    pub region: String,
    /// VPC CIDR block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_network_cidr: Option<String>,
}

impl From<Cloud> for CloudState {
    fn from(cloud: Cloud) -> Self {
        Self {
            cloud_id: cloud.id.clone(),
            id: cloud.id,
            name: cloud.name,
            provider: cloud.provider,
            region: cloud.region,
            virtual_network_cidr: cloud.virtual_network_cidr,
        }
    }
}

/// Read-only lookup of a cloud.
#[derive(Debug, Default, Clone, Copy)]
pub struct CloudDataSource;

impl CloudDataSource {
    /// Data source schema.
    pub fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Look up a Couchbase Capella cloud")
            .with_attribute(
                "cloud_id",
                Attribute::required_string()
                    .with_description("Cloud ID")
                    .with_validator(Validator::Uuid),
            )
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::computed_string().with_description("Cloud name"))
            .with_attribute(
                "provider",
                Attribute::computed_string().with_description("Cloud provider"),
            )
            .with_attribute("region", Attribute::computed_string().with_description("Region"))
            .with_attribute(
                "virtual_network_cidr",
                Attribute::computed_string().with_description("CIDR block of the cloud VPC"),
            )
    }

    /// Fetch the cloud named by `config.cloud_id`.
    pub async fn read(&self, ctx: &Context, config: Value) -> ProviderResult<Value> {
        let query: CloudQuery = decode(&self.schema(), &config)?;
        let cloud: Cloud = ctx
            .client
            .get_optional(&format!("/v2/clouds/{}", query.cloud_id), "read cloud")
            .await?
            .ok_or_else(|| {
                ProviderError::NotFound(format!("the cloud {} doesn't exist", query.cloud_id))
            })?;
        to_state(&CloudState::from(cloud))
    }
}
