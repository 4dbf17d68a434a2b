//! Request and response payloads of the Capella control-plane API.
//!
//! The API speaks camelCase JSON; these types are the wire shapes only.
//! Reconcilers translate their typed specs into them.

use serde::{Deserialize, Serialize};

// =========================================================================
// Projects (v2)
// =========================================================================

/// `POST /v2/projects` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateProjectRequest {
    /// Project name.
    pub name: String,
}

/// A project as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Project UUID.
    pub id: String,
    /// Project name.
    pub name: String,
    /// Creation timestamp, when reported.
    #[serde(default)]
    pub created_at: Option<String>,
}

// =========================================================================
// Clouds (v2)
// =========================================================================

/// A cloud (customer VPC registration) as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cloud {
    /// Cloud UUID.
    pub id: String,
    /// Cloud name.
    pub name: String,
    /// Cloud provider (`aws`, `azure`).
    pub provider: String,
    /// Provider region.
    pub region: String,
    /// VPC CIDR block, when reported.
    #[serde(default)]
    pub virtual_network_cidr: Option<String>,
    /// Cloud status, when reported.
    #[serde(default)]
    pub status: Option<String>,
}

// =========================================================================
// In-VPC clusters (v2)
// =========================================================================

/// AWS placement of a VPC cluster server group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerAws {
    /// EC2 instance type.
    pub instance_size: String,
    /// EBS volume size in GiB.
    pub ebs_size_gib: i64,
}

/// Azure placement of a VPC cluster server group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerAzure {
    /// VM instance type.
    pub instance_size: String,
    /// Managed disk type.
    pub volume_type: String,
}

/// A VPC cluster server group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Number of nodes.
    pub size: i64,
    /// Couchbase services running on the nodes.
    pub services: Vec<String>,
    /// AWS placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<ServerAws>,
    /// Azure placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<ServerAzure>,
}

/// `POST /v2/clusters` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClusterRequest {
    /// Cluster name.
    pub name: String,
    /// Cloud to deploy into.
    pub cloud_id: String,
    /// Owning project.
    pub project_id: String,
    /// Server groups.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
}

/// A VPC cluster as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// Cluster UUID.
    pub id: String,
    /// Cluster name.
    pub name: String,
    /// Cloud the cluster is deployed in.
    #[serde(default)]
    pub cloud_id: Option<String>,
    /// Owning project.
    #[serde(default)]
    pub project_id: Option<String>,
}

/// Status document returned by the cluster status endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClusterStatus {
    /// Lifecycle status (`deploying`, `ready`, `healthy`, `destroying`, ...).
    pub status: String,
}

// =========================================================================
// Buckets (v2)
// =========================================================================

/// `POST /v2/clusters/{id}/buckets` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBucketRequest {
    /// Bucket name.
    pub name: String,
    /// Memory quota in MiB.
    pub memory_quota: i64,
    /// Replica count.
    pub replicas: i64,
    /// Conflict resolution (`lww`, `seqno`).
    pub conflict_resolution: String,
}

/// `PUT /v2/clusters/{id}/buckets/{bucket_id}` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBucketRequest {
    /// New memory quota in MiB.
    pub memory_quota: i64,
}

/// `DELETE /v2/clusters/{id}/buckets` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteBucketRequest {
    /// Name of the bucket to delete.
    pub name: String,
}

/// A bucket as listed by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// Server-side bucket ID (used by the update endpoint).
    pub id: String,
    /// Bucket name.
    pub name: String,
    /// Memory quota in MiB.
    pub memory_quota: i64,
    /// Replica count, when reported.
    #[serde(default)]
    pub replicas: Option<i64>,
    /// Conflict resolution, when reported.
    #[serde(default)]
    pub conflict_resolution: Option<String>,
}

// =========================================================================
// Database users (v2)
// =========================================================================

/// Per-bucket roles of a database user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketRoleRequest {
    /// Bucket the roles apply to.
    pub bucket_name: String,
    /// Granted roles (`data_reader`, `data_writer`).
    pub bucket_access: Vec<String>,
}

/// `POST /v2/clusters/{id}/users` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatabaseUserRequest {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
    /// Per-bucket roles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<BucketRoleRequest>>,
    /// Role granted on every bucket.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_buckets_access: Option<String>,
}

/// `PUT /v2/clusters/{id}/users/{username}` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDatabaseUserRequest {
    /// Per-bucket roles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<BucketRoleRequest>>,
    /// Role granted on every bucket.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_buckets_access: Option<String>,
}

/// A database user as listed by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseUser {
    /// Username.
    pub username: String,
}

// =========================================================================
// Hosted clusters (v3)
// =========================================================================

/// Hosted placement: provider, region and CIDR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct V3PlaceHosted {
    /// Cloud provider (`aws`, `azure`, `gcp`).
    pub provider: String,
    /// Provider region.
    pub region: String,
    /// CIDR block for the cluster network.
    #[serde(rename = "CIDR")]
    pub cidr: String,
}

/// Where a hosted cluster is deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct V3Place {
    /// Single availability zone.
    #[serde(rename = "singleAZ")]
    pub single_az: bool,
    /// Hosted placement.
    pub hosted: V3PlaceHosted,
}

/// Storage of a hosted server group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct V3ServersStorage {
    /// Storage type (`GP3`, `IO2`).
    #[serde(rename = "type")]
    pub storage_type: String,
    /// Provisioned IOPS.
    #[serde(rename = "IOPS")]
    pub iops: i64,
    /// Size in GiB.
    pub size: i64,
}

/// A hosted cluster server group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct V3Servers {
    /// Number of nodes.
    pub size: i64,
    /// Compute instance type.
    pub compute: String,
    /// Couchbase services running on the nodes.
    pub services: Vec<String>,
    /// Storage configuration.
    pub storage: V3ServersStorage,
}

/// Support package of a hosted cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct V3SupportPackage {
    /// Support timezone (`ET`, `GMT`, `IST`, `PT`).
    pub timezone: String,
    /// Package type (`Basic`, `DeveloperPro`, `Enterprise`).
    #[serde(rename = "type")]
    pub package_type: String,
}

/// `POST /v3/clusters` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct V3CreateClusterRequest {
    /// Always `hosted`.
    pub environment: String,
    /// Cluster name.
    pub name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Owning project.
    pub project_id: String,
    /// Placement.
    pub place: V3Place,
    /// Server groups.
    pub servers: Vec<V3Servers>,
    /// Support package.
    pub support_package: V3SupportPackage,
}

/// A hosted cluster as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V3Cluster {
    /// Cluster UUID.
    pub id: String,
    /// Cluster name.
    pub name: String,
    /// Description, when set.
    #[serde(default)]
    pub description: Option<String>,
    /// Owning project, when reported.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Placement, when reported.
    #[serde(default)]
    pub place: Option<V3Place>,
    /// Server groups, when reported.
    #[serde(default)]
    pub servers: Option<Vec<V3Servers>>,
    /// Support package, when reported.
    #[serde(default)]
    pub support_package: Option<V3SupportPackage>,
}

/// `PUT /v3/clusters/{id}/meta` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct V3UpdateClusterMetaRequest {
    /// New name.
    pub name: String,
    /// New description.
    pub description: String,
}

/// `PUT /v3/clusters/{id}/support` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct V3UpdateClusterSupportRequest {
    /// New support package.
    pub support_package: V3SupportPackage,
}

/// `PUT /v3/clusters/{id}/servers` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct V3UpdateClusterServersRequest {
    /// New server groups.
    pub servers: Vec<V3Servers>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_v3_create_request_wire_names() {
        let request = V3CreateClusterRequest {
            environment: "hosted".to_string(),
            name: "c1".to_string(),
            description: None,
            project_id: "p1".to_string(),
            place: V3Place {
                single_az: true,
                hosted: V3PlaceHosted {
                    provider: "aws".to_string(),
                    region: "us-east-2".to_string(),
                    cidr: "10.0.16.0/20".to_string(),
                },
            },
            servers: vec![V3Servers {
                size: 3,
                compute: "m5.xlarge".to_string(),
                services: vec!["data".to_string()],
                storage: V3ServersStorage {
                    storage_type: "GP3".to_string(),
                    iops: 3000,
                    size: 50,
                },
            }],
            support_package: V3SupportPackage {
                timezone: "GMT".to_string(),
                package_type: "Basic".to_string(),
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["projectId"], "p1");
        assert_eq!(value["place"]["singleAZ"], true);
        assert_eq!(value["place"]["hosted"]["CIDR"], "10.0.16.0/20");
        assert_eq!(value["servers"][0]["storage"]["IOPS"], 3000);
        assert_eq!(value["servers"][0]["storage"]["type"], "GP3");
        assert_eq!(value["supportPackage"]["type"], "Basic");
        assert!(value.get("description").is_none());
    }

    #[test]
    fn test_user_request_omits_unused_access() {
        let request = CreateDatabaseUserRequest {
            username: "app".to_string(),
            password: "Password123!".to_string(),
            buckets: None,
            all_buckets_access: Some("data_reader".to_string()),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["allBucketsAccess"], "data_reader");
        assert!(value.get("buckets").is_none());
    }

    #[test]
    fn test_bucket_list_tolerates_missing_fields() {
        let buckets: Vec<Bucket> =
            serde_json::from_value(json!([{"id": "YjE=", "name": "b1", "memoryQuota": 128}]))
                .unwrap();
        assert_eq!(buckets[0].memory_quota, 128);
        assert!(buckets[0].replicas.is_none());
    }
}
