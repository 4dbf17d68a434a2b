//! Accepted values for enumerated Capella fields.

/// Couchbase services a server group can run.
pub const SERVICES: &[&str] = &["data", "index", "query", "search", "eventing", "analytics"];

/// Bucket conflict resolution modes.
pub const CONFLICT_RESOLUTIONS: &[&str] = &["lww", "seqno"];

/// Database user bucket roles.
pub const BUCKET_ROLES: &[&str] = &["data_reader", "data_writer"];

/// Hosted cluster cloud providers.
pub const HOSTED_PROVIDERS: &[&str] = &["aws", "azure", "gcp"];

/// Hosted cluster storage types.
pub const STORAGE_TYPES: &[&str] = &["GP3", "IO2"];

/// Support package timezones.
pub const TIMEZONES: &[&str] = &["ET", "GMT", "IST", "PT"];

/// Support package types.
pub const SUPPORT_PACKAGES: &[&str] = &["Basic", "DeveloperPro", "Enterprise"];

/// The support package that only runs in a single availability zone.
pub const BASIC_SUPPORT: &str = "Basic";

/// EC2 instance types.
pub const AWS_INSTANCES: &[&str] = &[
    "m5.xlarge",
    "m5.2xlarge",
    "m5.4xlarge",
    "m5.8xlarge",
    "m5.12xlarge",
    "m5.16xlarge",
    "m5.24xlarge",
    "r5.xlarge",
    "r5.2xlarge",
    "r5.4xlarge",
    "r5.8xlarge",
    "r5.12xlarge",
    "r5.16xlarge",
    "r5.24xlarge",
    "c5.2xlarge",
    "c5.4xlarge",
    "c5.9xlarge",
    "c5.12xlarge",
    "c5.18xlarge",
    "c5.24xlarge",
];

/// Azure VM sizes.
pub const AZURE_INSTANCES: &[&str] = &[
    "Standard_F4s_v2",
    "Standard_F8s_v2",
    "Standard_F16s_v2",
    "Standard_F32s_v2",
    "Standard_F48s_v2",
    "Standard_F64s_v2",
    "Standard_F72s_v2",
    "Standard_D4s_v3",
    "Standard_D8s_v3",
    "Standard_D16s_v3",
    "Standard_D32s_v3",
    "Standard_D48s_v3",
    "Standard_D64s_v3",
    "Standard_E4s_v3",
    "Standard_E8s_v3",
    "Standard_E16s_v3",
    "Standard_E20s_v3",
    "Standard_E32s_v3",
    "Standard_E48s_v3",
    "Standard_E64s_v3",
];

/// GCP machine types.
pub const GCP_INSTANCES: &[&str] = &[
    "n2-standard-2",
    "n2-standard-4",
    "n2-standard-8",
    "n2-standard-16",
    "n2-standard-32",
    "n2-standard-48",
    "n2-standard-64",
    "n2-standard-80",
    "n2-highmem-2",
    "n2-highmem-4",
    "n2-highmem-8",
    "n2-highmem-16",
    "n2-highmem-32",
    "n2-highmem-48",
    "n2-highmem-64",
    "n2-highmem-80",
    "n2-highcpu-2",
    "n2-highcpu-4",
    "n2-highcpu-8",
    "n2-highcpu-16",
    "n2-highcpu-32",
    "n2-highcpu-48",
    "n2-highcpu-64",
    "n2-highcpu-80",
    "n2-custom-2-4096",
    "n2-custom-4-8192",
    "n2-custom-8-16384",
    "n2-custom-16-32768",
    "n2-custom-32-65536",
    "n2-custom-36-73728",
    "n2-custom-48-98304",
    "n2-custom-72-147456",
];

/// Azure managed disk types for VPC clusters.
pub const AZURE_VOLUME_TYPES: &[&str] = &[
    "P6", "P10", "P15", "P20", "P30", "P40", "P50", "P60",
];

/// AWS regions.
pub const AWS_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-2",
    "ca-central-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-central-1",
    "eu-north-1",
    "ap-south-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "ap-northeast-2",
    "sa-east-1",
];

/// Azure regions.
pub const AZURE_REGIONS: &[&str] = &[
    "eastus",
    "eastus2",
    "westus2",
    "centralus",
    "southcentralus",
    "canadacentral",
    "northeurope",
    "westeurope",
    "uksouth",
    "francecentral",
    "germanywestcentral",
    "swedencentral",
    "centralindia",
    "southeastasia",
    "japaneast",
    "koreacentral",
    "australiaeast",
    "brazilsouth",
];

/// GCP regions.
pub const GCP_REGIONS: &[&str] = &[
    "asia-east1",
    "asia-east2",
    "asia-northeast1",
    "asia-northeast2",
    "asia-northeast3",
    "asia-south1",
    "asia-south2",
    "asia-southeast1",
    "asia-southeast2",
    "australia-southeast1",
    "australia-southeast2",
    "europe-central2",
    "europe-north1",
    "europe-west1",
    "europe-west2",
    "europe-west3",
    "europe-west4",
    "europe-west6",
    "europe-west8",
    "northamerica-northeast1",
    "northamerica-northeast2",
    "southamerica-east1",
    "southamerica-west1",
    "us-east1",
    "us-east4",
    "us-west1",
    "us-west2",
    "us-west3",
    "us-west4",
    "us-central1",
    "us-central2",
];

/// Instance types offered by a hosted provider.
pub fn instances_for(provider: &str) -> &'static [&'static str] {
    match provider {
        "aws" => AWS_INSTANCES,
        "azure" => AZURE_INSTANCES,
        "gcp" => GCP_INSTANCES,
        _ => &[],
    }
}

/// Regions offered by a hosted provider.
pub fn regions_for(provider: &str) -> &'static [&'static str] {
    match provider {
        "aws" => AWS_REGIONS,
        "azure" => AZURE_REGIONS,
        "gcp" => GCP_REGIONS,
        _ => &[],
    }
}

/// Every known instance type, across providers.
pub fn all_instances() -> Vec<&'static str> {
    [AWS_INSTANCES, AZURE_INSTANCES, GCP_INSTANCES].concat()
}

/// Every known region, across providers.
pub fn all_regions() -> Vec<&'static str> {
    [AWS_REGIONS, AZURE_REGIONS, GCP_REGIONS].concat()
}

/// Inclusive IOPS range for a storage type.
pub fn iops_range(storage_type: &str) -> Option<(i64, i64)> {
    match storage_type {
        "GP3" => Some((3000, 16000)),
        "IO2" => Some((1000, 64000)),
        _ => None,
    }
}
