//! Couchbase Capella provider
//!
//! This crate reconciles declared Couchbase Capella resources against the
//! Capella management API. An infrastructure engine drives it through the
//! [`ProviderService`] trait: it fetches the schema, configures credentials,
//! then plans, creates, reads, updates, deletes and imports resources by
//! type name using untyped JSON state.
//!
//! # Resources
//!
//! | Type name                          | Remote object                       |
//! |------------------------------------|-------------------------------------|
//! | `couchbasecapella_project`         | Capella project                     |
//! | `couchbasecapella_hosted_cluster`  | Cluster hosted by Couchbase (v3)    |
//! | `couchbasecapella_vpc_cluster`     | Cluster in the customer's VPC (v2)  |
//! | `couchbasecapella_bucket`          | Bucket in a VPC cluster             |
//! | `couchbasecapella_database_user`   | Database user in a VPC cluster      |
//!
//! and one data source, `couchbasecapella_cloud`.
//!
//! Cluster creation and deletion are asynchronous on the Capella side. The
//! provider polls the cluster status until it reaches its target state or
//! the operation timeout elapses; see [`poll::StatusPoller`].
//!
//! # Quick Start
//!
//! ```ignore
//! use couchbase_capella_provider::{CapellaProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     couchbase_capella_provider::init_logging();
//!
//!     let provider = CapellaProvider::new();
//!     // Credentials fall back to CBC_ACCESS_KEY / CBC_SECRET_KEY.
//!     provider.configure(json!({})).await?;
//!
//!     let plan = provider
//!         .plan("couchbasecapella_project", None, json!({"name": "analytics"}), json!({}))
//!         .await?;
//!     let state = provider
//!         .create("couchbasecapella_project", plan.planned_state)
//!         .await?;
//!     println!("created project {}", state["id"]);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod plan;
pub mod poll;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod service;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use client::CapellaClient;
pub use config::{PollConfig, ProviderConfig};
pub use error::{ErrorKind, ProviderError, ProviderResult};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::CapellaProvider;
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{decode, is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
