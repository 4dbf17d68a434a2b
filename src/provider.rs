//! The Capella provider: [`ProviderService`] over the resource reconcilers.
//!
//! Credentials are resolved once in [`ProviderService::configure`] into a
//! [`Context`] that every operation borrows. Operations dispatch by
//! resource type name to the matching [`Reconciler`].

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::client::CapellaClient;
use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::plan;
use crate::resources::{
    cloud, BucketReconciler, CloudDataSource, Context, DatabaseUserReconciler,
    HostedClusterReconciler, ProjectReconciler, Reconciler, VpcClusterReconciler,
};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult, ProviderCapabilities, ProviderMetadata};
use crate::validation;

/// Couchbase Capella provider.
pub struct CapellaProvider {
    context: RwLock<Option<Arc<Context>>>,
    reconcilers: Vec<Box<dyn Reconciler>>,
    cloud: CloudDataSource,
}

impl std::fmt::Debug for CapellaProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let types: Vec<&str> = self.reconcilers.iter().map(|r| r.type_name()).collect();
        f.debug_struct("CapellaProvider")
            .field("resources", &types)
            .finish_non_exhaustive()
    }
}

impl Default for CapellaProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CapellaProvider {
    /// Create an unconfigured provider.
    pub fn new() -> Self {
        Self {
            context: RwLock::new(None),
            reconcilers: vec![
                Box::new(ProjectReconciler),
                Box::new(HostedClusterReconciler),
                Box::new(VpcClusterReconciler),
                Box::new(BucketReconciler),
                Box::new(DatabaseUserReconciler),
            ],
            cloud: CloudDataSource,
        }
    }

    /// Create a provider already configured with `config`.
    pub fn configured(config: &ProviderConfig) -> ProviderResult<Self> {
        let context = Context::new(CapellaClient::new(config)?, config.poll);
        Ok(Self {
            context: RwLock::new(Some(Arc::new(context))),
            ..Self::new()
        })
    }

    async fn context(&self) -> ProviderResult<Arc<Context>> {
        self.context.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration(
                "the provider is not configured; call configure first".to_string(),
            )
        })
    }

    fn reconciler(&self, resource_type: &str) -> ProviderResult<&dyn Reconciler> {
        self.reconcilers
            .iter()
            .find(|r| r.type_name() == resource_type)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }
}

#[async_trait::async_trait]
impl ProviderService for CapellaProvider {
    fn schema(&self) -> ProviderSchema {
        self.reconcilers.iter().fold(
            ProviderSchema::new()
                .with_provider_config(ProviderConfig::schema())
                .with_data_source(cloud::TYPE_NAME, self.cloud.schema()),
            |schema, r| schema.with_resource(r.type_name(), r.schema()),
        )
    }

    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        let mut resources: Vec<String> = schema.resources.keys().cloned().collect();
        let mut data_sources: Vec<String> = schema.data_sources.keys().cloned().collect();
        resources.sort();
        data_sources.sort();
        ProviderMetadata {
            resources,
            data_sources,
            capabilities: ProviderCapabilities {
                plan_destroy: true,
                import: true,
            },
        }
    }

    #[instrument(skip(self, config))]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = validation::validate(&self.schema().provider, &config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            warn!(diagnostics = diagnostics.len(), "provider configuration rejected");
            return Ok(diagnostics);
        }

        let config = ProviderConfig::from_value(&config)?;
        let client = CapellaClient::new(&config)?;
        *self.context.write().await = Some(Arc::new(Context::new(client, config.poll)));

        info!(api_url = %config.api_url, "provider configured");
        Ok(diagnostics)
    }

    #[instrument(skip(self, prior_state, proposed_state, _config))]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let schema = self.reconciler(resource_type)?.schema();
        if !proposed_state.is_null() {
            validation::validate_result(&schema, &proposed_state).map_err(|diags| {
                ProviderError::Validation(
                    diags
                        .iter()
                        .map(|d| d.summary.clone())
                        .collect::<Vec<_>>()
                        .join("; "),
                )
            })?;
        }

        let result = plan::plan(&schema, prior_state.as_ref(), &proposed_state);
        debug!(
            changes = result.changes.len(),
            requires_replace = result.requires_replace,
            "plan computed"
        );
        Ok(result)
    }

    #[instrument(skip(self, planned_state))]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let reconciler = self.reconciler(resource_type)?;
        let ctx = self.context().await?;
        reconciler.create(&ctx, planned_state).await
    }

    #[instrument(skip(self, current_state))]
    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let reconciler = self.reconciler(resource_type)?;
        let ctx = self.context().await?;
        let state = reconciler.read(&ctx, current_state).await?;
        if state.is_none() {
            info!("resource no longer exists");
        }
        Ok(state)
    }

    #[instrument(skip(self, prior_state, planned_state))]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let reconciler = self.reconciler(resource_type)?;
        let ctx = self.context().await?;
        reconciler.update(&ctx, prior_state, planned_state).await
    }

    #[instrument(skip(self, current_state))]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let reconciler = self.reconciler(resource_type)?;
        let ctx = self.context().await?;
        reconciler.delete(&ctx, current_state).await
    }

    #[instrument(skip(self))]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let reconciler = self.reconciler(resource_type)?;
        let ctx = self.context().await?;
        let state = reconciler.import(&ctx, id).await?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    #[instrument(skip(self, config))]
    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        if data_source_type != cloud::TYPE_NAME {
            return Err(ProviderError::UnknownResource(format!(
                "Unknown data source type: {}",
                data_source_type
            )));
        }
        let ctx = self.context().await?;
        self.cloud.read(&ctx, config).await
    }
}
