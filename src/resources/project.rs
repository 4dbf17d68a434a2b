//! `couchbasecapella_project`: a Capella project.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::{from_state, id_attribute, state_id, to_state, Context, Reconciler};
use crate::error::{ProviderError, ProviderResult};
use crate::models::{CreateProjectRequest, Project};
use crate::schema::{Attribute, Schema, Validator};
use crate::validation::decode;

/// Resource type name.
pub const TYPE_NAME: &str = "couchbasecapella_project";

/// Desired state of a project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectSpec {
    /// Project name.
    pub name: String,
}

/// Recorded state of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectState {
    /// Project UUID.
    pub id: String,
    /// Project name.
    pub name: String,
}

impl From<Project> for ProjectState {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            name: project.name,
        }
    }
}

/// Reconciler for projects.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjectReconciler;

impl ProjectReconciler {
    async fn fetch(ctx: &Context, id: &str) -> ProviderResult<Option<Project>> {
        ctx.client
            .get_optional(&format!("/v2/projects/{}", id), "read project")
            .await
    }
}

#[async_trait::async_trait]
impl Reconciler for ProjectReconciler {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Manage Couchbase Capella projects")
            .with_attribute("id", id_attribute("Project ID"))
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("Project name")
                    .with_force_new()
                    .with_validator(Validator::NotEmpty),
            )
    }

    async fn create(&self, ctx: &Context, config: Value) -> ProviderResult<Value> {
        let spec: ProjectSpec = decode(&self.schema(), &config)?;

        let project: Project = ctx
            .client
            .post(
                "/v2/projects",
                &CreateProjectRequest { name: spec.name },
                "create project",
            )
            .await?;
        info!(id = %project.id, name = %project.name, "project created");

        let id = project.id.clone();
        let state = match Self::fetch(ctx, &id).await? {
            Some(fresh) => ProjectState::from(fresh),
            None => ProjectState::from(project),
        };
        to_state(&state)
    }

    async fn read(&self, ctx: &Context, state: Value) -> ProviderResult<Option<Value>> {
        let id = state_id(&state)?;
        match Self::fetch(ctx, &id).await? {
            Some(project) => Ok(Some(to_state(&ProjectState::from(project))?)),
            None => Ok(None),
        }
    }

    async fn update(&self, _ctx: &Context, _prior: Value, _planned: Value) -> ProviderResult<Value> {
        Err(ProviderError::Unimplemented(
            "projects cannot be updated in place; changing the name replaces the project"
                .to_string(),
        ))
    }

    async fn delete(&self, ctx: &Context, state: Value) -> ProviderResult<()> {
        let state: ProjectState = from_state(&state)?;
        if Self::fetch(ctx, &state.id).await?.is_none() {
            return Err(ProviderError::NotFound(format!(
                "project {} doesn't exist in Capella",
                state.id
            )));
        }

        ctx.client
            .delete(&format!("/v2/projects/{}", state.id), "delete project")
            .await?;
        info!(id = %state.id, "project deleted");
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> ProviderResult<Value> {
        let project = Self::fetch(ctx, id)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("project {} doesn't exist", id)))?;
        to_state(&ProjectState::from(project))
    }
}
