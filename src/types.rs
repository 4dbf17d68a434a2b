//! Value types exchanged with the engine driving the provider.

use serde::{Deserialize, Serialize};

/// Placeholder written in place of sensitive values.
pub const REDACTED: &str = "(sensitive value)";

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The path to the attribute that changed.
    pub path: String,
    /// The value before the change (None if creating).
    pub before: Option<serde_json::Value>,
    /// The value after the change (None if deleting).
    pub after: Option<serde_json::Value>,
    /// Whether this change alone forces the resource to be replaced.
    #[serde(default)]
    pub forces_replace: bool,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(
        path: impl Into<String>,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
    ) -> Self {
        Self {
            path: path.into(),
            before,
            after,
            forces_replace: false,
        }
    }

    /// Create a change for a new attribute.
    pub fn added(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Create a change for a removed attribute.
    pub fn removed(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// Create a change for a modified attribute.
    pub fn modified(
        path: impl Into<String>,
        before: serde_json::Value,
        after: serde_json::Value,
    ) -> Self {
        Self::new(path, Some(before), Some(after))
    }

    /// Mark this change as forcing replacement.
    pub fn forcing_replace(mut self) -> Self {
        self.forces_replace = true;
        self
    }

    /// Replace both sides with [`REDACTED`], keeping which sides are present.
    pub fn redacted(mut self) -> Self {
        let mask = |v: Option<serde_json::Value>| v.map(|_| serde_json::json!(REDACTED));
        self.before = mask(self.before);
        self.after = mask(self.after);
        self
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state after the operation.
    pub planned_state: serde_json::Value,
    /// The list of attribute changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource requires replacement.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Create a plan result with no changes.
    pub fn no_change(state: serde_json::Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// Create a plan result with changes.
    ///
    /// `requires_replace` is also raised when any change forces replacement.
    pub fn with_changes(
        planned_state: serde_json::Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        let requires_replace = requires_replace || changes.iter().any(|c| c.forces_replace);
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }

    /// True when applying this plan would not touch the remote resource.
    pub fn is_no_op(&self) -> bool {
        self.changes.is_empty() && !self.requires_replace
    }
}

/// An imported resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
    pub state: serde_json::Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: serde_json::Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Provider metadata: what the provider can manage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// List of resource type names.
    pub resources: Vec<String>,
    /// List of data source type names.
    pub data_sources: Vec<String>,
    /// Capability flags.
    pub capabilities: ProviderCapabilities,
}

/// Provider capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderCapabilities {
    /// Whether the provider supports planning destroy operations.
    pub plan_destroy: bool,
    /// Whether some resource types can be imported by ID.
    pub import: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_change_constructors() {
        let added = AttributeChange::added("name", json!("b1"));
        assert!(added.before.is_none());
        assert_eq!(added.after, Some(json!("b1")));
        assert!(!added.forces_replace);

        let removed = AttributeChange::removed("description", json!("old"));
        assert_eq!(removed.before, Some(json!("old")));
        assert!(removed.after.is_none());

        let modified = AttributeChange::modified("memory_quota", json!(128), json!(256));
        assert_eq!(modified.before, Some(json!(128)));
        assert_eq!(modified.after, Some(json!(256)));
    }

    #[test]
    fn test_attribute_change_redacted() {
        let change = AttributeChange::added("password", json!("Password123!")).redacted();
        assert!(change.before.is_none());
        assert_eq!(change.after, Some(json!(REDACTED)));
    }

    #[test]
    fn test_plan_result() {
        let no_change = PlanResult::no_change(json!({"id": "123"}));
        assert!(no_change.is_no_op());

        let update = PlanResult::with_changes(
            json!({"id": "123", "memory_quota": 256}),
            vec![AttributeChange::modified("memory_quota", json!(128), json!(256))],
            false,
        );
        assert_eq!(update.changes.len(), 1);
        assert!(!update.requires_replace);

        let replace = PlanResult::with_changes(
            json!({"id": "123", "name": "b2"}),
            vec![AttributeChange::modified("name", json!("b1"), json!("b2")).forcing_replace()],
            false,
        );
        assert!(replace.requires_replace);
    }

    #[test]
    fn test_imported_resource() {
        let imported = ImportedResource::new(
            "couchbasecapella_project",
            json!({"id": "0b4bd1f3-3c35-4a0a-9d6c-9bcbd2a33f52"}),
        );
        assert_eq!(imported.resource_type, "couchbasecapella_project");
        assert_eq!(imported.state["id"], "0b4bd1f3-3c35-4a0a-9d6c-9bcbd2a33f52");
    }
}
