//! Schema-driven planning.
//!
//! Compares the prior state of a resource with its proposed configuration
//! and decides whether the change can be applied in place or needs the
//! resource to be replaced. Computed attributes are carried over from the
//! prior state and sensitive values never appear in the reported changes.

use serde_json::{Map, Value};

use crate::schema::{Block, BlockNestingMode, NestedBlock, Schema};
use crate::types::{AttributeChange, PlanResult};

/// Plan a resource change.
///
/// - `prior == None`: create. Every configured attribute is reported as added.
/// - `proposed == Null`: delete. Every prior attribute is reported as removed.
/// - otherwise: update or replace, depending on which attributes changed.
pub fn plan(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    match prior {
        None => plan_create(schema, proposed),
        Some(prior) if proposed.is_null() => plan_delete(schema, prior),
        Some(prior) => plan_update(schema, prior, proposed),
    }
}

fn plan_create(schema: &Schema, proposed: &Value) -> PlanResult {
    let planned = with_defaults(&schema.block, proposed);
    let changes = top_level_keys(&schema.block)
        .filter_map(|name| {
            let value = planned.get(name).filter(|v| !v.is_null())?;
            Some(redact(
                &schema.block,
                name,
                AttributeChange::added(name, value.clone()),
            ))
        })
        .collect();
    PlanResult::with_changes(planned, changes, false)
}

fn plan_delete(schema: &Schema, prior: &Value) -> PlanResult {
    let changes = top_level_keys(&schema.block)
        .filter_map(|name| {
            let value = prior.get(name).filter(|v| !v.is_null())?;
            Some(redact(
                &schema.block,
                name,
                AttributeChange::removed(name, value.clone()),
            ))
        })
        .collect();
    PlanResult::with_changes(Value::Null, changes, false)
}

fn plan_update(schema: &Schema, prior: &Value, proposed: &Value) -> PlanResult {
    let mut planned = with_defaults(&schema.block, proposed);
    carry_computed(&schema.block, prior, &mut planned);

    let mut changes = Vec::new();
    for (name, attr) in &schema.block.attributes {
        if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
            continue;
        }
        let before = field(prior, name);
        let after = field(&planned, name);
        if before == after {
            continue;
        }
        let mut change = change_between(name, before, after);
        if attr.force_new {
            change = change.forcing_replace();
        }
        changes.push(redact(&schema.block, name, change));
    }

    for (name, nested) in &schema.block.blocks {
        let before = field(prior, name);
        let after = field(&planned, name);
        if before == after {
            continue;
        }
        let mut change = change_between(name, before, after);
        if nested_forces_replace(nested, before, after) {
            change = change.forcing_replace();
        }
        changes.push(change);
    }

    changes.sort_by(|a, b| a.path.cmp(&b.path));

    if changes.is_empty() {
        PlanResult::no_change(planned)
    } else {
        PlanResult::with_changes(planned, changes, false)
    }
}

/// Whether a change inside a nested block needs replacement.
fn nested_forces_replace(nested: &NestedBlock, before: &Value, after: &Value) -> bool {
    if nested.force_new {
        return true;
    }
    match nested.nesting_mode {
        BlockNestingMode::Single => block_forces_replace(&nested.block, before, after),
        BlockNestingMode::List | BlockNestingMode::Set => {
            let empty = Vec::new();
            let before = before.as_array().unwrap_or(&empty);
            let after = after.as_array().unwrap_or(&empty);
            if before.len() != after.len() {
                return has_force_new(&nested.block);
            }
            before
                .iter()
                .zip(after)
                .any(|(b, a)| block_forces_replace(&nested.block, b, a))
        },
    }
}

fn block_forces_replace(block: &Block, before: &Value, after: &Value) -> bool {
    let attrs = block
        .attributes
        .iter()
        .any(|(name, attr)| attr.force_new && field(before, name) != field(after, name));
    attrs
        || block.blocks.iter().any(|(name, nested)| {
            let (b, a) = (field(before, name), field(after, name));
            b != a && nested_forces_replace(nested, b, a)
        })
}

fn has_force_new(block: &Block) -> bool {
    block.attributes.values().any(|a| a.force_new)
        || block
            .blocks
            .values()
            .any(|n| n.force_new || has_force_new(&n.block))
}

fn change_between(name: &str, before: &Value, after: &Value) -> AttributeChange {
    match (before.is_null(), after.is_null()) {
        (true, _) => AttributeChange::added(name, after.clone()),
        (_, true) => AttributeChange::removed(name, before.clone()),
        _ => AttributeChange::modified(name, before.clone(), after.clone()),
    }
}

fn redact(block: &Block, name: &str, change: AttributeChange) -> AttributeChange {
    match block.attributes.get(name) {
        Some(attr) if attr.flags.sensitive => change.redacted(),
        _ => change,
    }
}

/// Copy computed attributes the configuration does not set from `prior`.
fn carry_computed(block: &Block, prior: &Value, planned: &mut Value) {
    let Some(planned) = planned.as_object_mut() else {
        return;
    };
    for (name, attr) in &block.attributes {
        if !attr.flags.computed {
            continue;
        }
        let unset = planned.get(name).map_or(true, Value::is_null);
        if unset {
            if let Some(value) = prior.get(name).filter(|v| !v.is_null()) {
                planned.insert(name.clone(), value.clone());
            }
        }
    }
}

/// Clone `value`, filling unset top-level attributes with their defaults.
fn with_defaults(block: &Block, value: &Value) -> Value {
    let mut obj = value.as_object().cloned().unwrap_or_else(Map::new);
    for (name, attr) in &block.attributes {
        if let Some(default) = &attr.default {
            let unset = obj.get(name).map_or(true, Value::is_null);
            if unset {
                obj.insert(name.clone(), default.clone());
            }
        }
    }
    Value::Object(obj)
}

fn top_level_keys(block: &Block) -> impl Iterator<Item = &str> {
    let mut keys: Vec<&str> = block
        .attributes
        .keys()
        .chain(block.blocks.keys())
        .map(String::as_str)
        .collect();
    keys.sort_unstable();
    keys.into_iter()
}

fn field<'a>(value: &'a Value, name: &str) -> &'a Value {
    value.get(name).unwrap_or(&Value::Null)
}
