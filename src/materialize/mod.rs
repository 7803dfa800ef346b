//! Edge materialization: turning a configured rule plus a triggering
//! instance into an edge write.

mod accessor;
mod rule;

pub use accessor::{Accessor, Callable, CallableTable};
pub use rule::{EdgeRule, LifecycleEvent, Trigger, RULE_OPTIONS};

use std::sync::Arc;

use crate::error::{GraphError, Result};
use crate::graph::{Entity, NodeRef, Value};
use crate::store::EdgeStore;

fn verb_text(value: Value, instance: &dyn Entity) -> Result<String> {
    match value {
        Value::Text(s) => Ok(s),
        Value::Int(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(GraphError::InvalidConfiguration(format!(
            "verb for {} resolved to {}, expected text",
            instance.type_name(),
            other.type_name()
        ))),
    }
}

/// Apply `rule` to `instance`: check guards, resolve endpoints and verb,
/// write the edge.
///
/// Returns `Ok(false)` when a guard stops the rule; that is not an error.
pub async fn materialize(
    rule: &EdgeRule,
    instance: &Arc<dyn Entity>,
    callables: &CallableTable,
    store: &EdgeStore,
) -> Result<bool> {
    if !rule.guards_pass(instance, callables)? {
        log::debug!(
            "Skipping {} rule for {}: guard not satisfied",
            instance.type_name(),
            NodeRef::for_entity(instance.as_ref())
        );
        return Ok(false);
    }

    let from = rule.from.resolve(instance, callables)?;
    let to = match &rule.to {
        Some(accessor) => accessor.resolve(instance, callables)?,
        None => Value::Entity(instance.clone()),
    };
    let verb = match &rule.verb {
        Some(accessor) => verb_text(accessor.resolve(instance, callables)?, instance.as_ref())?,
        None => instance.type_name().to_string(),
    };

    store.put(&NodeRef::of(&from), &verb, &NodeRef::of(&to)).await?;
    Ok(true)
}
