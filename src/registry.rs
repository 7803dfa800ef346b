//! Per-type graph configuration: edge rules, default query verbs and named
//! callables. Built once at startup and shared read-only afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{GraphError, Result};
use crate::graph::{DirectedVerb, Entity, Value};
use crate::materialize::{Callable, CallableTable, EdgeRule};

#[derive(Default, Clone)]
pub struct GraphRegistry {
    rules: HashMap<String, Vec<EdgeRule>>,
    node_verbs: HashMap<String, Vec<DirectedVerb>>,
    callables: CallableTable,
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every `[[nodes]]` and `[[rules]]` entry of `config`.
    ///
    /// Callables referenced by rules are looked up when a rule fires, so they
    /// can still be registered after this returns.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::new();
        for node in &config.nodes {
            registry.register_node_verbs(&node.type_name, &node.verbs)?;
        }
        for table in &config.rules {
            registry.register_rule_table(table)?;
        }
        log::info!(
            "Graph registry loaded: {} rule(s), {} node type(s)",
            registry.rules.values().map(Vec::len).sum::<usize>(),
            registry.node_verbs.len()
        );
        Ok(registry)
    }

    /// Append `rule` to the rules of `type_name`.
    pub fn register_edge_rule(&mut self, type_name: impl Into<String>, rule: EdgeRule) {
        self.rules.entry(type_name.into()).or_default().push(rule);
    }

    /// Parse and register one rule table; fails on unknown options.
    pub fn register_rule_table(&mut self, table: &toml::Table) -> Result<()> {
        let (type_name, rule) = EdgeRule::from_table(table)?;
        log::debug!("Registered {:?} rule for {}", rule.trigger(), type_name);
        self.register_edge_rule(type_name, rule);
        Ok(())
    }

    /// Add to the default verb set of `type_name`. Every verb needs a direction marker.
    pub fn register_node_verbs<S: AsRef<str>>(&mut self, type_name: &str, verbs: &[S]) -> Result<()> {
        let parsed = DirectedVerb::parse_all(verbs).map_err(|e| {
            GraphError::InvalidConfiguration(format!("node verbs for {}: {}", type_name, e))
        })?;
        let entry = self.node_verbs.entry(type_name.to_string()).or_default();
        for verb in parsed {
            if !entry.contains(&verb) {
                entry.push(verb);
            }
        }
        Ok(())
    }

    /// Make a callable available to `{ callable = "name" }` accessors.
    pub fn register_callable<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Arc<dyn Entity>) -> Result<Value> + Send + Sync + 'static,
    {
        let callable: Callable = Arc::new(f);
        self.callables.insert(name.into(), callable);
    }

    /// Append everything from `other`. Its callables replace same-named ones.
    pub fn merge(&mut self, other: GraphRegistry) {
        for (type_name, rules) in other.rules {
            self.rules.entry(type_name).or_default().extend(rules);
        }
        for (type_name, verbs) in other.node_verbs {
            let entry = self.node_verbs.entry(type_name).or_default();
            for verb in verbs {
                if !entry.contains(&verb) {
                    entry.push(verb);
                }
            }
        }
        self.callables.extend(other.callables);
    }

    /// Rules registered for exactly `type_name`. There is no inheritance:
    /// a subtype sees only the rules registered under its own name.
    pub fn rules_for(&self, type_name: &str) -> &[EdgeRule] {
        self.rules.get(type_name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node_verbs(&self, type_name: &str) -> &[DirectedVerb] {
        self.node_verbs.get(type_name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn callables(&self) -> &CallableTable {
        &self.callables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Record;
    use crate::materialize::{Accessor, Trigger};

    #[test]
    fn test_rules_append_in_order() {
        let mut registry = GraphRegistry::new();
        registry.register_edge_rule("OrderItem", EdgeRule::new(Accessor::member("user")));
        registry.register_edge_rule(
            "OrderItem",
            EdgeRule::new(Accessor::member("order")).on(Trigger::Create),
        );

        let rules = registry.rules_for("OrderItem");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].trigger(), Trigger::Save);
        assert_eq!(rules[1].trigger(), Trigger::Create);
        assert!(registry.rules_for("User").is_empty());
        // Exact names only
        assert!(registry.rules_for("SpecialOrderItem").is_empty());
        assert!(registry.rules_for("orderitem").is_empty());
    }

    #[test]
    fn test_node_verbs_validated_and_deduplicated() {
        let mut registry = GraphRegistry::new();
        registry.register_node_verbs("User", &[">Purchased", "<Follows"]).unwrap();
        registry.register_node_verbs("User", &[">Purchased"]).unwrap();

        let verbs: Vec<String> = registry.node_verbs("User").iter().map(|v| v.to_string()).collect();
        assert_eq!(verbs, vec![">Purchased", "<Follows"]);

        let err = registry.register_node_verbs("Item", &["Purchased"]).unwrap_err();
        assert!(matches!(err, GraphError::InvalidConfiguration(ref m) if m.contains("Item")));
        assert!(registry.node_verbs("Item").is_empty());
    }

    #[test]
    fn test_from_config() {
        let config = Config::parse(
            r#"
[[nodes]]
type = "User"
verbs = [">Purchased"]

[[rules]]
type = "OrderItem"
from = "user"
to = "item"
verb = "Purchased"
on = "create"
"#,
        )
        .unwrap();

        let registry = GraphRegistry::from_config(&config).unwrap();
        assert_eq!(registry.rules_for("OrderItem").len(), 1);
        assert_eq!(registry.node_verbs("User"), &[DirectedVerb::forward("Purchased")]);
    }

    #[test]
    fn test_from_config_fails_fast_on_bad_rule() {
        let config = Config::parse(
            r#"
[[rules]]
type = "Blah"
from = "owner"
foo = "bar"
"#,
        )
        .unwrap();

        assert!(matches!(
            GraphRegistry::from_config(&config),
            Err(GraphError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_register_callable() {
        let mut registry = GraphRegistry::new();
        registry.register_callable("is_vip", |e| Ok(Value::Bool(e.id() == "1")));

        let user: Arc<dyn Entity> = Arc::new(Record::new("User", 1));
        let callable = registry.callables().get("is_vip").unwrap();
        assert!(callable(&user).unwrap().is_truthy());
    }

    #[test]
    fn test_merge_keeps_both_sides() {
        let mut base = GraphRegistry::new();
        base.register_callable("flag", |_| Ok(Value::Bool(true)));
        base.register_node_verbs("User", &[">Purchased"]).unwrap();
        base.register_edge_rule("OrderItem", EdgeRule::new(Accessor::member("user")));

        let mut other = GraphRegistry::new();
        other.register_node_verbs("User", &[">Purchased", "<Follows"]).unwrap();
        other.register_edge_rule("OrderItem", EdgeRule::new(Accessor::member("order")));

        base.merge(other);
        assert_eq!(base.rules_for("OrderItem").len(), 2);
        assert_eq!(base.node_verbs("User").len(), 2);
        assert!(base.callables().contains_key("flag"));
    }
}
