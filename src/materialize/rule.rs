use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::accessor::{Accessor, CallableTable};
use crate::error::{GraphError, Result};
use crate::graph::{is_verb_text, Entity, Value};

/// Option keys accepted in a rule table.
pub const RULE_OPTIONS: &[&str] = &["type", "from", "to", "verb", "on", "if", "unless"];

/// Lifecycle event reported by the host for an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Create,
    Update,
    Save,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifecycleEvent::Create => "create",
            LifecycleEvent::Update => "update",
            LifecycleEvent::Save => "save",
        })
    }
}

/// Which lifecycle events a rule fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Trigger {
    /// Create events only.
    Create,
    /// Update events only.
    Update,
    /// Every create, update and save event.
    #[default]
    Save,
}

impl Trigger {
    pub fn fires_on(self, event: LifecycleEvent) -> bool {
        matches!(
            (self, event),
            (Trigger::Save, _)
                | (Trigger::Create, LifecycleEvent::Create)
                | (Trigger::Update, LifecycleEvent::Update)
        )
    }
}

impl FromStr for Trigger {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create" => Ok(Trigger::Create),
            "update" => Ok(Trigger::Update),
            "save" => Ok(Trigger::Save),
            other => Err(GraphError::InvalidConfiguration(format!(
                "unknown trigger {:?} (expected create, update or save)",
                other
            ))),
        }
    }
}

/// How one domain type turns its instances into edges.
///
/// Built with [`EdgeRule::new`] plus the chained setters, or parsed from a
/// configuration table with [`EdgeRule::from_table`].
#[derive(Debug, Clone)]
pub struct EdgeRule {
    pub(crate) from: Accessor,
    pub(crate) to: Option<Accessor>,
    pub(crate) verb: Option<Accessor>,
    pub(crate) on: Trigger,
    pub(crate) if_all: Vec<Accessor>,
    pub(crate) unless_any: Vec<Accessor>,
}

impl EdgeRule {
    /// Rule with the given source; target defaults to the instance itself,
    /// verb to the instance's type name, trigger to `save`.
    pub fn new(from: Accessor) -> Self {
        Self {
            from,
            to: None,
            verb: None,
            on: Trigger::default(),
            if_all: Vec::new(),
            unless_any: Vec::new(),
        }
    }

    pub fn to(mut self, to: Accessor) -> Self {
        self.to = Some(to);
        self
    }

    pub fn verb(mut self, verb: impl Into<String>) -> Self {
        self.verb = Some(Accessor::Literal(Value::Text(verb.into())));
        self
    }

    pub fn verb_from(mut self, verb: Accessor) -> Self {
        self.verb = Some(verb);
        self
    }

    pub fn on(mut self, trigger: Trigger) -> Self {
        self.on = trigger;
        self
    }

    /// Add a guard that must hold.
    pub fn when(mut self, guard: Accessor) -> Self {
        self.if_all.push(guard);
        self
    }

    /// Add a guard that must not hold.
    pub fn unless(mut self, guard: Accessor) -> Self {
        self.unless_any.push(guard);
        self
    }

    pub fn trigger(&self) -> Trigger {
        self.on
    }

    /// All `if` guards truthy and no `unless` guard truthy.
    pub fn guards_pass(&self, instance: &Arc<dyn Entity>, callables: &CallableTable) -> Result<bool> {
        for guard in &self.if_all {
            if !guard.resolve(instance, callables)?.is_truthy() {
                return Ok(false);
            }
        }
        for guard in &self.unless_any {
            if guard.resolve(instance, callables)?.is_truthy() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Parse a configuration table into `(domain type, rule)`.
    ///
    /// Unknown keys and malformed values are rejected up front.
    pub fn from_table(table: &toml::Table) -> Result<(String, Self)> {
        if let Some(key) = table.keys().find(|k| !RULE_OPTIONS.contains(&k.as_str())) {
            return Err(invalid(format!(
                "unknown rule option {:?} (valid: {})",
                key,
                RULE_OPTIONS.join(", ")
            )));
        }

        let type_name = match table.get("type") {
            Some(toml::Value::String(s)) if !s.is_empty() => s.clone(),
            Some(_) => return Err(invalid("rule option `type` must be a non-empty string")),
            None => return Err(invalid("rule is missing `type`")),
        };
        let from = match table.get("from") {
            Some(value) => parse_accessor("from", value)?,
            None => return Err(invalid(format!("rule for {} is missing `from`", type_name))),
        };

        let mut rule = Self::new(from);
        if let Some(value) = table.get("to") {
            rule.to = Some(parse_accessor("to", value)?);
        }
        match table.get("verb") {
            Some(toml::Value::String(s)) if !is_verb_text(s) => {
                return Err(invalid(format!("rule for {} has an unusable `verb` {:?}", type_name, s)))
            }
            Some(toml::Value::String(s)) => rule = rule.verb(s.clone()),
            Some(value) => rule.verb = Some(parse_accessor("verb", value)?),
            None => {}
        }
        match table.get("on") {
            Some(toml::Value::String(s)) => rule.on = s.parse()?,
            Some(_) => return Err(invalid("rule option `on` must be a string")),
            None => {}
        }
        if let Some(value) = table.get("if") {
            rule.if_all = parse_guards("if", value)?;
        }
        if let Some(value) = table.get("unless") {
            rule.unless_any = parse_guards("unless", value)?;
        }

        Ok((type_name, rule))
    }
}

fn invalid(msg: impl Into<String>) -> GraphError {
    GraphError::InvalidConfiguration(msg.into())
}

/// `"name"` is a member; `{ member | expr | callable = "..." }` picks the kind.
fn parse_accessor(option: &str, value: &toml::Value) -> Result<Accessor> {
    match value {
        toml::Value::String(name) if !name.is_empty() => Ok(Accessor::Member(name.clone())),
        toml::Value::Table(table) if table.len() == 1 => {
            let (kind, payload) = table.iter().next().ok_or_else(|| invalid("empty accessor table"))?;
            let payload = payload
                .as_str()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| invalid(format!("`{}.{}` must be a non-empty string", option, kind)))?
                .to_string();
            match kind.as_str() {
                "member" => Ok(Accessor::Member(payload)),
                "expr" => Ok(Accessor::Expression(payload)),
                "callable" => Ok(Accessor::NamedCallable(payload)),
                other => Err(invalid(format!(
                    "`{}` accessor kind {:?} (expected member, expr or callable)",
                    option, other
                ))),
            }
        }
        _ => Err(invalid(format!(
            "`{}` must be a member name or a single-key accessor table",
            option
        ))),
    }
}

fn parse_guards(option: &str, value: &toml::Value) -> Result<Vec<Accessor>> {
    match value {
        toml::Value::Array(items) => items.iter().map(|v| parse_accessor(option, v)).collect(),
        single => Ok(vec![parse_accessor(option, single)?]),
    }
}
