//! Node identity: canonical `Type:Value` references and the values accessors produce.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{GraphError, Result};

/// A managed domain entity that can appear as a graph endpoint.
///
/// `member` is how rule accessors reach into an instance: it returns `None`
/// when the entity does not expose a member of that name.
pub trait Entity: fmt::Debug + Send + Sync {
    /// Domain type name, e.g. `User`.
    fn type_name(&self) -> &str;

    /// Identifier rendered as a string.
    fn id(&self) -> String;

    /// Look up a named member (attribute or association).
    fn member(&self, name: &str) -> Option<Value>;
}

/// A value produced by resolving an accessor against an instance.
#[derive(Debug, Clone)]
pub enum Value {
    Entity(Arc<dyn Entity>),
    Text(String),
    Int(i64),
    Bool(bool),
    Nil,
}

impl Value {
    /// Wrap a concrete entity.
    pub fn entity<E: Entity + 'static>(entity: E) -> Self {
        Value::Entity(Arc::new(entity))
    }

    /// Guard truthiness: only `Nil` and `false` are false.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Display name of the value's type, as used for node type names.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Entity(e) => e.type_name(),
            Value::Text(_) => "String",
            Value::Int(_) => "Integer",
            Value::Bool(_) => "Boolean",
            Value::Nil => "Nil",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Arc<dyn Entity>> for Value {
    fn from(e: Arc<dyn Entity>) -> Self {
        Value::Entity(e)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Nil)
    }
}

/// Canonical identity of a graph endpoint.
///
/// Stored as the canonical string with the position of the first separator;
/// equality, ordering and hashing all follow the canonical string.
#[derive(Clone)]
pub struct NodeRef {
    canonical: String,
    split: usize,
}

impl NodeRef {
    /// The type/value split is taken from the canonical string at its first
    /// `:`, so `new("Tag:a", "b")` and `"Tag:a:b".parse()` agree.
    pub fn new(type_name: &str, value: &str) -> Self {
        let canonical = format!("{}:{}", type_name, value);
        let split = canonical.find(':').unwrap_or(type_name.len());
        Self { canonical, split }
    }

    /// Node for any resolved value: entities use their id, everything else its text form.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Entity(e) => Self::for_entity(e.as_ref()),
            Value::Text(s) => Self::new(value.type_name(), s),
            Value::Int(n) => Self::new(value.type_name(), &n.to_string()),
            Value::Bool(b) => Self::new(value.type_name(), if *b { "true" } else { "false" }),
            Value::Nil => Self::new(value.type_name(), ""),
        }
    }

    pub fn for_entity(entity: &dyn Entity) -> Self {
        Self::new(entity.type_name(), &entity.id())
    }

    pub fn type_name(&self) -> &str {
        &self.canonical[..self.split]
    }

    pub fn value(&self) -> &str {
        &self.canonical[self.split + 1..]
    }

    /// `"{TypeName}:{Value}"`
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn into_canonical(self) -> String {
        self.canonical
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for NodeRef {}

impl Hash for NodeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl PartialOrd for NodeRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({})", self.canonical)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl FromStr for NodeRef {
    type Err = GraphError;

    /// Parses `Type:Value`, splitting at the first `:`.
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((type_name, value)) if !type_name.is_empty() => Ok(Self::new(type_name, value)),
            _ => Err(GraphError::InvalidNodeRef(s.to_string())),
        }
    }
}

/// A plain entity backed by a member map.
///
/// Handy for hosts that do not have their own domain types and for wiring
/// rules from configuration.
#[derive(Debug, Clone)]
pub struct Record {
    type_name: String,
    id: String,
    members: HashMap<String, Value>,
}

impl Record {
    pub fn new(type_name: impl Into<String>, id: impl ToString) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.to_string(),
            members: HashMap::new(),
        }
    }

    /// Builder-style member assignment.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.members.insert(name.into(), value.into());
    }

    pub fn into_value(self) -> Value {
        Value::entity(self)
    }
}

impl Entity for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn member(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::Text(self.id.clone())),
            _ => self.members.get(name).cloned(),
        }
    }
}
