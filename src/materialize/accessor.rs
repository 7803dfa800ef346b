//! Accessor dispatch: how a rule reaches a value from a triggering instance.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{GraphError, Result};
use crate::graph::{Entity, Value};

/// A function computing a value from the triggering instance.
pub type Callable = Arc<dyn Fn(&Arc<dyn Entity>) -> Result<Value> + Send + Sync>;

/// Callables addressable by name from configuration.
pub type CallableTable = HashMap<String, Callable>;

/// Where a rule gets a source, target, verb or guard value from.
#[derive(Clone)]
pub enum Accessor {
    /// A named member of the instance.
    Member(String),
    /// A member path evaluated against the instance, see [`Accessor::resolve`].
    Expression(String),
    /// A function of the instance.
    Callable(Callable),
    /// A callable looked up by name when the rule fires.
    NamedCallable(String),
    /// A fixed value, independent of the instance.
    Literal(Value),
}

impl Accessor {
    pub fn member(name: impl Into<String>) -> Self {
        Accessor::Member(name.into())
    }

    pub fn expression(expr: impl Into<String>) -> Self {
        Accessor::Expression(expr.into())
    }

    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(&Arc<dyn Entity>) -> Result<Value> + Send + Sync + 'static,
    {
        Accessor::Callable(Arc::new(f))
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Accessor::Literal(value.into())
    }

    /// Resolve against `instance`.
    ///
    /// Expressions are a member path with optional `!` negation:
    /// `self`, `order.user`, `self.order.user`, `!archived`.
    pub fn resolve(&self, instance: &Arc<dyn Entity>, callables: &CallableTable) -> Result<Value> {
        match self {
            Accessor::Member(name) => read_member(&Value::Entity(instance.clone()), name),
            Accessor::Expression(expr) => evaluate_expression(expr, instance),
            Accessor::Callable(f) => f(instance),
            Accessor::NamedCallable(name) => match callables.get(name) {
                Some(f) => f(instance),
                None => Err(GraphError::UnsupportedAccessorKind(format!(
                    "no callable registered under {:?}",
                    name
                ))),
            },
            Accessor::Literal(value) => Ok(value.clone()),
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Member(name) => write!(f, "Member({})", name),
            Accessor::Expression(expr) => write!(f, "Expression({:?})", expr),
            Accessor::Callable(_) => f.write_str("Callable(..)"),
            Accessor::NamedCallable(name) => write!(f, "NamedCallable({})", name),
            Accessor::Literal(value) => write!(f, "Literal({:?})", value),
        }
    }
}

fn read_member(target: &Value, name: &str) -> Result<Value> {
    let unknown = || GraphError::UnknownMember {
        type_name: target.type_name().to_string(),
        member: name.to_string(),
    };
    match target {
        Value::Entity(entity) => entity.member(name).ok_or_else(unknown),
        _ => Err(unknown()),
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn evaluate_expression(expr: &str, instance: &Arc<dyn Entity>) -> Result<Value> {
    let trimmed = expr.trim();
    let path = trimmed.trim_start_matches('!');
    let negations = trimmed.len() - path.len();
    let path = path.trim();

    let segments: Vec<&str> = path.split('.').map(str::trim).collect();
    if segments.iter().any(|s| !is_identifier(s)) {
        return Err(GraphError::UnsupportedAccessorKind(format!(
            "expression {:?} is not a member path",
            expr
        )));
    }

    let mut current = Value::Entity(instance.clone());
    for (i, segment) in segments.iter().enumerate() {
        if i == 0 && *segment == "self" {
            continue;
        }
        current = read_member(&current, segment)?;
    }

    if negations == 0 {
        Ok(current)
    } else {
        let truthy = current.is_truthy();
        Ok(Value::Bool(if negations % 2 == 0 { truthy } else { !truthy }))
    }
}
