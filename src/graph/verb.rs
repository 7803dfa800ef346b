use std::fmt;
use std::str::FromStr;

use crate::error::{GraphError, Result};

/// Which side of an edge a verb key is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// `>`: this node did the verb to the members
    Forward,
    /// `<`: the members did the verb to this node
    Reverse,
}

impl Direction {
    pub fn marker(self) -> char {
        match self {
            Direction::Forward => '>',
            Direction::Reverse => '<',
        }
    }

    pub fn flip(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

/// Whether `verb` can be used as verb text in a store key.
///
/// Keys are `{node}:{marker}{verb}` and node values may contain `:`, so the
/// verb must be non-empty, free of `:` and must not begin with a marker.
pub fn is_verb_text(verb: &str) -> bool {
    !verb.is_empty() && !verb.contains(':') && !verb.starts_with(['>', '<'])
}

/// A verb with its direction marker, e.g. `>Purchased`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirectedVerb {
    direction: Direction,
    verb: String,
}

impl DirectedVerb {
    pub fn forward(verb: impl Into<String>) -> Self {
        Self { direction: Direction::Forward, verb: verb.into() }
    }

    pub fn reverse(verb: impl Into<String>) -> Self {
        Self { direction: Direction::Reverse, verb: verb.into() }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Same verb text, opposite marker.
    pub fn flipped(&self) -> Self {
        Self { direction: self.direction.flip(), verb: self.verb.clone() }
    }

    /// Parse a whole verb list, failing on the first malformed entry.
    pub fn parse_all<S: AsRef<str>>(verbs: &[S]) -> Result<Vec<Self>> {
        verbs.iter().map(|v| v.as_ref().parse()).collect()
    }
}

impl fmt::Display for DirectedVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.direction.marker(), self.verb)
    }
}

impl FromStr for DirectedVerb {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        let (direction, verb) = if let Some(rest) = s.strip_prefix('>') {
            (Direction::Forward, rest)
        } else if let Some(rest) = s.strip_prefix('<') {
            (Direction::Reverse, rest)
        } else {
            return Err(GraphError::InvalidVerbDirection(s.to_string()));
        };
        if !is_verb_text(verb) {
            return Err(GraphError::InvalidVerbDirection(s.to_string()));
        }
        Ok(Self { direction, verb: verb.to_string() })
    }
}
