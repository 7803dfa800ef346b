//! Verb-labeled relationship graph: node identity, directed verbs and
//! multi-hop neighbor traversal over an [`EdgeStore`](crate::store::EdgeStore).
//!
//! Nodes are addressed by their canonical `Type:Value` string and verbs carry a
//! `>` (forward) or `<` (reverse) direction marker when used in a query.

mod node;
mod traversal;
mod verb;

pub use node::{Entity, NodeRef, Record, Value};
pub use traversal::{checked_distance, neighbors, ranked_neighbors};
pub use verb::{is_verb_text, DirectedVerb, Direction};
