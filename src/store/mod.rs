//! Set-oriented key/value storage and the symmetric edge index built on it.
//!
//! Every edge `(from, verb, to)` is two set memberships:
//! `to ∈ "{from}:>{verb}"` and `from ∈ "{to}:<{verb}"`. [`EdgeStore::put`] is
//! the only write path and always issues both halves in a single backend call.

mod memory;
mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{GraphError, Result};
use crate::graph::{is_verb_text, DirectedVerb, NodeRef};

/// Contract of the backing set store.
///
/// Implementations must give set semantics: adding an existing member is a
/// no-op and reading an absent key yields an empty set.
#[async_trait]
pub trait SetBackend: Send + Sync {
    /// Short name used in logs.
    fn backend_name(&self) -> &'static str;

    /// Add every `(key, member)` pair. Either all pairs are written or an
    /// error is returned.
    async fn add_members(&self, entries: Vec<(String, String)>) -> Result<()>;

    async fn add_member(&self, key: String, member: String) -> Result<()> {
        self.add_members(vec![(key, member)]).await
    }

    async fn members(&self, key: &str) -> Result<BTreeSet<String>>;

    /// Read several sets in one round-trip where the backend allows it.
    /// Results are returned in the order of `keys`.
    async fn members_batch(&self, keys: &[String]) -> Result<Vec<BTreeSet<String>>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            out.push(self.members(key).await?);
        }
        Ok(out)
    }
}

/// Forward/reverse adjacency maintenance over a [`SetBackend`].
#[derive(Clone)]
pub struct EdgeStore {
    backend: Arc<dyn SetBackend>,
}

impl EdgeStore {
    pub fn new(backend: Arc<dyn SetBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn SetBackend> {
        &self.backend
    }

    /// Store key of a node's adjacency set: `"{node}:{marker}{verb}"`.
    pub fn adjacency_key(node: &str, verb: &DirectedVerb) -> String {
        format!("{}:{}", node, verb)
    }

    /// Record the edge `from --verb--> to`. Idempotent.
    ///
    /// Verbs that could alias another node's key are rejected before any write.
    pub async fn put(&self, from: &NodeRef, verb: &str, to: &NodeRef) -> Result<()> {
        if !is_verb_text(verb) {
            return Err(GraphError::InvalidConfiguration(format!(
                "verb {:?} for edge {} -> {} must be non-empty, without ':' or a leading '>'/'<'",
                verb, from, to
            )));
        }

        let forward_key = Self::adjacency_key(from.canonical(), &DirectedVerb::forward(verb));
        let reverse_key = Self::adjacency_key(to.canonical(), &DirectedVerb::reverse(verb));
        log::debug!(
            "Edge via {}: {} += {}, {} += {}",
            self.backend.backend_name(),
            forward_key,
            to,
            reverse_key,
            from
        );

        self.backend
            .add_members(vec![
                (forward_key, to.canonical().to_string()),
                (reverse_key, from.canonical().to_string()),
            ])
            .await
    }

    /// Members of `node`'s adjacency set for one directed verb.
    pub async fn members(&self, node: &str, verb: &DirectedVerb) -> Result<BTreeSet<String>> {
        self.backend.members(&Self::adjacency_key(node, verb)).await
    }

    /// One hop for a whole frontier; results align with `nodes`.
    pub async fn expand<S: AsRef<str>>(
        &self,
        nodes: &[S],
        verb: &DirectedVerb,
    ) -> Result<Vec<BTreeSet<String>>> {
        if nodes.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = nodes
            .iter()
            .map(|n| Self::adjacency_key(n.as_ref(), verb))
            .collect();
        self.backend.members_batch(&keys).await
    }
}
