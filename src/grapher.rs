//! Collaborator-facing entry points: lifecycle hook, edge writes and
//! neighbor queries with registry-driven defaults.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::{BackendKind, Config};
use crate::db::Db;
use crate::error::Result;
use crate::graph::{self, DirectedVerb, Entity, NodeRef};
use crate::materialize::{materialize, LifecycleEvent};
use crate::registry::GraphRegistry;
use crate::store::{EdgeStore, MemoryBackend, SetBackend, SqliteBackend};

/// The graph service a host application talks to.
///
/// Holds no graph state of its own: every call goes to the backend, so a
/// `Grapher` can be cloned and shared freely across tasks.
#[derive(Clone)]
pub struct Grapher {
    store: EdgeStore,
    registry: Arc<GraphRegistry>,
    default_distance: usize,
}

impl Grapher {
    pub fn new(backend: Arc<dyn SetBackend>, registry: GraphRegistry) -> Self {
        Self {
            store: EdgeStore::new(backend),
            registry: Arc::new(registry),
            default_distance: 1,
        }
    }

    /// Distance used when a query does not give one. Zero is ignored.
    pub fn with_default_distance(mut self, distance: usize) -> Self {
        if distance > 0 {
            self.default_distance = distance;
        }
        self
    }

    /// Open the configured backend and registry.
    ///
    /// `registry` is used as the base so programmatic callables and rules
    /// survive; configured rules and verbs are appended to it.
    pub async fn from_config(config: &Config, mut registry: GraphRegistry) -> Result<Self> {
        let backend: Arc<dyn SetBackend> = match config.store.backend {
            BackendKind::Sqlite => Arc::new(
                SqliteBackend::open(Db::new(config.db_path()), config.store.namespace).await?,
            ),
            BackendKind::Memory => {
                log::warn!("Using in-memory set store: edges are lost on exit");
                Arc::new(MemoryBackend::new())
            }
        };

        let configured = GraphRegistry::from_config(config)?;
        registry.merge(configured);

        Ok(Self::new(backend, registry).with_default_distance(config.traversal.default_distance))
    }

    pub fn store(&self) -> &EdgeStore {
        &self.store
    }

    pub fn registry(&self) -> &GraphRegistry {
        &self.registry
    }

    /// Lifecycle hook: run every rule of the instance's type whose trigger
    /// matches `event`. Returns the number of edges written.
    ///
    /// Rules run in registration order; the first error stops the rest.
    pub async fn on_entity_event(&self, event: LifecycleEvent, instance: &Arc<dyn Entity>) -> Result<usize> {
        let mut written = 0;
        for rule in self.registry.rules_for(instance.type_name()) {
            if !rule.trigger().fires_on(event) {
                continue;
            }
            if materialize(rule, instance, self.registry.callables(), &self.store).await? {
                written += 1;
            }
        }
        log::debug!(
            "{} event for {} wrote {} edge(s)",
            event,
            NodeRef::for_entity(instance.as_ref()),
            written
        );
        Ok(written)
    }

    /// Write one edge directly.
    pub async fn put_edge(&self, from: &NodeRef, verb: &str, to: &NodeRef) -> Result<()> {
        self.store.put(from, verb, to).await
    }

    pub async fn neighbors(
        &self,
        instance: &dyn Entity,
        verbs: Option<&[&str]>,
        distance: Option<usize>,
    ) -> Result<BTreeSet<String>> {
        self.neighbors_of(&NodeRef::for_entity(instance), verbs, distance).await
    }

    pub async fn ranked_neighbors(
        &self,
        instance: &dyn Entity,
        verbs: Option<&[&str]>,
        distance: Option<usize>,
    ) -> Result<Vec<(u64, String)>> {
        self.ranked_neighbors_of(&NodeRef::for_entity(instance), verbs, distance).await
    }

    /// Neighbors of a node given only by reference.
    ///
    /// Without explicit verbs, the verbs registered for the node's type are used.
    pub async fn neighbors_of(
        &self,
        node: &NodeRef,
        verbs: Option<&[&str]>,
        distance: Option<usize>,
    ) -> Result<BTreeSet<String>> {
        let verbs = self.query_verbs(node, verbs)?;
        graph::neighbors(&self.store, node, &verbs, distance.unwrap_or(self.default_distance)).await
    }

    pub async fn ranked_neighbors_of(
        &self,
        node: &NodeRef,
        verbs: Option<&[&str]>,
        distance: Option<usize>,
    ) -> Result<Vec<(u64, String)>> {
        let verbs = self.query_verbs(node, verbs)?;
        graph::ranked_neighbors(&self.store, node, &verbs, distance.unwrap_or(self.default_distance)).await
    }

    fn query_verbs(&self, node: &NodeRef, verbs: Option<&[&str]>) -> Result<Vec<DirectedVerb>> {
        match verbs {
            Some(verbs) => DirectedVerb::parse_all(verbs),
            None => Ok(self.registry.node_verbs(node.type_name()).to_vec()),
        }
    }
}
