pub mod config;
pub mod error;
pub mod db;
pub mod graph;
pub mod store;
pub mod materialize;
pub mod registry;
pub mod grapher;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{GraphError, Result};
pub use graph::{DirectedVerb, Direction, Entity, NodeRef, Record, Value};
pub use grapher::Grapher;
pub use materialize::{Accessor, EdgeRule, LifecycleEvent, Trigger};
pub use registry::GraphRegistry;
pub use store::{EdgeStore, MemoryBackend, SetBackend, SqliteBackend};
