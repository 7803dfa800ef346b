use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub traversal: TraversalConfig,
    /// Default verb sets per node type
    #[serde(default)]
    pub nodes: Vec<NodeVerbsConfig>,
    /// Edge rule tables, validated when the registry is built
    #[serde(default)]
    pub rules: Vec<toml::Table>,
}

/// Which set store backs the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sqlite,
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Logical database selector; graphs in different namespaces never mix
    #[serde(default)]
    pub namespace: i64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            db_path: default_db_path(),
            namespace: 0,
            log_level: default_log_level(),
        }
    }
}

/// Traversal defaults
#[derive(Debug, Clone, Deserialize)]
pub struct TraversalConfig {
    #[serde(default = "default_distance")]
    pub default_distance: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            default_distance: default_distance(),
        }
    }
}

/// `[[nodes]]` entry: verbs queried when no explicit verb set is given
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeVerbsConfig {
    #[serde(rename = "type")]
    pub type_name: String,
    pub verbs: Vec<String>,
}

fn default_backend() -> BackendKind {
    BackendKind::Sqlite
}

fn default_db_path() -> PathBuf {
    PathBuf::from("verbgraph.db")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_distance() -> usize {
    1
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in VERBGRAPH_CONFIG environment variable
    /// 2. ./verbgraph.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("VERBGRAPH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("verbgraph.toml"));

        Self::from_file(&config_path)
    }

    /// Load and validate a specific configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&config_str)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse and validate configuration text
    pub fn parse(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str)
            .context("Failed to parse configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.traversal.default_distance == 0 {
            anyhow::bail!("traversal.default_distance must be greater than 0");
        }

        if self.store.backend == BackendKind::Sqlite && self.store.db_path.as_os_str().is_empty() {
            anyhow::bail!("store.db_path must be set for the sqlite backend");
        }

        if let Some(node) = self.nodes.iter().find(|n| n.type_name.is_empty()) {
            anyhow::bail!("nodes entry with verbs {:?} has an empty type", node.verbs);
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.store.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const SAMPLE: &str = r#"
[store]
backend = "sqlite"
db_path = "./graph.db"
namespace = 13
log_level = "debug"

[traversal]
default_distance = 2

[[nodes]]
type = "User"
verbs = [">Purchased"]

[[rules]]
type = "OrderItem"
from = "user"
to = "item"
verb = "Purchased"
"#;

    #[test]
    fn test_parse_full() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.store.backend, BackendKind::Sqlite);
        assert_eq!(config.store.namespace, 13);
        assert_eq!(config.store.log_level, "debug");
        assert_eq!(config.traversal.default_distance, 2);
        assert_eq!(config.nodes[0].type_name, "User");
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.rules[0].get("verb").and_then(|v| v.as_str()), Some("Purchased"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.store.backend, BackendKind::Sqlite);
        assert_eq!(config.db_path(), Path::new("verbgraph.db"));
        assert_eq!(config.store.namespace, 0);
        assert_eq!(config.traversal.default_distance, 1);
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_zero_distance_rejected() {
        let err = Config::parse("[traversal]\ndefault_distance = 0").unwrap_err();
        assert!(err.to_string().contains("default_distance"));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(Config::parse("[store]\nbackend = \"redis\"").is_err());
    }

    #[test]
    fn test_node_entry_unknown_field_rejected() {
        assert!(Config::parse("[[nodes]]\ntype = \"User\"\nverbs = []\nfoo = 1").is_err());
    }

    #[test]
    fn test_config_load_from_env_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("custom.toml");
        fs::write(&config_path, SAMPLE).unwrap();

        let original = std::env::var("VERBGRAPH_CONFIG").ok();
        std::env::set_var("VERBGRAPH_CONFIG", &config_path);
        let config = Config::load();
        std::env::remove_var("VERBGRAPH_CONFIG");
        if let Some(v) = original {
            std::env::set_var("VERBGRAPH_CONFIG", v);
        }

        let config = config.unwrap();
        assert_eq!(config.store.namespace, 13);
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let original = std::env::var("VERBGRAPH_CONFIG").ok();
        std::env::set_var("VERBGRAPH_CONFIG", "nonexistent.toml");
        let config = Config::load();
        assert!(config.is_err());
        assert!(config.unwrap_err().to_string().contains("nonexistent.toml"));
        std::env::remove_var("VERBGRAPH_CONFIG");
        if let Some(v) = original {
            std::env::set_var("VERBGRAPH_CONFIG", v);
        }
    }
}
