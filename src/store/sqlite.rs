use std::collections::BTreeSet;

use async_trait::async_trait;
use rusqlite::params;

use super::SetBackend;
use crate::db::{migrate, Db};
use crate::error::{GraphError, Result};

/// Set store persisted in SQLite (`member_sets` table).
///
/// `namespace` plays the role of a logical database number: graphs in
/// different namespaces share the file but never see each other's sets.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    db: Db,
    namespace: i64,
}

/// Failures while serving a set operation are reported as the backend being unavailable.
fn unavailable(err: GraphError) -> GraphError {
    match err {
        GraphError::Database(e) => GraphError::BackendUnavailable(format!("sqlite: {}", e)),
        other => other,
    }
}

impl SqliteBackend {
    /// Open the store at `db`, applying pending migrations.
    pub async fn open(db: Db, namespace: i64) -> Result<Self> {
        db.with_connection(|conn| migrate::run_migrations(conn)).await?;
        log::info!(
            "SQLite set store ready at {} (namespace {})",
            db.path().display(),
            namespace
        );
        Ok(Self { db, namespace })
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn namespace(&self) -> i64 {
        self.namespace
    }
}

#[async_trait]
impl SetBackend for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn add_members(&self, entries: Vec<(String, String)>) -> Result<()> {
        let namespace = self.namespace;
        self.db
            .with_connection(move |conn| {
                // One transaction: both halves of an edge land together or not at all
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare_cached(
                        "INSERT OR IGNORE INTO member_sets (namespace, set_key, member) \
                         VALUES (?1, ?2, ?3)",
                    )?;
                    for (key, member) in &entries {
                        stmt.execute(params![namespace, key, member])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(unavailable)
    }

    async fn members(&self, key: &str) -> Result<BTreeSet<String>> {
        let mut sets = self.members_batch(&[key.to_string()]).await?;
        Ok(sets.pop().unwrap_or_default())
    }

    async fn members_batch(&self, keys: &[String]) -> Result<Vec<BTreeSet<String>>> {
        let namespace = self.namespace;
        let keys = keys.to_vec();
        self.db
            .with_connection(move |conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT member FROM member_sets WHERE namespace = ?1 AND set_key = ?2",
                )?;
                let mut out = Vec::with_capacity(keys.len());
                for key in &keys {
                    let members = stmt
                        .query_map(params![namespace, key], |row| row.get::<_, String>(0))?
                        .collect::<std::result::Result<BTreeSet<_>, rusqlite::Error>>()?;
                    out.push(members);
                }
                Ok(out)
            })
            .await
            .map_err(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeRef;
    use crate::store::EdgeStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn open_backend(temp_dir: &TempDir, namespace: i64) -> SqliteBackend {
        let db = Db::new(temp_dir.path().join("graph.db"));
        SqliteBackend::open(db, namespace).await.unwrap()
    }

    #[tokio::test]
    async fn test_add_and_read_members() {
        let temp_dir = TempDir::new().unwrap();
        let backend = open_backend(&temp_dir, 0).await;

        backend.add_member("User:1:>Purchased".to_string(), "Item:1".to_string()).await.unwrap();
        backend.add_member("User:1:>Purchased".to_string(), "Item:4".to_string()).await.unwrap();
        backend.add_member("User:1:>Purchased".to_string(), "Item:1".to_string()).await.unwrap();

        let members = backend.members("User:1:>Purchased").await.unwrap();
        assert_eq!(
            members,
            BTreeSet::from(["Item:1".to_string(), "Item:4".to_string()])
        );
        assert!(backend.members("User:2:>Purchased").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edges_persist_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = EdgeStore::new(Arc::new(open_backend(&temp_dir, 13).await));
            store
                .put(&NodeRef::new("User", "1"), "Purchased", &NodeRef::new("Item", "1"))
                .await
                .unwrap();
        }

        let reopened = open_backend(&temp_dir, 13).await;
        let reverse = reopened.members("Item:1:<Purchased").await.unwrap();
        assert!(reverse.contains("User:1"));
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let ns_a = open_backend(&temp_dir, 1).await;
        let ns_b = open_backend(&temp_dir, 2).await;

        ns_a.add_member("k".to_string(), "a".to_string()).await.unwrap();

        assert_eq!(ns_a.members("k").await.unwrap().len(), 1);
        assert!(ns_b.members("k").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_read_matches_single_reads() {
        let temp_dir = TempDir::new().unwrap();
        let backend = open_backend(&temp_dir, 0).await;
        backend
            .add_members(vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
                ("b".to_string(), "3".to_string()),
            ])
            .await
            .unwrap();

        let keys = vec!["b".to_string(), "missing".to_string(), "a".to_string()];
        let sets = backend.members_batch(&keys).await.unwrap();
        assert_eq!(sets.len(), 3);
        assert_eq!(sets[0].len(), 2);
        assert!(sets[1].is_empty());
        assert_eq!(sets[2], backend.members("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_schema_reports_backend_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        // Bypass open() so the table is never created
        let backend = SqliteBackend {
            db: Db::new(temp_dir.path().join("bare.db")),
            namespace: 0,
        };
        let err = backend.members("k").await.unwrap_err();
        assert!(matches!(err, GraphError::BackendUnavailable(_)));
    }
}
