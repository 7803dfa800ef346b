use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::SetBackend;
use crate::error::{GraphError, Result};

type Sets = HashMap<String, BTreeSet<String>>;

/// Process-local set store.
///
/// Data lives only as long as the value; intended for tests and for hosts
/// that rebuild the graph on startup.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    sets: Mutex<Sets>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Sets>> {
        self.sets.lock().map_err(|_| {
            log::error!("Memory set store lock poisoned");
            GraphError::BackendUnavailable("memory set store lock poisoned".to_string())
        })
    }

    /// Number of non-empty sets.
    pub fn key_count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }
}

#[async_trait]
impl SetBackend for MemoryBackend {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn add_members(&self, entries: Vec<(String, String)>) -> Result<()> {
        let mut sets = self.lock()?;
        for (key, member) in entries {
            sets.entry(key).or_default().insert(member);
        }
        Ok(())
    }

    async fn members(&self, key: &str) -> Result<BTreeSet<String>> {
        Ok(self.lock()?.get(key).cloned().unwrap_or_default())
    }

    async fn members_batch(&self, keys: &[String]) -> Result<Vec<BTreeSet<String>>> {
        let sets = self.lock()?;
        Ok(keys
            .iter()
            .map(|key| sets.get(key).cloned().unwrap_or_default())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_add_and_read() {
        let backend = MemoryBackend::new();
        backend.add_member("k".to_string(), "a".to_string()).await.unwrap();
        backend.add_member("k".to_string(), "b".to_string()).await.unwrap();
        backend.add_member("k".to_string(), "a".to_string()).await.unwrap();

        let members = backend.members("k").await.unwrap();
        assert_eq!(members.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(backend.members("missing").await.unwrap().is_empty());
        assert_eq!(backend.key_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_adds_commute() {
        let backend = Arc::new(MemoryBackend::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let backend = backend.clone();
            handles.push(tokio::spawn(async move {
                backend
                    .add_members(vec![
                        ("shared".to_string(), format!("m{}", i % 4)),
                        (format!("own{}", i), "x".to_string()),
                    ])
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(backend.members("shared").await.unwrap().len(), 4);
        assert_eq!(backend.key_count().unwrap(), 17);
    }

    #[tokio::test]
    async fn test_members_batch_order() {
        let backend = MemoryBackend::new();
        backend.add_member("b".to_string(), "1".to_string()).await.unwrap();

        let sets = backend
            .members_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert!(sets[0].is_empty());
        assert!(sets[1].contains("1"));
    }
}
