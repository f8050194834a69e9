use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::Value;

#[derive(Clone)]
pub struct ValueService {
    values: Arc<RwLock<BTreeMap<u64, String>>>,
}

impl Default for ValueService {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueService {
    /// Seeded with `value1` and `value2`.
    pub fn new() -> Self {
        let values = BTreeMap::from([(1, "value1".to_string()), (2, "value2".to_string())]);
        Self {
            values: Arc::new(RwLock::new(values)),
        }
    }

    pub async fn list(&self) -> Vec<Value> {
        self.values
            .read()
            .await
            .iter()
            .map(|(id, value)| Value {
                id: *id,
                value: value.clone(),
            })
            .collect()
    }

    pub async fn get(&self, id: u64) -> Option<Value> {
        self.values.read().await.get(&id).map(|value| Value {
            id,
            value: value.clone(),
        })
    }

    pub async fn create(&self, value: String) -> Value {
        let mut values = self.values.write().await;
        let id = values.last_key_value().map_or(1, |(id, _)| id + 1);
        values.insert(id, value.clone());
        Value { id, value }
    }

    /// Insert or replace the value at `id`.
    pub async fn put(&self, id: u64, value: String) -> Value {
        self.values.write().await.insert(id, value.clone());
        Value { id, value }
    }

    /// Returns whether a value was removed.
    pub async fn delete(&self, id: u64) -> bool {
        self.values.write().await.remove(&id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ids_continue_after_the_highest() {
        let service = ValueService::new();
        assert_eq!(service.create("three".into()).await.id, 3);
        assert!(service.delete(1).await);
        assert!(!service.delete(1).await);
        assert_eq!(service.create("four".into()).await.id, 4);
        service.put(10, "ten".into()).await;
        assert_eq!(service.create("eleven".into()).await.id, 11);
    }
}
