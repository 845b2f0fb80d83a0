use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use uuid::Uuid;

use super::{DocumentStore, StoreError};
use crate::pipeline::types::BlockId;

/// One `append_children` call as the store saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreCall {
    pub document_id: String,
    pub children: Vec<Value>,
}

/// In-memory document store. Records every call and can be scripted to fail
/// on a given call index (0-based). A failed call commits nothing.
#[derive(Default)]
pub struct MemoryStore {
    calls: Mutex<Vec<StoreCall>>,
    failures: Mutex<HashMap<usize, StoreError>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject call number `call` with a validation message.
    pub fn reject_at(self, call: usize, message: &str) -> Self {
        self.fail_at(call, StoreError::Rejected(message.to_string()))
    }

    pub fn fail_at(self, call: usize, error: StoreError) -> Self {
        lock(&self.failures).insert(call, error);
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.calls).clone()
    }

    /// Children committed to `document_id` across successful calls, in order.
    pub fn children_of(&self, document_id: &str) -> Vec<Value> {
        let failures = lock(&self.failures);
        lock(&self.calls)
            .iter()
            .enumerate()
            .filter(|(i, c)| c.document_id == document_id && !failures.contains_key(i))
            .flat_map(|(_, c)| c.children.iter().cloned())
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DocumentStore for MemoryStore {
    fn append_children(&self, document_id: &str, children: &[Value]) -> Result<Vec<BlockId>, StoreError> {
        let index = {
            let mut calls = lock(&self.calls);
            calls.push(StoreCall {
                document_id: document_id.to_string(),
                children: children.to_vec(),
            });
            calls.len() - 1
        };
        if let Some(error) = lock(&self.failures).get(&index) {
            return Err(error.clone());
        }
        Ok(children.iter().map(|_| BlockId(Uuid::new_v4().to_string())).collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn records_calls_and_assigns_ids() {
        let store = MemoryStore::new();
        let ids = store.append_children("doc", &[json!({"type": "divider"}), json!({})]).unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(store.calls().len(), 1);
        assert_eq!(store.children_of("doc").len(), 2);
        assert!(store.children_of("other").is_empty());
    }

    #[test]
    fn scripted_failure_commits_nothing() {
        let store = MemoryStore::new().fail_at(1, StoreError::Timeout { secs: 3 });
        store.append_children("doc", &[json!({"n": 1})]).unwrap();
        let err = store.append_children("doc", &[json!({"n": 2})]).unwrap_err();
        assert_eq!(err, StoreError::Timeout { secs: 3 });
        store.append_children("doc", &[json!({"n": 3})]).unwrap();
        assert_eq!(store.children_of("doc"), vec![json!({"n": 1}), json!({"n": 3})]);
    }
}
