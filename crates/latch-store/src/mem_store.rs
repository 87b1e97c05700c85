use crate::{ActionStore, PendingUpdate, PendingUpdateFn, StoreError, StoreResult};
use latch_types::{DeferredAction, TargetRef, Timestamp, Token};
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

#[derive(Clone, Default)]
pub struct MemStore {
    records: Arc<RwLock<HashMap<String, DeferredAction>>>,
}

impl std::fmt::Debug for MemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemStore")
            .field("records", &self.records.read().unwrap().len())
            .finish()
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActionStore for MemStore {
    fn insert(&self, record: DeferredAction) -> StoreResult<()> {
        let mut guard = self.records.write().unwrap();
        if guard.contains_key(record.token.as_str()) {
            return Err(StoreError::TokenExists {
                token: record.token,
            });
        }
        guard.insert(record.token.as_str().to_owned(), record);
        Ok(())
    }

    fn get(&self, token: &Token) -> StoreResult<Option<DeferredAction>> {
        Ok(self.records.read().unwrap().get(token.as_str()).cloned())
    }

    fn contains(&self, token: &Token) -> StoreResult<bool> {
        Ok(self.records.read().unwrap().contains_key(token.as_str()))
    }

    fn count_pending(&self, target: &TargetRef, now: Timestamp) -> StoreResult<usize> {
        let guard = self.records.read().unwrap();
        Ok(guard
            .values()
            .filter(|record| record.target.as_ref() == Some(target) && record.is_pending(now))
            .count())
    }

    fn update_pending(
        &self,
        token: &Token,
        apply: PendingUpdateFn<'_>,
    ) -> StoreResult<Option<DeferredAction>> {
        // Write lock held across the callback: concurrent confirms serialize
        // here, the loser sees confirmed == true and falls out with None.
        let mut guard = self.records.write().unwrap();
        let Some(record) = guard.get_mut(token.as_str()) else {
            return Ok(None);
        };
        if record.confirmed {
            return Ok(None);
        }
        if apply(record) == PendingUpdate::Confirm {
            record.confirmed = true;
        }
        Ok(Some(record.clone()))
    }
}
