//! Session state storage.

use chrono::Utc;
use dashmap::DashMap;
use std::time::Duration;
use tracing::debug;

use crate::error::ServiceResult;

use super::StoredState;

/// Keyed storage for session state
pub trait StateStore: Send + Sync {
    /// Look up a live state. Expired states are reported as missing.
    fn get_state(&self, id: &str) -> ServiceResult<Option<StoredState>>;

    /// Insert or replace the state under its own id
    fn put_state(&self, state: StoredState) -> ServiceResult<()>;

    /// Atomically remove and return a live state
    fn take_state(&self, id: &str) -> ServiceResult<Option<StoredState>>;

    /// Drop every expired state, returning how many were removed
    fn purge_expired(&self) -> usize;

    /// Number of states currently held
    fn len(&self) -> usize;
}

/// In-process state store
pub struct MemoryStateStore {
    states: DashMap<String, StoredState>,
    ttl: Duration,
}

impl MemoryStateStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            states: DashMap::new(),
            ttl,
        }
    }

    fn is_expired(&self, state: &StoredState) -> bool {
        let age = Utc::now().signed_duration_since(state.lti().created_at);
        age.to_std().is_ok_and(|age| age > self.ttl)
    }
}

impl StateStore for MemoryStateStore {
    fn get_state(&self, id: &str) -> ServiceResult<Option<StoredState>> {
        let state = match self.states.get(id) {
            Some(entry) => entry.value().clone(),
            None => return Ok(None),
        };

        if self.is_expired(&state) {
            debug!(state_id = %id, "Dropping expired state");
            self.states.remove(id);
            return Ok(None);
        }

        Ok(Some(state))
    }

    fn put_state(&self, state: StoredState) -> ServiceResult<()> {
        debug!(state_id = %state.id(), kind = state.kind(), "Storing state");
        self.states.insert(state.id().to_string(), state);
        Ok(())
    }

    fn take_state(&self, id: &str) -> ServiceResult<Option<StoredState>> {
        Ok(self
            .states
            .remove(id)
            .map(|(_, state)| state)
            .filter(|state| !self.is_expired(state)))
    }

    fn purge_expired(&self) -> usize {
        let before = self.states.len();
        self.states.retain(|_, state| !self.is_expired(state));
        before.saturating_sub(self.states.len())
    }

    fn len(&self) -> usize {
        self.states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{DemoState, LtiState};

    fn pending() -> StoredState {
        StoredState::Pending(LtiState::new(
            "https://lms.example.edu".to_string(),
            "client".to_string(),
            None,
        ))
    }

    fn aged(mut state: StoredState, secs: i64) -> StoredState {
        let created_at = Utc::now() - chrono::Duration::seconds(secs);
        match &mut state {
            StoredState::Pending(lti) => lti.created_at = created_at,
            StoredState::Demo(demo) => demo.lti.created_at = created_at,
        }
        state
    }

    #[test]
    fn test_put_and_get() {
        let store = MemoryStateStore::new(Duration::from_secs(60));
        let state = pending();
        let id = state.id().to_string();

        store.put_state(state.clone()).unwrap();
        assert_eq!(store.get_state(&id).unwrap(), Some(state));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_id() {
        let store = MemoryStateStore::new(Duration::from_secs(60));
        assert_eq!(store.get_state("never-stored").unwrap(), None);
    }

    #[test]
    fn test_put_replaces_variant() {
        let store = MemoryStateStore::new(Duration::from_secs(60));
        let state = pending();
        let id = state.id().to_string();
        store.put_state(state.clone()).unwrap();

        let StoredState::Pending(lti) = state else {
            panic!("Expected pending state");
        };
        store
            .put_state(StoredState::Demo(DemoState::new(lti)))
            .unwrap();

        let stored = store.get_state(&id).unwrap().unwrap();
        assert_eq!(stored.kind(), "demo");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_take_removes() {
        let store = MemoryStateStore::new(Duration::from_secs(60));
        let state = pending();
        let id = state.id().to_string();
        store.put_state(state).unwrap();

        assert!(store.take_state(&id).unwrap().is_some());
        assert!(store.take_state(&id).unwrap().is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_expired_state_is_missing() {
        let store = MemoryStateStore::new(Duration::from_secs(60));
        let state = aged(pending(), 120);
        let id = state.id().to_string();
        store.put_state(state).unwrap();

        assert_eq!(store.get_state(&id).unwrap(), None);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_purge_expired() {
        let store = MemoryStateStore::new(Duration::from_secs(60));
        store.put_state(aged(pending(), 120)).unwrap();
        store.put_state(aged(pending(), 90)).unwrap();
        let fresh = pending();
        let fresh_id = fresh.id().to_string();
        store.put_state(fresh).unwrap();

        assert_eq!(store.purge_expired(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get_state(&fresh_id).unwrap().is_some());
    }
}
