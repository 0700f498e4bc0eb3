use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use super::session::ReviewSession;

/// Review sessions isolated by id; each caller works on its own entry
#[derive(Default)]
pub struct SessionStore {
    sessions: HashMap<Uuid, ReviewSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: ReviewSession) -> Uuid {
        let id = session.id;
        debug!(session_id = %id, "Stored review session");
        self.sessions.insert(id, session);
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<&ReviewSession> {
        self.sessions.get(id)
    }

    /// Swap in a newer revision of a stored session, returning the one it superseded
    pub fn replace(&mut self, session: ReviewSession) -> Option<ReviewSession> {
        debug!(session_id = %session.id, revision = session.revision, "Replaced review session");
        self.sessions.insert(session.id, session)
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<ReviewSession> {
        self.sessions.remove(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::InMemoryStorage;
    use crate::test_support::record;

    #[test]
    fn sessions_for_the_same_code_stay_isolated() {
        let storage = InMemoryStorage::new(vec![record("10060", 30.0, 20.0, 2.0)], vec![], vec![], vec![], vec![]);
        let mut store = SessionStore::new();
        let a = store.insert(ReviewSession::start(&storage, &Config::default(), "10060").unwrap());
        let b = store.insert(ReviewSession::start(&storage, &Config::default(), "10060").unwrap());
        assert_ne!(a, b);

        let mut proposed = store.get(&a).unwrap().proposed;
        proposed.ruc.work = 3.0;
        let updated = store.get(&a).unwrap().with_proposed(proposed);
        let previous = store.replace(updated).unwrap();

        assert_eq!(previous.revision, 0);
        assert_eq!(store.get(&a).unwrap().proposed.ruc.work, 3.0);
        assert_eq!(store.get(&b).unwrap().proposed.ruc.work, 2.0);
        assert!(store.remove(&b).is_some());
        assert_eq!(store.len(), 1);
    }
}
