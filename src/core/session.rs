//! Session store: one isolated controller per live call
//!
//! Implementations must be safe to share between tasks. Controllers are
//! handed out as `Arc<Mutex<_>>`, so turns of one call are serialized while
//! different calls proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

use crate::core::controller::TurnController;
use crate::error::{CallbotError, Result};

pub type SharedController = Arc<Mutex<TurnController>>;

pub trait SessionStore: Send + Sync {
    /// Fails with `SessionExists` if the id is taken; the rejected
    /// controller is hung up so its interaction is closed
    fn create(&self, session_id: &str, controller: TurnController) -> Result<SharedController>;

    fn get(&self, session_id: &str) -> Option<SharedController>;

    fn remove(&self, session_id: &str) -> Option<SharedController>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SharedController>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, session_id: &str, controller: TurnController) -> Result<SharedController> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        if sessions.contains_key(session_id) {
            drop(sessions);
            let mut rejected = controller;
            rejected.hang_up();
            return Err(CallbotError::SessionExists(session_id.to_string()));
        }
        let shared = Arc::new(Mutex::new(controller));
        sessions.insert(session_id.to_string(), Arc::clone(&shared));
        Ok(shared)
    }

    fn get(&self, session_id: &str) -> Option<SharedController> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.get(session_id).cloned()
    }

    fn remove(&self, session_id: &str) -> Option<SharedController> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(session_id)
    }

    fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::controller::{Collaborators, ControllerSettings, TurnInput};
    use crate::core::engine::DecisionEngine;
    use crate::core::store::SqliteStore;
    use crate::types::CallState;

    fn controller(id: &str, store: &Arc<SqliteStore>) -> TurnController {
        TurnController::new(
            id,
            Arc::new(DecisionEngine::with_defaults()),
            Collaborators::with_store(Arc::clone(store)),
            ControllerSettings::default(),
        )
    }

    #[test]
    fn test_create_get_remove() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let sessions = InMemorySessionStore::new();
        sessions.create("a", controller("a", &store)).unwrap();
        assert_eq!(sessions.len(), 1);
        assert!(sessions.get("a").is_some());
        assert!(sessions.get("b").is_none());
        assert!(sessions.remove("a").is_some());
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let sessions = InMemorySessionStore::new();
        sessions.create("a", controller("a", &store)).unwrap();

        let rejected = controller("a", &store);
        let rejected_interaction = rejected.conversation().interaction_id.clone().unwrap();
        let err = sessions.create("a", rejected).err().unwrap();
        assert!(matches!(err, CallbotError::SessionExists(id) if id == "a"));

        // the losing controller does not leave an open interaction behind
        let row = store.interaction(&rejected_interaction).unwrap().unwrap();
        assert_eq!(row.status, "abandoned");
        assert!(row.ended_at.is_some());
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let sessions = InMemorySessionStore::new();
        let a = sessions.create("a", controller("a", &store)).unwrap();
        let b = sessions.create("b", controller("b", &store)).unwrap();

        let out = tokio::task::spawn_blocking(move || a.blocking_lock().handle_turn(&TurnInput::text("au revoir")))
            .await
            .unwrap();
        assert_eq!(out.state, CallState::FeedbackPending);

        let b = b.lock().await;
        assert_eq!(b.state(), CallState::AwaitingInput);
        assert_eq!(b.conversation().turn_number(), 0);
        assert!(!b.conversation().has_said_goodbye);
    }
}
