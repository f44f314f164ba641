use crate::cache::SessionCache;
use crate::handle::ModelHandle;
use ground_llm::traits::ConversationTurn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Active,
}

/// One running conversation. Owns its model handle (and thus its cache) and
/// its history; only the controller mutates either.
#[derive(Debug)]
pub struct ChatSession {
    id: Uuid,
    pub(crate) handle: Option<ModelHandle>,
    pub(crate) history: Vec<ConversationTurn>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            handle: None,
            history: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        match self.handle {
            Some(_) => SessionState::Active,
            None => SessionState::Uninitialized,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn cache(&self) -> Option<&SessionCache> {
        self.handle.as_ref().map(ModelHandle::cache)
    }
}
