//! Session types.

use chrono::{DateTime, Utc};
use notewise_knowledge::Conversation;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One session: an owner and a conversation.
///
/// The conversation mutex is held for the whole of a chat call, so chats on
/// one session run one at a time.
#[derive(Debug)]
pub struct SessionHandle {
    id: String,
    owner: String,
    created_at: DateTime<Utc>,
    pub(crate) conversation: Mutex<Conversation>,
}

impl SessionHandle {
    pub(crate) fn new(id: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            created_at: Utc::now(),
            conversation: Mutex::new(Conversation::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// User id the session was created for. Never changes.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Outcome of looking up a session by id.
#[derive(Debug, Clone)]
pub enum SessionLookup {
    /// The session existed and belongs to the caller
    Found(Arc<SessionHandle>),

    /// The id was unknown; a fresh session with empty history was created
    /// under it for the caller
    Recreated(Arc<SessionHandle>),
}

impl SessionLookup {
    pub fn handle(&self) -> &Arc<SessionHandle> {
        match self {
            Self::Found(handle) | Self::Recreated(handle) => handle,
        }
    }

    pub fn into_handle(self) -> Arc<SessionHandle> {
        match self {
            Self::Found(handle) | Self::Recreated(handle) => handle,
        }
    }

    pub fn was_recreated(&self) -> bool {
        matches!(self, Self::Recreated(_))
    }
}
