//! Session store shared by all request handlers.

use crate::types::{SessionHandle, SessionLookup};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use notewise_core::{AppError, AppResult, CallContext, MissingSessionPolicy};
use notewise_knowledge::{Answer, GenerationEngine};
use notewise_prompt::Turn;
use std::sync::Arc;

/// Longest session id accepted from a client.
const MAX_SESSION_ID_LEN: usize = 128;

/// Maps session ids to sessions and runs chats against the shared
/// [`GenerationEngine`].
///
/// Lookups on different ids never block each other; chats on the same id
/// are serialised by the session's conversation lock.
pub struct SessionManager {
    sessions: DashMap<String, Arc<SessionHandle>>,
    engine: Arc<GenerationEngine>,
    on_missing: MissingSessionPolicy,
}

impl SessionManager {
    pub fn new(engine: Arc<GenerationEngine>, on_missing: MissingSessionPolicy) -> Self {
        Self {
            sessions: DashMap::new(),
            engine,
            on_missing,
        }
    }

    pub fn policy(&self) -> MissingSessionPolicy {
        self.on_missing
    }

    /// Start a session for `user_id` and return its id.
    ///
    /// Ids are 128 random bits in hex.
    pub fn create_session(&self, user_id: &str) -> String {
        loop {
            let id = format!("{:032x}", rand::random::<u128>());
            match self.sessions.entry(id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(Arc::new(SessionHandle::new(id.clone(), user_id)));
                    tracing::info!(session = %id, user = %user_id, "Created session");
                    return id;
                }
                Entry::Occupied(_) => {
                    tracing::warn!(session = %id, "Session id collision, retrying");
                }
            }
        }
    }

    /// Look up `session_id` for `user_id` under the given policy.
    ///
    /// Fails with [`AppError::Forbidden`] when the session belongs to someone
    /// else and with [`AppError::SessionNotFound`] when it is unknown and the
    /// policy is [`MissingSessionPolicy::Reject`].
    pub fn resolve(
        &self,
        session_id: &str,
        user_id: &str,
        policy: MissingSessionPolicy,
    ) -> AppResult<SessionLookup> {
        validate_session_id(session_id)?;

        match self.sessions.entry(session_id.to_string()) {
            Entry::Occupied(existing) => {
                let handle = existing.get();
                if handle.owner() != user_id {
                    tracing::warn!(
                        session = %session_id,
                        user = %user_id,
                        "Session requested by a user who does not own it"
                    );
                    return Err(AppError::Forbidden(
                        "session belongs to another user".to_string(),
                    ));
                }
                Ok(SessionLookup::Found(handle.clone()))
            }
            Entry::Vacant(slot) => match policy {
                MissingSessionPolicy::Reject => {
                    Err(AppError::SessionNotFound(session_id.to_string()))
                }
                MissingSessionPolicy::Recreate => {
                    tracing::warn!(
                        session = %session_id,
                        user = %user_id,
                        "Unknown session, starting a fresh conversation"
                    );
                    let handle = Arc::new(SessionHandle::new(session_id, user_id));
                    slot.insert(handle.clone());
                    Ok(SessionLookup::Recreated(handle))
                }
            },
        }
    }

    /// [`SessionManager::resolve`] under the configured policy.
    pub fn get_or_create(&self, session_id: &str, user_id: &str) -> AppResult<SessionLookup> {
        self.resolve(session_id, user_id, self.on_missing)
    }

    /// Answer `message` within the session, recording the exchange in its
    /// history.
    pub async fn chat(
        &self,
        session_id: &str,
        user_id: &str,
        message: &str,
        ctx: &CallContext,
    ) -> AppResult<Answer> {
        let handle = self.get_or_create(session_id, user_id)?.into_handle();

        let mut conversation = ctx
            .run("session lock", async { Ok(handle.conversation.lock().await) })
            .await?;
        self.engine.answer(&mut conversation, message, ctx).await
    }

    /// Snapshot of a session's turns.
    pub async fn history(&self, session_id: &str) -> Option<Vec<Turn>> {
        let handle = self.sessions.get(session_id).map(|entry| entry.value().clone())?;
        let conversation = handle.conversation.lock().await;
        Some(conversation.turns().to_vec())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn validate_session_id(session_id: &str) -> AppResult<()> {
    if session_id.is_empty() || session_id.len() > MAX_SESSION_ID_LEN {
        return Err(AppError::BadRequest(format!(
            "session_id must be 1 to {} characters",
            MAX_SESSION_ID_LEN
        )));
    }
    if session_id.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(AppError::BadRequest(
            "session_id must not contain whitespace or control characters".to_string(),
        ));
    }
    Ok(())
}
