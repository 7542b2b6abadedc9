//! # Session Controller
//!
//! Owns the active conversation and the archive it is saved into.
//!
//! The active conversation is bound to at most one archived session. Saving a
//! bound conversation rewrites that entry in place; saving an unbound one
//! prepends a new entry and binds it.

use chrono::Utc;
use expertbot_core::{Message, Session, SessionId};
use tracing::{debug, error, info, warn};

use crate::store::SessionStore;

pub struct SessionController {
    store: SessionStore,
    sessions: Vec<Session>,
    active: Vec<Message>,
    bound_id: Option<SessionId>,
    welcome: Message,
}

impl SessionController {
    /// Load the archive and start on a fresh conversation.
    pub async fn open(store: SessionStore) -> Self {
        let sessions = store.load().await;
        let welcome = Message::welcome();
        info!("Session controller opened with {} archived sessions", sessions.len());

        Self {
            store,
            sessions,
            active: vec![welcome.clone()],
            bound_id: None,
            welcome,
        }
    }

    /// Archive the current conversation if it has content, then start over.
    pub async fn start_new_session(&mut self) {
        if self.has_unsaved_content() {
            self.save_active().await;
        }
        self.reset_active();
        debug!("Started a new conversation");
    }

    /// Save the active conversation into the archive and persist.
    ///
    /// A conversation with no user message is never archived.
    pub async fn save_active(&mut self) {
        if !self.has_unsaved_content() || !self.active.iter().any(Message::is_user) {
            return;
        }

        let now = Utc::now();
        let messages = self.active.clone();

        let existing = self
            .bound_id
            .as_deref()
            .and_then(|id| self.sessions.iter().position(|s| s.id == id));

        match existing {
            Some(index) => {
                self.sessions[index].refresh(messages, now);
            }
            None => {
                if let Some(stale) = &self.bound_id {
                    warn!("Bound session {} is gone, archiving as a new entry", stale);
                }
                let session = Session::new(messages, now);
                debug!("Archived new session {}", session.id);
                self.bound_id = Some(session.id.clone());
                self.sessions.insert(0, session);
            }
        }

        self.persist().await;
    }

    /// Switch to an archived session. Returns `false` for an unknown id.
    pub async fn select_session(&mut self, id: &str) -> bool {
        if !self.sessions.iter().any(|s| s.id == id) {
            warn!("Cannot select unknown session {}", id);
            return false;
        }

        if self.bound_id.as_deref() != Some(id) && self.has_unsaved_content() {
            self.save_active().await;
        }

        let Some(session) = self.sessions.iter().find(|s| s.id == id) else {
            return false;
        };
        self.active = session.messages.clone();
        self.bound_id = Some(session.id.clone());
        debug!("Selected session {}", id);
        true
    }

    /// Remove an archived session. Deleting the bound session resets the
    /// active conversation.
    pub async fn delete_session(&mut self, id: &str) {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        if self.sessions.len() == before {
            debug!("Delete of unknown session {} ignored", id);
        }

        self.persist().await;

        if self.bound_id.as_deref() == Some(id) {
            self.reset_active();
        }
    }

    /// Append to the active conversation. Nothing is persisted.
    pub fn append_message(&mut self, message: Message) {
        self.active.push(message);
    }

    pub fn active_messages(&self) -> &[Message] {
        &self.active
    }

    /// Archived sessions, most recent first.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn bound_id(&self) -> Option<&str> {
        self.bound_id.as_deref()
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Most recent user-authored message in the active conversation.
    pub fn last_user_message(&self) -> Option<&Message> {
        self.active.iter().rev().find(|m| m.is_user())
    }

    /// Anything beyond the welcome message.
    pub fn has_unsaved_content(&self) -> bool {
        self.active.len() > 1
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    fn reset_active(&mut self) {
        self.active = vec![self.welcome.clone()];
        self.bound_id = None;
    }

    async fn persist(&self) {
        if let Err(e) = self.store.persist(&self.sessions).await {
            error!("Failed to persist chat history: {}", e);
        }
    }
}
