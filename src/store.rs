//! Server-side credential storage keyed by session id.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::types::{AccessToken, RequestToken};

pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Where a session stands in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    RequestTokenObtained,
    Authenticated,
}

/// Everything the proxy remembers about one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionRecord {
    /// Pending until exchanged at the callback.
    pub request_token: Option<RequestToken>,
    pub access_token: Option<AccessToken>,
}

impl SessionRecord {
    /// An access token wins over a pending request token: a session that
    /// restarts the handshake keeps its credential until the new one lands.
    pub fn state(&self) -> SessionState {
        match (&self.request_token, &self.access_token) {
            (_, Some(_)) => SessionState::Authenticated,
            (Some(_), None) => SessionState::RequestTokenObtained,
            (None, None) => SessionState::Unauthenticated,
        }
    }
}

/// Session persistence.
///
/// Ids are opaque; the HTTP layer generates them and carries them in a
/// signed cookie.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError>;

    async fn set(&self, session_id: &str, record: SessionRecord) -> Result<(), StoreError>;

    async fn clear(&self, session_id: &str) -> Result<(), StoreError>;
}

/// Process-local store. Sessions vanish on restart.
///
/// Entries are written only once a request token is obtained, but nothing
/// expires them: an abandoned handshake keeps its request token until
/// [`SessionStore::clear`] is called or the process exits.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, SessionRecord>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.sessions.get(session_id).map(|r| r.value().clone()))
    }

    async fn set(&self, session_id: &str, record: SessionRecord) -> Result<(), StoreError> {
        self.sessions.insert(session_id.to_owned(), record);
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<(), StoreError> {
        self.sessions.remove(session_id);
        Ok(())
    }
}
