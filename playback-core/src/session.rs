//! Playback session bookkeeping.
//!
//! Sessions are opaque records clients create when playback starts, refresh
//! with heartbeats, and close when playback stops.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::streaming::{IdentifierError, validate_identifier};

/// A single playback session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSession {
    pub session_id: String,
    pub user_id: String,
    pub video_id: String,
    pub started_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub active: bool,
}

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid {field}: {source}")]
    InvalidIdentifier {
        field: &'static str,
        #[source]
        source: IdentifierError,
    },

    #[error("playback session not found: {session_id}")]
    NotFound { session_id: String },
}

/// Single-field change to an existing session.
///
/// Stores apply a change atomically, so a heartbeat racing a stop can never
/// write a stale `active` flag back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    /// Set `last_heartbeat`
    Heartbeat(DateTime<Utc>),
    /// Clear `active`
    Stop,
}

impl SessionChange {
    pub fn apply(self, session: &mut PlaybackSession) {
        match self {
            SessionChange::Heartbeat(at) => session.last_heartbeat = at,
            SessionChange::Stop => session.active = false,
        }
    }
}

/// Persistence seam for sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts or replaces a session keyed by its id.
    async fn save(&self, session: PlaybackSession);

    /// Looks up a session by id.
    async fn find(&self, session_id: &str) -> Option<PlaybackSession>;

    /// Applies `change` to a stored session in one step and returns the
    /// result, or `None` if no such session exists.
    async fn apply(&self, session_id: &str, change: SessionChange) -> Option<PlaybackSession>;
}

/// Process-local session store.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, PlaybackSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, session: PlaybackSession) {
        self.sessions
            .write()
            .insert(session.session_id.clone(), session);
    }

    async fn find(&self, session_id: &str) -> Option<PlaybackSession> {
        self.sessions.read().get(session_id).cloned()
    }

    async fn apply(&self, session_id: &str, change: SessionChange) -> Option<PlaybackSession> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(session_id)?;
        change.apply(session);
        Some(session.clone())
    }
}

/// Creates, heartbeats and stops playback sessions.
#[derive(Clone)]
pub struct SessionTracker {
    store: Arc<dyn SessionStore>,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SessionTracker {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemorySessionStore::new()))
    }

    /// Starts a new active session with a freshly generated id.
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidIdentifier` - `user_id` or `video_id` failed validation
    pub async fn start(
        &self,
        user_id: &str,
        video_id: &str,
    ) -> Result<PlaybackSession, SessionError> {
        check("userId", user_id)?;
        check("videoId", video_id)?;

        let now = Utc::now();
        let session = PlaybackSession {
            session_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            video_id: video_id.to_string(),
            started_at: now,
            last_heartbeat: now,
            active: true,
        };
        self.store.save(session.clone()).await;

        info!(
            session_id = %session.session_id,
            user_id,
            video_id,
            "Playback session started"
        );
        Ok(session)
    }

    /// Refreshes the heartbeat timestamp of a session.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotFound` - No session with this id
    pub async fn heartbeat(&self, session_id: &str) -> Result<PlaybackSession, SessionError> {
        let session = self
            .change(session_id, SessionChange::Heartbeat(Utc::now()))
            .await?;

        debug!(session_id, "Playback heartbeat");
        Ok(session)
    }

    /// Marks a session inactive. Stopping an already stopped session is a no-op.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotFound` - No session with this id
    pub async fn stop(&self, session_id: &str) -> Result<PlaybackSession, SessionError> {
        let session = self.change(session_id, SessionChange::Stop).await?;

        info!(session_id, "Playback session stopped");
        Ok(session)
    }

    /// Returns a session by id.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotFound` - No session with this id
    pub async fn get(&self, session_id: &str) -> Result<PlaybackSession, SessionError> {
        self.store
            .find(session_id)
            .await
            .ok_or_else(|| not_found(session_id))
    }

    async fn change(
        &self,
        session_id: &str,
        change: SessionChange,
    ) -> Result<PlaybackSession, SessionError> {
        self.store
            .apply(session_id, change)
            .await
            .ok_or_else(|| not_found(session_id))
    }
}

fn check(field: &'static str, value: &str) -> Result<(), SessionError> {
    validate_identifier(value)
        .map_err(|source| SessionError::InvalidIdentifier { field, source })
}

fn not_found(session_id: &str) -> SessionError {
    SessionError::NotFound {
        session_id: session_id.to_string(),
    }
}
