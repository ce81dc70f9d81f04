//! The session manager: tracks all active client sessions.
//!
//! Sessions are created when a client claims a nickname and expire a
//! fixed time later. Expiry is lazy: an expired session is discovered
//! and purged when something touches it (or on a bulk sweep), never by
//! a background timer.
//!
//! # Concurrency note
//!
//! `SessionManager` is NOT thread-safe by itself; it uses plain
//! `HashMap`s. It lives inside the relay's single context lock along
//! with the registry and rooms, so it never sees concurrent mutation.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use lanchat_protocol::ClientId;
use rand::Rng;

use crate::{Session, SessionConfig, SessionError};

/// Manages all active client sessions.
pub struct SessionManager {
    /// All sessions, keyed by session id.
    sessions: HashMap<String, Session>,

    /// Index from connection to its session id, kept in sync with
    /// `sessions`. A connection has at most one session.
    by_owner: HashMap<ClientId, String>,

    config: SessionConfig,
}

impl SessionManager {
    /// Creates a new, empty session manager with the given config.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            by_owner: HashMap::new(),
            config,
        }
    }

    /// Creates a session for `owner`, replacing any previous one.
    ///
    /// Returns the session id.
    pub fn create(&mut self, owner: ClientId, nickname: &str) -> String {
        if let Some(old_id) = self.by_owner.remove(&owner) {
            self.sessions.remove(&old_id);
        }

        let id = generate_session_id();
        let now = Instant::now();
        let session = Session {
            id: id.clone(),
            owner,
            nickname: nickname.to_string(),
            created_at: now,
            last_activity: now,
        };

        self.by_owner.insert(owner, id.clone());
        self.sessions.insert(id.clone(), session);

        tracing::info!(%owner, nickname, "session created");
        id
    }

    /// Validates a session id.
    ///
    /// An expired session is purged here, as a side effect of being
    /// looked at. On success the session's `last_activity` is bumped.
    ///
    /// # Errors
    /// - [`SessionError::SessionNotFound`] — unknown id
    /// - [`SessionError::SessionExpired`] — timeout elapsed (now purged)
    pub fn validate(&mut self, id: &str) -> Result<&Session, SessionError> {
        let timeout = Duration::from_secs(self.config.session_timeout_secs);

        let expired = match self.sessions.get(id) {
            None => return Err(SessionError::SessionNotFound),
            Some(session) => session.created_at.elapsed() > timeout,
        };

        if expired {
            if let Some(session) = self.sessions.remove(id) {
                self.by_owner.remove(&session.owner);
                tracing::info!(owner = %session.owner, "session expired");
            }
            return Err(SessionError::SessionExpired);
        }

        let session = self
            .sessions
            .get_mut(id)
            .ok_or(SessionError::SessionNotFound)?;
        session.last_activity = Instant::now();
        Ok(session)
    }

    /// Removes `owner`'s session, if any. Called from disconnect cleanup.
    pub fn remove_owner(&mut self, owner: ClientId) {
        if let Some(id) = self.by_owner.remove(&owner) {
            self.sessions.remove(&id);
        }
    }

    /// Sweeps out every expired session. Returns how many were purged.
    pub fn purge_expired(&mut self) -> usize {
        let timeout = Duration::from_secs(self.config.session_timeout_secs);
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.created_at.elapsed() > timeout)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            if let Some(session) = self.sessions.remove(id) {
                self.by_owner.remove(&session.owner);
            }
        }
        expired.len()
    }

    /// Looks up a session by its owning connection.
    pub fn get_by_owner(&self, owner: ClientId) -> Option<&Session> {
        self.by_owner
            .get(&owner)
            .and_then(|id| self.sessions.get(id))
    }

    /// Returns the number of tracked sessions (including not-yet-purged
    /// expired ones).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
fn generate_session_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================
