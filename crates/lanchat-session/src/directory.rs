//! The nickname directory: connection ↔ display name, with uniqueness.

use std::collections::HashMap;

use lanchat_protocol::ClientId;

use crate::SessionError;

/// What kind of claim just happened, so the caller knows which
/// announcement to broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NicknameChange {
    /// The connection had no name before; announce `user_joined`.
    First,
    /// The connection renamed itself; announce `nickname_changed`.
    Changed { old: String },
}

/// Maps live connections to their claimed display names, both ways.
///
/// The forward map (`by_name`) is the uniqueness authority and the
/// lookup index for voice-relay targets; the reverse map (`by_client`)
/// serves "what is this connection called". The two are kept in sync by
/// every operation.
///
/// Comparison is exact-case: "Alice" and "alice" are different names.
/// That is a policy choice, not an accident.
#[derive(Debug, Default)]
pub struct NicknameDirectory {
    by_name: HashMap<String, ClientId>,
    by_client: HashMap<ClientId, String>,
}

impl NicknameDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `name` for `client`.
    ///
    /// # Errors
    /// Returns [`SessionError::NicknameTaken`] if another live
    /// connection already holds exactly `name`. A connection re-claiming
    /// its own current name is allowed (it reads as a no-op rename).
    pub fn claim(
        &mut self,
        client: ClientId,
        name: &str,
    ) -> Result<NicknameChange, SessionError> {
        if let Some(&holder) = self.by_name.get(name) {
            if holder != client {
                return Err(SessionError::NicknameTaken(name.to_string()));
            }
        }

        let previous = self.by_client.insert(client, name.to_string());
        if let Some(old) = &previous {
            self.by_name.remove(old);
        }
        self.by_name.insert(name.to_string(), client);

        match previous {
            Some(old) => {
                tracing::info!(%client, %old, new = %name, "nickname changed");
                Ok(NicknameChange::Changed { old })
            }
            None => {
                tracing::info!(%client, nickname = %name, "nickname claimed");
                Ok(NicknameChange::First)
            }
        }
    }

    /// Releases whatever name `client` holds. Idempotent.
    ///
    /// Returns the released name so disconnect cleanup can announce
    /// `user_left`.
    pub fn remove(&mut self, client: ClientId) -> Option<String> {
        let name = self.by_client.remove(&client)?;
        self.by_name.remove(&name);
        Some(name)
    }

    /// The name `client` currently holds, if any.
    pub fn nickname(&self, client: ClientId) -> Option<&str> {
        self.by_client.get(&client).map(String::as_str)
    }

    /// Reverse lookup: which connection holds `name`. Exact match.
    pub fn lookup(&self, name: &str) -> Option<ClientId> {
        self.by_name.get(name).copied()
    }

    /// All claimed names, for `user_list` replies.
    pub fn names(&self) -> Vec<String> {
        self.by_name.keys().cloned().collect()
    }

    /// Number of named connections.
    pub fn len(&self) -> usize {
        self.by_client.len()
    }

    /// Returns `true` if no connection has claimed a name.
    pub fn is_empty(&self) -> bool {
        self.by_client.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
