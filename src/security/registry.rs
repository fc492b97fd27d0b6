//! In-memory registry of resolved tokens.
//!
//! Two indexes: token to session, and user id to the most recently registered
//! token. Each index has its own lock, so a concurrent reader can observe the
//! token index updated before the user index; both converge once `register`
//! returns. Entries live for the whole process and are never swept.

use axum::http::HeaderMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use super::{request, Session};

#[derive(Debug, Default)]
pub struct SessionRegistry {
    tokens: RwLock<HashMap<String, Session>>,
    users: RwLock<HashMap<u64, String>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert `token`, and point its user at it. Older tokens of the same user stay resolvable.
    ///
    /// The token is stored unquoted, the same form `lookup` searches for. Returns
    /// `false` and stores nothing when that form is empty.
    pub fn register(&self, token: &str, session: Session) -> bool {
        let token = request::unquote(token);
        if token.is_empty() {
            return false;
        }
        let user_id = session.identity.id;
        self.tokens.write().insert(token.to_string(), session);
        self.users.write().insert(user_id, token.to_string());
        debug!(user_id, "registered session");
        true
    }

    #[must_use]
    pub fn lookup(&self, token: &str) -> Option<Session> {
        let token = request::unquote(token);
        if token.is_empty() {
            return None;
        }
        self.tokens.read().get(token).cloned()
    }

    #[must_use]
    pub fn current_token_of(&self, user_id: u64) -> Option<String> {
        self.users.read().get(&user_id).cloned()
    }

    #[must_use]
    pub fn resolve_from_request(&self, headers: &HeaderMap) -> Option<Session> {
        request::token_from(headers).and_then(|token| self.lookup(&token))
    }

    /// Register `session` under the request's token. Returns `false` when the request carries none.
    pub fn register_from_request(&self, headers: &HeaderMap, session: Session) -> bool {
        request::token_from(headers).is_some_and(|token| self.register(&token, session))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.read().is_empty()
    }
}
