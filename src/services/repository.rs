//! Repositories over the four well-known store keys.
//!
//! Every write is a whole-value read-modify-write of one key. There is no
//! locking: two writers racing on the same key lose one write (last store
//! wins). The UI issues writes one at a time, so this is accepted.

use crate::config::{KEY_CHATS, KEY_SETTINGS, KEY_USERS};
use crate::models::{AppSettings, ChatSession, User};
use crate::services::storage::{JsonStore, KeyValueStore};

#[derive(Clone, Debug)]
pub struct SettingsRepository<S> {
    store: JsonStore<S>,
}

impl<S: KeyValueStore> SettingsRepository<S> {
    pub fn new(store: JsonStore<S>) -> Self {
        Self { store }
    }

    pub fn get(&self) -> AppSettings {
        self.store.get(KEY_SETTINGS).unwrap_or_default()
    }

    /// Overwrites the stored record wholesale; values are not validated.
    pub fn set(&self, settings: &AppSettings) {
        self.store.set(KEY_SETTINGS, settings);
    }
}

#[derive(Clone, Debug)]
pub struct UserRepository<S> {
    store: JsonStore<S>,
}

impl<S: KeyValueStore> UserRepository<S> {
    pub fn new(store: JsonStore<S>) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Vec<User> {
        self.store.get_vec(KEY_USERS)
    }

    /// Appends without a uniqueness check; registration checks first.
    /// Returns `false` when the stored list is unreadable and was left as is.
    pub fn add(&self, user: &User) -> bool {
        self.store.push_vec(KEY_USERS, user.clone())
    }

    pub fn find_by_username(&self, username: &str) -> Option<User> {
        self.list().into_iter().find(|u| u.username == username)
    }
}

#[derive(Clone, Debug)]
pub struct SessionRepository<S> {
    store: JsonStore<S>,
}

impl<S: KeyValueStore> SessionRepository<S> {
    pub fn new(store: JsonStore<S>) -> Self {
        Self { store }
    }

    fn load_all(&self) -> Vec<ChatSession> {
        self.store.get_vec(KEY_CHATS)
    }

    /// Sessions owned by `user_id`, newest first.
    pub fn list_for_user(&self, user_id: &str) -> Vec<ChatSession> {
        let mut sessions: Vec<ChatSession> = self
            .load_all()
            .into_iter()
            .filter(|s| s.user_id == user_id)
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions
    }

    pub fn get(&self, session_id: &str) -> Option<ChatSession> {
        self.load_all().into_iter().find(|s| s.id == session_id)
    }

    /// Replaces the session with the same id, or appends it. An unparseable
    /// chat list is never overwritten.
    pub fn upsert(&self, session: &ChatSession) {
        tracing::debug!(session_id = %session.id, messages = session.messages.len(), "saving chat");
        self.store.update_vec(KEY_CHATS, |all: &mut Vec<ChatSession>| {
            match all.iter_mut().find(|s| s.id == session.id) {
                Some(existing) => *existing = session.clone(),
                None => all.push(session.clone()),
            }
        });
    }

    pub fn delete(&self, session_id: &str) {
        self.store
            .update_vec(KEY_CHATS, |all: &mut Vec<ChatSession>| all.retain(|s| s.id != session_id));
    }

    pub fn delete_all_for_user(&self, user_id: &str) {
        self.store
            .update_vec(KEY_CHATS, |all: &mut Vec<ChatSession>| all.retain(|s| s.user_id != user_id));
    }

    pub fn message_count_for_user(&self, user_id: &str) -> usize {
        self.list_for_user(user_id)
            .iter()
            .map(|s| s.messages.len())
            .sum()
    }
}
