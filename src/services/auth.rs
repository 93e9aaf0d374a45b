//! Demo-grade authentication.
//!
//! Passwords are never stored and only the optional master account compares
//! one, in cleartext. Registered users log in by username alone.

use crate::config::{AuthConfig, MasterAccount, KEY_SESSION};
use crate::error::AuthError;
use crate::models::User;
use crate::services::repository::UserRepository;
use crate::services::storage::{JsonStore, KeyValueStore};

/// The logged-in user, passed explicitly to everything acting on their behalf.
#[derive(Clone, PartialEq, Debug)]
pub struct AppContext {
    pub user: User,
}

pub struct AuthService<S> {
    users: UserRepository<S>,
    store: JsonStore<S>,
    config: AuthConfig,
}

impl<S: KeyValueStore + Clone> AuthService<S> {
    pub fn new(store: JsonStore<S>, config: AuthConfig) -> Self {
        Self {
            users: UserRepository::new(store.clone()),
            store,
            config,
        }
    }

    fn check_fields(username: &str, password: &str) -> Result<(), AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }
        Ok(())
    }

    fn master_user(&self, username: &str, password: &str) -> Option<User> {
        let master = self.config.master.as_ref()?;
        if master.username == username && master.password == password {
            Some(User {
                id: MasterAccount::USER_ID.to_string(),
                username: master.username.clone(),
                is_admin: true,
            })
        } else {
            None
        }
    }

    fn start_session(&self, user: User) -> AppContext {
        self.store.set(KEY_SESSION, &user);
        tracing::info!(user_id = %user.id, admin = user.is_admin, "logged in");
        AppContext { user }
    }

    pub fn login(&self, username: &str, password: &str) -> Result<AppContext, AuthError> {
        let username = username.trim();
        Self::check_fields(username, password)?;
        if let Some(master) = self.master_user(username, password) {
            return Ok(self.start_session(master));
        }
        let user = self
            .users
            .find_by_username(username)
            .ok_or(AuthError::UserNotFound)?;
        Ok(self.start_session(user))
    }

    pub fn register(&self, username: &str, password: &str) -> Result<AppContext, AuthError> {
        let username = username.trim();
        Self::check_fields(username, password)?;
        if let Some(master) = self.master_user(username, password) {
            return Ok(self.start_session(master));
        }
        if self.users.find_by_username(username).is_some() {
            tracing::debug!(username, "registration rejected, username taken");
            return Err(AuthError::UsernameExists);
        }
        let user = User::new(username);
        if !self.users.add(&user) {
            tracing::warn!(username, "user list unreadable, account not persisted");
        }
        Ok(self.start_session(user))
    }

    /// Reloads the persisted marker; called once at start-up.
    pub fn restore(&self) -> Option<AppContext> {
        self.store
            .get::<User>(KEY_SESSION)
            .map(|user| AppContext { user })
    }

    pub fn logout(&self) {
        self.store.remove(KEY_SESSION);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KEY_USERS;
    use crate::services::storage::MemoryStorage;

    fn service(master: Option<MasterAccount>) -> (MemoryStorage, AuthService<MemoryStorage>) {
        let kv = MemoryStorage::new();
        let auth = AuthService::new(JsonStore::new(kv.clone()), AuthConfig { master });
        (kv, auth)
    }

    #[test]
    fn register_then_reject_duplicate() {
        let (kv, auth) = service(None);

        let ctx = auth.register("alice", "secret").unwrap();
        assert_eq!(ctx.user.username, "alice");
        assert!(!ctx.user.is_admin);
        let users_after_first = kv.get_item(KEY_USERS);

        let err = auth.register("alice", "other").unwrap_err();
        assert_eq!(err, AuthError::UsernameExists);
        assert_eq!(err.to_string(), "Username already exists");
        assert_eq!(kv.get_item(KEY_USERS), users_after_first);
    }

    #[test]
    fn usernames_are_trimmed_before_lookup_and_storage() {
        let (kv, auth) = service(None);
        let ctx = auth.register("  alice ", "pw").unwrap();
        assert_eq!(ctx.user.username, "alice");
        let users_after_first = kv.get_item(KEY_USERS);

        assert_eq!(auth.register(" alice", "pw"), Err(AuthError::UsernameExists));
        assert_eq!(kv.get_item(KEY_USERS), users_after_first);
        assert_eq!(auth.login("alice  ", "pw"), Ok(ctx));
        assert_eq!(auth.register("   ", "pw"), Err(AuthError::MissingFields));
    }

    #[test]
    fn empty_fields_are_rejected() {
        let (_, auth) = service(None);
        assert_eq!(auth.login("", "pw"), Err(AuthError::MissingFields));
        assert_eq!(auth.register("bob", ""), Err(AuthError::MissingFields));
    }

    #[test]
    fn login_finds_registered_users_only() {
        let (_, auth) = service(None);
        assert_eq!(auth.login("ghost", "pw"), Err(AuthError::UserNotFound));

        let registered = auth.register("alice", "pw").unwrap();
        let logged_in = auth.login("alice", "anything").unwrap();
        assert_eq!(logged_in, registered);
    }

    #[test]
    fn master_account_only_when_configured() {
        let master = MasterAccount {
            username: "root".into(),
            password: "pw".into(),
        };
        let (_, auth) = service(Some(master));
        let ctx = auth.login("root", "pw").unwrap();
        assert_eq!(ctx.user.id, MasterAccount::USER_ID);
        assert!(ctx.user.is_admin);
        assert_eq!(auth.login("root", "wrong"), Err(AuthError::UserNotFound));

        let (_, plain) = service(None);
        assert_eq!(plain.login("root", "pw"), Err(AuthError::UserNotFound));
    }

    #[test]
    fn marker_survives_restart_until_logout() {
        let (kv, auth) = service(None);
        assert!(auth.restore().is_none());

        let ctx = auth.register("alice", "pw").unwrap();
        let restarted = AuthService::new(JsonStore::new(kv.clone()), AuthConfig::default());
        assert_eq!(restarted.restore(), Some(ctx));

        restarted.logout();
        assert!(auth.restore().is_none());
    }
}
