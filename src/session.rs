//! Client-side session shim.
//!
//! Tracks whether the local user is anonymous or signed in, persists the
//! signed-in user (never the password hash) under [`SESSION_KEY`], and
//! broadcasts a [`SessionEvent`] on every transition.

use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;

use crate::auth::Accounts;
use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::storage::KeyValueStore;

pub const SESSION_KEY: &str = "campus_user";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(User),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn(User),
    Registered(User),
    LoggedOut,
}

pub struct AuthSession {
    accounts: Accounts,
    persistence: Arc<dyn KeyValueStore>,
    state: RwLock<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl AuthSession {
    /// Rehydrates the session from `persistence`. Unreadable or corrupt data
    /// is discarded and the session starts anonymous.
    pub fn restore(accounts: Accounts, persistence: Arc<dyn KeyValueStore>) -> Self {
        let state = match persistence.get(SESSION_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => {
                    tracing::debug!("Session restored: user_id={}", user.id);
                    SessionState::Authenticated(user)
                }
                Err(e) => {
                    tracing::warn!("Discarding corrupt session data: {}", e);
                    if let Err(e) = persistence.remove(SESSION_KEY) {
                        tracing::warn!("Failed to clear corrupt session: {}", e);
                    }
                    SessionState::Anonymous
                }
            },
            Ok(None) => SessionState::Anonymous,
            Err(e) => {
                tracing::warn!("Session storage unreadable, starting anonymous: {}", e);
                SessionState::Anonymous
            }
        };

        let (events, _) = broadcast::channel(16);
        Self {
            accounts,
            persistence,
            state: RwLock::new(state),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SessionState {
        match self.state.read() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        match self.state() {
            SessionState::Authenticated(user) => Some(user),
            SessionState::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<User> {
        let user = self.accounts.authenticate(email, password).await?;
        self.enter(user.clone())?;
        self.notify(SessionEvent::LoggedIn(user.clone()));
        Ok(user)
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> AppResult<User> {
        let user = self.accounts.register(email, password, name).await?;
        self.enter(user.clone())?;
        self.notify(SessionEvent::Registered(user.clone()));
        Ok(user)
    }

    pub fn logout(&self) -> AppResult<()> {
        self.persistence.remove(SESSION_KEY)?;
        self.set_state(SessionState::Anonymous)?;
        self.notify(SessionEvent::LoggedOut);
        Ok(())
    }

    fn enter(&self, user: User) -> AppResult<()> {
        let raw = serde_json::to_string(&user)?;
        self.persistence.set(SESSION_KEY, &raw)?;
        self.set_state(SessionState::Authenticated(user))
    }

    fn set_state(&self, next: SessionState) -> AppResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| AppError::Internal("session state lock poisoned".to_string()))?;
        *state = next;
        Ok(())
    }

    fn notify(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
