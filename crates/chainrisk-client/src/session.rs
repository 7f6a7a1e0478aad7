//! Client session: the single owner of the bearer token.
//!
//! `Anonymous -> Authenticated` on login, back to `Anonymous` on logout or
//! on the first 401 for the token currently held. Expiry is serialised so
//! concurrent 401s clear the token and ask for a new login exactly once.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::error::Result;
use crate::token::TokenStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated { token: String, username: String },
}

/// Notifications for the view layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { username: String },
    LoggedOut,
    /// The gateway rejected the token; show the login view.
    LoginRequired,
}

pub struct Session {
    state: Mutex<SessionState>,
    store: Arc<dyn TokenStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self { state: Mutex::new(SessionState::Anonymous), store, events }
    }

    /// Pick up a token left by an earlier run.
    pub async fn restore(store: Arc<dyn TokenStore>) -> Result<Self> {
        let session = Self::new(store);
        if let Some(token) = session.store.load().await? {
            let username = token_subject(&token).unwrap_or_default();
            *session.state.lock().await = SessionState::Authenticated { token, username };
        }
        Ok(session)
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn token(&self) -> Option<String> {
        match &*self.state.lock().await {
            SessionState::Authenticated { token, .. } => Some(token.clone()),
            SessionState::Anonymous => None,
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token().await.is_some()
    }

    pub async fn login(&self, token: &str, username: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        self.store.save(token).await?;
        *state = SessionState::Authenticated {
            token: token.to_string(),
            username: username.to_string(),
        };
        info!(username, "session started");
        let _ = self.events.send(SessionEvent::LoggedIn { username: username.to_string() });
        Ok(())
    }

    pub async fn logout(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.store.clear().await?;
        *state = SessionState::Anonymous;
        let _ = self.events.send(SessionEvent::LoggedOut);
        Ok(())
    }

    /// Drop the session after a 401 on a request that carried `rejected`.
    /// A 401 for a token that has since been replaced leaves the session
    /// alone. Returns `true` only for the call that ended the session.
    pub async fn expire_if(&self, rejected: &str) -> bool {
        let mut state = self.state.lock().await;
        match &*state {
            SessionState::Authenticated { token, .. } if token == rejected => {}
            _ => return false,
        }
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "failed to clear stored token");
        }
        *state = SessionState::Anonymous;
        warn!("session expired, login required");
        let _ = self.events.send(SessionEvent::LoginRequired);
        true
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// `sub` claim of a JWT, read without verification. Display only.
fn token_subject(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims["sub"].as_str().map(String::from)
}
