//! Sessions
//!
//! A session starts anonymous and becomes authenticated on login (a
//! credential verified by the identity provider) or on resume (a stored
//! email and household key pair, re-proven with a fresh credential). Each
//! authenticated session owns a
//! [`Workspace`] on its active household; logging out closes it.

use super::{AuthError, IdentityProvider};
use crate::household::{hats, HouseholdKey, Workspace, WorkspaceSettings};
use crate::storage::TreeStore;
use crate::websocket::ConnectionHub;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// What a request is allowed to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Anonymous,
    Authenticated {
        email: String,
        household: HouseholdKey,
    },
}

/// An authenticated session
pub struct Session {
    pub id: String,
    pub email: String,
    /// Key derived from the email, used for `users/<key>`
    pub user: HouseholdKey,
    pub workspace: Workspace,
}

impl Session {
    pub async fn state(&self) -> SessionState {
        match self.workspace.household().await {
            Some(household) => SessionState::Authenticated {
                email: self.email.clone(),
                household,
            },
            None => SessionState::Anonymous,
        }
    }

    /// Open another household the user owns or has joined
    pub async fn switch(&self, store: &TreeStore, key: HouseholdKey) -> Result<bool, AuthError> {
        if !hats::can_open(store, &self.user, &key).await? {
            return Err(AuthError::Forbidden(key.to_string()));
        }
        Ok(self.workspace.switch(key).await?)
    }
}

/// All live sessions, keyed by token
pub struct SessionManager {
    store: Arc<TreeStore>,
    hub: Option<Arc<ConnectionHub>>,
    provider: Arc<dyn IdentityProvider>,
    settings: WorkspaceSettings,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    pub fn new(
        store: Arc<TreeStore>,
        hub: Option<Arc<ConnectionHub>>,
        provider: Arc<dyn IdentityProvider>,
        settings: WorkspaceSettings,
    ) -> Self {
        Self {
            store,
            hub,
            provider,
            settings,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn provider(&self) -> &dyn IdentityProvider {
        self.provider.as_ref()
    }

    /// Verify `credential` and open the user's most recent household
    pub async fn login(&self, credential: &str) -> Result<Arc<Session>, AuthError> {
        let identity = self.provider.verify(credential).await?;
        let user = HouseholdKey::from_email(&identity.email)?;

        let pointer = user.user_root()?.child("mostRecentDatabase")?;
        let recent = match self.store.get(&pointer).await {
            Some(serde_json::Value::String(raw)) => HouseholdKey::parse(&raw).ok(),
            _ => None,
        };
        let household = recent.unwrap_or_else(|| user.clone());

        tracing::info!(
            provider = %self.provider.name(),
            user = %user,
            household = %household,
            "Login"
        );
        self.start(identity.email, user, household).await
    }

    /// Re-enter a household from a stored email/household pair. The
    /// credential must verify as the same email.
    pub async fn resume(
        &self,
        credential: &str,
        email: &str,
        household: &str,
    ) -> Result<Arc<Session>, AuthError> {
        let identity = self.provider.verify(credential).await?;
        if !identity.email.trim().eq_ignore_ascii_case(email.trim()) {
            return Err(AuthError::AccountMismatch {
                claimed: email.trim().to_string(),
                verified: identity.email,
            });
        }

        let user = HouseholdKey::from_email(&identity.email)?;
        let household = HouseholdKey::parse(household)?;

        if !hats::can_open(&self.store, &user, &household).await? {
            return Err(AuthError::Forbidden(household.to_string()));
        }

        tracing::info!(user = %user, household = %household, "Session resumed");
        self.start(identity.email, user, household).await
    }

    async fn start(
        &self,
        email: String,
        user: HouseholdKey,
        household: HouseholdKey,
    ) -> Result<Arc<Session>, AuthError> {
        let id = Uuid::new_v4().to_string();
        let workspace = Workspace::open(
            Arc::clone(&self.store),
            self.hub.clone(),
            id.clone(),
            user.clone(),
            household,
            self.settings,
        )
        .await?;

        let session = Arc::new(Session {
            id: id.clone(),
            email,
            user,
            workspace,
        });
        self.sessions.write().await.insert(id, Arc::clone(&session));
        Ok(session)
    }

    /// Close the session's workspace and forget the token
    pub async fn logout(&self, token: &str) -> bool {
        let removed = self.sessions.write().await.remove(token);
        match removed {
            Some(session) => {
                session.workspace.close().await;
                tracing::info!(session_id = %token, user = %session.user, "Logout");
                true
            }
            None => false,
        }
    }

    pub async fn get(&self, token: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(token).cloned()
    }

    /// Session for `token`, or `LoginRequired`
    pub async fn require(&self, token: Option<&str>) -> Result<Arc<Session>, AuthError> {
        match token {
            Some(token) => self.get(token).await.ok_or(AuthError::LoginRequired),
            None => Err(AuthError::LoginRequired),
        }
    }

    pub async fn state(&self, token: Option<&str>) -> SessionState {
        match token {
            Some(token) => match self.get(token).await {
                Some(session) => session.state().await,
                None => SessionState::Anonymous,
            },
            None => SessionState::Anonymous,
        }
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Close every session (server shutdown)
    pub async fn close_all(&self) {
        let sessions: Vec<Arc<Session>> = self.sessions.write().await.drain().map(|(_, s)| s).collect();
        for session in sessions {
            session.workspace.close().await;
        }
    }
}
