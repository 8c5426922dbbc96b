//! Authentication and sessions
//!
//! Credentials are verified by an [`IdentityProvider`]:
//! - Google ID tokens ([`GoogleCredentialProvider`])
//! - Plain email addresses for development and tests ([`StaticIdentityProvider`])
//!
//! A successful login creates a session with its own household
//! [`Workspace`](crate::household::Workspace). The session token is sent
//! back as a bearer token on every request.

mod identity;
mod session;

pub use identity::{GoogleCredentialProvider, StaticIdentityProvider};
pub use session::{Session, SessionManager, SessionState};

use async_trait::async_trait;
use crate::household::HouseholdError;
use crate::storage::StorageError;
use serde::Serialize;

/// Verified identity of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub email: String,
    pub name: Option<String>,
}

/// Common trait for all identity providers
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Unique name for this provider
    fn name(&self) -> &str;

    /// Verify a credential and return the identity it belongs to
    async fn verify(&self, credential: &str) -> Result<Identity, AuthError>;
}

/// Errors that can occur during authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Credential was issued for another client ({0})")]
    AudienceMismatch(String),

    #[error("Email address is not verified: {0}")]
    UnverifiedEmail(String),

    #[error("Login required")]
    LoginRequired,

    #[error("Not allowed to open household {0}")]
    Forbidden(String),

    #[error("Credential belongs to {verified}, not {claimed}")]
    AccountMismatch { claimed: String, verified: String },

    #[error(transparent)]
    Household(#[from] HouseholdError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
