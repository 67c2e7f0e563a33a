use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::watch;
use uuid::Uuid;

use crate::contract::{
    error::SessionError,
    model::{Identity, SessionSnapshot},
};

/// Public API of the identity session that front-ends consume.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Current mode and identity
    fn snapshot(&self) -> SessionSnapshot;

    /// Receiver that observes every committed change
    fn subscribe(&self) -> watch::Receiver<SessionSnapshot>;

    /// Log in with email and password
    async fn authenticate(&self, email: &str, secret: &SecretString)
        -> Result<Identity, SessionError>;

    /// Create an account and log in as it
    async fn register(
        &self,
        name: &str,
        email: &str,
        secret: &SecretString,
    ) -> Result<Identity, SessionError>;

    /// Act as another user (SUPER_ADMIN only)
    async fn impersonate(&self, target_id: Uuid) -> Result<Identity, SessionError>;

    /// Return to the administrator's own identity
    async fn exit_impersonate(&self) -> Result<Identity, SessionError>;

    /// Re-read the active identity from the backend
    async fn refresh(&self) -> Result<Identity, SessionError>;

    /// Drop the session and everything persisted for it
    fn logout(&self);
}
