use async_trait::async_trait;
use secrecy::SecretString;
use uuid::Uuid;

use crate::contract::model::{Credential, Grant, IdentityProbe};
use crate::domain::error::IdentityError;

/// Transport-agnostic port to the identity service.
///
/// Privileged calls carry the actor's credential explicitly so the backend
/// attributes the audit record to the right identity.
#[async_trait]
pub trait IdentityPort: Send + Sync {
    async fn authenticate(&self, email: &str, secret: &SecretString)
        -> Result<Grant, IdentityError>;

    async fn register(
        &self,
        name: &str,
        email: &str,
        secret: &SecretString,
    ) -> Result<Grant, IdentityError>;

    /// Mint a credential acting as `target`, linked server-side to `actor`.
    async fn delegate(&self, actor: &Credential, target: Uuid) -> Result<Grant, IdentityError>;

    /// Resolve the server-side linkage of a delegated credential back to its actor.
    async fn restore(&self, delegated: &Credential) -> Result<Grant, IdentityError>;

    async fn current_identity(&self, credential: &Credential)
        -> Result<IdentityProbe, IdentityError>;
}
