use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::contract::{
    client::SessionApi,
    error::SessionError,
    model::{Identity, SessionSnapshot},
};
use crate::domain::controller::SessionController;

/// Local implementation of the SessionApi trait that delegates to the session controller
pub struct SessionLocalClient {
    controller: Arc<SessionController>,
}

impl SessionLocalClient {
    pub fn new(controller: Arc<SessionController>) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl SessionApi for SessionLocalClient {
    fn snapshot(&self) -> SessionSnapshot {
        self.controller.snapshot()
    }

    fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.controller.subscribe()
    }

    async fn authenticate(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<Identity, SessionError> {
        self.controller.authenticate(email, secret).await
    }

    async fn register(
        &self,
        name: &str,
        email: &str,
        secret: &SecretString,
    ) -> Result<Identity, SessionError> {
        self.controller.register(name, email, secret).await
    }

    async fn impersonate(&self, target_id: Uuid) -> Result<Identity, SessionError> {
        self.controller.impersonate(target_id).await
    }

    async fn exit_impersonate(&self) -> Result<Identity, SessionError> {
        self.controller.exit_impersonate().await
    }

    async fn refresh(&self) -> Result<Identity, SessionError> {
        self.controller.refresh().await
    }

    fn logout(&self) {
        self.controller.logout()
    }
}
