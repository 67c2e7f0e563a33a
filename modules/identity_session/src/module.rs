use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use url::Url;

use crate::config::IdentitySessionConfig;
use crate::contract::client::SessionApi;
use crate::domain::controller::SessionController;
use crate::domain::ports::{CredentialStore, IdentityPort};
use crate::gateways::{AuditLogReader, ResourceGateway, SessionLocalClient};
use crate::infra::http::TracedClient;
use crate::infra::identity::HttpIdentityClient;
use crate::infra::store::JsonFileCredentialStore;

/// Wiring of the identity session: one controller, one gateway, one store.
pub struct IdentitySession {
    controller: Arc<SessionController>,
    gateway: Arc<ResourceGateway>,
    audit: AuditLogReader,
}

impl IdentitySession {
    /// Build from config. `home_dir` anchors a relative `store_file`.
    pub fn init(cfg: &IdentitySessionConfig, home_dir: &Path) -> Result<Self> {
        let base = Url::parse(&cfg.backend_url)
            .with_context(|| format!("invalid backend_url '{}'", cfg.backend_url))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("backend_url '{}' cannot be used as a base URL", cfg.backend_url);
        }

        let client = TracedClient::with_timeout(Duration::from_millis(cfg.request_timeout_ms))
            .context("failed to build HTTP client")?;

        let store_path = {
            let p = Path::new(&cfg.store_file);
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                home_dir.join(p)
            }
        };
        let store: Arc<dyn CredentialStore> =
            Arc::new(JsonFileCredentialStore::new(store_path.clone()));
        let identity: Arc<dyn IdentityPort> =
            Arc::new(HttpIdentityClient::new(client.clone(), base.clone()));

        info!(backend = %base, store = %store_path.display(), "identity session initialized");
        Ok(Self::from_parts(store, identity, client, base))
    }

    /// Assemble from explicit adapters.
    pub fn from_parts(
        store: Arc<dyn CredentialStore>,
        identity: Arc<dyn IdentityPort>,
        client: TracedClient,
        base: Url,
    ) -> Self {
        let controller = Arc::new(SessionController::new(store, identity));
        let gateway = Arc::new(ResourceGateway::new(controller.clone(), client, base));
        let audit = AuditLogReader::new(gateway.clone());
        Self {
            controller,
            gateway,
            audit,
        }
    }

    pub fn api(&self) -> Arc<dyn SessionApi> {
        Arc::new(SessionLocalClient::new(self.controller.clone()))
    }

    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    pub fn gateway(&self) -> &Arc<ResourceGateway> {
        &self.gateway
    }

    pub fn audit(&self) -> &AuditLogReader {
        &self.audit
    }
}
