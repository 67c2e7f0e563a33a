use std::sync::Arc;

use tracing::instrument;

use crate::contract::error::GatewayError;
use crate::contract::model::{AuditPage, AuditQuery};
use crate::gateways::resource::ResourceGateway;

/// Read-only view of the backend's audit trail. SUPER_ADMIN only.
pub struct AuditLogReader {
    gateway: Arc<ResourceGateway>,
}

impl AuditLogReader {
    pub fn new(gateway: Arc<ResourceGateway>) -> Self {
        Self { gateway }
    }

    #[instrument(
        name = "identity_session.gateway.audit.list",
        skip_all,
        fields(skip = query.skip, limit = query.limit)
    )]
    pub async fn list(&self, query: &AuditQuery) -> Result<AuditPage, GatewayError> {
        let snapshot = self.gateway.session().snapshot();
        if !snapshot.is_authenticated() {
            return Err(GatewayError::NotAuthenticated);
        }
        // A delegated session acts as the target, who never holds SUPER_ADMIN.
        if !snapshot.is_super_admin() {
            return Err(GatewayError::forbidden(
                "audit logs are visible to SUPER_ADMIN only",
            ));
        }

        self.gateway.get_json(&query_path(query)).await
    }
}

fn query_path(query: &AuditQuery) -> String {
    let mut params = url::form_urlencoded::Serializer::new(String::new());
    if let Some(action) = &query.action {
        params.append_pair("action", action.as_str());
    }
    params.append_pair("skip", &query.skip.to_string());
    params.append_pair("limit", &query.limit.to_string());
    format!("admin/audit-logs?{}", params.finish())
}
