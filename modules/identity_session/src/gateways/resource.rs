use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::contract::error::GatewayError;
use crate::domain::controller::SessionController;
use crate::infra::http::{error_detail, TracedClient};

/// Outbound path for every non-identity backend call.
///
/// Each request carries the credential that is active at send time. A 401
/// tears down the session that credential belonged to (and only that one),
/// so a late rejection cannot close a session opened after the request left.
pub struct ResourceGateway {
    session: Arc<SessionController>,
    client: TracedClient,
    base: Url,
}

impl ResourceGateway {
    pub fn new(session: Arc<SessionController>, client: TracedClient, base: Url) -> Self {
        Self {
            session,
            client,
            base,
        }
    }

    pub fn session(&self) -> &Arc<SessionController> {
        &self.session
    }

    /// Resolve `path` (e.g. `admin/users?skip=0`) under the backend's `/api` prefix.
    pub fn url_for(&self, path: &str) -> Result<Url, GatewayError> {
        let invalid = || GatewayError::InvalidPath {
            path: path.to_string(),
        };
        let (route, query) = match path.split_once('?') {
            Some((route, query)) => (route, Some(query)),
            None => (path, None),
        };
        let segments: Vec<&str> = route
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        if segments.is_empty() || segments.iter().any(|s| *s == ".." || *s == ".") {
            return Err(invalid());
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        url.set_query(query.filter(|q| !q.is_empty()));
        Ok(url)
    }

    /// Send one authenticated request and return the successful response.
    #[instrument(
        name = "identity_session.gateway.send",
        skip_all,
        fields(method = %method, path = %path)
    )]
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, GatewayError> {
        let url = self.url_for(path)?;
        let Some((credential, generation)) = self.session.credential_for_request() else {
            debug!("no active session; request not sent");
            return Err(GatewayError::NotAuthenticated);
        };

        let mut builder = self
            .client
            .request(method, url)
            .bearer_auth(credential.expose());
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let request = builder
            .build()
            .map_err(|e| GatewayError::unavailable(e.to_string()))?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| GatewayError::unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = error_detail(response).await;
        Err(match status {
            StatusCode::UNAUTHORIZED => {
                warn!(%detail, generation, "backend rejected the session credential");
                self.session.revoke(generation, &detail);
                GatewayError::StaleSession
            }
            StatusCode::FORBIDDEN => GatewayError::forbidden(detail),
            StatusCode::NOT_FOUND => GatewayError::NotFound { message: detail },
            s if s.is_server_error() => {
                GatewayError::unavailable(format!("HTTP {}: {}", s.as_u16(), detail))
            }
            s => GatewayError::Status {
                status: s.as_u16(),
                message: detail,
            },
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, GatewayError> {
        let response = self.send(method, path, body.as_ref()).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::decode(e.to_string()))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        self.send_json(Method::GET, path, None).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        self.send_json(Method::POST, path, Some(encode(body)?)).await
    }

    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        self.send_json(Method::PUT, path, Some(encode(body)?)).await
    }

    pub async fn patch_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        self.send_json(Method::PATCH, path, Some(encode(body)?)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), GatewayError> {
        self.send(Method::DELETE, path, None).await.map(|_| ())
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value, GatewayError> {
    serde_json::to_value(body).map_err(|e| GatewayError::decode(e.to_string()))
}
