use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use crate::contract::model::{Credential, Grant, Identity, IdentityProbe};
use crate::domain::error::IdentityError;
use crate::domain::ports::IdentityPort;
use crate::infra::http::{error_detail, TracedClient};

/// Token response of login, register, impersonate and exit-impersonate.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Credential,
    #[serde(default)]
    token_type: Option<String>,
    user: Identity,
    #[serde(default)]
    is_impersonating: bool,
}

/// `GET /auth/me`: the identity fields plus the delegation flag.
#[derive(Debug, Deserialize)]
struct MeResponse {
    #[serde(flatten)]
    identity: Identity,
    #[serde(default)]
    is_impersonating: bool,
}

impl TokenResponse {
    fn into_grant(self, expect_impersonating: bool) -> Result<Grant, IdentityError> {
        if self.access_token.is_blank() {
            return Err(IdentityError::protocol("empty access token"));
        }
        if let Some(kind) = &self.token_type {
            if !kind.eq_ignore_ascii_case("bearer") {
                return Err(IdentityError::protocol(format!(
                    "unsupported token type '{kind}'"
                )));
            }
        }
        if self.is_impersonating != expect_impersonating {
            return Err(IdentityError::protocol(format!(
                "backend reported is_impersonating={} (expected {})",
                self.is_impersonating, expect_impersonating
            )));
        }
        Ok(Grant {
            credential: self.access_token,
            identity: self.user,
        })
    }
}

fn status_error(status: StatusCode, detail: String) -> IdentityError {
    match status {
        StatusCode::UNAUTHORIZED => IdentityError::unauthorized(detail),
        StatusCode::FORBIDDEN => IdentityError::forbidden(detail),
        StatusCode::NOT_FOUND => IdentityError::not_found(detail),
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            IdentityError::rejected(status.as_u16(), detail)
        }
        _ => IdentityError::unavailable(format!("HTTP {}: {}", status.as_u16(), detail)),
    }
}

/// HTTP adapter implementing the IdentityPort against the backend `/api` routes.
pub struct HttpIdentityClient {
    client: TracedClient,
    base: Url,
}

impl HttpIdentityClient {
    pub fn new(client: TracedClient, base: Url) -> Self {
        Self { client, base }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, IdentityError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| IdentityError::protocol("invalid identity base URL"))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        credential: Option<&Credential>,
        body: Option<serde_json::Value>,
    ) -> Result<T, IdentityError> {
        let label = format!("{} {}", method, url.path());
        let mut builder = self.client.request(method, url);
        if let Some(credential) = credential {
            builder = builder.bearer_auth(credential.expose());
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let request = builder
            .build()
            .map_err(|e| IdentityError::protocol(e.to_string()))?;
        let response = self
            .client
            .execute(request)
            .await
            .with_context(|| label.clone())
            .map_err(|e| IdentityError::unavailable(format!("{e:#}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = error_detail(response).await;
            debug!(%status, %detail, "identity service refused {}", label);
            return Err(status_error(status, detail));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| IdentityError::protocol(format!("{label}: {e}")))
    }
}

#[async_trait]
impl IdentityPort for HttpIdentityClient {
    #[instrument(
        name = "identity_session.http.identity.authenticate",
        skip_all,
        fields(base = %self.base, email = %email)
    )]
    async fn authenticate(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<Grant, IdentityError> {
        let url = self.endpoint(&["auth", "login"])?;
        let body = serde_json::json!({
            "email": email,
            "password": secret.expose_secret(),
        });
        let token: TokenResponse = self.call(Method::POST, url, None, Some(body)).await?;
        token.into_grant(false)
    }

    #[instrument(
        name = "identity_session.http.identity.register",
        skip_all,
        fields(base = %self.base, email = %email)
    )]
    async fn register(
        &self,
        name: &str,
        email: &str,
        secret: &SecretString,
    ) -> Result<Grant, IdentityError> {
        let url = self.endpoint(&["auth", "register"])?;
        let body = serde_json::json!({
            "name": name,
            "email": email,
            "password": secret.expose_secret(),
        });
        let token: TokenResponse = self.call(Method::POST, url, None, Some(body)).await?;
        token.into_grant(false)
    }

    #[instrument(
        name = "identity_session.http.identity.delegate",
        skip_all,
        fields(base = %self.base, target_id = %target)
    )]
    async fn delegate(&self, actor: &Credential, target: Uuid) -> Result<Grant, IdentityError> {
        let target = target.to_string();
        let url = self.endpoint(&["admin", "impersonate", &target])?;
        let token: TokenResponse = self.call(Method::POST, url, Some(actor), None).await?;
        token.into_grant(true)
    }

    #[instrument(name = "identity_session.http.identity.restore", skip_all, fields(base = %self.base))]
    async fn restore(&self, delegated: &Credential) -> Result<Grant, IdentityError> {
        let url = self.endpoint(&["admin", "exit-impersonate"])?;
        let token: TokenResponse = self.call(Method::POST, url, Some(delegated), None).await?;
        token.into_grant(false)
    }

    #[instrument(name = "identity_session.http.identity.current", skip_all, fields(base = %self.base))]
    async fn current_identity(
        &self,
        credential: &Credential,
    ) -> Result<IdentityProbe, IdentityError> {
        let url = self.endpoint(&["auth", "me"])?;
        let me: MeResponse = self.call(Method::GET, url, Some(credential), None).await?;
        Ok(IdentityProbe {
            identity: me.identity,
            is_impersonating: me.is_impersonating,
        })
    }
}
