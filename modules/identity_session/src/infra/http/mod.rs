//! Outgoing HTTP plumbing shared by the identity adapter and the resource gateway.

pub mod trace_context;
pub mod traced_client;

pub use traced_client::TracedClient;

/// Human-readable reason from an error response.
/// Prefers the backend's `{"detail": ...}` body, then the raw body, then the status text.
pub async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| match v.get("detail") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        });

    match detail {
        Some(d) => d,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    }
}
