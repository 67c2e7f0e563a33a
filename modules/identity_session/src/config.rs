use serde::{Deserialize, Serialize};

/// Identity session configuration, read from `modules.identity_session`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdentitySessionConfig {
    /// Backend origin; routes are resolved under `<backend_url>/api`.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Session record path, relative to the client home dir unless absolute.
    #[serde(default = "default_store_file")]
    pub store_file: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for IdentitySessionConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            store_file: default_store_file(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_store_file() -> String {
    "session.json".to_string()
}

fn default_request_timeout_ms() -> u64 {
    15_000
}
