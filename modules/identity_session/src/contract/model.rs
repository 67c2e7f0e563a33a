use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Authorization role attached to an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Paused,
    Blocked,
}

/// Billing plan fields as reported by the identity service. All optional:
/// token responses only carry the core identity fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_expires_at: Option<String>,
}

/// Read-only cached copy of a backend identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    #[serde(rename = "name")]
    pub display_name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(flatten)]
    pub plan: PlanAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Opaque bearer token. Never decoded, never printed.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token, for the authorization header only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// A credential minted by the identity service together with the identity it acts as.
#[derive(Debug, Clone, PartialEq)]
pub struct Grant {
    pub credential: Credential,
    pub identity: Identity,
}

/// The identity the backend currently associates with a credential.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityProbe {
    pub identity: Identity,
    pub is_impersonating: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Anonymous,
    Authenticated,
    Delegated,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionMode::Anonymous => "anonymous",
            SessionMode::Authenticated => "authenticated",
            SessionMode::Delegated => "delegated",
        })
    }
}

/// What consumers observe: the mode and the active identity, never credentials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub mode: SessionMode,
    pub identity: Option<Identity>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl SessionSnapshot {
    pub fn anonymous() -> Self {
        Self {
            mode: SessionMode::Anonymous,
            identity: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.mode != SessionMode::Anonymous
    }

    pub fn is_delegated(&self) -> bool {
        self.mode == SessionMode::Delegated
    }

    pub fn is_admin(&self) -> bool {
        self.identity.as_ref().is_some_and(|i| i.role.is_admin())
    }

    pub fn is_super_admin(&self) -> bool {
        self.identity
            .as_ref()
            .is_some_and(|i| i.role == Role::SuperAdmin)
    }
}

/// Kind of privileged action recorded by the audit service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuditAction {
    Impersonate,
    BlockUser,
    PauseUser,
    ActivateUser,
    ChangeRole,
    ChangePlan,
    CreateUser,
    UpdateProfile,
    ResetPassword,
    DeleteUser,
    Other(String),
}

impl AuditAction {
    pub fn as_str(&self) -> &str {
        match self {
            AuditAction::Impersonate => "impersonate",
            AuditAction::BlockUser => "block_user",
            AuditAction::PauseUser => "pause_user",
            AuditAction::ActivateUser => "activate_user",
            AuditAction::ChangeRole => "change_role",
            AuditAction::ChangePlan => "change_plan",
            AuditAction::CreateUser => "create_user",
            AuditAction::UpdateProfile => "update_profile",
            AuditAction::ResetPassword => "reset_password",
            AuditAction::DeleteUser => "delete_user",
            AuditAction::Other(raw) => raw,
        }
    }
}

impl From<String> for AuditAction {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "impersonate" => AuditAction::Impersonate,
            "block_user" => AuditAction::BlockUser,
            "pause_user" => AuditAction::PauseUser,
            "activate_user" => AuditAction::ActivateUser,
            "change_role" => AuditAction::ChangeRole,
            "change_plan" => AuditAction::ChangePlan,
            "create_user" => AuditAction::CreateUser,
            "update_profile" => AuditAction::UpdateProfile,
            "reset_password" => AuditAction::ResetPassword,
            "delete_user" => AuditAction::DeleteUser,
            _ => AuditAction::Other(raw),
        }
    }
}

impl From<AuditAction> for String {
    fn from(action: AuditAction) -> Self {
        action.as_str().to_string()
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit entry produced by the backend as a side effect of a privileged call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub actor_id: Uuid,
    pub actor_email: String,
    pub action: AuditAction,
    #[serde(default)]
    pub target_id: Option<Uuid>,
    #[serde(default)]
    pub target_email: Option<String>,
    #[serde(default)]
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditQuery {
    pub action: Option<AuditAction>,
    pub skip: u32,
    pub limit: u32,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            action: None,
            skip: 0,
            limit: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditPage {
    pub logs: Vec<AuditRecord>,
    pub total: u64,
}
